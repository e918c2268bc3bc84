//! Connection record types

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use storeq_util::{ConnectionId, StoreId, UserId};

/// Outcome of a dispatched query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Success,
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// One durable log entry for a completed dispatch.
///
/// Field order matches the persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub connection_id: ConnectionId,
    pub store_id: StoreId,
    /// Transaction date the user asked about
    pub queried_date: NaiveDate,
    /// Day the query was made
    pub request_date: NaiveDate,
    pub request_time: NaiveTime,
    pub user_id: UserId,
    pub status: RecordStatus,
}

/// Inclusive range of request dates; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

/// Read filter for connection records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub store_id: Option<StoreId>,
    pub date_range: Option<DateRange>,
}

impl RecordFilter {
    /// Matches every record
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn matches(&self, record: &ConnectionRecord) -> bool {
        self.store_id.as_ref().is_none_or(|s| s == &record.store_id)
            && self
                .date_range
                .is_none_or(|r| r.contains(record.request_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(store: &str, request_date: NaiveDate) -> ConnectionRecord {
        ConnectionRecord {
            connection_id: ConnectionId::new("c1"),
            store_id: StoreId::new(store),
            queried_date: request_date,
            request_date,
            request_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            user_id: UserId::new("u1"),
            status: RecordStatus::Success,
        }
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange::between(date(2024, 8, 1), date(2024, 8, 31));
        assert!(range.contains(date(2024, 8, 1)));
        assert!(range.contains(date(2024, 8, 31)));
        assert!(!range.contains(date(2024, 9, 1)));
        assert!(!range.contains(date(2024, 7, 31)));
    }

    #[test]
    fn open_ended_range() {
        let range = DateRange::new(Some(date(2024, 1, 1)), None);
        assert!(range.contains(date(2030, 1, 1)));
        assert!(!range.contains(date(2023, 12, 31)));
    }

    #[test]
    fn filter_combines_store_and_dates() {
        let filter = RecordFilter::all()
            .for_store(StoreId::new("KFC004"))
            .within(DateRange::between(date(2024, 8, 1), date(2024, 8, 31)));

        assert!(filter.matches(&record("KFC004", date(2024, 8, 15))));
        assert!(!filter.matches(&record("KFC005", date(2024, 8, 15))));
        assert!(!filter.matches(&record("KFC004", date(2024, 9, 15))));
        assert!(RecordFilter::all().matches(&record("ABC123", date(1999, 1, 1))));
    }

    #[test]
    fn status_parses_its_own_output() {
        for status in [RecordStatus::Success, RecordStatus::Error] {
            assert_eq!(status.as_str().parse::<RecordStatus>(), Ok(status));
        }
        assert!("pending".parse::<RecordStatus>().is_err());
    }
}
