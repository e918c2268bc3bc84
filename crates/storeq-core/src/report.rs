//! Report aggregation over the connection record log

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use storeq_store::{ConnectionRecord, DateRange, RecordFilter, RecordStore, StoreError};
use storeq_util::StoreId;
use thiserror::Error;
use tracing::{debug, warn};

/// Flat listing or grouped summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Every matching record, newest request first (CSV)
    Flat,
    /// Per-store and per-day counts (detailed text)
    Grouped,
}

impl ReportKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Flat => "📊 Reporte CSV",
            Self::Grouped => "📈 Reporte Detallado",
        }
    }

    /// Recognize a report-type button or keyword
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed == Self::Flat.label() {
            return Some(Self::Flat);
        }
        if trimmed == Self::Grouped.label() {
            return Some(Self::Grouped);
        }

        match trimmed.to_lowercase().as_str() {
            "csv" | "reporte csv" | "flat" | "listado" => Some(Self::Flat),
            "detallado" | "reporte detallado" | "grouped" | "summary" | "resumen" => {
                Some(Self::Grouped)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which stores a report covers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreFilter {
    All,
    Store(StoreId),
}

impl StoreFilter {
    pub fn store_id(&self) -> Option<&StoreId> {
        match self {
            Self::All => None,
            Self::Store(id) => Some(id),
        }
    }
}

impl fmt::Display for StoreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("todos"),
            Self::Store(id) => write!(f, "{}", id),
        }
    }
}

/// Connection count and first/last request day for one store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub store_id: StoreId,
    pub count: usize,
    pub first_request: NaiveDate,
    pub last_request: NaiveDate,
}

/// Connection count for one request day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub request_date: NaiveDate,
    pub count: usize,
}

/// Grouped report: the sorted rows plus both summaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedReport {
    pub records: Vec<ConnectionRecord>,
    pub by_store: Vec<StoreSummary>,
    pub by_date: Vec<DaySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Flat(Vec<ConnectionRecord>),
    Grouped(GroupedReport),
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::Flat(_) => ReportKind::Flat,
            Self::Grouped(_) => ReportKind::Grouped,
        }
    }

    /// Rows the report was built from
    pub fn records(&self) -> &[ConnectionRecord] {
        match self {
            Self::Flat(records) => records,
            Self::Grouped(grouped) => &grouped.records,
        }
    }
}

/// Result of building a report; an empty match is not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Ready(Report),
    Empty,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Error leyendo registros de conexiones: {0}")]
    StoreRead(#[from] StoreError),

    #[error("Error generando el documento del reporte: {0}")]
    Render(#[from] std::io::Error),

    #[error("Error generando el documento del reporte")]
    Format(#[from] std::fmt::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Sort newest request day first; equal days keep insertion order
pub fn sort_by_request_date_desc(records: &mut [ConnectionRecord]) {
    records.sort_by(|a, b| b.request_date.cmp(&a.request_date));
}

/// Per-store counts, most connections first (ties by store id)
pub fn summarize_by_store(records: &[ConnectionRecord]) -> Vec<StoreSummary> {
    let mut groups: BTreeMap<&StoreId, StoreSummary> = BTreeMap::new();

    for record in records {
        groups
            .entry(&record.store_id)
            .and_modify(|s| {
                s.count += 1;
                s.first_request = s.first_request.min(record.request_date);
                s.last_request = s.last_request.max(record.request_date);
            })
            .or_insert_with(|| StoreSummary {
                store_id: record.store_id.clone(),
                count: 1,
                first_request: record.request_date,
                last_request: record.request_date,
            });
    }

    let mut summaries: Vec<_> = groups.into_values().collect();
    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

/// Per-day counts, newest day first
pub fn summarize_by_date(records: &[ConnectionRecord]) -> Vec<DaySummary> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.request_date).or_default() += 1;
    }

    counts
        .into_iter()
        .rev()
        .map(|(request_date, count)| DaySummary {
            request_date,
            count,
        })
        .collect()
}

/// Builds reports from an injected record store
pub struct ReportAggregator {
    store: Arc<dyn RecordStore>,
}

impl ReportAggregator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Every store id seen in the log, deduplicated, ascending
    pub fn get_distinct_stores(&self) -> ReportResult<Vec<StoreId>> {
        let records = self.store.read(&RecordFilter::all()).inspect_err(|e| {
            warn!(error = %e, "Failed to read stores for report selection");
        })?;

        let stores: BTreeSet<StoreId> = records.into_iter().map(|r| r.store_id).collect();
        Ok(stores.into_iter().collect())
    }

    pub fn build_report(
        &self,
        kind: ReportKind,
        store_filter: &StoreFilter,
        date_range: Option<DateRange>,
    ) -> ReportResult<ReportOutcome> {
        let filter = RecordFilter {
            store_id: store_filter.store_id().cloned(),
            date_range,
        };

        let mut records = self.store.read(&filter).inspect_err(|e| {
            warn!(error = %e, "Failed to read records for report");
        })?;

        // The store already filters; re-check so any RecordStore behaves the same
        records.retain(|r| filter.matches(r));

        if records.is_empty() {
            debug!(kind = ?kind, filter = %store_filter, "Report matched no records");
            return Ok(ReportOutcome::Empty);
        }

        sort_by_request_date_desc(&mut records);

        let report = match kind {
            ReportKind::Flat => Report::Flat(records),
            ReportKind::Grouped => {
                let by_store = summarize_by_store(&records);
                let by_date = summarize_by_date(&records);
                Report::Grouped(GroupedReport {
                    records,
                    by_store,
                    by_date,
                })
            }
        };

        debug!(
            kind = ?kind,
            filter = %store_filter,
            rows = report.records().len(),
            "Report built"
        );

        Ok(ReportOutcome::Ready(report))
    }
}
