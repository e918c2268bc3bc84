//! Clock utilities for storeq
//!
//! Everything that needs "today" goes through [`now`], so relative date
//! keywords can be exercised against a fixed day.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `STOREQ_MOCK_TIME` environment variable overrides the
//! system time. Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2024-08-27 14:30:00`).

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "STOREQ_MOCK_TIME";

/// Compact, lexically sortable date key sent to the backend (`20240827`)
pub const DATE_KEY_FORMAT: &str = "%Y%m%d";

/// Date format shown to users and accepted for manual entry (`27/08/2024`)
pub const DATE_DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Date format of persisted request dates (`2024-08-27`)
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Time-of-day format of persisted request times (`14:30:00`)
pub const TIME_FORMAT: &str = "%H:%M:%S";

static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                if let Ok(naive_dt) =
                    NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S")
                {
                    if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        "Failed to convert mock time to local timezone"
                    );
                } else {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = "%Y-%m-%d %H:%M:%S",
                        "Invalid mock time format"
                    );
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Today's calendar date according to [`now`]
pub fn today() -> NaiveDate {
    now().date_naive()
}

pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn format_date_display(date: NaiveDate) -> String {
    date.format(DATE_DISPLAY_FORMAT).to_string()
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Timestamp suffix used in generated file names (`20240827_143000`)
pub fn format_file_timestamp(dt: &DateTime<Local>) -> String {
    dt.format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_and_display_describe_same_day() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 27).unwrap();

        assert_eq!(format_date_key(date), "20240827");
        assert_eq!(format_date_display(date), "27/08/2024");
        assert_eq!(format_iso_date(date), "2024-08-27");

        let from_key = NaiveDate::parse_from_str(&format_date_key(date), DATE_KEY_FORMAT).unwrap();
        let from_display =
            NaiveDate::parse_from_str(&format_date_display(date), DATE_DISPLAY_FORMAT).unwrap();
        assert_eq!(from_key, from_display);
    }

    #[test]
    fn date_keys_sort_chronologically() {
        let earlier = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(format_date_key(earlier) < format_date_key(later));
        assert!(format_iso_date(earlier) < format_iso_date(later));
    }

    #[test]
    fn file_timestamp_format() {
        let dt = Local.with_ymd_and_hms(2024, 8, 27, 9, 5, 3).unwrap();
        assert_eq!(format_file_timestamp(&dt), "20240827_090503");
    }

    #[test]
    fn today_matches_now() {
        assert_eq!(today(), now().date_naive());
    }
}
