//! Single-field validators
//!
//! Pure functions: every input either yields a typed value or a
//! [`FieldError`] whose message can be shown to the user as-is.

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use storeq_util::{format_date_display, format_date_key, StoreId, DATE_DISPLAY_FORMAT};
use thiserror::Error;

/// Example shown whenever a store id is rejected
pub const STORE_ID_EXAMPLE: &str = "kfc004";

/// Example shown whenever a manual date is rejected
pub const DATE_EXAMPLE: &str = "27/08/2024";

/// Recoverable validation failures; the dialogue re-prompts on these
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Formato incorrecto: '{input}'. Ingresa el local en el formato: {example}")]
    InvalidFormat { input: String, example: &'static str },

    #[error("Fecha inválida: '{input}'. Usa DD/MM/AAAA (ejemplo: {example})")]
    InvalidDate { input: String, example: &'static str },
}

fn store_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{3}\d{3}$").expect("Invalid store id regex"))
}

/// `D/M/YYYY` shape, checked before chrono parses the numbers
fn manual_date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9]{1,2}/[0-9]{1,2}/[0-9]{4}$").expect("Invalid manual date regex")
    })
}

/// Normalize and validate a store identifier (`kfc004` -> `KFC004`)
pub fn validate_store_id(input: &str) -> Result<StoreId, FieldError> {
    let normalized = input.trim().to_uppercase();

    if store_id_pattern().is_match(&normalized) {
        Ok(StoreId::new(normalized))
    } else {
        Err(FieldError::InvalidFormat {
            input: input.trim().to_string(),
            example: STORE_ID_EXAMPLE,
        })
    }
}

/// Relative-day shortcuts offered on the date keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickDate {
    Today,
    Yesterday,
    TwoDaysAgo,
    ThreeDaysAgo,
}

impl QuickDate {
    pub const ALL: [QuickDate; 4] = [
        QuickDate::Today,
        QuickDate::Yesterday,
        QuickDate::TwoDaysAgo,
        QuickDate::ThreeDaysAgo,
    ];

    /// Button label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Today => "Hoy",
            Self::Yesterday => "Ayer",
            Self::TwoDaysAgo => "Hace 2 días",
            Self::ThreeDaysAgo => "Hace 3 días",
        }
    }

    pub fn days_back(&self) -> u64 {
        match self {
            Self::Today => 0,
            Self::Yesterday => 1,
            Self::TwoDaysAgo => 2,
            Self::ThreeDaysAgo => 3,
        }
    }

    /// Recognize a keyword, case-insensitively, in Spanish or English
    pub fn parse(input: &str) -> Option<Self> {
        let lowered = input.trim().to_lowercase();
        match lowered.as_str() {
            "hoy" | "today" => Some(Self::Today),
            "ayer" | "yesterday" => Some(Self::Yesterday),
            "hace 2 días" | "hace 2 dias" | "2 days ago" => Some(Self::TwoDaysAgo),
            "hace 3 días" | "hace 3 dias" | "3 days ago" => Some(Self::ThreeDaysAgo),
            _ => None,
        }
    }

    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(self.days_back()))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// A validated transaction date.
///
/// The backend key and the display text are both derived from the one
/// calendar date held here, so they cannot disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueryDate(NaiveDate);

impl QueryDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Compact sortable key sent to the backend (`YYYYMMDD`)
    pub fn key(&self) -> String {
        format_date_key(self.0)
    }

    /// Form shown to the user (`DD/MM/YYYY`)
    pub fn display(&self) -> String {
        format_date_display(self.0)
    }
}

impl fmt::Display for QueryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Parse a quick-date keyword or a strict `DD/MM/YYYY` date
pub fn parse_date(input: &str, today: NaiveDate) -> Result<QueryDate, FieldError> {
    if let Some(quick) = QuickDate::parse(input) {
        return Ok(QueryDate::new(quick.resolve(today)));
    }

    let trimmed = input.trim();
    let invalid = || FieldError::InvalidDate {
        input: trimmed.to_string(),
        example: DATE_EXAMPLE,
    };

    if !manual_date_pattern().is_match(trimmed) {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(trimmed, DATE_DISPLAY_FORMAT)
        .map(QueryDate::new)
        .map_err(|_| invalid())
}

/// Value of an optional field once the user has answered it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionalField {
    /// Explicitly "no value"; not the same as an empty string
    Absent,
    Value(String),
}

impl OptionalField {
    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Value(v) => Some(v),
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::Value(v) => Some(v),
        }
    }
}

/// Label of the "no value" button on optional-field keyboards
pub const NO_VALUE_LABEL: &str = "No tengo";

/// Whether the input is the "no value" sentinel
pub fn is_no_value(input: &str) -> bool {
    let lowered = input.trim().to_lowercase();
    lowered == NO_VALUE_LABEL.to_lowercase() || lowered == "none" || lowered == "ninguno"
}

/// Map the sentinel to [`OptionalField::Absent`]; anything else is kept verbatim (trimmed)
pub fn normalize_optional(input: &str) -> OptionalField {
    if is_no_value(input) {
        OptionalField::Absent
    } else {
        OptionalField::Value(input.trim().to_string())
    }
}
