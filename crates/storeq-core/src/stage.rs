//! Dialogue stages shared by the query form and the report dialogue

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which dialogue a stage belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueKind {
    QueryForm,
    Report,
}

/// A point in a dialogue awaiting one specific answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CollectStore,
    CollectDate,
    CollectReference,
    CollectAuthorization,
    ReportSelectType,
    ReportSelectStore,
}

impl Stage {
    pub fn dialogue(&self) -> DialogueKind {
        match self {
            Self::CollectStore
            | Self::CollectDate
            | Self::CollectReference
            | Self::CollectAuthorization => DialogueKind::QueryForm,
            Self::ReportSelectType | Self::ReportSelectStore => DialogueKind::Report,
        }
    }

    /// First stage of a dialogue
    pub fn initial(kind: DialogueKind) -> Self {
        match kind {
            DialogueKind::QueryForm => Self::CollectStore,
            DialogueKind::Report => Self::ReportSelectType,
        }
    }

    /// Stage that "back" returns to; `None` at the first stage
    pub fn previous(&self) -> Option<Self> {
        match self {
            Self::CollectStore | Self::ReportSelectType => None,
            Self::CollectDate => Some(Self::CollectStore),
            Self::CollectReference => Some(Self::CollectDate),
            Self::CollectAuthorization => Some(Self::CollectReference),
            Self::ReportSelectStore => Some(Self::ReportSelectType),
        }
    }

    /// Stage that follows a successful answer; `None` at the last stage
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::CollectStore => Some(Self::CollectDate),
            Self::CollectDate => Some(Self::CollectReference),
            Self::CollectReference => Some(Self::CollectAuthorization),
            Self::ReportSelectType => Some(Self::ReportSelectStore),
            Self::CollectAuthorization | Self::ReportSelectStore => None,
        }
    }

    /// Whether `/skip` and the "no value" sentinel apply here
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::CollectReference | Self::CollectAuthorization)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CollectStore => "COLLECT_STORE",
            Self::CollectDate => "COLLECT_DATE",
            Self::CollectReference => "COLLECT_REFERENCE",
            Self::CollectAuthorization => "COLLECT_AUTHORIZATION",
            Self::ReportSelectType => "REPORT_SELECT_TYPE",
            Self::ReportSelectStore => "REPORT_SELECT_STORE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Stage; 6] = [
        Stage::CollectStore,
        Stage::CollectDate,
        Stage::CollectReference,
        Stage::CollectAuthorization,
        Stage::ReportSelectType,
        Stage::ReportSelectStore,
    ];

    #[test]
    fn next_and_previous_are_inverse() {
        for stage in ALL {
            if let Some(next) = stage.next() {
                assert_eq!(next.previous(), Some(stage));
                assert_eq!(next.dialogue(), stage.dialogue());
            }
        }
    }

    #[test]
    fn first_stages_have_no_predecessor() {
        assert_eq!(Stage::initial(DialogueKind::QueryForm).previous(), None);
        assert_eq!(Stage::initial(DialogueKind::Report).previous(), None);
    }

    #[test]
    fn only_reference_and_authorization_are_optional() {
        let optional: Vec<_> = ALL.into_iter().filter(Stage::is_optional).collect();
        assert_eq!(optional, [Stage::CollectReference, Stage::CollectAuthorization]);
    }
}
