//! Per-user dialogue state

use chrono::{DateTime, Local};
use storeq_util::{StoreId, UserId};

use crate::{DialogueKind, OptionalField, QueryDate, ReportKind, Stage};

/// Fields collected by the query form so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub store_id: Option<StoreId>,
    pub date: Option<QueryDate>,
    pub reference: Option<OptionalField>,
    pub authorization: Option<OptionalField>,
}

impl FormFields {
    /// Forget the answer for `stage` and every later form stage
    pub fn clear_from(&mut self, stage: Stage) {
        let mut current = Some(stage);
        while let Some(s) = current {
            match s {
                Stage::CollectStore => self.store_id = None,
                Stage::CollectDate => self.date = None,
                Stage::CollectReference => self.reference = None,
                Stage::CollectAuthorization => self.authorization = None,
                Stage::ReportSelectType | Stage::ReportSelectStore => {}
            }
            current = s.next();
        }
    }

    /// Assemble the request once every field has been answered
    pub fn to_request(&self) -> Option<QueryRequest> {
        Some(QueryRequest {
            store_id: self.store_id.clone()?,
            date: self.date?,
            reference: self.reference.clone()?.into_option(),
            authorization: self.authorization.clone()?.into_option(),
        })
    }
}

/// Choices made in the report dialogue so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSelection {
    pub kind: Option<ReportKind>,
    /// Stores offered on the selection keyboard
    pub stores: Vec<StoreId>,
}

/// A fully collected query, ready to dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub store_id: StoreId,
    pub date: QueryDate,
    pub reference: Option<String>,
    pub authorization: Option<String>,
}

/// In-progress dialogue for exactly one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub stage: Stage,
    pub form: FormFields,
    pub report: ReportSelection,
    pub started_at: DateTime<Local>,
}

impl Session {
    /// Empty session positioned at the first stage of `kind`
    pub fn new(user_id: UserId, kind: DialogueKind, now: DateTime<Local>) -> Self {
        Self {
            user_id,
            stage: Stage::initial(kind),
            form: FormFields::default(),
            report: ReportSelection::default(),
            started_at: now,
        }
    }

    pub fn dialogue(&self) -> DialogueKind {
        self.stage.dialogue()
    }

    /// Move back to `stage`.
    ///
    /// Answers from the stage being left onward are discarded; `stage` and
    /// everything before it keep their answers until they are re-entered.
    pub fn rewind_to(&mut self, stage: Stage) {
        self.form.clear_from(self.stage);
        if stage == Stage::ReportSelectType {
            self.report = ReportSelection::default();
        }
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn filled() -> FormFields {
        FormFields {
            store_id: Some(StoreId::new("KFC004")),
            date: Some(QueryDate::new(NaiveDate::from_ymd_opt(2024, 8, 27).unwrap())),
            reference: Some(OptionalField::Absent),
            authorization: Some(OptionalField::Value("AUTH123".into())),
        }
    }

    #[test]
    fn request_requires_every_answer() {
        let mut fields = filled();
        let request = fields.to_request().unwrap();
        assert_eq!(request.store_id.as_str(), "KFC004");
        assert_eq!(request.reference, None);
        assert_eq!(request.authorization.as_deref(), Some("AUTH123"));

        fields.reference = None;
        assert!(fields.to_request().is_none());
    }

    #[test]
    fn rewind_keeps_earlier_answers() {
        let mut session = Session::new(UserId::new("u"), DialogueKind::QueryForm, Local::now());
        session.form = filled();
        session.stage = Stage::CollectAuthorization;

        session.rewind_to(Stage::CollectReference);

        assert_eq!(session.stage, Stage::CollectReference);
        assert_eq!(session.form.store_id, Some(StoreId::new("KFC004")));
        assert!(session.form.date.is_some());
        assert_eq!(session.form.reference, Some(OptionalField::Absent));
        assert!(session.form.authorization.is_none());
    }

    #[test]
    fn rewind_discards_the_stage_being_left() {
        let mut session = Session::new(UserId::new("u"), DialogueKind::QueryForm, Local::now());
        session.form = filled();
        session.form.reference = None;
        session.form.authorization = None;
        session.stage = Stage::CollectReference;

        session.rewind_to(Stage::CollectDate);
        assert_eq!(session.stage, Stage::CollectDate);
        assert!(session.form.date.is_some());

        session.rewind_to(Stage::CollectStore);
        assert_eq!(session.stage, Stage::CollectStore);
        assert_eq!(session.form.store_id, Some(StoreId::new("KFC004")));
        assert!(session.form.date.is_none());
    }

    #[test]
    fn new_session_starts_at_first_stage() {
        let form = Session::new(UserId::new("u"), DialogueKind::QueryForm, Local::now());
        assert_eq!(form.stage, Stage::CollectStore);

        let report = Session::new(UserId::new("u"), DialogueKind::Report, Local::now());
        assert_eq!(report.stage, Stage::ReportSelectType);
        assert_eq!(report.dialogue(), DialogueKind::Report);
    }
}
