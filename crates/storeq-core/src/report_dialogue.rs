//! Report dialogue: pick a report kind, then a store scope

use chrono::{DateTime, Local};
use storeq_api::Reply;
use storeq_util::StoreId;

use crate::prompts::ALL_STORES_LABEL;
use crate::{
    prompts, render_attachment, report_caption, validate_store_id, Effect, EndReason, Input,
    Next, ReportKind, ReportOutcome, ReportResult, Session, Stage, StoreFilter,
    TransitionResult,
};

pub fn step(mut session: Session, input: Input) -> TransitionResult {
    let stage = session.stage;

    match input {
        Input::Cancel => TransitionResult::end(EndReason::Cancelled, prompts::report_cancelled()),

        Input::Back => match stage.previous() {
            Some(previous) => {
                session.rewind_to(previous);
                TransitionResult::stay(session, prompts::report_menu())
            }
            None => TransitionResult::stay(session, prompts::back_at_first_stage(stage)),
        },

        Input::Skip => {
            let reply = prompts::skip_not_allowed(stage, &session.form, &session.report.stores);
            TransitionResult::stay(session, reply)
        }

        Input::Text(text) => match stage {
            Stage::ReportSelectType => match ReportKind::parse(&text) {
                Some(kind) => {
                    session.report.kind = Some(kind);
                    TransitionResult::new(Next::Continue(session)).with_effect(Effect::OfferStores)
                }
                None => TransitionResult::stay(session, prompts::unknown_report_type(&text)),
            },
            Stage::ReportSelectStore => select_store(session, &text),
            _ => reprompt(session),
        },

        Input::Command(_) => reprompt(session),
    }
}

fn reprompt(session: Session) -> TransitionResult {
    let reply = prompts::stage_prompt(session.stage, &session.form, &session.report.stores);
    TransitionResult::stay(session, reply)
}

fn parse_store_choice(text: &str, offered: &[StoreId]) -> Option<StoreFilter> {
    if text == ALL_STORES_LABEL || matches!(text.to_lowercase().as_str(), "todos" | "all") {
        return Some(StoreFilter::All);
    }
    let store_id = validate_store_id(text).ok()?;
    offered.contains(&store_id).then_some(StoreFilter::Store(store_id))
}

fn select_store(mut session: Session, text: &str) -> TransitionResult {
    let Some(kind) = session.report.kind else {
        session.rewind_to(Stage::ReportSelectType);
        return TransitionResult::stay(session, prompts::report_menu());
    };

    match parse_store_choice(text, &session.report.stores) {
        Some(filter) => TransitionResult::end(EndReason::ReportRequested, prompts::generating(kind, text))
            .with_effect(Effect::BuildReport { kind, filter }),
        None => {
            let reply = prompts::unknown_store(text, &session.report.stores);
            TransitionResult::stay(session, reply)
        }
    }
}

/// Continue after the distinct stores have been looked up
pub fn offer_stores(mut session: Session, stores: ReportResult<Vec<StoreId>>) -> TransitionResult {
    let Some(kind) = session.report.kind else {
        session.rewind_to(Stage::ReportSelectType);
        return TransitionResult::stay(session, prompts::report_menu());
    };

    match stores {
        Ok(stores) if stores.is_empty() => {
            TransitionResult::end(EndReason::NoReportData, prompts::no_report_data())
        }
        Ok(stores) => {
            let reply = prompts::store_selection(kind, &stores);
            session.report.stores = stores;
            session.stage = Stage::ReportSelectStore;
            TransitionResult::stay(session, reply)
        }
        Err(e) => TransitionResult::end(EndReason::ReportFailed, prompts::report_failed(&e.to_string())),
    }
}

/// Replies for a finished report build
pub fn deliver_report(
    filter: &StoreFilter,
    outcome: &ReportResult<ReportOutcome>,
    generated_at: &DateTime<Local>,
) -> Vec<Reply> {
    match outcome {
        Ok(ReportOutcome::Ready(report)) => match render_attachment(report, filter, generated_at) {
            Ok(attachment) => vec![
                Reply::text(report_caption(report)).with_attachment(attachment),
                prompts::report_done(),
            ],
            Err(e) => vec![prompts::report_failed(&e.to_string())],
        },
        Ok(ReportOutcome::Empty) => vec![prompts::report_empty()],
        Err(e) => vec![prompts::report_failed(&e.to_string())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DialogueKind, Report, ReportError};
    use chrono::{NaiveDate, NaiveTime};
    use storeq_store::{ConnectionRecord, RecordStatus, StoreError};
    use storeq_util::{ConnectionId, UserId};

    fn new_report() -> Session {
        Session::new(UserId::new("1001"), DialogueKind::Report, Local::now())
    }

    fn stores() -> Vec<StoreId> {
        vec![StoreId::new("KFC001"), StoreId::new("KFC004")]
    }

    fn at_store_selection(kind_label: &str) -> Session {
        let session = step(new_report(), Input::classify(kind_label))
            .next
            .into_session()
            .unwrap();
        offer_stores(session, Ok(stores())).next.into_session().unwrap()
    }

    #[test]
    fn kind_selection_requests_store_lookup() {
        let result = step(new_report(), Input::classify("📈 Reporte Detallado"));
        assert_eq!(result.effects, vec![Effect::OfferStores]);
        assert!(result.replies.is_empty());
        let session = result.next.session().unwrap();
        assert_eq!(session.report.kind, Some(ReportKind::Grouped));
        assert_eq!(session.stage, Stage::ReportSelectType);
    }

    #[test]
    fn unknown_kind_reprompts() {
        let result = step(new_report(), Input::classify("pdf"));
        assert!(result.effects.is_empty());
        assert_eq!(result.next.session().unwrap().stage, Stage::ReportSelectType);
    }

    #[test]
    fn no_stores_ends_with_no_data() {
        let session = step(new_report(), Input::classify("csv")).next.into_session().unwrap();
        let result = offer_stores(session, Ok(vec![]));
        assert_eq!(result.next, Next::End(EndReason::NoReportData));
        assert_eq!(result.replies, vec![prompts::no_report_data()]);
        assert!(result.effects.is_empty());
    }

    #[test]
    fn store_read_failure_aborts() {
        let session = step(new_report(), Input::classify("csv")).next.into_session().unwrap();
        let result = offer_stores(
            session,
            Err(ReportError::StoreRead(StoreError::Database("locked".into()))),
        );
        assert_eq!(result.next, Next::End(EndReason::ReportFailed));
        assert_eq!(result.replies.len(), 1);
    }

    #[test]
    fn stores_offered_then_selected() {
        let session = at_store_selection("📊 Reporte CSV");
        assert_eq!(session.stage, Stage::ReportSelectStore);
        assert_eq!(session.report.stores, stores());

        let result = step(session, Input::classify("kfc004"));
        assert_eq!(result.next, Next::End(EndReason::ReportRequested));
        assert_eq!(
            result.effects,
            vec![Effect::BuildReport {
                kind: ReportKind::Flat,
                filter: StoreFilter::Store(StoreId::new("KFC004")),
            }]
        );
    }

    #[test]
    fn all_stores_button() {
        let result = step(at_store_selection("csv"), Input::classify(ALL_STORES_LABEL));
        assert_eq!(
            result.effects,
            vec![Effect::BuildReport {
                kind: ReportKind::Flat,
                filter: StoreFilter::All,
            }]
        );
    }

    #[test]
    fn store_not_offered_reprompts() {
        let result = step(at_store_selection("csv"), Input::classify("XYZ999"));
        assert!(result.effects.is_empty());
        assert_eq!(result.next.session().unwrap().stage, Stage::ReportSelectStore);
    }

    #[test]
    fn back_returns_to_kind_selection() {
        let result = step(at_store_selection("csv"), Input::classify(crate::REPORT_BACK_LABEL));
        let session = result.next.session().unwrap();
        assert_eq!(session.stage, Stage::ReportSelectType);
        assert_eq!(session.report.kind, None);
        assert!(session.report.stores.is_empty());
        assert_eq!(result.replies, vec![prompts::report_menu()]);
    }

    #[test]
    fn cancel_at_either_stage() {
        let result = step(new_report(), Input::classify(crate::REPORT_CANCEL_LABEL));
        assert_eq!(result.next, Next::End(EndReason::Cancelled));

        let result = step(at_store_selection("csv"), Input::classify("/cancel"));
        assert_eq!(result.next, Next::End(EndReason::Cancelled));
        assert!(result.effects.is_empty());
    }

    #[test]
    fn delivery_replies() {
        let record = ConnectionRecord {
            connection_id: ConnectionId::new("c1"),
            store_id: StoreId::new("KFC004"),
            queried_date: NaiveDate::from_ymd_opt(2024, 8, 27).unwrap(),
            request_date: NaiveDate::from_ymd_opt(2024, 8, 27).unwrap(),
            request_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            user_id: UserId::new("1001"),
            status: RecordStatus::Success,
        };
        let now = Local::now();

        let ready = Ok(ReportOutcome::Ready(Report::Flat(vec![record])));
        let replies = deliver_report(&StoreFilter::All, &ready, &now);
        assert_eq!(replies.len(), 2);
        let attachment = replies[0].attachment.as_ref().unwrap();
        assert!(attachment.filename.starts_with("reporte_conexiones_todos_"));
        assert!(attachment.filename.ends_with(".csv"));

        let replies = deliver_report(&StoreFilter::All, &Ok(ReportOutcome::Empty), &now);
        assert_eq!(replies, vec![prompts::report_empty()]);
    }
}
