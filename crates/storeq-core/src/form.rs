//! Query form: store, date, reference, authorization, then dispatch

use chrono::NaiveDate;
use storeq_api::Reply;
use tracing::debug;

use crate::{
    normalize_optional, parse_date, prompts, validate_store_id, EndReason, Effect,
    ExecutorResult, Input, OptionalField, QueryRequest, QueryResult, Session, Stage,
    TransitionResult,
};
use crate::prompts::MANUAL_DATE_LABEL;

/// Advance the query form by one input.
///
/// Navigation is checked before the stage sees the text: cancel, then
/// back, then stage shortcuts, then validation.
pub fn step(mut session: Session, input: Input, today: NaiveDate) -> TransitionResult {
    let stage = session.stage;

    match input {
        Input::Cancel => TransitionResult::end(EndReason::Cancelled, prompts::form_cancelled()),

        Input::Back => match stage.previous() {
            Some(previous) => {
                session.rewind_to(previous);
                let reply = prompts::going_back(previous, &session.form, &[]);
                TransitionResult::stay(session, reply)
            }
            None => TransitionResult::stay(session, prompts::back_at_first_stage(stage)),
        },

        Input::Skip if stage.is_optional() => answer_optional(session, OptionalField::Absent),
        Input::Skip => {
            let reply = prompts::skip_not_allowed(stage, &session.form, &[]);
            TransitionResult::stay(session, reply)
        }

        Input::Text(text) => match stage {
            Stage::CollectStore => match validate_store_id(&text) {
                Ok(store_id) => {
                    let reply = prompts::store_accepted(&store_id);
                    session.form.store_id = Some(store_id);
                    session.stage = Stage::CollectDate;
                    TransitionResult::stay(session, reply)
                }
                Err(e) => TransitionResult::stay(session, prompts::invalid_input(stage, &e)),
            },
            Stage::CollectDate if text == MANUAL_DATE_LABEL => {
                TransitionResult::stay(session, prompts::manual_date_hint())
            }
            Stage::CollectDate => match parse_date(&text, today) {
                Ok(date) => {
                    session.form.date = Some(date);
                    session.stage = Stage::CollectReference;
                    TransitionResult::stay(session, prompts::date_accepted(&date))
                }
                Err(e) => TransitionResult::stay(session, prompts::invalid_input(stage, &e)),
            },
            Stage::CollectReference | Stage::CollectAuthorization => {
                answer_optional(session, normalize_optional(&text))
            }
            Stage::ReportSelectType | Stage::ReportSelectStore => {
                let reply = prompts::stage_prompt(stage, &session.form, &[]);
                TransitionResult::stay(session, reply)
            }
        },

        // Dialogue commands are resolved before a stage is consulted
        Input::Command(_) => {
            let reply = prompts::stage_prompt(stage, &session.form, &[]);
            TransitionResult::stay(session, reply)
        }
    }
}

fn answer_optional(mut session: Session, value: OptionalField) -> TransitionResult {
    match session.stage {
        Stage::CollectReference => {
            let reply = prompts::reference_accepted(value.as_deref());
            session.form.reference = Some(value);
            session.stage = Stage::CollectAuthorization;
            TransitionResult::stay(session, reply)
        }
        _ => {
            session.form.authorization = Some(value);
            dispatch(session)
        }
    }
}

/// Assemble the request and hand it to the runtime
fn dispatch(mut session: Session) -> TransitionResult {
    match session.form.to_request() {
        Some(request) => {
            debug!(user_id = %session.user_id, store_id = %request.store_id, "Query form complete");
            TransitionResult::end(EndReason::Dispatched, prompts::summary(&request))
                .with_effect(Effect::Dispatch(request))
        }
        None => {
            let missing = first_unanswered(&session);
            session.rewind_to(missing);
            let reply = prompts::stage_prompt(missing, &session.form, &[]);
            TransitionResult::stay(session, reply)
        }
    }
}

fn first_unanswered(session: &Session) -> Stage {
    let form = &session.form;
    if form.store_id.is_none() {
        Stage::CollectStore
    } else if form.date.is_none() {
        Stage::CollectDate
    } else if form.reference.is_none() {
        Stage::CollectReference
    } else {
        Stage::CollectAuthorization
    }
}

/// Message reporting what the backend returned for a dispatched query
pub fn dispatch_outcome(request: &QueryRequest, outcome: &ExecutorResult<QueryResult>) -> Reply {
    match outcome {
        Ok(result) => prompts::query_results(request, result.connection_id.as_str(), &result.rows),
        Err(e) => prompts::query_failed(&e.to_string()),
    }
}
