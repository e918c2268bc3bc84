//! Pure dialogue transitions
//!
//! Given the user's current session (if any), one classified input and
//! the current time, [`transition`] decides the next session state, the
//! replies to send, and the I/O the runtime must perform. Nothing here
//! touches the record store or the query backend.

use chrono::{DateTime, Local};
use storeq_api::{BotCommand, Reply};
use storeq_util::UserId;

use crate::{form, prompts, report_dialogue, DialogueKind, Input, QueryRequest, ReportKind, Session, StoreFilter};

/// Work the runtime performs after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the completed query to the backend and log the connection
    Dispatch(QueryRequest),
    /// Look up distinct stores, then continue with [`report_dialogue::offer_stores`]
    OfferStores,
    /// Build and deliver a report, see [`report_dialogue::deliver_report`]
    BuildReport { kind: ReportKind, filter: StoreFilter },
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Cancelled,
    Dispatched,
    NoReportData,
    ReportRequested,
    ReportFailed,
}

/// Session state after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Continue(Session),
    End(EndReason),
    /// There was no session and none was started
    Idle,
}

impl Next {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Continue(session) => Some(session),
            Self::End(_) | Self::Idle => None,
        }
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::Continue(session) => Some(session),
            Self::End(_) | Self::Idle => None,
        }
    }
}

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub next: Next,
    pub replies: Vec<Reply>,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(next: Next) -> Self {
        Self {
            next,
            replies: vec![],
            effects: vec![],
        }
    }

    /// Keep the session (possibly modified) and send one reply
    pub fn stay(session: Session, reply: Reply) -> Self {
        Self::new(Next::Continue(session)).with_reply(reply)
    }

    pub fn end(reason: EndReason, reply: Reply) -> Self {
        Self::new(Next::End(reason)).with_reply(reply)
    }

    pub fn with_reply(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Pure transition function
pub fn transition(
    user_id: &UserId,
    session: Option<Session>,
    input: Input,
    now: DateTime<Local>,
) -> TransitionResult {
    match (session, input) {
        // Starting a dialogue always replaces whatever was in progress
        (_, Input::Command(BotCommand::Start)) => TransitionResult::stay(
            Session::new(user_id.clone(), DialogueKind::QueryForm, now),
            prompts::welcome(),
        ),
        (_, Input::Command(BotCommand::Reports)) => TransitionResult::stay(
            Session::new(user_id.clone(), DialogueKind::Report, now),
            prompts::report_menu(),
        ),

        (Some(session), Input::Command(BotCommand::Help)) => {
            TransitionResult::stay(session, prompts::help())
        }
        (None, Input::Command(BotCommand::Help)) => {
            TransitionResult::new(Next::Idle).with_reply(prompts::help())
        }

        (None, Input::Cancel) => {
            TransitionResult::new(Next::Idle).with_reply(prompts::nothing_to_cancel())
        }
        (None, _) => TransitionResult::new(Next::Idle).with_reply(prompts::no_session()),

        (Some(session), input) => match session.dialogue() {
            DialogueKind::QueryForm => form::step(session, input, now.date_naive()),
            DialogueKind::Report => report_dialogue::step(session, input),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stage;

    fn user() -> UserId {
        UserId::new("1001")
    }

    fn run(session: Option<Session>, text: &str) -> TransitionResult {
        transition(&user(), session, Input::classify(text), Local::now())
    }

    #[test]
    fn start_opens_query_form() {
        let result = run(None, "/start");
        let session = result.next.session().unwrap();
        assert_eq!(session.stage, Stage::CollectStore);
        assert_eq!(session.user_id, user());
        assert_eq!(result.replies.len(), 1);
        assert!(result.effects.is_empty());
    }

    #[test]
    fn start_replaces_running_dialogue() {
        let report = run(None, "/reportes").next.into_session();
        assert_eq!(report.as_ref().unwrap().stage, Stage::ReportSelectType);

        let result = run(report, "/start");
        assert_eq!(result.next.session().unwrap().stage, Stage::CollectStore);
    }

    #[test]
    fn help_keeps_session() {
        let session = run(None, "/start").next.into_session();
        let result = run(session.clone(), "/help");
        assert_eq!(result.next.into_session(), session);

        let result = run(None, "/ayuda");
        assert_eq!(result.next, Next::Idle);
        assert_eq!(result.replies.len(), 1);
    }

    #[test]
    fn input_without_session() {
        let result = run(None, "kfc004");
        assert_eq!(result.next, Next::Idle);
        assert_eq!(result.replies, vec![prompts::no_session()]);

        let result = run(None, "/cancel");
        assert_eq!(result.next, Next::Idle);
        assert_eq!(result.replies, vec![prompts::nothing_to_cancel()]);
    }
}
