//! Dialogue runtime: per-user sessions, effect execution, connection log

use chrono::{DateTime, Local, Timelike};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use storeq_api::Reply;
use storeq_store::{ConnectionRecord, RecordStatus, RecordStore};
use storeq_util::{ConnectionId, UserId};
use tracing::{debug, error, info, warn};

use crate::{
    form, report_dialogue, transition, Effect, Input, Next, QueryExecutor, QueryRequest,
    ReportAggregator, Session, TransitionResult,
};

type Slot = Arc<Mutex<Option<Session>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sessions keyed by user.
///
/// The map lock is held only to find a user's slot; the slot lock is held
/// for a whole turn, so one user's turns run in order while other users
/// proceed in parallel.
#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<UserId, Slot>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: &UserId) -> Slot {
        lock(&self.slots)
            .entry(user_id.clone())
            .or_default()
            .clone()
    }

    /// Snapshot of a user's session, if one is active
    pub fn get(&self, user_id: &UserId) -> Option<Session> {
        let slot = lock(&self.slots).get(user_id).cloned()?;
        let session = lock(&slot).clone();
        session
    }

    pub fn active_count(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| slot.try_lock().map(|s| s.is_some()).unwrap_or(true))
            .count()
    }

    /// Drop slots with no session and no turn in progress
    pub fn prune(&self) -> usize {
        let mut slots = lock(&self.slots);
        let before = slots.len();
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || slot.try_lock().map(|s| s.is_some()).unwrap_or(true)
        });
        before - slots.len()
    }
}

/// Drives both dialogues for any number of users
pub struct DialogueEngine {
    store: Arc<dyn RecordStore>,
    executor: Arc<dyn QueryExecutor>,
    aggregator: ReportAggregator,
    sessions: SessionRegistry,
}

impl DialogueEngine {
    pub fn new(store: Arc<dyn RecordStore>, executor: Arc<dyn QueryExecutor>) -> Self {
        info!("Dialogue engine initialized");

        Self {
            aggregator: ReportAggregator::new(store.clone()),
            store,
            executor,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn is_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    /// Process one message from `user_id` and return the replies in order.
    ///
    /// Blocks while the backend or the record store is busy.
    pub fn handle(&self, user_id: &UserId, text: &str) -> Vec<Reply> {
        self.handle_at(user_id, text, storeq_util::now())
    }

    pub fn handle_at(&self, user_id: &UserId, text: &str, now: DateTime<Local>) -> Vec<Reply> {
        let slot = self.sessions.slot(user_id);
        let mut current = lock(&slot);

        let input = Input::classify(text);
        let stage_before = current.as_ref().map(|s| s.stage);
        debug!(user_id = %user_id, stage = ?stage_before, input = ?input, "Handling message");

        let result = transition(user_id, current.take(), input, now);
        let (next, replies) = self.run_effects(user_id, result, now);

        match &next {
            Next::Continue(session) => {
                debug!(user_id = %user_id, stage = %session.stage, "Session continues");
            }
            Next::End(reason) => {
                info!(user_id = %user_id, reason = ?reason, "Session ended");
            }
            Next::Idle => {}
        }

        *current = next.into_session();
        replies
    }

    fn run_effects(
        &self,
        user_id: &UserId,
        result: TransitionResult,
        now: DateTime<Local>,
    ) -> (Next, Vec<Reply>) {
        let TransitionResult {
            mut next,
            mut replies,
            effects,
        } = result;
        let mut pending: VecDeque<Effect> = effects.into();

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::Dispatch(request) => {
                    replies.push(self.dispatch(user_id, &request, now));
                }
                Effect::OfferStores => match std::mem::replace(&mut next, Next::Idle) {
                    Next::Continue(session) => {
                        let stores = self.aggregator.get_distinct_stores();
                        let followup = report_dialogue::offer_stores(session, stores);
                        replies.extend(followup.replies);
                        pending.extend(followup.effects);
                        next = followup.next;
                    }
                    other => {
                        warn!(user_id = %user_id, "Store lookup requested without a session");
                        next = other;
                    }
                },
                Effect::BuildReport { kind, filter } => {
                    info!(user_id = %user_id, kind = ?kind, filter = %filter, "Building report");
                    let outcome = self.aggregator.build_report(kind, &filter, None);
                    replies.extend(report_dialogue::deliver_report(&filter, &outcome, &now));
                }
            }
        }

        (next, replies)
    }

    /// Run the query, log the connection, and describe the outcome
    fn dispatch(&self, user_id: &UserId, request: &QueryRequest, now: DateTime<Local>) -> Reply {
        info!(
            user_id = %user_id,
            store_id = %request.store_id,
            date = %request.date.key(),
            reference = request.reference.as_deref().unwrap_or("None"),
            authorization = request.authorization.as_deref().unwrap_or("None"),
            "QUERY"
        );

        let outcome = self.executor.execute(request);

        let (connection_id, status) = match &outcome {
            Ok(result) => (result.connection_id.clone(), RecordStatus::Success),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Query execution failed");
                (ConnectionId::generate(), RecordStatus::Error)
            }
        };

        info!(
            user_id = %user_id,
            connection_id = %connection_id,
            status = %status,
            "CONNECTION"
        );

        let record = ConnectionRecord {
            connection_id,
            store_id: request.store_id.clone(),
            queried_date: request.date.date(),
            request_date: now.date_naive(),
            request_time: now.time().with_nanosecond(0).unwrap_or(now.time()),
            user_id: user_id.clone(),
            status,
        };

        if let Err(e) = self.store.append(&record) {
            error!(
                user_id = %user_id,
                connection_id = %record.connection_id,
                error = %e,
                "Failed to record connection"
            );
        }

        form::dispatch_outcome(request, &outcome)
    }
}
