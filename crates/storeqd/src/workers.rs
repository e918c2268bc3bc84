//! Per-user job queues
//!
//! Each user gets one task that runs their jobs in arrival order. Idle
//! tasks are retired from the owning loop, never from inside the task, so
//! nothing can be queued on a worker that is already shutting down. A
//! replacement worker waits for its predecessor before starting.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use storeq_util::UserId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

/// Runs one job to completion
pub trait JobHandler: Send + Sync + 'static {
    type Job: Send + 'static;

    fn handle(&self, job: Self::Job) -> impl Future<Output = ()> + Send;
}

struct Worker<J> {
    tx: mpsc::UnboundedSender<J>,
    task: JoinHandle<()>,
    last_used: Instant,
}

pub struct UserWorkers<H: JobHandler> {
    handler: Arc<H>,
    idle_after: Duration,
    active: HashMap<UserId, Worker<H::Job>>,
    /// Retired workers that may still be finishing queued jobs
    retiring: HashMap<UserId, JoinHandle<()>>,
}

impl<H: JobHandler> UserWorkers<H> {
    pub fn new(handler: Arc<H>, idle_after: Duration) -> Self {
        Self {
            handler,
            idle_after,
            active: HashMap::new(),
            retiring: HashMap::new(),
        }
    }

    /// Queue a job behind the user's earlier ones
    pub fn submit(&mut self, user_id: &UserId, job: H::Job) {
        let job = match self.active.get_mut(user_id) {
            Some(worker) => match worker.tx.send(job) {
                Ok(()) => {
                    worker.last_used = Instant::now();
                    return;
                }
                // The task is gone (it panicked); replace it
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let previous = match self.active.remove(user_id) {
            Some(worker) => Some(worker.task),
            None => self.retiring.remove(user_id),
        };

        let worker = self.spawn(user_id.clone(), previous);
        if worker.tx.send(job).is_err() {
            error!(user_id = %user_id, "New user worker rejected a job");
        }
        self.active.insert(user_id.clone(), worker);
    }

    fn spawn(&self, user_id: UserId, previous: Option<JoinHandle<()>>) -> Worker<H::Job> {
        let (tx, mut rx) = mpsc::unbounded_channel::<H::Job>();
        let handler = self.handler.clone();

        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                // Jobs queued on the old worker come first
                let _ = previous.await;
            }

            debug!(user_id = %user_id, "User worker started");
            while let Some(job) = rx.recv().await {
                handler.handle(job).await;
            }
            debug!(user_id = %user_id, "User worker stopped");
        });

        Worker {
            tx,
            task,
            last_used: Instant::now(),
        }
    }

    /// Retire workers with no job submitted within the idle limit.
    ///
    /// Dropping a worker's sender lets it drain its queue and exit.
    pub fn retire_idle(&mut self) -> usize {
        let now = Instant::now();
        let idle: Vec<UserId> = self
            .active
            .iter()
            .filter(|(_, worker)| now.duration_since(worker.last_used) >= self.idle_after)
            .map(|(user_id, _)| user_id.clone())
            .collect();

        for user_id in &idle {
            if let Some(worker) = self.active.remove(user_id) {
                self.retiring.insert(user_id.clone(), worker.task);
            }
        }

        self.retiring.retain(|_, task| !task.is_finished());
        idle.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::oneshot;
    use tokio::time::sleep;

    struct Step {
        id: u32,
        gate: Option<oneshot::Receiver<()>>,
    }

    impl Step {
        fn new(id: u32) -> Self {
            Self { id, gate: None }
        }

        fn gated(id: u32) -> (Self, oneshot::Sender<()>) {
            let (tx, rx) = oneshot::channel();
            (Self { id, gate: Some(rx) }, tx)
        }
    }

    #[derive(Default)]
    struct Recorder {
        done: Mutex<Vec<u32>>,
    }

    impl Recorder {
        fn done(&self) -> Vec<u32> {
            self.done.lock().unwrap().clone()
        }
    }

    impl JobHandler for Recorder {
        type Job = Step;

        async fn handle(&self, step: Step) {
            if let Some(gate) = step.gate {
                let _ = gate.await;
            }
            self.done.lock().unwrap().push(step.id);
        }
    }

    async fn wait_for(recorder: &Recorder, count: usize) {
        for _ in 0..200 {
            if recorder.done().len() >= count {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("only {:?} finished", recorder.done());
    }

    #[tokio::test]
    async fn jobs_keep_order_across_retirement() {
        let recorder = Arc::new(Recorder::default());
        let mut workers = UserWorkers::new(recorder.clone(), Duration::from_millis(20));
        let user = UserId::new("1001");

        let (slow, release) = Step::gated(1);
        workers.submit(&user, slow);
        workers.submit(&user, Step::new(2));

        sleep(Duration::from_millis(40)).await;
        assert_eq!(workers.retire_idle(), 1);
        assert_eq!(workers.active_count(), 0);

        // Lands on a fresh worker while the old one still holds jobs 1 and 2
        workers.submit(&user, Step::new(3));
        sleep(Duration::from_millis(20)).await;
        assert!(recorder.done().is_empty());

        release.send(()).unwrap();
        wait_for(&recorder, 3).await;
        assert_eq!(recorder.done(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn busy_user_does_not_block_others() {
        let recorder = Arc::new(Recorder::default());
        let mut workers = UserWorkers::new(recorder.clone(), Duration::from_secs(60));

        let (slow, release) = Step::gated(1);
        workers.submit(&UserId::new("a"), slow);
        workers.submit(&UserId::new("b"), Step::new(2));

        wait_for(&recorder, 1).await;
        assert_eq!(recorder.done(), vec![2]);

        release.send(()).unwrap();
        wait_for(&recorder, 2).await;
        assert_eq!(recorder.done(), vec![2, 1]);
    }

    #[tokio::test]
    async fn recently_used_workers_stay() {
        let recorder = Arc::new(Recorder::default());
        let mut workers = UserWorkers::new(recorder.clone(), Duration::from_secs(60));

        workers.submit(&UserId::new("a"), Step::new(1));
        wait_for(&recorder, 1).await;

        assert_eq!(workers.retire_idle(), 0);
        assert_eq!(workers.active_count(), 1);
    }
}
