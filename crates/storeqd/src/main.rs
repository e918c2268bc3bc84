//! storeqd - The storeq background service
//!
//! Wires together:
//! - Configuration loading
//! - Connection log (SQLite)
//! - Query backend (external program)
//! - Dialogue engine
//! - IPC server for chat transports

mod archive;
mod executor;
mod workers;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storeq_api::{
    BotCommand, Command, CommandInfo, ErrorCode, ErrorInfo, Response, ResponsePayload,
    API_VERSION,
};
use storeq_config::{load_config, DATABASE_FILENAME};
use storeq_core::{prompts, DialogueEngine};
use storeq_ipc::{IpcServer, ServerMessage};
use storeq_store::{RecordStore, SqliteStore};
use storeq_util::{default_config_path, is_mock_time_active, ClientId, RateLimiter, UserId};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::archive::archive_attachments;
use crate::executor::ProcessExecutor;
use crate::workers::{JobHandler, UserWorkers};

/// A user worker with no new message for this long is retired
const WORKER_IDLE: Duration = Duration::from_secs(300);

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

/// storeqd - Guided transaction queries over chat
#[derive(Parser, Debug)]
#[command(name = "storeqd")]
#[command(about = "Guided transaction queries and connection reports", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/storeq/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set STOREQ_SOCKET env var)
    #[arg(short, long, env = "STOREQ_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set STOREQ_DATA_DIR env var)
    #[arg(short, long, env = "STOREQ_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// One user message waiting for its turn
struct Job {
    client_id: ClientId,
    request_id: u64,
    user_id: UserId,
    text: String,
}

/// What every user worker needs
struct WorkerContext {
    engine: Arc<DialogueEngine>,
    ipc: Arc<IpcServer>,
    /// Set when generated reports are kept on disk
    reports_dir: Option<PathBuf>,
}

/// Main service state
struct Service {
    context: Arc<WorkerContext>,
    rate_limiter: RateLimiter,
    /// One queue per user, so a user's messages are handled in arrival order
    workers: UserWorkers<WorkerContext>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let settings = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            executor = %settings.executor.argv.join(" "),
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| settings.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(DATABASE_FILENAME);
        let store: Arc<dyn RecordStore> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let executor = Arc::new(ProcessExecutor::new(&settings.executor));
        let engine = Arc::new(DialogueEngine::new(store, executor));

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        let reports_dir = settings
            .keep_report_files
            .then(|| settings.service.reports_dir.clone());
        if let Some(dir) = &reports_dir {
            info!(reports_dir = %dir.display(), "Generated reports will be kept");
        }

        let rate_limiter = RateLimiter::new(settings.requests_per_second, Duration::from_secs(1));

        let context = Arc::new(WorkerContext {
            engine,
            ipc: Arc::new(ipc),
            reports_dir,
        });

        Ok(Self {
            workers: UserWorkers::new(context.clone(), WORKER_IDLE),
            context,
            rate_limiter,
        })
    }

    async fn run(mut self) -> Result<()> {
        let ipc = self.context.ipc.clone();
        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        let mut housekeeping = tokio::time::interval(HOUSEKEEPING_INTERVAL);

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                _ = housekeeping.tick() => {
                    self.housekeeping();
                }

                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        info!(
            active_sessions = self.context.engine.sessions().active_count(),
            "Shutting down storeqd"
        );

        ipc.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    fn housekeeping(&mut self) {
        let retired = self.workers.retire_idle();
        self.rate_limiter.cleanup(HOUSEKEEPING_INTERVAL);
        let pruned = self.context.engine.sessions().prune();

        if !self.context.engine.is_healthy() {
            warn!("Record store is unhealthy");
        }

        debug!(
            workers = self.workers.active_count(),
            retired_workers = retired,
            pruned_slots = pruned,
            "Housekeeping done"
        );
    }

    async fn handle_ipc_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                if request.api_version != API_VERSION {
                    let response = Response::error(
                        request.request_id,
                        ErrorInfo::new(
                            ErrorCode::UnsupportedVersion,
                            format!("Expected API version {}", API_VERSION),
                        ),
                    );
                    let _ = self.context.ipc.send_response(&client_id, response).await;
                    return;
                }

                let request_id = request.request_id;
                match request.command {
                    Command::Message { user_id, text } => {
                        if !self.rate_limiter.check(&user_id) {
                            warn!(user_id = %user_id, "Rate limited");
                            let response = Response::success(
                                request_id,
                                ResponsePayload::Replies {
                                    user_id,
                                    replies: vec![prompts::rate_limited()],
                                },
                            );
                            let _ = self.context.ipc.send_response(&client_id, response).await;
                            return;
                        }

                        let job_user = user_id.clone();
                        self.workers.submit(
                            &job_user,
                            Job {
                                client_id,
                                request_id,
                                user_id,
                                text,
                            },
                        );
                    }

                    Command::ListCommands => {
                        let commands = BotCommand::MENU
                            .iter()
                            .map(|(command, description)| CommandInfo {
                                name: command.name().to_string(),
                                description: description.to_string(),
                            })
                            .collect();
                        let response =
                            Response::success(request_id, ResponsePayload::Commands { commands });
                        let _ = self.context.ipc.send_response(&client_id, response).await;
                    }

                    Command::Ping => {
                        let response = Response::success(request_id, ResponsePayload::Pong);
                        let _ = self.context.ipc.send_response(&client_id, response).await;
                    }
                }
            }

            ServerMessage::ClientConnected { client_id, peer } => {
                info!(
                    client_id = %client_id,
                    uid = ?peer.uid,
                    pid = ?peer.pid,
                    "Transport connected"
                );
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Transport disconnected");
            }
        }
    }
}

impl JobHandler for WorkerContext {
    type Job = Job;

    async fn handle(&self, job: Job) {
        run_job(self, job).await;
    }
}

async fn run_job(context: &WorkerContext, job: Job) {
    let Job {
        client_id,
        request_id,
        user_id,
        text,
    } = job;

    let engine = context.engine.clone();
    let reports_dir = context.reports_dir.clone();
    let user = user_id.clone();

    // The backend call and store I/O block; keep them off the runtime threads
    let handled = tokio::task::spawn_blocking(move || {
        let replies = engine.handle(&user, &text);
        if let Some(dir) = reports_dir {
            archive_attachments(&dir, &replies);
        }
        replies
    })
    .await;

    let response = match handled {
        Ok(replies) => Response::success(request_id, ResponsePayload::Replies { user_id, replies }),
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Message handling panicked");
            Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::InternalError, "Message handling failed"),
            )
        }
    };

    if let Err(e) = context.ipc.send_response(&client_id, response).await {
        debug!(client_id = %client_id, error = %e, "Could not deliver replies");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "storeqd starting"
    );

    if is_mock_time_active() {
        warn!("Mock time is active; request dates in the connection log will be shifted");
    }

    let service = Service::new(&args).await?;
    service.run().await
}
