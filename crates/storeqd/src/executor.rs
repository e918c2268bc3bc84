//! Query executor backed by an external program
//!
//! The configured argv is run with the store id and date key (`YYYYMMDD`)
//! appended, followed by `--reference=<value>` and `--authorization=<value>`
//! only for fields the user answered. An absent field and an empty value
//! therefore stay distinguishable.
//! A first stdout line of the form `CONNECTION_ID=<id>` names the backend
//! connection; every other non-empty line is a result row.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use storeq_config::ExecutorConfig;
use storeq_core::{ExecutorError, ExecutorResult, QueryExecutor, QueryRequest, QueryResult};
use storeq_util::ConnectionId;
use tracing::{debug, warn};

const CONNECTION_ID_PREFIX: &str = "CONNECTION_ID=";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct ProcessExecutor {
    argv: Vec<String>,
    env: HashMap<String, String>,
    timeout: Duration,
}

impl ProcessExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            argv: config.argv.clone(),
            env: config.env.clone(),
            timeout: config.timeout,
        }
    }

    fn command(&self, request: &QueryRequest) -> ExecutorResult<Command> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| ExecutorError::Launch("Empty argv".into()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(request.store_id.as_str())
            .arg(request.date.key())
            .args(optional_args(request))
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Own process group so a timeout kills any helpers too
            .process_group(0);

        Ok(cmd)
    }

    fn wait_with_timeout(&self, child: &mut Child) -> ExecutorResult<std::process::ExitStatus> {
        let deadline = Instant::now() + self.timeout;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    let pgid = Pid::from_raw(child.id() as i32);
                    if let Err(e) = signal::killpg(pgid, Signal::SIGKILL) {
                        warn!(pgid = %pgid, error = %e, "Failed to kill timed out query");
                    }
                    let _ = child.wait();
                    return Err(ExecutorError::Timeout(self.timeout.as_secs()));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(ExecutorError::Failed(e.to_string())),
            }
        }
    }
}

fn optional_args(request: &QueryRequest) -> Vec<String> {
    [
        ("reference", &request.reference),
        ("authorization", &request.authorization),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.as_ref().map(|v| format!("--{}={}", name, v)))
    .collect()
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut out = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut out);
        }
        out
    })
}

/// Split program output into a connection id and result rows
pub fn parse_output(stdout: &str) -> (Option<ConnectionId>, Vec<String>) {
    let mut lines = stdout.lines().map(str::trim_end).filter(|l| !l.trim().is_empty());
    let mut rows: Vec<String> = Vec::new();
    let mut connection_id = None;

    if let Some(first) = lines.next() {
        match first.strip_prefix(CONNECTION_ID_PREFIX) {
            Some(id) if !id.trim().is_empty() => connection_id = Some(ConnectionId::new(id.trim())),
            Some(_) => {}
            None => rows.push(first.to_string()),
        }
    }
    rows.extend(lines.map(str::to_string));

    (connection_id, rows)
}

impl QueryExecutor for ProcessExecutor {
    fn execute(&self, request: &QueryRequest) -> ExecutorResult<QueryResult> {
        let started = Instant::now();
        let mut child = self
            .command(request)?
            .spawn()
            .map_err(|e| ExecutorError::Launch(e.to_string()))?;

        // Read both pipes while waiting so a chatty backend cannot block on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait_with_timeout(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        debug!(
            store_id = %request.store_id,
            status = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query process finished"
        );

        if !status.success() {
            let message = match stderr.trim() {
                "" => format!("exit status {}", status.code().unwrap_or(-1)),
                text => text.to_string(),
            };
            return Err(ExecutorError::Failed(message));
        }

        let (connection_id, rows) = parse_output(&stdout);
        let connection_id = connection_id.unwrap_or_else(|| {
            debug!("Backend did not report a connection id, generating one");
            ConnectionId::generate()
        });

        Ok(QueryResult {
            rows,
            connection_id,
        })
    }
}
