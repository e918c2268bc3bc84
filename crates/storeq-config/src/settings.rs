//! Validated settings structures

use crate::schema::{RawConfig, RawExecutorConfig, RawServiceConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use storeq_util::{default_data_dir, default_socket_path};

/// Default seconds allowed for one query
pub const DEFAULT_EXECUTOR_TIMEOUT_SECS: u64 = 30;

/// Default per-user message budget per second
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// SQLite file inside the data directory
pub const DATABASE_FILENAME: &str = "connections.db";

/// Validated settings ready for use by the daemon
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ServiceConfig,
    pub executor: ExecutorConfig,
    pub requests_per_second: u32,
    pub keep_report_files: bool,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            executor: ExecutorConfig::from_raw(raw.executor),
            requests_per_second: raw
                .limits
                .requests_per_second
                .unwrap_or(DEFAULT_REQUESTS_PER_SECOND),
            keep_report_files: raw.reports.keep_files,
        }
    }
}

/// Daemon paths
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        let data_dir = raw.data_dir.unwrap_or_else(default_data_dir);
        Self {
            socket_path: raw.socket_path.unwrap_or_else(default_socket_path),
            reports_dir: raw.reports_dir.unwrap_or_else(|| data_dir.join("reports")),
            data_dir,
        }
    }

    /// SQLite file holding the connection log
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILENAME)
    }
}

/// Query backend command line
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub argv: Vec<String>,
    pub timeout: Duration,
    pub env: HashMap<String, String>,
}

impl ExecutorConfig {
    fn from_raw(raw: RawExecutorConfig) -> Self {
        Self {
            argv: raw.command,
            timeout: Duration::from_secs(
                raw.timeout_seconds.unwrap_or(DEFAULT_EXECUTOR_TIMEOUT_SECS),
            ),
            env: raw.env,
        }
    }
}
