//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Daemon-level paths
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Query backend invocation
    pub executor: RawExecutorConfig,

    #[serde(default)]
    pub limits: RawLimits,

    #[serde(default)]
    pub reports: RawReports,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path (default: under the per-user runtime directory)
    pub socket_path: Option<PathBuf>,

    /// Data directory for the connection log
    pub data_dir: Option<PathBuf>,

    /// Where generated reports are archived (default: <data_dir>/reports)
    pub reports_dir: Option<PathBuf>,
}

/// How the daemon runs a query
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawExecutorConfig {
    /// Program and leading arguments; store and date are appended, then
    /// `--reference=`/`--authorization=` flags for answered fields
    pub command: Vec<String>,

    /// Seconds before a running query is abandoned
    pub timeout_seconds: Option<u64>,

    /// Extra environment for the query process
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLimits {
    /// Messages accepted per user per second
    pub requests_per_second: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReports {
    /// Keep a copy of every generated report on disk
    #[serde(default)]
    pub keep_files: bool,
}
