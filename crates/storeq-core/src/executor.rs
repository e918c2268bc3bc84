//! Query backend interface

use storeq_util::ConnectionId;
use thiserror::Error;

use crate::QueryRequest;

/// What the backend returned for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Preformatted result lines, relayed to the user verbatim
    pub rows: Vec<String>,
    /// Backend connection that served the query
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("No se pudo iniciar la consulta: {0}")]
    Launch(String),

    #[error("La consulta excedió el tiempo límite de {0} segundos")]
    Timeout(u64),

    #[error("La consulta falló: {0}")]
    Failed(String),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Runs a completed query against the external data source.
///
/// Called from a blocking context; implementations may take as long as the
/// backend needs. The date is passed as [`QueryDate::key`](crate::QueryDate::key).
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, request: &QueryRequest) -> ExecutorResult<QueryResult>;
}
