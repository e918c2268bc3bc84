//! Mock query executor for testing

use std::sync::{Arc, Mutex};
use storeq_util::ConnectionId;

use crate::{ExecutorError, ExecutorResult, QueryExecutor, QueryRequest, QueryResult};

/// Records every request and answers with canned rows
#[derive(Clone, Default)]
pub struct MockExecutor {
    calls: Arc<Mutex<Vec<QueryRequest>>>,

    /// Configure execute to fail with this message
    pub fail_with: Arc<Mutex<Option<String>>>,

    /// Rows returned on success
    pub rows: Arc<Mutex<Vec<String>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows<I, S>(self, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.rows.lock().unwrap() = rows.into_iter().map(Into::into).collect();
        self
    }

    pub fn failing(self, message: impl Into<String>) -> Self {
        *self.fail_with.lock().unwrap() = Some(message.into());
        self
    }

    /// Requests received so far, in call order
    pub fn calls(&self) -> Vec<QueryRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl QueryExecutor for MockExecutor {
    fn execute(&self, request: &QueryRequest) -> ExecutorResult<QueryResult> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };

        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(ExecutorError::Failed(message));
        }

        Ok(QueryResult {
            rows: self.rows.lock().unwrap().clone(),
            connection_id: ConnectionId::new(format!("mock-{}", call_number)),
        })
    }
}
