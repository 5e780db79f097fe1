//! In-process driver double for tests and dry runs

use crate::driver::{AccessMode, Driver, QueryResult};
use crate::error::{Error, Result};
use async_trait::async_trait;
use graphframe_core::{Params, Record};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// One statement seen by a [`RecordingDriver`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub mode: AccessMode,
    pub query: String,
    pub params: Params,
}

/// Records every statement and replays scripted responses in order
///
/// With nothing scripted, a call succeeds with no rows.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<VecDeque<Result<QueryResult>>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful result
    pub fn push_result(&self, result: QueryResult) {
        self.responses.lock().push_back(Ok(result));
    }

    /// Queue a result carrying only rows
    pub fn push_records(&self, records: Vec<Record>) {
        self.push_result(QueryResult::from_records(records));
    }

    /// Queue a failure
    pub fn push_error(&self, error: Error) {
        self.responses.lock().push_back(Err(error));
    }

    /// Every call so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Query text of every call so far
    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.query.clone()).collect()
    }

    /// Forget recorded calls and pending responses
    pub fn reset(&self) {
        self.calls.lock().clear();
        self.responses.lock().clear();
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn run(&self, mode: AccessMode, query: &str, params: &Params) -> Result<QueryResult> {
        self.calls.lock().push(RecordedCall {
            mode,
            query: query.to_string(),
            params: params.clone(),
        });
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::default()))
    }
}
