//! The boundary between compiled statements and a running database
//!
//! A [`Driver`] takes query text plus named parameters and returns rows.
//! Everything else in the crate talks to the database through a
//! [`Session`] borrowed from a [`Graph`](crate::Graph).

use crate::error::Result;
use async_trait::async_trait;
use graphframe_core::{Params, Record};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Read or write execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessMode {
    Read,
    Write,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => f.write_str("READ"),
            AccessMode::Write => f.write_str("WRITE"),
        }
    }
}

/// Update counters reported by the database for one statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryStats {
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub relationships_created: u64,
    pub relationships_deleted: u64,
    pub properties_set: u64,
}

impl QueryStats {
    /// Sum two sets of counters
    pub fn merge(self, other: QueryStats) -> QueryStats {
        QueryStats {
            nodes_created: self.nodes_created + other.nodes_created,
            nodes_deleted: self.nodes_deleted + other.nodes_deleted,
            relationships_created: self.relationships_created + other.relationships_created,
            relationships_deleted: self.relationships_deleted + other.relationships_deleted,
            properties_set: self.properties_set + other.properties_set,
        }
    }
}

/// Rows and optional counters returned by one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub records: Vec<Record>,
    pub stats: Option<QueryStats>,
}

impl QueryResult {
    /// Result carrying only rows
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records,
            stats: None,
        }
    }
}

/// Executes compiled statements
///
/// Parameters are bound by name; every key in `params` corresponds to a
/// `$name` placeholder in `query`.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Run one statement
    async fn run(&self, mode: AccessMode, query: &str, params: &Params) -> Result<QueryResult>;

    /// Release any pooled resources
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A scoped unit of work against a driver
///
/// Released when dropped, whichever way the owning scope exits.
pub struct Session {
    driver: Arc<dyn Driver>,
    mode: AccessMode,
    statements: usize,
    open: Arc<AtomicUsize>,
}

impl Session {
    pub(crate) fn new(driver: Arc<dyn Driver>, mode: AccessMode, open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("Session opened ({})", mode);
        Self {
            driver,
            mode,
            statements: 0,
            open,
        }
    }

    /// Run a statement in this session's access mode
    pub async fn run(&mut self, query: &str, params: &Params) -> Result<QueryResult> {
        self.statements += 1;
        self.driver.run(self.mode, query, params).await
    }

    /// Access mode of this session
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Statements run so far
    pub fn statements(&self) -> usize {
        self.statements
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("statements", &self.statements)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(
            "Session released ({}, {} statements)",
            self.mode,
            self.statements
        );
    }
}
