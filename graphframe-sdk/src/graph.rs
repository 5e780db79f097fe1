//! Entry point tying configuration, driver and frames together

use crate::client::HttpDriver;
use crate::config::GraphConfig;
use crate::driver::{AccessMode, Driver, QueryResult, Session};
use crate::error::{Error, Result};
use crate::frames::{EdgeFrame, NodeFrame};
use crate::schema::SchemaManager;
use graphframe_core::{CompiledQuery, ConditionParser, Params, Record};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A graph database handle
///
/// Cheap to clone; clones share the driver.
#[derive(Clone)]
pub struct Graph {
    config: Arc<GraphConfig>,
    driver: Arc<dyn Driver>,
    open_sessions: Arc<AtomicUsize>,
}

impl Graph {
    /// Use an existing driver
    pub fn new(config: GraphConfig, driver: Arc<dyn Driver>) -> Self {
        Self {
            config: Arc::new(config),
            driver,
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build an [`HttpDriver`] from `config`
    ///
    /// ```no_run
    /// use graphframe::{Graph, GraphConfig};
    ///
    /// let graph = Graph::connect(GraphConfig::new("http://localhost:15474"))?;
    /// let people = graph.nodes("Person").where_([("age__gte", 18)]).limit(10);
    /// # Ok::<(), graphframe::Error>(())
    /// ```
    pub fn connect(config: GraphConfig) -> Result<Self> {
        let driver = HttpDriver::new(&config).map_err(|e| match e {
            Error::Http(e) => Error::Connection(format!(
                "Failed to connect to {}: {}",
                config.uri, e
            )),
            other => other,
        })?;
        tracing::info!("Connected to {}", driver.url());
        Ok(Self::new(config, Arc::new(driver)))
    }

    /// Active configuration
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Acquire a scoped session
    pub fn session(&self, mode: AccessMode) -> Session {
        Session::new(self.driver.clone(), mode, self.open_sessions.clone())
    }

    /// Sessions currently held
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Frame over nodes with `label`
    pub fn nodes(&self, label: impl Into<String>) -> NodeFrame {
        NodeFrame::new(self.clone(), label.into())
    }

    /// Frame over relationships of `rel_type`
    pub fn rels(&self, rel_type: impl Into<String>) -> EdgeFrame {
        EdgeFrame::new(self.clone(), rel_type.into())
    }

    /// Constraint and index management
    pub fn schema(&self) -> SchemaManager {
        SchemaManager::new(self.clone())
    }

    /// Run raw Cypher in write mode and return its rows
    pub async fn cypher(&self, query: &str, params: Params) -> Result<Vec<Record>> {
        let mut session = self.session(AccessMode::Write);
        Ok(session.run(query, &params).await?.records)
    }

    /// Close the underlying driver
    pub async fn close(&self) -> Result<()> {
        self.driver.close().await
    }

    pub(crate) fn parser(&self) -> ConditionParser {
        ConditionParser::new(self.config.operator_policy)
    }

    pub(crate) async fn execute(
        &self,
        mode: AccessMode,
        compiled: &CompiledQuery,
    ) -> Result<QueryResult> {
        let mut session = self.session(mode);
        session.run(compiled.query(), compiled.params()).await
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("uri", &self.config.uri)
            .field("database", &self.config.database)
            .finish()
    }
}
