//! Deferred write operations: compile, preview, commit

use crate::driver::{AccessMode, QueryStats};
use crate::error::{Error, Result};
use crate::graph::Graph;
use graphframe_core::{
    BatchSummary, CompiledQuery, Condition, Endpoint, NullPolicy, Record,
    SchemaCompiler, UpdateCompiler, UpsertCompiler, UpsertOptions,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Upsert,
    RelationshipUpsert,
    Patch,
    Update,
    RelationshipUpdate,
    Delete,
    RelationshipDelete,
    EnsureUnique,
    EnsureNodeKey,
    EnsureIndex,
    DropUnique,
    DropIndex,
    Advanced,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Upsert => "upsert",
            OperationType::RelationshipUpsert => "relationship_upsert",
            OperationType::Patch => "patch",
            OperationType::Update => "update",
            OperationType::RelationshipUpdate => "relationship_update",
            OperationType::Delete => "delete",
            OperationType::RelationshipDelete => "relationship_delete",
            OperationType::EnsureUnique => "ensure_unique",
            OperationType::EnsureNodeKey => "ensure_node_key",
            OperationType::EnsureIndex => "ensure_index",
            OperationType::DropUnique => "drop_unique",
            OperationType::DropIndex => "drop_index",
            OperationType::Advanced => "advanced",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A write intent with everything needed to compile it
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOperation {
    Upsert {
        label: String,
        data: Vec<Record>,
        key: Vec<String>,
        options: UpsertOptions,
    },
    RelationshipUpsert {
        rel_type: String,
        data: Vec<Record>,
        src: Endpoint,
        dst: Endpoint,
        rel_key: Vec<String>,
        options: UpsertOptions,
    },
    Patch {
        label: String,
        updates: Record,
        conditions: Vec<Condition>,
        null_policy: NullPolicy,
    },
    Update {
        label: String,
        updates: Record,
        conditions: Vec<Condition>,
        null_policy: NullPolicy,
    },
    RelationshipUpdate {
        rel_type: String,
        updates: Record,
        conditions: Vec<Condition>,
        null_policy: NullPolicy,
    },
    Delete {
        label: String,
        conditions: Vec<Condition>,
        detach: bool,
    },
    RelationshipDelete {
        rel_type: String,
        conditions: Vec<Condition>,
    },
    EnsureUnique {
        label: String,
        property: String,
    },
    EnsureNodeKey {
        label: String,
        properties: Vec<String>,
    },
    EnsureIndex {
        label: String,
        property: String,
    },
    DropUnique {
        label: String,
        property: String,
    },
    DropIndex {
        label: String,
        property: String,
    },
    /// Field-level mutation compiled by the frame up front
    Advanced {
        target: String,
        compiled: CompiledQuery,
    },
}

impl WriteOperation {
    /// Tag of this operation
    pub fn operation_type(&self) -> OperationType {
        match self {
            WriteOperation::Upsert { .. } => OperationType::Upsert,
            WriteOperation::RelationshipUpsert { .. } => OperationType::RelationshipUpsert,
            WriteOperation::Patch { .. } => OperationType::Patch,
            WriteOperation::Update { .. } => OperationType::Update,
            WriteOperation::RelationshipUpdate { .. } => OperationType::RelationshipUpdate,
            WriteOperation::Delete { .. } => OperationType::Delete,
            WriteOperation::RelationshipDelete { .. } => OperationType::RelationshipDelete,
            WriteOperation::EnsureUnique { .. } => OperationType::EnsureUnique,
            WriteOperation::EnsureNodeKey { .. } => OperationType::EnsureNodeKey,
            WriteOperation::EnsureIndex { .. } => OperationType::EnsureIndex,
            WriteOperation::DropUnique { .. } => OperationType::DropUnique,
            WriteOperation::DropIndex { .. } => OperationType::DropIndex,
            WriteOperation::Advanced { .. } => OperationType::Advanced,
        }
    }

    /// Label or relationship type written to
    pub fn target(&self) -> &str {
        match self {
            WriteOperation::Upsert { label, .. }
            | WriteOperation::Patch { label, .. }
            | WriteOperation::Update { label, .. }
            | WriteOperation::Delete { label, .. }
            | WriteOperation::EnsureUnique { label, .. }
            | WriteOperation::EnsureNodeKey { label, .. }
            | WriteOperation::EnsureIndex { label, .. }
            | WriteOperation::DropUnique { label, .. }
            | WriteOperation::DropIndex { label, .. } => label,
            WriteOperation::RelationshipUpsert { rel_type, .. }
            | WriteOperation::RelationshipUpdate { rel_type, .. }
            | WriteOperation::RelationshipDelete { rel_type, .. } => rel_type,
            WriteOperation::Advanced { target, .. } => target,
        }
    }
}

/// Lifecycle of a [`WritePlan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    Created,
    Compiled,
    Committed,
}

/// Outcome of a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    Committed,
    /// The plan compiled to a placeholder and nothing ran
    Skipped,
}

/// Counters reported by [`WritePlan::commit`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteStats {
    pub operation_type: OperationType,
    pub target: String,
    pub status: WriteStatus,
    pub nodes_created: u64,
    pub nodes_updated: u64,
    pub relationships_created: u64,
    pub properties_set: u64,
    pub rows_affected: u64,
    /// Row and batch counts for upserts
    pub batch: Option<BatchSummary>,
}

#[derive(Debug, Clone)]
struct CompiledWrite {
    query: CompiledQuery,
    statements: Vec<CompiledQuery>,
    batch: Option<BatchSummary>,
}

impl CompiledWrite {
    fn single(query: CompiledQuery) -> Self {
        Self {
            statements: vec![query.clone()],
            query,
            batch: None,
        }
    }
}

/// A write that can be previewed before it is committed
///
/// Compilation happens once; later `compile()` calls return the cached
/// statement. A plan commits at most once.
#[derive(Debug)]
pub struct WritePlan {
    graph: Graph,
    operation: WriteOperation,
    deferred: Option<graphframe_core::Error>,
    state: PlanState,
    compiled: Option<CompiledWrite>,
    stats: Option<WriteStats>,
}

impl WritePlan {
    pub(crate) fn new(graph: Graph, operation: WriteOperation) -> Self {
        Self {
            graph,
            operation,
            deferred: None,
            state: PlanState::Created,
            compiled: None,
            stats: None,
        }
    }

    /// Plan that fails to compile with a filter error the frame collected
    pub(crate) fn with_deferred(mut self, error: Option<graphframe_core::Error>) -> Self {
        self.deferred = error;
        self
    }

    /// The wrapped operation
    pub fn operation(&self) -> &WriteOperation {
        &self.operation
    }

    /// Operation tag
    pub fn operation_type(&self) -> OperationType {
        self.operation.operation_type()
    }

    /// Current lifecycle state
    pub fn state(&self) -> PlanState {
        self.state
    }

    /// Stats of the commit, once committed
    pub fn stats(&self) -> Option<&WriteStats> {
        self.stats.as_ref()
    }

    /// Compile to a single statement, caching the result
    pub fn compile(&mut self) -> Result<&CompiledQuery> {
        if self.compiled.is_none() {
            if let Some(err) = &self.deferred {
                return Err(Error::Compile(err.clone()));
            }
            let compiled = self.compile_operation()?;
            tracing::debug!(
                "Compiled {} plan for {}",
                self.operation.operation_type(),
                self.operation.target()
            );
            self.compiled = Some(compiled);
            if self.state == PlanState::Created {
                self.state = PlanState::Compiled;
            }
        }
        match &self.compiled {
            Some(compiled) => Ok(&compiled.query),
            None => Err(Error::Write {
                message: "Write plan has not been compiled".to_string(),
                source: None,
            }),
        }
    }

    /// Same as [`Self::compile`]
    pub fn preview(&mut self) -> Result<&CompiledQuery> {
        self.compile()
    }

    /// Statements `commit()` will run, one per upsert batch
    pub fn statements(&mut self) -> Result<Vec<CompiledQuery>> {
        self.compile()?;
        Ok(self
            .compiled
            .as_ref()
            .map(|c| c.statements.clone())
            .unwrap_or_default())
    }

    /// Run the plan in write mode
    ///
    /// Placeholders are not sent to the database and report
    /// [`WriteStatus::Skipped`]. Driver failures come back as
    /// [`Error::Write`] with the driver error as source.
    pub async fn commit(&mut self) -> Result<WriteStats> {
        if self.state == PlanState::Committed {
            return Err(Error::Write {
                message: format!(
                    "{} plan for {} has already been committed",
                    self.operation.operation_type(),
                    self.operation.target()
                ),
                source: None,
            });
        }
        self.compile()?;
        let compiled = match &self.compiled {
            Some(compiled) => compiled.clone(),
            None => {
                return Err(Error::Write {
                    message: "Write plan has not been compiled".to_string(),
                    source: None,
                });
            }
        };

        let operation_type = self.operation.operation_type();
        let target = self.operation.target().to_string();
        let mut stats = WriteStats {
            operation_type,
            target: target.clone(),
            status: WriteStatus::Committed,
            nodes_created: 0,
            nodes_updated: 0,
            relationships_created: 0,
            properties_set: 0,
            rows_affected: 0,
            batch: compiled.batch,
        };

        if compiled.query.is_placeholder() {
            tracing::warn!(
                "Skipping {} plan for {}: {}",
                operation_type,
                target,
                compiled.query.query()
            );
            stats.status = WriteStatus::Skipped;
            return Ok(self.finish(stats));
        }

        let mut counters = QueryStats::default();
        for statement in &compiled.statements {
            let result = self
                .graph
                .execute(AccessMode::Write, statement)
                .await
                .map_err(|e| {
                    Error::write(
                        format!("Failed to execute {} on {}", operation_type, target),
                        e,
                    )
                })?;
            stats.rows_affected += result.records.len() as u64;
            if let Some(s) = result.stats {
                counters = counters.merge(s);
            }
        }

        stats.nodes_created = counters.nodes_created;
        stats.relationships_created = counters.relationships_created;
        stats.properties_set = counters.properties_set;
        if let (OperationType::Upsert, Some(batch)) = (operation_type, compiled.batch) {
            stats.nodes_updated = (batch.rows as u64).saturating_sub(counters.nodes_created);
        }

        tracing::info!(
            "Committed {} on {} ({} statements, {} nodes created, {} relationships created)",
            operation_type,
            target,
            compiled.statements.len(),
            stats.nodes_created,
            stats.relationships_created
        );
        Ok(self.finish(stats))
    }

    fn finish(&mut self, stats: WriteStats) -> WriteStats {
        self.state = PlanState::Committed;
        self.stats = Some(stats.clone());
        stats
    }

    fn compile_operation(&self) -> Result<CompiledWrite> {
        let upserts = UpsertCompiler;
        let updates = UpdateCompiler;
        let schema = SchemaCompiler;

        let compiled = match &self.operation {
            WriteOperation::Upsert {
                label,
                data,
                key,
                options,
            } => {
                let upsert = upserts.compile_node_upsert(label, data, key, options)?;
                CompiledWrite {
                    statements: upsert.batches(),
                    batch: Some(upsert.summary),
                    query: upsert.query,
                }
            }
            WriteOperation::RelationshipUpsert {
                rel_type,
                data,
                src,
                dst,
                rel_key,
                options,
            } => {
                let upsert = upserts.compile_relationship_upsert(
                    rel_type,
                    data,
                    src,
                    dst,
                    rel_key,
                    options,
                    self.graph.config().rel_uniqueness_policy,
                )?;
                CompiledWrite {
                    statements: upsert.batches(),
                    batch: Some(upsert.summary),
                    query: upsert.query,
                }
            }
            WriteOperation::Patch {
                label,
                updates: props,
                conditions,
                null_policy,
            }
            | WriteOperation::Update {
                label,
                updates: props,
                conditions,
                null_policy,
            } => CompiledWrite::single(updates.compile_node_update(
                label,
                props,
                conditions,
                *null_policy,
            )),
            WriteOperation::RelationshipUpdate {
                rel_type,
                updates: props,
                conditions,
                null_policy,
            } => CompiledWrite::single(updates.compile_relationship_update(
                rel_type,
                props,
                conditions,
                *null_policy,
            )),
            WriteOperation::Delete {
                label,
                conditions,
                detach,
            } => CompiledWrite::single(updates.compile_node_delete(label, conditions, *detach)),
            WriteOperation::RelationshipDelete {
                rel_type,
                conditions,
            } => CompiledWrite::single(updates.compile_relationship_delete(rel_type, conditions)),
            WriteOperation::EnsureUnique { label, property } => {
                CompiledWrite::single(schema.ensure_unique(label, property))
            }
            WriteOperation::EnsureNodeKey { label, properties } => {
                CompiledWrite::single(schema.ensure_node_key(label, properties))
            }
            WriteOperation::EnsureIndex { label, property } => {
                CompiledWrite::single(schema.ensure_index(label, property))
            }
            WriteOperation::DropUnique { label, property } => {
                CompiledWrite::single(schema.drop_unique(label, property))
            }
            WriteOperation::DropIndex { label, property } => {
                CompiledWrite::single(schema.drop_index(label, property))
            }
            WriteOperation::Advanced { compiled, .. } => CompiledWrite::single(compiled.clone()),
        };
        Ok(compiled)
    }
}

/// Frames build advanced plans eagerly through this
pub(crate) fn advanced_plan(graph: Graph, target: &str, compiled: CompiledQuery) -> WritePlan {
    WritePlan::new(
        graph,
        WriteOperation::Advanced {
            target: target.to_string(),
            compiled,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::testing::RecordingDriver;
    use graphframe_core::{Value, record};
    use std::sync::Arc;

    fn graph() -> (Graph, Arc<RecordingDriver>) {
        let driver = Arc::new(RecordingDriver::new());
        (Graph::new(GraphConfig::default(), driver.clone()), driver)
    }

    #[test]
    fn test_operation_tags() {
        let op = WriteOperation::DropIndex {
            label: "Person".to_string(),
            property: "name".to_string(),
        };
        assert_eq!(op.operation_type().as_str(), "drop_index");
        assert_eq!(op.target(), "Person");
        assert_eq!(
            serde_json::to_string(&OperationType::RelationshipUpsert).unwrap(),
            "\"relationship_upsert\""
        );
    }

    #[tokio::test]
    async fn test_compile_is_memoized() {
        let (graph, _) = graph();
        let mut plan = WritePlan::new(
            graph,
            WriteOperation::EnsureUnique {
                label: "Person".to_string(),
                property: "email".to_string(),
            },
        );
        assert_eq!(plan.state(), PlanState::Created);
        let first = plan.compile().unwrap().clone();
        assert_eq!(plan.state(), PlanState::Compiled);
        let second = plan.preview().unwrap().clone();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_second_commit_is_rejected() {
        let (graph, driver) = graph();
        let mut plan = WritePlan::new(
            graph,
            WriteOperation::Delete {
                label: "Person".to_string(),
                conditions: vec![Condition::eq("email", "ann@example.com")],
                detach: true,
            },
        );
        let stats = plan.commit().await.unwrap();
        assert_eq!(stats.status, WriteStatus::Committed);
        assert_eq!(plan.state(), PlanState::Committed);
        assert!(matches!(plan.commit().await, Err(Error::Write { .. })));
        assert_eq!(driver.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_runs_one_statement_per_batch() {
        let (graph, driver) = graph();
        let data: Vec<Record> = (0..5)
            .map(|i| record([("id", Value::from(i)), ("n", Value::from(i * 10))]))
            .collect();
        let mut plan = WritePlan::new(
            graph,
            WriteOperation::Upsert {
                label: "Item".to_string(),
                data,
                key: vec!["id".to_string()],
                options: UpsertOptions::default().with_batch_size(2),
            },
        );
        let stats = plan.commit().await.unwrap();
        assert_eq!(driver.calls().len(), 3);
        assert_eq!(stats.batch, Some(BatchSummary { rows: 5, batches: 3 }));
    }
}
