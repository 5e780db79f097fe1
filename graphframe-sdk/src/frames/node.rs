use super::FrameState;
use super::path::PathFrame;
use crate::driver::AccessMode;
use crate::error::Result;
use crate::graph::Graph;
use crate::write_plan::{WriteOperation, WritePlan, advanced_plan};
use graphframe_core::{
    AdvancedUpdateCompiler, BackQuery, CompiledQuery, Condition, Direction, NodeQuery, NullPolicy,
    QueryCompiler, Record, Traversal, TraversalAliases, UpsertOptions, Value,
};

/// Nodes of one label
///
/// ```
/// use std::sync::Arc;
/// use graphframe::testing::RecordingDriver;
/// use graphframe::{Graph, GraphConfig};
///
/// let graph = Graph::new(GraphConfig::default(), Arc::new(RecordingDriver::new()));
/// let compiled = graph
///     .nodes("Person")
///     .where_([("age__gte", 18)])
///     .where_([("country", "US")])
///     .select(["name"])
///     .limit(10)
///     .compile()?;
///
/// assert_eq!(
///     compiled.query(),
///     "MATCH (n:Person)\nWHERE n.age >= $param_0 AND n.country = $param_1\nRETURN n.name\nLIMIT 10"
/// );
/// # Ok::<(), graphframe::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct NodeFrame {
    graph: Graph,
    label: String,
    state: FrameState,
    /// Set when this frame came from `PathFrame::back`
    origin: Option<(Traversal, Vec<Condition>)>,
}

impl NodeFrame {
    pub(crate) fn new(graph: Graph, label: String) -> Self {
        Self {
            graph,
            label,
            state: FrameState::default(),
            origin: None,
        }
    }

    pub(crate) fn from_back(graph: Graph, back: BackQuery, error: Option<graphframe_core::Error>) -> Self {
        Self {
            graph,
            label: back.traversal.from_label.clone(),
            state: FrameState {
                selection: back.origin,
                error,
            },
            origin: Some((back.traversal, back.traversal_conditions)),
        }
    }

    /// Node label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether this frame returns the origin of a traversal
    pub fn is_back_query(&self) -> bool {
        self.origin.is_some()
    }

    /// Add `field__op = value` filters; every call ANDs onto the previous ones
    pub fn where_<K, V, I>(mut self, filters: I) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.state.add_filters(self.graph.parser(), filters);
        self
    }

    /// Add an already typed condition
    pub fn filter(mut self, condition: Condition) -> Self {
        self.state.add_condition(condition);
        self
    }

    /// Fields to return; replaces any earlier selection
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.select(fields);
        self
    }

    /// Sort keys, `field`, `field__asc` or `field__desc`
    pub fn order_by<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.order_by(keys);
        self
    }

    /// Row limit; negative disables it
    pub fn limit(mut self, limit: i64) -> Self {
        self.state.selection.limit = Some(limit);
        self
    }

    /// Rows to skip
    pub fn offset(mut self, offset: i64) -> Self {
        self.state.selection.offset = Some(offset);
        self
    }

    /// Follow `rel_type` to `to_label` with the default aliases
    ///
    /// Filters already on this frame apply to the origin node. A back
    /// frame cannot be traversed again; compiling the path fails.
    pub fn traverse(
        self,
        rel_type: impl Into<String>,
        to_label: impl Into<String>,
        direction: Direction,
    ) -> PathFrame {
        self.traverse_as(rel_type, to_label, direction, TraversalAliases::default())
    }

    /// Follow `rel_type` binding custom aliases
    pub fn traverse_as(
        self,
        rel_type: impl Into<String>,
        to_label: impl Into<String>,
        direction: Direction,
        aliases: TraversalAliases,
    ) -> PathFrame {
        let error = self.deferred("traverse");
        let traversal =
            Traversal::new(self.label, rel_type, to_label, direction).with_aliases(aliases);
        PathFrame::new(self.graph, traversal, self.state.selection.conditions, error)
    }

    /// Compile to a node query, or a back query after `PathFrame::back`
    pub fn compile(&self) -> Result<CompiledQuery> {
        self.state.check()?;
        match &self.origin {
            Some((traversal, conditions)) => Ok(QueryCompiler.compile_back_query(&BackQuery {
                traversal: traversal.clone(),
                traversal_conditions: conditions.clone(),
                origin: self.state.selection.clone(),
            })?),
            None => Ok(QueryCompiler.compile_node_query(&NodeQuery {
                label: self.label.clone(),
                alias: graphframe_core::NODE_ALIAS.to_string(),
                selection: self.state.selection.clone(),
            })),
        }
    }

    /// Run in read mode
    pub async fn to_records(&self) -> Result<Vec<Record>> {
        let compiled = self.compile()?;
        Ok(self.graph.execute(AccessMode::Read, &compiled).await?.records)
    }

    /// Merge `data` on `key` with default options
    pub fn upsert<I, S>(&self, data: Vec<Record>, key: I) -> WritePlan
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options =
            UpsertOptions::default().with_batch_size(self.graph.config().batch_size);
        self.upsert_with(data, key, options)
    }

    /// Merge `data` on `key`
    ///
    /// Filters are ignored, so this is also allowed on a back frame.
    pub fn upsert_with<I, S>(&self, data: Vec<Record>, key: I, options: UpsertOptions) -> WritePlan
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WritePlan::new(
            self.graph.clone(),
            WriteOperation::Upsert {
                label: self.label.clone(),
                data,
                key: key.into_iter().map(Into::into).collect(),
                options,
            },
        )
    }

    /// Set non-null `updates` on the matching nodes
    pub fn patch(&self, updates: Record) -> WritePlan {
        self.write("patch", WriteOperation::Patch {
            label: self.label.clone(),
            updates,
            conditions: self.state.selection.conditions.clone(),
            null_policy: NullPolicy::IgnoreNulls,
        })
    }

    /// Set `updates` on the matching nodes under `null_policy`
    pub fn update(&self, updates: Record, null_policy: NullPolicy) -> WritePlan {
        self.write("update", WriteOperation::Update {
            label: self.label.clone(),
            updates,
            conditions: self.state.selection.conditions.clone(),
            null_policy,
        })
    }

    /// Delete the matching nodes
    pub fn delete(&self, detach: bool) -> WritePlan {
        self.write("delete", WriteOperation::Delete {
            label: self.label.clone(),
            conditions: self.state.selection.conditions.clone(),
            detach,
        })
    }

    /// Add `amount` to a numeric field, treating a missing value as zero
    pub fn inc(&self, field: &str, amount: impl Into<Value>) -> WritePlan {
        let compiled =
            AdvancedUpdateCompiler.compile_inc(&self.label, field, amount, self.conditions());
        self.advanced("inc", compiled)
    }

    /// Remove a property
    pub fn unset(&self, field: &str) -> WritePlan {
        let compiled = AdvancedUpdateCompiler.compile_unset(&self.label, field, self.conditions());
        self.advanced("unset", compiled)
    }

    /// Append to a list property
    pub fn list_append(&self, field: &str, values: impl Into<Value>) -> WritePlan {
        let compiled =
            AdvancedUpdateCompiler.compile_list_append(&self.label, field, values, self.conditions());
        self.advanced("list_append", compiled)
    }

    /// Remove every occurrence of `value` from a list property
    pub fn list_remove(&self, field: &str, value: impl Into<Value>) -> WritePlan {
        let compiled =
            AdvancedUpdateCompiler.compile_list_remove(&self.label, field, value, self.conditions());
        self.advanced("list_remove", compiled)
    }

    /// Merge entries into a map property
    pub fn map_merge(&self, field: &str, entries: impl Into<Value>) -> WritePlan {
        let compiled =
            AdvancedUpdateCompiler.compile_map_merge(&self.label, field, entries, self.conditions());
        self.advanced("map_merge", compiled)
    }

    fn conditions(&self) -> &[Condition] {
        &self.state.selection.conditions
    }

    /// Parse error from the filters, or the refusal to act on a back frame
    fn deferred(&self, operation: &'static str) -> Option<graphframe_core::Error> {
        match (&self.state.error, &self.origin) {
            (Some(err), _) => Some(err.clone()),
            (None, Some(_)) => Some(graphframe_core::Error::UnsupportedAfterBack { operation }),
            (None, None) => None,
        }
    }

    fn write(&self, operation_name: &'static str, operation: WriteOperation) -> WritePlan {
        WritePlan::new(self.graph.clone(), operation).with_deferred(self.deferred(operation_name))
    }

    fn advanced(&self, operation: &'static str, compiled: CompiledQuery) -> WritePlan {
        advanced_plan(self.graph.clone(), &self.label, compiled)
            .with_deferred(self.deferred(operation))
    }
}
