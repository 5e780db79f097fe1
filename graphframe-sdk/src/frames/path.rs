use super::FrameState;
use super::node::NodeFrame;
use crate::driver::AccessMode;
use crate::error::Result;
use crate::graph::Graph;
use graphframe_core::{
    BackQuery, CompiledQuery, Condition, QueryCompiler, Record, Selection, Traversal,
    TraversalQuery, Value,
};

/// One-hop traversal from a node frame
///
/// Filter and field names route by prefix: `from__`, `rel__` and `to__`
/// (or the custom aliases followed by `__`); bare names belong to the
/// origin node.
#[derive(Debug, Clone)]
pub struct PathFrame {
    graph: Graph,
    traversal: Traversal,
    state: FrameState,
}

impl PathFrame {
    pub(crate) fn new(
        graph: Graph,
        traversal: Traversal,
        conditions: Vec<Condition>,
        error: Option<graphframe_core::Error>,
    ) -> Self {
        Self {
            graph,
            traversal,
            state: FrameState {
                selection: Selection {
                    conditions,
                    ..Selection::default()
                },
                error,
            },
        }
    }

    /// The traversal descriptor
    pub fn traversal(&self) -> &Traversal {
        &self.traversal
    }

    /// Add `namespace__field__op = value` filters
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

    /// Sort keys with optional `__asc` / `__desc` suffix
    pub fn order_by<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.order_by(keys);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.state.selection.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.state.selection.offset = Some(offset);
        self
    }

    /// Return to the origin nodes, keeping every filter applied so far
    pub fn back(self) -> NodeFrame {
        let back = BackQuery::from_traversal(&self.query());
        NodeFrame::from_back(self.graph, back, self.state.error)
    }

    pub fn compile(&self) -> Result<CompiledQuery> {
        self.state.check()?;
        Ok(QueryCompiler.compile_traversal_query(&self.query()))
    }

    /// Run in read mode
    pub async fn to_records(&self) -> Result<Vec<Record>> {
        let compiled = self.compile()?;
        Ok(self.graph.execute(AccessMode::Read, &compiled).await?.records)
    }

    fn query(&self) -> TraversalQuery {
        TraversalQuery {
            traversal: self.traversal.clone(),
            selection: self.state.selection.clone(),
        }
    }
}
