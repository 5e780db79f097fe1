use super::FrameState;
use crate::driver::AccessMode;
use crate::error::Result;
use crate::graph::Graph;
use crate::write_plan::{WriteOperation, WritePlan};
use graphframe_core::{
    CompiledQuery, Condition, EdgeQuery, Endpoint, NullPolicy, QueryCompiler, REL_ALIAS, Record,
    UpsertOptions, Value,
};

/// Relationships of one type
#[derive(Debug, Clone)]
pub struct EdgeFrame {
    graph: Graph,
    rel_type: String,
    state: FrameState,
}

impl EdgeFrame {
    pub(crate) fn new(graph: Graph, rel_type: String) -> Self {
        Self {
            graph,
            rel_type,
            state: FrameState::default(),
        }
    }

    /// Relationship type
    pub fn rel_type(&self) -> &str {
        &self.rel_type
    }

    /// Add `field__op = value` filters
    pub fn where_<K, V, I>(mut self, filters: I) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.state.add_filters(self.graph.parser(), filters);
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.state.add_condition(condition);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.select(fields);
        self
    }

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

    pub fn compile(&self) -> Result<CompiledQuery> {
        self.state.check()?;
        Ok(QueryCompiler.compile_edge_query(&EdgeQuery {
            rel_type: self.rel_type.clone(),
            alias: REL_ALIAS.to_string(),
            selection: self.state.selection.clone(),
        }))
    }

    /// Run in read mode
    pub async fn to_records(&self) -> Result<Vec<Record>> {
        let compiled = self.compile()?;
        Ok(self.graph.execute(AccessMode::Read, &compiled).await?.records)
    }

    /// Merge relationships between `src` and `dst`, keyed on `rel_key` if
    /// given
    pub fn upsert<I, S>(&self, data: Vec<Record>, src: Endpoint, dst: Endpoint, rel_key: I) -> WritePlan
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options =
            UpsertOptions::default().with_batch_size(self.graph.config().batch_size);
        self.upsert_with(data, src, dst, rel_key, options)
    }

    pub fn upsert_with<I, S>(
        &self,
        data: Vec<Record>,
        src: Endpoint,
        dst: Endpoint,
        rel_key: I,
        options: UpsertOptions,
    ) -> WritePlan
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WritePlan::new(
            self.graph.clone(),
            WriteOperation::RelationshipUpsert {
                rel_type: self.rel_type.clone(),
                data,
                src,
                dst,
                rel_key: rel_key.into_iter().map(Into::into).collect(),
                options,
            },
        )
    }

    /// Set non-null `updates` on the matching relationships
    pub fn patch(&self, updates: Record) -> WritePlan {
        self.update(updates, NullPolicy::IgnoreNulls)
    }

    /// Set `updates` on the matching relationships under `null_policy`
    pub fn update(&self, updates: Record, null_policy: NullPolicy) -> WritePlan {
        self.write(WriteOperation::RelationshipUpdate {
            rel_type: self.rel_type.clone(),
            updates,
            conditions: self.state.selection.conditions.clone(),
            null_policy,
        })
    }

    /// Delete the matching relationships
    pub fn delete(&self) -> WritePlan {
        self.write(WriteOperation::RelationshipDelete {
            rel_type: self.rel_type.clone(),
            conditions: self.state.selection.conditions.clone(),
        })
    }

    fn write(&self, operation: WriteOperation) -> WritePlan {
        WritePlan::new(self.graph.clone(), operation).with_deferred(self.state.error.clone())
    }
}
