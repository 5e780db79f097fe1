//! Constraint and index management

use crate::graph::Graph;
use crate::write_plan::{WriteOperation, WritePlan};

/// Builds schema write plans; every statement is idempotent
#[derive(Debug, Clone)]
pub struct SchemaManager {
    graph: Graph,
}

impl SchemaManager {
    pub(crate) fn new(graph: Graph) -> Self {
        Self { graph }
    }

    /// Uniqueness constraint on `label.property`
    pub fn ensure_unique(&self, label: &str, property: &str) -> WritePlan {
        self.plan(WriteOperation::EnsureUnique {
            label: label.to_string(),
            property: property.to_string(),
        })
    }

    /// Node key over `properties`
    pub fn ensure_node_key<I, S>(&self, label: &str, properties: I) -> WritePlan
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plan(WriteOperation::EnsureNodeKey {
            label: label.to_string(),
            properties: properties.into_iter().map(Into::into).collect(),
        })
    }

    /// Index on `label.property`
    pub fn ensure_index(&self, label: &str, property: &str) -> WritePlan {
        self.plan(WriteOperation::EnsureIndex {
            label: label.to_string(),
            property: property.to_string(),
        })
    }

    pub fn drop_unique(&self, label: &str, property: &str) -> WritePlan {
        self.plan(WriteOperation::DropUnique {
            label: label.to_string(),
            property: property.to_string(),
        })
    }

    pub fn drop_index(&self, label: &str, property: &str) -> WritePlan {
        self.plan(WriteOperation::DropIndex {
            label: label.to_string(),
            property: property.to_string(),
        })
    }

    fn plan(&self, operation: WriteOperation) -> WritePlan {
        WritePlan::new(self.graph.clone(), operation)
    }
}
