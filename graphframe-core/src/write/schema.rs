//! Constraint and index DDL with deterministic names

use crate::compiler::{CompiledQuery, finish};
use crate::render::{ClauseType, ParamContext, StatementBuilder, ident};

/// Compiles idempotent `CREATE ... IF NOT EXISTS` / `DROP ... IF EXISTS`
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaCompiler;

impl SchemaCompiler {
    pub fn new() -> Self {
        Self
    }

    /// `constraint_<Label>_<p1>_<p2>...`
    pub fn constraint_name<S: AsRef<str>>(label: &str, properties: &[S]) -> String {
        let props: Vec<&str> = properties.iter().map(|p| AsRef::<str>::as_ref(p)).collect();
        format!("constraint_{}_{}", label, props.join("_"))
    }

    /// `index_<Label>_<prop>`
    pub fn index_name(label: &str, property: &str) -> String {
        format!("index_{}_{}", label, property)
    }

    /// Uniqueness constraint on one property
    pub fn ensure_unique(&self, label: &str, property: &str) -> CompiledQuery {
        if property.is_empty() {
            return insufficient("ensure_unique", label);
        }
        ddl(format!(
            "CREATE CONSTRAINT IF NOT EXISTS {}\nFOR (n:{}) REQUIRE n.{} IS UNIQUE",
            ident(&Self::constraint_name(label, &[property])),
            ident(label),
            ident(property)
        ))
    }

    /// Node key constraint over one or more properties
    pub fn ensure_node_key<S: AsRef<str>>(&self, label: &str, properties: &[S]) -> CompiledQuery {
        if properties.is_empty() {
            return insufficient("ensure_node_key", label);
        }
        let tuple: Vec<String> = properties
            .iter()
            .map(|p| format!("n.{}", ident(AsRef::<str>::as_ref(p))))
            .collect();
        ddl(format!(
            "CREATE CONSTRAINT IF NOT EXISTS {}\nFOR (n:{}) REQUIRE ({}) IS NODE KEY",
            ident(&Self::constraint_name(label, properties)),
            ident(label),
            tuple.join(", ")
        ))
    }

    /// Range index on one property
    pub fn ensure_index(&self, label: &str, property: &str) -> CompiledQuery {
        if property.is_empty() {
            return insufficient("ensure_index", label);
        }
        ddl(format!(
            "CREATE INDEX IF NOT EXISTS {}\nFOR (n:{}) ON (n.{})",
            ident(&Self::index_name(label, property)),
            ident(label),
            ident(property)
        ))
    }

    /// Drop the uniqueness constraint created by [`Self::ensure_unique`]
    pub fn drop_unique(&self, label: &str, property: &str) -> CompiledQuery {
        if property.is_empty() {
            return insufficient("drop_unique", label);
        }
        ddl(format!(
            "DROP CONSTRAINT IF EXISTS {}",
            ident(&Self::constraint_name(label, &[property]))
        ))
    }

    /// Drop the index created by [`Self::ensure_index`]
    pub fn drop_index(&self, label: &str, property: &str) -> CompiledQuery {
        if property.is_empty() {
            return insufficient("drop_index", label);
        }
        ddl(format!(
            "DROP INDEX IF EXISTS {}",
            ident(&Self::index_name(label, property))
        ))
    }
}

fn ddl(query: String) -> CompiledQuery {
    let mut stmt = StatementBuilder::new();
    stmt.push(ClauseType::Schema, query);
    finish(stmt, ParamContext::new())
}

fn insufficient(op: &str, label: &str) -> CompiledQuery {
    CompiledQuery::placeholder(format!("{} {} - insufficient arguments", op, label))
}
