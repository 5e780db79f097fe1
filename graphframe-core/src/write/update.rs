//! MATCH-based updates and deletes

use super::{NullPolicy, SET_PARAM_PREFIX, write_where};
use crate::compiler::{CompiledQuery, NODE_ALIAS, REL_ALIAS, finish};
use crate::condition::Condition;
use crate::render::{ClauseType, ParamContext, StatementBuilder, ident};
use crate::value::Record;

/// Compiles `MATCH ... WHERE ... SET|DELETE` statements
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateCompiler;

impl UpdateCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Set properties on every matching node
    pub fn compile_node_update(
        &self,
        label: &str,
        updates: &Record,
        conditions: &[Condition],
        null_policy: NullPolicy,
    ) -> CompiledQuery {
        compile_update(
            format!("MATCH ({}:{})", NODE_ALIAS, ident(label)),
            NODE_ALIAS,
            label,
            updates,
            conditions,
            null_policy,
        )
    }

    /// Set properties on every matching relationship
    pub fn compile_relationship_update(
        &self,
        rel_type: &str,
        updates: &Record,
        conditions: &[Condition],
        null_policy: NullPolicy,
    ) -> CompiledQuery {
        compile_update(
            rel_match(rel_type),
            REL_ALIAS,
            rel_type,
            updates,
            conditions,
            null_policy,
        )
    }

    /// Delete matching nodes; `detach` removes their relationships too
    pub fn compile_node_delete(
        &self,
        label: &str,
        conditions: &[Condition],
        detach: bool,
    ) -> CompiledQuery {
        let verb = if detach { "DETACH DELETE" } else { "DELETE" };
        compile_delete(
            format!("MATCH ({}:{})", NODE_ALIAS, ident(label)),
            NODE_ALIAS,
            verb,
            conditions,
        )
    }

    /// Delete matching relationships
    pub fn compile_relationship_delete(
        &self,
        rel_type: &str,
        conditions: &[Condition],
    ) -> CompiledQuery {
        compile_delete(rel_match(rel_type), REL_ALIAS, "DELETE", conditions)
    }
}

pub(crate) fn rel_match(rel_type: &str) -> String {
    format!("MATCH ()-[{}:{}]->()", REL_ALIAS, ident(rel_type))
}

fn compile_update(
    match_clause: String,
    alias: &str,
    target: &str,
    updates: &Record,
    conditions: &[Condition],
    null_policy: NullPolicy,
) -> CompiledQuery {
    let mut ctx = ParamContext::new();
    let where_clause = write_where(&mut ctx, alias, conditions);

    let assignments: Vec<String> = updates
        .iter()
        .filter(|(_, value)| !(null_policy == NullPolicy::IgnoreNulls && value.is_null()))
        .map(|(prop, value)| {
            let name = ctx.bind(SET_PARAM_PREFIX, value.clone());
            format!("{}.{} = ${}", alias, ident(prop), name)
        })
        .collect();

    if assignments.is_empty() {
        return CompiledQuery::placeholder(format!("Update {} - no properties to set", target));
    }

    let mut stmt = StatementBuilder::new();
    stmt.push(ClauseType::Match, match_clause);
    stmt.push_opt(ClauseType::Where, where_clause);
    stmt.push(ClauseType::Set, format!("SET {}", assignments.join(", ")));
    finish(stmt, ctx)
}

fn compile_delete(
    match_clause: String,
    alias: &str,
    verb: &str,
    conditions: &[Condition],
) -> CompiledQuery {
    let mut ctx = ParamContext::new();
    let mut stmt = StatementBuilder::new();
    stmt.push(ClauseType::Match, match_clause);
    stmt.push_opt(ClauseType::Where, write_where(&mut ctx, alias, conditions));
    stmt.push(ClauseType::Delete, format!("{} {}", verb, alias));
    finish(stmt, ctx)
}
