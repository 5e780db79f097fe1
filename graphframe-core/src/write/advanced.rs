//! Single-field mutations: increment, unset, list append/remove, map merge

use super::write_where;
use crate::compiler::{CompiledQuery, NODE_ALIAS, finish};
use crate::condition::Condition;
use crate::render::{ClauseType, ParamContext, StatementBuilder, ident};
use crate::value::Value;

/// Compiles field-level node mutations
///
/// Payload parameters are named `{kind}_{n}` where `n` is the number of
/// parameters the WHERE clause already bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancedUpdateCompiler;

impl AdvancedUpdateCompiler {
    pub fn new() -> Self {
        Self
    }

    /// `SET n.f = coalesce(n.f, 0) + $inc_N`
    pub fn compile_inc(
        &self,
        label: &str,
        field: &str,
        amount: impl Into<Value>,
        conditions: &[Condition],
    ) -> CompiledQuery {
        compile_field_op(label, field, "inc", conditions, |ctx, t| {
            let p = ctx.bind_positional("inc", amount.into());
            (
                ClauseType::Set,
                format!("SET {t} = coalesce({t}, 0) + ${p}"),
            )
        })
    }

    /// `REMOVE n.f`
    pub fn compile_unset(&self, label: &str, field: &str, conditions: &[Condition]) -> CompiledQuery {
        compile_field_op(label, field, "unset", conditions, |_, t| {
            (ClauseType::Remove, format!("REMOVE {t}"))
        })
    }

    /// `SET n.f = coalesce(n.f, []) + $list_N`
    pub fn compile_list_append(
        &self,
        label: &str,
        field: &str,
        values: impl Into<Value>,
        conditions: &[Condition],
    ) -> CompiledQuery {
        compile_field_op(label, field, "list_append", conditions, |ctx, t| {
            let p = ctx.bind_positional("list", values.into());
            (
                ClauseType::Set,
                format!("SET {t} = coalesce({t}, []) + ${p}"),
            )
        })
    }

    /// `SET n.f = [x IN coalesce(n.f, []) WHERE x <> $list_N]`
    pub fn compile_list_remove(
        &self,
        label: &str,
        field: &str,
        value: impl Into<Value>,
        conditions: &[Condition],
    ) -> CompiledQuery {
        compile_field_op(label, field, "list_remove", conditions, |ctx, t| {
            let p = ctx.bind_positional("list", value.into());
            (
                ClauseType::Set,
                format!("SET {t} = [x IN coalesce({t}, []) WHERE x <> ${p}]"),
            )
        })
    }

    /// `SET n.f += $map_N`
    pub fn compile_map_merge(
        &self,
        label: &str,
        field: &str,
        entries: impl Into<Value>,
        conditions: &[Condition],
    ) -> CompiledQuery {
        compile_field_op(label, field, "map_merge", conditions, |ctx, t| {
            let p = ctx.bind_positional("map", entries.into());
            (ClauseType::Set, format!("SET {t} += ${p}"))
        })
    }
}

fn compile_field_op<F>(
    label: &str,
    field: &str,
    op: &str,
    conditions: &[Condition],
    mutation: F,
) -> CompiledQuery
where
    F: FnOnce(&mut ParamContext, &str) -> (ClauseType, String),
{
    if field.is_empty() {
        return CompiledQuery::placeholder(format!("{} {} - insufficient arguments", op, label));
    }

    let mut ctx = ParamContext::new();
    let mut stmt = StatementBuilder::new();
    stmt.push(ClauseType::Match, format!("MATCH ({}:{})", NODE_ALIAS, ident(label)));
    stmt.push_opt(ClauseType::Where, write_where(&mut ctx, NODE_ALIAS, conditions));
    let target = format!("{}.{}", NODE_ALIAS, ident(field));
    let (clause, text) = mutation(&mut ctx, &target);
    stmt.push(clause, text);
    finish(stmt, ctx)
}
