//! Clause rendering and parameter minting
//!
//! Every literal leaves the query text through [`ParamContext::bind`]; the
//! renderer only ever writes `$name` placeholders, aliases, labels and
//! property names into the statement. Labels, types and property names go
//! through [`ident`] first.

use crate::condition::Condition;
use crate::value::{Params, Value};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// Parameter prefix used by read queries
pub const QUERY_PARAM_PREFIX: &str = "param";

/// Mints placeholder names and collects their values for one compilation
///
/// A context lives for exactly one `compile_*` call, so names restart at
/// zero for every statement and compilers stay stateless.
#[derive(Debug, Default)]
pub struct ParamContext {
    params: Params,
    counters: HashMap<&'static str, usize>,
}

impl ParamContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value under the next `{prefix}_{n}` name and return the name
    pub fn bind(&mut self, prefix: &'static str, value: Value) -> String {
        let counter = self.counters.entry(prefix).or_insert(0);
        let name = format!("{}_{}", prefix, counter);
        *counter += 1;
        self.params.insert(name.clone(), value);
        name
    }

    /// Bind a value under `{prefix}_{n}` where `n` is the number of
    /// parameters already bound
    pub fn bind_positional(&mut self, prefix: &'static str, value: Value) -> String {
        let name = format!("{}_{}", prefix, self.params.len());
        self.params.insert(name.clone(), value);
        name
    }

    /// Bind a value under a fixed name
    pub fn bind_named(&mut self, name: &str, value: Value) -> String {
        self.params.insert(name.to_string(), value);
        name.to_string()
    }

    /// Number of parameters bound so far
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameter has been bound
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Consume the context and return its parameters
    pub fn into_params(self) -> Params {
        self.params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClauseType {
    Unwind,
    Match,
    Merge,
    Where,
    With,
    Return,
    OrderBy,
    Skip,
    Limit,
    Set,
    Remove,
    Delete,
    Schema,
}

/// Line-oriented statement assembly; empty clauses contribute nothing
#[derive(Debug, Default)]
pub(crate) struct StatementBuilder {
    parts: Vec<(ClauseType, String)>,
}

impl StatementBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, clause: ClauseType, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if !text.is_empty() {
            self.parts.push((clause, text));
        }
        self
    }

    pub(crate) fn push_opt(&mut self, clause: ClauseType, text: Option<String>) -> &mut Self {
        if let Some(text) = text {
            self.push(clause, text);
        }
        self
    }

    #[cfg(test)]
    pub(crate) fn clause_types(&self) -> Vec<ClauseType> {
        self.parts.iter().map(|(c, _)| *c).collect()
    }

    pub(crate) fn build(self) -> String {
        self.parts
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Sort direction for ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive parse; anything other than `desc` sorts ascending
    pub fn parse(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    /// Cypher keyword
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl From<&str> for SortDirection {
    fn from(direction: &str) -> Self {
        Self::parse(direction)
    }
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    /// Possibly namespaced field
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

impl OrderKey {
    /// Create an order key
    pub fn new(field: impl Into<String>, direction: impl Into<SortDirection>) -> Self {
        Self {
            field: field.into(),
            direction: direction.into(),
        }
    }

    /// Parse `field`, `field__asc` or `field__desc`
    pub fn parse(key: &str) -> Self {
        if let Some(field) = key.strip_suffix("__desc") {
            Self::new(field, SortDirection::Desc)
        } else if let Some(field) = key.strip_suffix("__asc") {
            Self::new(field, SortDirection::Asc)
        } else {
            Self::new(key, SortDirection::Asc)
        }
    }
}

/// Escape a label, relationship type or property name for statement text
///
/// Plain ASCII identifiers pass through unchanged; anything else is wrapped
/// in backticks with embedded backticks doubled.
pub fn ident(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("`{}`", name.replace('`', "``")))
    }
}

/// Render one predicate against an already resolved alias and property
pub(crate) fn render_predicate(
    ctx: &mut ParamContext,
    prefix: &'static str,
    alias: &str,
    property: &str,
    condition: &Condition,
) -> String {
    let op = condition.operator;
    if op.is_null_test() {
        format!("{}.{} {}", alias, ident(property), op.symbol())
    } else {
        let name = ctx.bind(prefix, condition.value.clone());
        format!("{}.{} {} ${}", alias, ident(property), op.symbol(), name)
    }
}

/// Render a WHERE clause; `resolve` maps a condition field to `(alias, property)`
pub(crate) fn render_where<'a, F>(
    ctx: &mut ParamContext,
    prefix: &'static str,
    conditions: &'a [Condition],
    mut resolve: F,
) -> Option<String>
where
    F: FnMut(&'a str) -> (String, &'a str),
{
    let parts: Vec<String> = conditions
        .iter()
        .filter(|c| !c.field.is_empty())
        .map(|c| {
            let (alias, property) = resolve(c.field.as_str());
            render_predicate(ctx, prefix, &alias, property, c)
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("WHERE {}", parts.join(" AND ")))
    }
}

/// WHERE clause against a single fixed alias
pub(crate) fn render_where_for_alias(
    ctx: &mut ParamContext,
    prefix: &'static str,
    alias: &str,
    conditions: &[Condition],
) -> Option<String> {
    render_where(ctx, prefix, conditions, |field| (alias.to_string(), field))
}

/// RETURN clause from already qualified items; empty means the bare alias
pub(crate) fn render_return(items: Vec<String>, default: &str) -> String {
    if items.is_empty() {
        format!("RETURN {}", default)
    } else {
        format!("RETURN {}", items.join(", "))
    }
}

/// ORDER BY clause from `(qualified field, direction)` pairs
pub(crate) fn render_order_by(items: Vec<(String, SortDirection)>) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let parts: Vec<String> = items
        .into_iter()
        .map(|(field, dir)| format!("{} {}", field, dir.as_str()))
        .collect();
    Some(format!("ORDER BY {}", parts.join(" , ")))
}

/// SKIP is emitted only for a strictly positive offset
pub(crate) fn render_skip(offset: Option<i64>) -> Option<String> {
    offset.filter(|o| *o > 0).map(|o| format!("SKIP {}", o))
}

/// LIMIT is emitted for any non-negative limit, zero included
pub(crate) fn render_limit(limit: Option<i64>) -> Option<String> {
    limit.filter(|l| *l >= 0).map(|l| format!("LIMIT {}", l))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operator;

    #[test]
    fn test_bind_counts_per_prefix() {
        let mut ctx = ParamContext::new();
        assert_eq!(ctx.bind("where", Value::from(1)), "where_0");
        assert_eq!(ctx.bind("param", Value::from(2)), "param_0");
        assert_eq!(ctx.bind("where", Value::from(3)), "where_1");
        assert_eq!(ctx.bind_positional("inc", Value::from(4)), "inc_3");
        assert_eq!(ctx.len(), 4);
    }

    #[test]
    fn test_null_tests_do_not_bind() {
        let mut ctx = ParamContext::new();
        let conditions = vec![
            Condition::new("email", Operator::IsNull, Value::Null),
            Condition::new("phone", Operator::NotNull, "ignored"),
            Condition::new("nick", Operator::Exists, 1),
        ];
        let clause = render_where_for_alias(&mut ctx, "param", "n", &conditions).unwrap();
        assert_eq!(
            clause,
            "WHERE n.email IS NULL AND n.phone IS NOT NULL AND n.nick IS NOT NULL"
        );
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_empty_conditions_render_nothing() {
        let mut ctx = ParamContext::new();
        assert_eq!(render_where_for_alias(&mut ctx, "param", "n", &[]), None);
    }

    #[test]
    fn test_limit_and_skip_boundaries() {
        assert_eq!(render_limit(Some(0)).as_deref(), Some("LIMIT 0"));
        assert_eq!(render_limit(Some(-1)), None);
        assert_eq!(render_limit(None), None);
        assert_eq!(render_skip(Some(0)), None);
        assert_eq!(render_skip(Some(20)).as_deref(), Some("SKIP 20"));
    }

    #[test]
    fn test_order_by_separator() {
        let clause = render_order_by(vec![
            ("to.name".to_string(), SortDirection::Asc),
            ("rel.since".to_string(), SortDirection::Desc),
        ]);
        assert_eq!(clause.as_deref(), Some("ORDER BY to.name ASC , rel.since DESC"));
    }

    #[test]
    fn test_order_key_suffixes() {
        assert_eq!(OrderKey::parse("age__desc"), OrderKey::new("age", "DESC"));
        assert_eq!(OrderKey::parse("age__asc"), OrderKey::new("age", "asc"));
        assert_eq!(
            OrderKey::parse("rel__since__desc"),
            OrderKey::new("rel__since", SortDirection::Desc)
        );
        assert_eq!(SortDirection::parse("sideways"), SortDirection::Asc);
    }

    #[test]
    fn test_statement_builder_skips_empty_parts() {
        let mut b = StatementBuilder::new();
        b.push(ClauseType::Match, "MATCH (n:Person)")
            .push(ClauseType::Where, "")
            .push_opt(ClauseType::Limit, None)
            .push(ClauseType::Return, "RETURN n");
        assert_eq!(b.clause_types(), vec![ClauseType::Match, ClauseType::Return]);
        assert_eq!(b.build(), "MATCH (n:Person)\nRETURN n");
    }

    #[test]
    fn test_ident_quotes_only_when_needed() {
        assert_eq!(ident("email"), "email");
        assert_eq!(ident("_private2"), "_private2");
        assert_eq!(ident("first name"), "`first name`");
        assert_eq!(ident("2fa"), "`2fa`");
        assert_eq!(ident("a`b"), "`a``b`");
        assert_eq!(ident(""), "``");
    }
}
