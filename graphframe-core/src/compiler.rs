//! Read-query compilation: node, relationship, traversal and back queries
//!
//! Clause order is fixed for every shape:
//! MATCH -> WHERE -> (WITH, back queries only) -> RETURN -> ORDER BY -> SKIP -> LIMIT

use crate::condition::Condition;
use crate::error::{Error, Result};
use crate::render::{
    ClauseType, OrderKey, ParamContext, QUERY_PARAM_PREFIX, StatementBuilder, ident,
    render_limit, render_order_by, render_return, render_skip, render_where,
    render_where_for_alias,
};
use crate::value::Params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default alias for node queries
pub const NODE_ALIAS: &str = "n";
/// Default alias for relationship queries
pub const REL_ALIAS: &str = "r";

/// Prefix comment marking a statement that must not be executed
const PLACEHOLDER_PREFIX: &str = "//";

/// Compiled statement: query text plus its named parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    query: String,
    params: Params,
}

impl CompiledQuery {
    /// Wrap query text and parameters
    pub fn new(query: impl Into<String>, params: Params) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    /// A no-op comment statement
    pub fn placeholder(comment: impl fmt::Display) -> Self {
        Self::new(format!("{} {}", PLACEHOLDER_PREFIX, comment), Params::new())
    }

    /// Query text
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Named parameters
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Whether this is a no-op comment rather than an executable statement
    pub fn is_placeholder(&self) -> bool {
        is_placeholder(&self.query)
    }

    /// Split into query text and parameters
    pub fn into_parts(self) -> (String, Params) {
        (self.query, self.params)
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

/// Whether query text is a placeholder comment
pub fn is_placeholder(query: &str) -> bool {
    query.trim_start().starts_with(PLACEHOLDER_PREFIX)
}

/// Filter, projection, ordering and paging state handed to the compiler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Conjoined predicates, in call order
    pub conditions: Vec<Condition>,
    /// Returned fields; empty returns whole entities
    pub fields: Vec<String>,
    /// ORDER BY keys, in call order
    pub order_by: Vec<OrderKey>,
    /// LIMIT, applied when non-negative
    pub limit: Option<i64>,
    /// SKIP, applied when strictly positive
    pub offset: Option<i64>,
}

/// Traversal direction relative to the origin node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Out,
    In,
    Both,
}

impl Direction {
    /// Relationship segment of the MATCH pattern
    pub fn pattern(self, rel_alias: &str, rel_type: &str) -> String {
        match self {
            Direction::Out => format!("-{}:{}->", rel_alias, rel_type),
            Direction::In => format!("<-{}:{}-", rel_alias, rel_type),
            Direction::Both => format!("-{}:{}-", rel_alias, rel_type),
        }
    }

    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Out => "out",
            Direction::In => "in",
            Direction::Both => "both",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "out" => Ok(Direction::Out),
            "in" => Ok(Direction::In),
            "both" => Ok(Direction::Both),
            other => Err(Error::invalid_field(
                other,
                "direction must be one of out, in, both",
            )),
        }
    }
}

/// Which end of a traversal a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    From,
    Rel,
    To,
}

/// Aliases bound to the origin node, the relationship and the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalAliases {
    pub from: String,
    pub rel: String,
    pub to: String,
}

impl Default for TraversalAliases {
    fn default() -> Self {
        Self::new("from", "rel", "to")
    }
}

impl TraversalAliases {
    /// Custom aliases
    pub fn new(from: impl Into<String>, rel: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            rel: rel.into(),
            to: to.into(),
        }
    }

    /// Alias for a namespace
    pub fn alias(&self, ns: Namespace) -> &str {
        match ns {
            Namespace::From => &self.from,
            Namespace::Rel => &self.rel,
            Namespace::To => &self.to,
        }
    }

    /// Route a possibly prefixed field to its namespace and bare property
    ///
    /// `from__`/`rel__`/`to__` win, then prefixes built from the configured
    /// aliases; anything else belongs to the origin node.
    pub fn resolve<'f>(&self, field: &'f str) -> (Namespace, &'f str) {
        const STANDARD: [(&str, Namespace); 3] = [
            ("from__", Namespace::From),
            ("rel__", Namespace::Rel),
            ("to__", Namespace::To),
        ];
        for (prefix, ns) in STANDARD {
            if let Some(prop) = field.strip_prefix(prefix) {
                return (ns, prop);
            }
        }
        for ns in [Namespace::From, Namespace::Rel, Namespace::To] {
            if let Some(prop) = field
                .strip_prefix(self.alias(ns))
                .and_then(|rest| rest.strip_prefix("__"))
            {
                return (ns, prop);
            }
        }
        (Namespace::From, field)
    }

    fn all(&self) -> String {
        format!("{}, {}, {}", self.from, self.rel, self.to)
    }
}

/// One-hop traversal descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub rel_type: String,
    pub from_label: String,
    /// Empty leaves the destination unlabeled
    pub to_label: String,
    pub direction: Direction,
    pub aliases: TraversalAliases,
}

impl Traversal {
    /// Traversal with default aliases
    pub fn new(
        from_label: impl Into<String>,
        rel_type: impl Into<String>,
        to_label: impl Into<String>,
        direction: Direction,
    ) -> Self {
        Self {
            rel_type: rel_type.into(),
            from_label: from_label.into(),
            to_label: to_label.into(),
            direction,
            aliases: TraversalAliases::default(),
        }
    }

    /// Replace the aliases
    pub fn with_aliases(mut self, aliases: TraversalAliases) -> Self {
        self.aliases = aliases;
        self
    }

    fn pattern(&self) -> String {
        let a = &self.aliases;
        let to = if self.to_label.is_empty() {
            format!("({})", a.to)
        } else {
            format!("({}:{})", a.to, ident(&self.to_label))
        };
        format!(
            "({}:{}){}{}",
            a.from,
            ident(&self.from_label),
            self.direction.pattern(&a.rel, &ident(&self.rel_type)),
            to
        )
    }
}

/// `MATCH (alias:Label)` query description
#[derive(Debug, Clone, PartialEq)]
pub struct NodeQuery {
    pub label: String,
    pub alias: String,
    pub selection: Selection,
}

impl NodeQuery {
    /// Query over a label with the default `n` alias
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            alias: NODE_ALIAS.to_string(),
            selection: Selection::default(),
        }
    }
}

/// `MATCH ()-[alias:TYPE]-()` query description
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeQuery {
    pub rel_type: String,
    pub alias: String,
    pub selection: Selection,
}

impl EdgeQuery {
    /// Query over a relationship type with the default `r` alias
    pub fn new(rel_type: impl Into<String>) -> Self {
        Self {
            rel_type: rel_type.into(),
            alias: REL_ALIAS.to_string(),
            selection: Selection::default(),
        }
    }
}

/// One-hop traversal query description
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalQuery {
    pub traversal: Traversal,
    pub selection: Selection,
}

impl TraversalQuery {
    /// Unfiltered traversal
    pub fn new(traversal: Traversal) -> Self {
        Self {
            traversal,
            selection: Selection::default(),
        }
    }
}

/// Traversal that returns to its origin nodes
#[derive(Debug, Clone, PartialEq)]
pub struct BackQuery {
    pub traversal: Traversal,
    /// Predicates collected on the path before `back()`
    pub traversal_conditions: Vec<Condition>,
    /// Origin frame state after `back()`; its conditions are appended
    pub origin: Selection,
}

impl BackQuery {
    /// Turn a traversal query around, keeping its filters on the path and
    /// carrying its projection, ordering and paging over to the origin
    pub fn from_traversal(query: &TraversalQuery) -> Self {
        let sel = &query.selection;
        Self {
            traversal: query.traversal.clone(),
            traversal_conditions: sel.conditions.clone(),
            origin: Selection {
                conditions: Vec::new(),
                fields: sel.fields.clone(),
                order_by: sel.order_by.clone(),
                limit: sel.limit,
                offset: sel.offset,
            },
        }
    }
}

/// Compiles frame state into read queries
///
/// Stateless: each call owns a fresh [`ParamContext`], so one compiler can
/// be shared freely across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryCompiler;

impl QueryCompiler {
    /// Create a compiler
    pub fn new() -> Self {
        Self
    }

    /// `MATCH (alias:Label)` query
    pub fn compile_node_query(&self, node: &NodeQuery) -> CompiledQuery {
        let (label, alias, sel) = (&node.label, node.alias.as_str(), &node.selection);
        let mut ctx = ParamContext::new();
        let mut stmt = StatementBuilder::new();

        stmt.push(ClauseType::Match, format!("MATCH ({}:{})", alias, ident(label)));
        stmt.push_opt(
            ClauseType::Where,
            render_where_for_alias(&mut ctx, QUERY_PARAM_PREFIX, alias, &sel.conditions),
        );
        push_single_alias_tail(&mut stmt, alias, sel);

        finish(stmt, ctx)
    }

    /// `MATCH ()-[alias:TYPE]-()` query
    pub fn compile_edge_query(&self, edge: &EdgeQuery) -> CompiledQuery {
        let (rel_type, alias, sel) = (&edge.rel_type, edge.alias.as_str(), &edge.selection);
        let mut ctx = ParamContext::new();
        let mut stmt = StatementBuilder::new();

        stmt.push(ClauseType::Match, format!("MATCH ()-[{}:{}]-()", alias, ident(rel_type)));
        stmt.push_opt(
            ClauseType::Where,
            render_where_for_alias(&mut ctx, QUERY_PARAM_PREFIX, alias, &sel.conditions),
        );
        push_single_alias_tail(&mut stmt, alias, sel);

        finish(stmt, ctx)
    }

    /// One-hop traversal returning any of the three aliases
    pub fn compile_traversal_query(&self, query: &TraversalQuery) -> CompiledQuery {
        let (traversal, sel) = (&query.traversal, &query.selection);
        let aliases = &traversal.aliases;
        let mut ctx = ParamContext::new();
        let mut stmt = StatementBuilder::new();

        stmt.push(ClauseType::Match, format!("MATCH {}", traversal.pattern()));
        stmt.push_opt(
            ClauseType::Where,
            render_traversal_where(&mut ctx, aliases, &sel.conditions),
        );

        let items = sel
            .fields
            .iter()
            .map(|field| {
                if field == "*" {
                    aliases.all()
                } else {
                    let (ns, prop) = aliases.resolve(field);
                    format!("{}.{}", aliases.alias(ns), ident(prop))
                }
            })
            .collect();
        stmt.push(ClauseType::Return, render_return(items, &aliases.all()));

        let order = sel
            .order_by
            .iter()
            .map(|key| {
                let (ns, prop) = aliases.resolve(&key.field);
                (format!("{}.{}", aliases.alias(ns), ident(prop)), key.direction)
            })
            .collect();
        push_paging(&mut stmt, order, sel);

        finish(stmt, ctx)
    }

    /// Traversal that filters across the hop but returns the origin nodes
    pub fn compile_back_query(&self, query: &BackQuery) -> Result<CompiledQuery> {
        let (traversal, origin) = (&query.traversal, &query.origin);
        let traversal_conditions = &query.traversal_conditions;
        let aliases = &traversal.aliases;
        let from = aliases.from.as_str();
        let mut ctx = ParamContext::new();
        let mut stmt = StatementBuilder::new();

        stmt.push(
            ClauseType::Match,
            format!("MATCH path = {}", traversal.pattern()),
        );

        let conditions: Vec<Condition> = traversal_conditions
            .iter()
            .chain(origin.conditions.iter())
            .cloned()
            .collect();
        stmt.push_opt(
            ClauseType::Where,
            render_traversal_where(&mut ctx, aliases, &conditions),
        );
        stmt.push(ClauseType::With, format!("WITH {}", from));

        let items = origin
            .fields
            .iter()
            .map(|field| {
                if field == "*" {
                    Ok(from.to_string())
                } else {
                    origin_property(aliases, field).map(|prop| format!("{}.{}", from, ident(prop)))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        stmt.push(ClauseType::Return, render_return(items, from));

        let order = origin
            .order_by
            .iter()
            .map(|key| {
                origin_property(aliases, &key.field)
                    .map(|prop| (format!("{}.{}", from, ident(prop)), key.direction))
            })
            .collect::<Result<Vec<_>>>()?;
        push_paging(&mut stmt, order, origin);

        Ok(finish(stmt, ctx))
    }
}

fn origin_property<'f>(aliases: &TraversalAliases, field: &'f str) -> Result<&'f str> {
    match aliases.resolve(field) {
        (Namespace::From, prop) => Ok(prop),
        (ns, _) => Err(Error::invalid_field(
            field,
            format!(
                "`{}` is out of scope after back(); only `{}` fields can be returned or ordered",
                aliases.alias(ns),
                aliases.from
            ),
        )),
    }
}

fn render_traversal_where(
    ctx: &mut ParamContext,
    aliases: &TraversalAliases,
    conditions: &[Condition],
) -> Option<String> {
    render_where(ctx, QUERY_PARAM_PREFIX, conditions, |field| {
        let (ns, prop) = aliases.resolve(field);
        (aliases.alias(ns).to_string(), prop)
    })
}

fn push_single_alias_tail(stmt: &mut StatementBuilder, alias: &str, sel: &Selection) {
    let items = sel
        .fields
        .iter()
        .map(|field| {
            if field == "*" {
                alias.to_string()
            } else {
                format!("{}.{}", alias, ident(field))
            }
        })
        .collect();
    stmt.push(ClauseType::Return, render_return(items, alias));

    let order = sel
        .order_by
        .iter()
        .map(|key| (format!("{}.{}", alias, ident(&key.field)), key.direction))
        .collect();
    push_paging(stmt, order, sel);
}

fn push_paging(
    stmt: &mut StatementBuilder,
    order: Vec<(String, crate::render::SortDirection)>,
    sel: &Selection,
) {
    stmt.push_opt(ClauseType::OrderBy, render_order_by(order));
    stmt.push_opt(ClauseType::Skip, render_skip(sel.offset));
    stmt.push_opt(ClauseType::Limit, render_limit(sel.limit));
}

pub(crate) fn finish(stmt: StatementBuilder, ctx: ParamContext) -> CompiledQuery {
    let query = stmt.build();
    let params = ctx.into_params();
    tracing::debug!(
        "Compiled query ({} params: {:?}):\n{}",
        params.len(),
        params.keys().collect::<Vec<_>>(),
        query
    );
    CompiledQuery::new(query, params)
}
