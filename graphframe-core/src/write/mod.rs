//! Write compilation: upserts, updates, deletes, field-level operations
//! and schema management
//!
//! Validation failures (a record missing a key field, a missing rel key
//! under [`RelUniquenessPolicy::RequireRelKey`]) are errors. Calls that
//! simply have nothing to do compile to a placeholder comment that the
//! write plan recognizes and skips.

pub mod advanced;
pub mod schema;
pub mod update;
pub mod upsert;

pub use advanced::AdvancedUpdateCompiler;
pub use schema::SchemaCompiler;
pub use update::UpdateCompiler;
pub use upsert::UpsertCompiler;

use crate::compiler::CompiledQuery;
use crate::condition::Condition;
use crate::error::{Error, Result};
use crate::render::{ParamContext, ident, render_where_for_alias};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix for WHERE values in write statements
pub const WHERE_PARAM_PREFIX: &str = "where";
/// Prefix for SET values in write statements
pub const SET_PARAM_PREFIX: &str = "param";
/// Parameter carrying upsert rows
pub const BATCH_PARAM: &str = "batch";
/// Rows per upsert batch unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// How null-valued fields are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Leave the stored value untouched
    #[default]
    IgnoreNulls,
    /// Overwrite with null
    SetNulls,
}

impl NullPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            NullPolicy::IgnoreNulls => "ignore_nulls",
            NullPolicy::SetNulls => "set_nulls",
        }
    }
}

impl FromStr for NullPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ignore_nulls" => Ok(NullPolicy::IgnoreNulls),
            "set_nulls" => Ok(NullPolicy::SetNulls),
            other => Err(Error::invalid_field(
                other,
                "null policy must be ignore_nulls or set_nulls",
            )),
        }
    }
}

impl fmt::Display for NullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graph-wide rule for relationship upserts without a relationship key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelUniquenessPolicy {
    /// Reject relationship upserts that omit `rel_key`
    RequireRelKey,
    /// MERGE on the endpoint pair alone
    #[default]
    SingleEdgePerPair,
    /// No enforcement
    AllowMultiple,
}

impl RelUniquenessPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RelUniquenessPolicy::RequireRelKey => "require_rel_key",
            RelUniquenessPolicy::SingleEdgePerPair => "single_edge_per_pair",
            RelUniquenessPolicy::AllowMultiple => "allow_multiple",
        }
    }
}

impl FromStr for RelUniquenessPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "require_rel_key" => Ok(RelUniquenessPolicy::RequireRelKey),
            "single_edge_per_pair" => Ok(RelUniquenessPolicy::SingleEdgePerPair),
            "allow_multiple" => Ok(RelUniquenessPolicy::AllowMultiple),
            other => Err(Error::invalid_field(
                other,
                "rel uniqueness policy must be require_rel_key, single_edge_per_pair or allow_multiple",
            )),
        }
    }
}

impl fmt::Display for RelUniquenessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upsert knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOptions {
    /// Patch mode: existing values survive nulls unless told otherwise
    pub patch: bool,
    /// Explicit null policy; `None` picks the mode's default
    pub null_policy: Option<NullPolicy>,
    /// Rows per executed batch
    pub batch_size: usize,
}

impl Default for UpsertOptions {
    fn default() -> Self {
        Self {
            patch: false,
            null_policy: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl UpsertOptions {
    /// Patch-mode options
    pub fn patch() -> Self {
        Self {
            patch: true,
            ..Self::default()
        }
    }

    /// Override the null policy
    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = Some(policy);
        self
    }

    /// Override the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// `SetNulls` for plain upserts, `IgnoreNulls` in patch mode, unless
    /// set explicitly
    pub fn effective_null_policy(&self) -> NullPolicy {
        self.null_policy.unwrap_or(if self.patch {
            NullPolicy::IgnoreNulls
        } else {
            NullPolicy::SetNulls
        })
    }
}

/// Label and key fields identifying one end of an upserted relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub label: String,
    pub key: Vec<String>,
}

impl Endpoint {
    /// Endpoint keyed on a single field
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: vec![key.into()],
        }
    }

    /// Endpoint keyed on several fields
    pub fn composite<I, K>(label: impl Into<String>, key: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            label: label.into(),
            key: key.into_iter().map(Into::into).collect(),
        }
    }
}

/// Row and batch counts for an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub batches: usize,
}

impl BatchSummary {
    /// Counts for `rows` rows split into batches of `batch_size`
    pub fn new(rows: usize, batch_size: usize) -> Self {
        Self {
            rows,
            batches: rows.div_ceil(batch_size.max(1)),
        }
    }
}

/// A compiled upsert together with its batching
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUpsert {
    pub query: CompiledQuery,
    pub summary: BatchSummary,
    pub batch_size: usize,
}

impl CompiledUpsert {
    pub(crate) fn placeholder(comment: impl fmt::Display) -> Self {
        Self {
            query: CompiledQuery::placeholder(comment),
            summary: BatchSummary::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// One statement per batch, each carrying its slice of `$batch`
    ///
    /// A placeholder yields itself once.
    pub fn batches(&self) -> Vec<CompiledQuery> {
        let rows = match self.query.params().get(BATCH_PARAM) {
            Some(Value::Array(rows)) if self.summary.batches > 1 => rows,
            _ => return vec![self.query.clone()],
        };
        rows.chunks(self.batch_size.max(1))
            .map(|chunk| {
                let mut params = self.query.params().clone();
                params.insert(BATCH_PARAM.to_string(), Value::Array(chunk.to_vec()));
                CompiledQuery::new(self.query.query(), params)
            })
            .collect()
    }
}

/// WHERE clause against a fixed write alias, minting `where_N` names
pub(crate) fn write_where(
    ctx: &mut ParamContext,
    alias: &str,
    conditions: &[Condition],
) -> Option<String> {
    render_where_for_alias(ctx, WHERE_PARAM_PREFIX, alias, conditions)
}

/// `{k1: item.k1, k2: item.k2}`
pub(crate) fn item_map<S: AsRef<str>>(keys: &[S]) -> String {
    let props: Vec<String> = keys
        .iter()
        .map(|k| format!("{0}: item.{0}", ident(AsRef::<str>::as_ref(k))))
        .collect();
    format!("{{{}}}", props.join(", "))
}
