//! GraphFrame core: turns filter, projection, traversal and write intent
//! into parameterized Cypher
//!
//! Nothing in this crate performs I/O. Every compiler is a stateless unit
//! struct; each `compile_*` call owns its own [`render::ParamContext`], so
//! a compiler can be shared across threads.
//!
//! ```
//! use graphframe_core::{ConditionParser, NodeQuery, QueryCompiler};
//!
//! let mut query = NodeQuery::new("Person");
//! query.selection.conditions = ConditionParser::default()
//!     .parse([("age__gte", 18)])
//!     .unwrap();
//! query.selection.limit = Some(10);
//!
//! let compiled = QueryCompiler.compile_node_query(&query);
//! assert_eq!(
//!     compiled.query(),
//!     "MATCH (n:Person)\nWHERE n.age >= $param_0\nRETURN n\nLIMIT 10"
//! );
//! ```

pub mod compiler;
pub mod condition;
pub mod error;
pub mod render;
pub mod value;
pub mod write;

pub use compiler::{
    BackQuery, CompiledQuery, Direction, EdgeQuery, NODE_ALIAS, Namespace, NodeQuery,
    QueryCompiler, REL_ALIAS, Selection, Traversal, TraversalAliases, TraversalQuery,
    is_placeholder,
};
pub use condition::{Condition, ConditionParser, Operator, OperatorPolicy, SEPARATOR};
pub use error::{Error, Result};
pub use render::{OrderKey, ParamContext, SortDirection, ident};
pub use value::{Params, Record, Value, record};
pub use write::{
    AdvancedUpdateCompiler, BatchSummary, CompiledUpsert, Endpoint, NullPolicy,
    RelUniquenessPolicy, SchemaCompiler, UpdateCompiler, UpsertCompiler, UpsertOptions,
};
