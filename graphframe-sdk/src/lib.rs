//! # GraphFrame
//!
//! DataFrame-style querying and upserts for Cypher graph databases.
//!
//! Frames collect filters, projections and write intent; the
//! [`graphframe_core`] compilers turn them into parameterized Cypher; a
//! [`Driver`] runs the result.
//!
//! ## Example
//!
//! ```no_run
//! use graphframe::{Direction, Graph, GraphConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), graphframe::Error> {
//! let graph = Graph::connect(GraphConfig::new("http://localhost:15474"))?;
//!
//! let engineers = graph
//!     .nodes("Person")
//!     .traverse("WORKS_AT", "Company", Direction::Out)
//!     .where_([("to__industry", "Tech")])
//!     .back()
//!     .select(["name"])
//!     .to_records()
//!     .await?;
//! tracing::info!("Found {} people", engineers.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod frames;
pub mod graph;
pub mod schema;
pub mod testing;
pub mod write_plan;

pub use client::HttpDriver;
pub use config::GraphConfig;
pub use driver::{AccessMode, Driver, QueryResult, QueryStats, Session};
pub use error::{Error, Result};
pub use frames::{EdgeFrame, NodeFrame, PathFrame};
pub use graph::Graph;
pub use schema::SchemaManager;
pub use write_plan::{OperationType, PlanState, WriteOperation, WritePlan, WriteStats, WriteStatus};

pub use graphframe_core::{
    BatchSummary, CompiledQuery, Condition, Direction, Endpoint, NullPolicy, Operator,
    OperatorPolicy, Params, Record, RelUniquenessPolicy, TraversalAliases, UpsertOptions, Value,
    record,
};
