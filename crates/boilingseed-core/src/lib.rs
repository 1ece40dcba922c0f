//! Core contracts and helpers for boilingseed.
//!
//! This crate defines the schema snapshot consumed by the seeding engine, the
//! foreign-key dependency graph, and small utilities shared with the CLI.

pub mod constraints;
pub mod error;
pub mod graph;
pub mod redaction;
pub mod schema;
pub mod types;
pub mod validation;

pub use constraints::{CheckConstraint, Constraint, ForeignKey, PrimaryKey, UniqueConstraint};
pub use error::{Error, Result};
pub use graph::{FkGraphReport, FkGraphSummary, build_fk_graph_report, toposort};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use schema::{Column, DatabaseSchema, Schema, Table, TableKind, table_key};
pub use types::{ColumnType, EnumType, GeneratedExpression, GeneratedKind, IdentityGeneration};
pub use validation::validate_schema;

/// Current schema contract version for `schema.json` snapshots.
pub const SCHEMA_VERSION: &str = "0.1";
