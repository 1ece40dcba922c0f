//! Dependency-ordered, constraint-aware seeding engine for boilingseed.
//!
//! A [`Seeder`] is built from a `schema.json` snapshot and a [`SeedConfig`].
//! [`Seeder::run`] walks the foreign-key order of the schema and tops every
//! table up to its configured minimum row count through a caller-owned
//! [`Repository`], retrying candidates that collide on unique constraints.

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod errors;
pub mod foreign;
pub mod generators;
pub mod graph;
pub mod hooks;
pub mod memory;
pub mod model;
pub mod record;
pub mod repository;
mod retry;
mod satisfier;

pub use config::{DEFAULT_RETRY_BUDGET, SeedConfig};
pub use descriptor::{DescriptorSet, EntityDescriptor, EntityName, ForeignKeyRef};
pub use engine::Seeder;
pub use errors::{GeneratorError, HookError, PersistError, SeedError};
pub use generators::{ColumnGenerator, FnGenerator, Generator, GeneratorRegistry, SeedRng};
pub use hooks::{FnHook, HookContext, StageHook};
pub use memory::{CallCounts, InMemoryRepository};
pub use model::{EntityReport, SeedReport};
pub use record::{Record, Value};
pub use repository::Repository;
pub use satisfier::SeedJob;

pub use tokio_util::sync::CancellationToken;
