use thiserror::Error;

use crate::descriptor::EntityName;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort a seeding run.
///
/// Only [`PersistError::UniqueViolation`] is handled inside the engine; every
/// variant here is returned to the caller.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("foreign key graph contains a cycle through: {}", .entities.join(", "))]
    SchemaCycle { entities: Vec<String> },
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("generator for {entity} failed: {source}")]
    Generator {
        entity: EntityName,
        #[source]
        source: GeneratorError,
    },
    #[error("no rows in {referenced} to satisfy foreign key ({}) on {entity}", .columns.join(", "))]
    UnresolvedReference {
        entity: EntityName,
        referenced: EntityName,
        columns: Vec<String>,
    },
    #[error("gave up inserting into {entity} after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        entity: EntityName,
        attempts: u32,
        #[source]
        last_error: PersistError,
    },
    #[error("persistence failed for {entity}: {source}")]
    Persistence {
        entity: EntityName,
        #[source]
        source: PersistError,
    },
    #[error("post-stage hook for {entity} failed: {source}")]
    Hook {
        entity: EntityName,
        #[source]
        source: HookError,
    },
    #[error("seeding cancelled")]
    Cancelled,
}

impl SeedError {
    /// Entity the failure is attributed to, when there is one.
    pub fn entity(&self) -> Option<&EntityName> {
        match self {
            SeedError::Generator { entity, .. }
            | SeedError::UnresolvedReference { entity, .. }
            | SeedError::RetriesExhausted { entity, .. }
            | SeedError::Persistence { entity, .. }
            | SeedError::Hook { entity, .. } => Some(entity),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SeedError::Cancelled)
    }
}

/// Failure reported by a [`Repository`](crate::Repository).
#[derive(Debug, Error)]
pub enum PersistError {
    /// A unique or primary-key constraint rejected the row. Retryable with a fresh candidate.
    #[error("unique constraint {} violated: {message}", .constraint.as_deref().unwrap_or("<unnamed>"))]
    UniqueViolation {
        constraint: Option<String>,
        message: String,
    },
    #[error("foreign key constraint {} violated: {message}", .constraint.as_deref().unwrap_or("<unnamed>"))]
    ForeignKeyViolation {
        constraint: Option<String>,
        message: String,
    },
    #[error("null value in column '{column}' violates not-null constraint")]
    NotNullViolation { column: String },
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),
    #[error("unknown column '{column}' on {entity}")]
    UnknownColumn { entity: String, column: String },
    #[error("database error: {0}")]
    Database(#[source] BoxError),
}

impl PersistError {
    /// The single classification boundary for retries: only uniqueness collisions are transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, PersistError::UniqueViolation { .. })
    }

    pub fn database(err: impl Into<BoxError>) -> Self {
        PersistError::Database(err.into())
    }
}

/// Failure raised by a record generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("no default generator for column '{column}' of type '{data_type}'")]
    UnsupportedType { column: String, data_type: String },
    #[error("{0}")]
    Invalid(String),
}

/// Failure raised by a post-stage hook.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] BoxError),
}

impl HookError {
    pub fn message(message: impl Into<String>) -> Self {
        HookError::Message(message.into())
    }
}
