use async_trait::async_trait;

use crate::descriptor::EntityName;
use crate::errors::PersistError;
use crate::record::Record;

/// Persistence boundary of the engine.
///
/// Implementations own the connection. The engine issues calls one at a
/// time, so a single-connection backend is enough.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Current number of rows in `entity`.
    async fn count(&self, entity: &EntityName) -> Result<u64, PersistError>;

    /// Insert one row and return it as stored, including database-assigned columns.
    ///
    /// A unique or primary-key collision must be reported as
    /// [`PersistError::UniqueViolation`]; the engine retries only those.
    async fn insert(&self, entity: &EntityName, record: &Record) -> Result<Record, PersistError>;

    /// Existing rows of `entity`, used as foreign-key candidates. `limit` caps the result.
    async fn list_existing(
        &self,
        entity: &EntityName,
        limit: Option<u64>,
    ) -> Result<Vec<Record>, PersistError>;
}
