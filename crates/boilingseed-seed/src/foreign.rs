use std::collections::HashMap;

use rand::Rng;
use tracing::debug;

use crate::descriptor::{EntityDescriptor, EntityName, ForeignKeyRef};
use crate::errors::SeedError;
use crate::generators::SeedRng;
use crate::record::{Record, Value};
use crate::repository::Repository;

/// Fills unset foreign-key columns from rows already persisted in the referenced entity.
///
/// Candidate rows are loaded once per referenced entity and kept for the run.
/// Every referenced entity has finished its stage before a dependent one
/// starts, so the cached set does not go stale.
#[derive(Debug, Default)]
pub struct ForeignKeyResolver {
    candidate_limit: Option<u64>,
    cache: HashMap<EntityName, Vec<Record>>,
}

impl ForeignKeyResolver {
    pub fn new(candidate_limit: Option<u64>) -> Self {
        Self {
            candidate_limit,
            cache: HashMap::new(),
        }
    }

    /// Resolve every foreign key of `descriptor` that `record` leaves (partly) unset.
    ///
    /// Caller-set columns are never overwritten. A key with some columns set
    /// only accepts referenced rows that agree with them. A key holding an
    /// explicit null is not enforced by the database and is left alone.
    pub async fn resolve<R>(
        &mut self,
        repo: &R,
        descriptor: &EntityDescriptor,
        record: &mut Record,
        rng: &mut SeedRng,
    ) -> Result<(), SeedError>
    where
        R: Repository + ?Sized,
    {
        for fk in &descriptor.foreign_keys {
            if fk.columns.iter().all(|column| record.is_set(column)) {
                continue;
            }
            if fk
                .columns
                .iter()
                .any(|column| record.get(column).is_some_and(Value::is_null))
            {
                continue;
            }

            let candidates = self.candidates(repo, &descriptor.name, &fk.referenced).await?;
            let matching: Vec<&Record> = candidates
                .iter()
                .filter(|candidate| matches_set_columns(fk, record, candidate))
                .collect();

            if matching.is_empty() {
                return Err(SeedError::UnresolvedReference {
                    entity: descriptor.name.clone(),
                    referenced: fk.referenced.clone(),
                    columns: fk.columns.clone(),
                });
            }

            let chosen = matching[rng.random_range(0..matching.len())];
            for (column, referenced_column) in fk.columns.iter().zip(&fk.referenced_columns) {
                if record.is_set(column) {
                    continue;
                }
                if let Some(value) = chosen.get(referenced_column) {
                    record.set(column.clone(), value.clone());
                }
            }

            debug!(
                entity = %descriptor.name,
                referenced = %fk.referenced,
                columns = ?fk.columns,
                candidates = matching.len(),
                "foreign key resolved"
            );
        }

        Ok(())
    }

    async fn candidates<R>(
        &mut self,
        repo: &R,
        entity: &EntityName,
        referenced: &EntityName,
    ) -> Result<&[Record], SeedError>
    where
        R: Repository + ?Sized,
    {
        if !self.cache.contains_key(referenced) {
            let rows = repo
                .list_existing(referenced, self.candidate_limit)
                .await
                .map_err(|source| SeedError::Persistence {
                    entity: entity.clone(),
                    source,
                })?;
            debug!(
                entity = %entity,
                referenced = %referenced,
                rows = rows.len(),
                "loaded foreign key candidates"
            );
            self.cache.insert(referenced.clone(), rows);
        }
        Ok(self
            .cache
            .get(referenced)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }
}

/// A candidate qualifies when all referenced columns are non-null and it agrees with every set column.
fn matches_set_columns(fk: &ForeignKeyRef, record: &Record, candidate: &Record) -> bool {
    if candidate.project(&fk.referenced_columns).is_none() {
        return false;
    }
    fk.columns
        .iter()
        .zip(&fk.referenced_columns)
        .all(|(column, referenced_column)| match record.get(column) {
            Some(value) => candidate
                .get(referenced_column)
                .is_some_and(|other| other.key() == value.key()),
            None => true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk() -> ForeignKeyRef {
        ForeignKeyRef {
            name: Some("shipments_order_fkey".to_string()),
            referenced: EntityName::new("public", "order_lines"),
            columns: vec!["order_id".to_string(), "line_no".to_string()],
            referenced_columns: vec!["order_id".to_string(), "line_no".to_string()],
        }
    }

    #[test]
    fn partial_keys_only_match_agreeing_rows() {
        let record = Record::new().with("order_id", 7_i64);
        let agreeing = Record::new().with("order_id", 7_i64).with("line_no", 2_i64);
        let other = Record::new().with("order_id", 8_i64).with("line_no", 2_i64);
        assert!(matches_set_columns(&fk(), &record, &agreeing));
        assert!(!matches_set_columns(&fk(), &record, &other));
    }

    #[test]
    fn rows_with_null_keys_are_not_candidates() {
        let candidate = Record::new().with("order_id", 7_i64).with("line_no", Value::Null);
        assert!(!matches_set_columns(&fk(), &Record::new(), &candidate));
    }
}
