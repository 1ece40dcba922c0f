use tracing::info;

use crate::descriptor::{EntityDescriptor, EntityName};
use crate::engine::RunContext;
use crate::errors::SeedError;
use crate::generators::Generator;
use crate::model::EntityReport;
use crate::repository::Repository;
use crate::retry;

/// Outstanding work for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedJob {
    pub entity: EntityName,
    pub remaining: u64,
}

impl SeedJob {
    /// Job for the rows `entity` still needs: `minimum - existing`, never negative.
    pub fn for_deficit(entity: EntityName, minimum: u64, existing: u64) -> Self {
        Self {
            entity,
            remaining: minimum.saturating_sub(existing),
        }
    }

    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }
}

/// Top `descriptor` up to its minimum count. A zero deficit makes no generator or insert calls.
pub(crate) async fn satisfy<R>(
    ctx: &mut RunContext<'_>,
    repo: &R,
    descriptor: &EntityDescriptor,
    generator: &dyn Generator,
) -> Result<EntityReport, SeedError>
where
    R: Repository + ?Sized,
{
    let entity = &descriptor.name;
    let existing = repo
        .count(entity)
        .await
        .map_err(|source| SeedError::Persistence {
            entity: entity.clone(),
            source,
        })?;

    let mut job = SeedJob::for_deficit(entity.clone(), descriptor.minimum_count, existing);
    let deficit = job.remaining;
    info!(
        run_id = %ctx.run_id,
        entity = %entity,
        existing,
        minimum = descriptor.minimum_count,
        deficit,
        "stage started"
    );

    let mut retries: u64 = 0;
    while !job.is_done() {
        let collisions = retry::insert_one(ctx, repo, descriptor, generator).await?;
        retries += u64::from(collisions);
        job.remaining -= 1;
    }

    let report = EntityReport {
        entity: entity.clone(),
        existing,
        minimum: descriptor.minimum_count,
        inserted: deficit,
        retries,
    };
    info!(
        run_id = %ctx.run_id,
        entity = %entity,
        inserted = report.inserted,
        retries,
        total = report.total(),
        "stage completed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deficit_never_goes_negative() {
        let entity = EntityName::new("public", "authors");
        assert_eq!(SeedJob::for_deficit(entity.clone(), 5, 2).remaining, 3);
        assert!(SeedJob::for_deficit(entity.clone(), 5, 5).is_done());
        assert!(SeedJob::for_deficit(entity, 2, 9).is_done());
    }
}
