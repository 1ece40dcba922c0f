use tracing::{debug, warn};

use crate::descriptor::EntityDescriptor;
use crate::engine::RunContext;
use crate::errors::SeedError;
use crate::generators::Generator;
use crate::repository::Repository;

/// Generate, resolve and persist one row of `descriptor`, returning the number
/// of unique-constraint collisions it took.
///
/// Collisions are retried with a fresh candidate up to the entity's retry
/// budget; the budget is per row, so at most `budget + 1` inserts are
/// attempted. Every other failure is returned as-is.
pub(crate) async fn insert_one<R>(
    ctx: &mut RunContext<'_>,
    repo: &R,
    descriptor: &EntityDescriptor,
    generator: &dyn Generator,
) -> Result<u32, SeedError>
where
    R: Repository + ?Sized,
{
    let entity = &descriptor.name;
    let mut attempt: u32 = 0;

    loop {
        if ctx.cancel.is_cancelled() {
            return Err(SeedError::Cancelled);
        }
        attempt += 1;

        let mut record = generator
            .generate(&mut ctx.rng)
            .map_err(|source| SeedError::Generator {
                entity: entity.clone(),
                source,
            })?;
        ctx.resolver
            .resolve(repo, descriptor, &mut record, &mut ctx.rng)
            .await?;

        match repo.insert(entity, &record).await {
            Ok(stored) => {
                debug!(entity = %entity, attempt, columns = stored.len(), "row inserted");
                return Ok(attempt - 1);
            }
            Err(err) if err.is_transient() => {
                if attempt > descriptor.retry_budget {
                    return Err(SeedError::RetriesExhausted {
                        entity: entity.clone(),
                        attempts: attempt,
                        last_error: err,
                    });
                }
                warn!(
                    entity = %entity,
                    attempt,
                    retry_budget = descriptor.retry_budget,
                    error = %err,
                    "unique constraint collision, retrying with a fresh candidate"
                );
            }
            Err(source) => {
                return Err(SeedError::Persistence {
                    entity: entity.clone(),
                    source,
                });
            }
        }
    }
}
