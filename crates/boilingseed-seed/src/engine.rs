use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use boilingseed_core::DatabaseSchema;

use crate::config::SeedConfig;
use crate::descriptor::{DescriptorSet, EntityName};
use crate::errors::SeedError;
use crate::foreign::ForeignKeyResolver;
use crate::generators::{GeneratorRegistry, SeedRng};
use crate::graph::DependencyGraph;
use crate::hooks::{HookContext, StageHook};
use crate::model::SeedReport;
use crate::repository::Repository;
use crate::satisfier;

/// Per-run state. Created by [`Seeder::run`] and dropped when it returns.
pub(crate) struct RunContext<'a> {
    pub run_id: String,
    pub cancel: &'a CancellationToken,
    pub rng: SeedRng,
    pub resolver: ForeignKeyResolver,
}

/// Seeds a database to configured minimum row counts in foreign-key order.
///
/// Built once from a schema snapshot and a [`SeedConfig`]; descriptors,
/// generators and hooks are fixed afterwards. [`Seeder::run`] can be called
/// repeatedly and only writes what is missing.
pub struct Seeder {
    descriptors: DescriptorSet,
    generators: GeneratorRegistry,
    hooks: BTreeMap<EntityName, Arc<dyn StageHook>>,
    rng_seed: Option<u64>,
    fk_candidate_limit: Option<u64>,
}

impl Seeder {
    pub fn new(schema: &DatabaseSchema, config: SeedConfig) -> Result<Self, SeedError> {
        if config.fk_candidate_limit == Some(0) {
            return Err(SeedError::InvalidConfig(
                "fk_candidate_limit must be greater than zero".to_string(),
            ));
        }

        let mut descriptors = DescriptorSet::from_schema(schema)?;

        let names: Vec<EntityName> = descriptors.iter().map(|d| d.name.clone()).collect();
        for name in &names {
            if let Some(descriptor) = descriptors.get_mut(name) {
                descriptor.retry_budget = config.retry_budget;
            }
        }
        for (key, minimum) in &config.minimum_counts {
            let name = descriptors.resolve(key)?;
            if let Some(descriptor) = descriptors.get_mut(&name) {
                descriptor.minimum_count = *minimum;
            }
        }
        for (key, budget) in &config.retry_budget_overrides {
            let name = descriptors.resolve(key)?;
            if let Some(descriptor) = descriptors.get_mut(&name) {
                descriptor.retry_budget = *budget;
            }
        }

        let mut generators = GeneratorRegistry::with_defaults(schema, &descriptors);
        for (key, generator) in config.generators {
            let name = descriptors.resolve(&key)?;
            generators.override_with(name, generator);
        }

        let mut hooks = BTreeMap::new();
        for (key, hook) in config.hooks {
            hooks.insert(descriptors.resolve(&key)?, hook);
        }

        Ok(Self {
            descriptors,
            generators,
            hooks,
            rng_seed: config.rng_seed,
            fk_candidate_limit: config.fk_candidate_limit,
        })
    }

    pub fn descriptors(&self) -> &DescriptorSet {
        &self.descriptors
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    /// Order in which entities are seeded. Fails with [`SeedError::SchemaCycle`] on a cyclic schema.
    pub fn stage_order(&self) -> Result<Vec<EntityName>, SeedError> {
        DependencyGraph::build(&self.descriptors).topological_order(&self.descriptors)
    }

    /// Top every entity up to its minimum count.
    ///
    /// The order is validated before the first repository call. Cancellation
    /// is observed at stage boundaries and before every insert attempt; rows
    /// already committed are kept on any failure.
    pub async fn run<R>(&self, cancel: &CancellationToken, repo: &R) -> Result<SeedReport, SeedError>
    where
        R: Repository + ?Sized,
    {
        self.run_with_id(uuid::Uuid::new_v4().to_string(), cancel, repo)
            .await
    }

    /// [`Seeder::run`] under a caller-chosen run id, used to correlate logs and artifacts.
    pub async fn run_with_id<R>(
        &self,
        run_id: String,
        cancel: &CancellationToken,
        repo: &R,
    ) -> Result<SeedReport, SeedError>
    where
        R: Repository + ?Sized,
    {
        let start = Instant::now();
        let mut report = SeedReport::new(run_id.clone(), Utc::now());

        let order = self.stage_order().inspect_err(|err| {
            warn!(run_id = %run_id, error = %err, "seeding aborted before any write");
        })?;

        info!(
            run_id = %run_id,
            entities = order.len(),
            seeded = ?self.rng_seed,
            "seeding started"
        );

        let mut ctx = RunContext {
            run_id: run_id.clone(),
            cancel,
            rng: self.new_rng(),
            resolver: ForeignKeyResolver::new(self.fk_candidate_limit),
        };

        match self.run_stages(&mut ctx, repo, &order, &mut report).await {
            Ok(()) => {
                report.duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    run_id = %run_id,
                    inserted = report.inserted_total,
                    retries = report.retries_total,
                    duration_ms = report.duration_ms,
                    "seeding finished"
                );
                Ok(report)
            }
            Err(SeedError::Cancelled) => {
                info!(
                    run_id = %run_id,
                    inserted = report.inserted_total,
                    "seeding cancelled"
                );
                Err(SeedError::Cancelled)
            }
            Err(err) => {
                warn!(
                    run_id = %run_id,
                    entity = err.entity().map(EntityName::as_str),
                    error = %err,
                    "seeding failed"
                );
                Err(err)
            }
        }
    }

    async fn run_stages<R>(
        &self,
        ctx: &mut RunContext<'_>,
        repo: &R,
        order: &[EntityName],
        report: &mut SeedReport,
    ) -> Result<(), SeedError>
    where
        R: Repository + ?Sized,
    {
        for entity in order {
            if ctx.cancel.is_cancelled() {
                return Err(SeedError::Cancelled);
            }

            let descriptor = self.descriptors.get(entity).ok_or_else(|| {
                SeedError::InvalidSchema(format!("no descriptor for {entity}"))
            })?;
            let generator = self.generators.get(entity).ok_or_else(|| {
                SeedError::InvalidConfig(format!("no generator registered for {entity}"))
            })?;

            let stage = satisfier::satisfy(ctx, repo, descriptor, generator.as_ref()).await?;

            if let Some(hook) = self.hooks.get(entity) {
                let hook_ctx = HookContext {
                    entity,
                    inserted: stage.inserted,
                    total: stage.total(),
                    cancel: ctx.cancel,
                };
                hook.after_stage(&hook_ctx)
                    .map_err(|source| SeedError::Hook {
                        entity: entity.clone(),
                        source,
                    })?;
            }

            report.push(stage);
        }
        Ok(())
    }

    fn new_rng(&self) -> SeedRng {
        match self.rng_seed {
            Some(seed) => SeedRng::seed_from_u64(seed),
            None => SeedRng::from_rng(&mut rand::rng()),
        }
    }
}

impl std::fmt::Debug for Seeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seeder")
            .field("entities", &self.descriptors.len())
            .field("generators", &self.generators)
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("rng_seed", &self.rng_seed)
            .field("fk_candidate_limit", &self.fk_candidate_limit)
            .finish()
    }
}
