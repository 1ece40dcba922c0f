use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use crate::errors::{GeneratorError, HookError};
use crate::generators::{FnGenerator, Generator};
use crate::hooks::{FnHook, HookContext, StageHook};
use crate::record::Record;

/// Retries allowed per row after the first attempt collides on a unique constraint.
pub const DEFAULT_RETRY_BUDGET: u32 = 1;

/// Caller configuration for one [`Seeder`](crate::Seeder).
///
/// Entity keys are either qualified (`public.authors`) or bare table names
/// (`authors`); they are resolved against the schema when the seeder is built.
#[derive(Clone)]
pub struct SeedConfig {
    pub minimum_counts: BTreeMap<String, u64>,
    pub retry_budget: u32,
    pub retry_budget_overrides: BTreeMap<String, u32>,
    pub generators: BTreeMap<String, Arc<dyn Generator>>,
    pub hooks: BTreeMap<String, Arc<dyn StageHook>>,
    /// Seed for the run's RNG. `None` draws a fresh seed per run.
    pub rng_seed: Option<u64>,
    /// Cap on candidate rows loaded per referenced entity. `None` loads all rows.
    pub fk_candidate_limit: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            minimum_counts: BTreeMap::new(),
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_budget_overrides: BTreeMap::new(),
            generators: BTreeMap::new(),
            hooks: BTreeMap::new(),
            rng_seed: None,
            fk_candidate_limit: None,
        }
    }
}

impl SeedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_minimum(mut self, entity: impl Into<String>, count: u64) -> Self {
        self.minimum_counts.insert(entity.into(), count);
        self
    }

    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    pub fn with_entity_retry_budget(mut self, entity: impl Into<String>, budget: u32) -> Self {
        self.retry_budget_overrides.insert(entity.into(), budget);
        self
    }

    pub fn with_generator(
        mut self,
        entity: impl Into<String>,
        generator: impl Generator + 'static,
    ) -> Self {
        self.generators.insert(entity.into(), Arc::new(generator));
        self
    }

    /// Replace the default generator of `entity` with a closure.
    pub fn with_generator_fn<F>(self, entity: impl Into<String>, generate: F) -> Self
    where
        F: Fn(&mut dyn RngCore) -> Result<Record, GeneratorError> + Send + Sync + 'static,
    {
        self.with_generator(entity, FnGenerator(generate))
    }

    pub fn with_hook(mut self, entity: impl Into<String>, hook: impl StageHook + 'static) -> Self {
        self.hooks.insert(entity.into(), Arc::new(hook));
        self
    }

    /// Run `hook` after `entity` reaches its minimum count.
    pub fn with_hook_fn<F>(self, entity: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.with_hook(entity, FnHook(hook))
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_fk_candidate_limit(mut self, limit: u64) -> Self {
        self.fk_candidate_limit = Some(limit);
        self
    }
}

impl fmt::Debug for SeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedConfig")
            .field("minimum_counts", &self.minimum_counts)
            .field("retry_budget", &self.retry_budget)
            .field("retry_budget_overrides", &self.retry_budget_overrides)
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("rng_seed", &self.rng_seed)
            .field("fk_candidate_limit", &self.fk_candidate_limit)
            .finish()
    }
}
