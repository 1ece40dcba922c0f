//! Record generators and the per-entity registry.

mod column;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::RngCore;
use rand_chacha::ChaCha8Rng;

use boilingseed_core::DatabaseSchema;

use crate::descriptor::{DescriptorSet, EntityName};
use crate::errors::GeneratorError;
use crate::record::Record;

pub use column::ColumnGenerator;

/// RNG driving one run. Seeded from the config for reproducible fixtures.
pub type SeedRng = ChaCha8Rng;

/// Produces candidate records for one entity.
///
/// Columns left unset are filled by the foreign-key resolver (FK columns) or
/// by the database (defaults, identities). Every call must produce a fresh
/// candidate; the retry loop calls again after a unique-constraint collision.
pub trait Generator: Send + Sync {
    fn generate(&self, rng: &mut dyn RngCore) -> Result<Record, GeneratorError>;
}

/// Adapts a closure into a [`Generator`].
pub struct FnGenerator<F>(pub F);

impl<F> Generator for FnGenerator<F>
where
    F: Fn(&mut dyn RngCore) -> Result<Record, GeneratorError> + Send + Sync,
{
    fn generate(&self, rng: &mut dyn RngCore) -> Result<Record, GeneratorError> {
        (self.0)(rng)
    }
}

/// Active generator per entity: the caller's override, else the column-type default.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<EntityName, Arc<dyn Generator>>,
    overridden: BTreeSet<EntityName>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a [`ColumnGenerator`] for every entity.
    pub fn with_defaults(schema: &DatabaseSchema, descriptors: &DescriptorSet) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors.iter() {
            registry.generators.insert(
                descriptor.name.clone(),
                Arc::new(ColumnGenerator::new(schema, descriptor)),
            );
        }
        registry
    }

    /// Replace the active generator of `entity` for the whole run.
    pub fn override_with(&mut self, entity: EntityName, generator: Arc<dyn Generator>) {
        self.generators.insert(entity.clone(), generator);
        self.overridden.insert(entity);
    }

    pub fn get(&self, entity: &EntityName) -> Option<&Arc<dyn Generator>> {
        self.generators.get(entity)
    }

    pub fn is_overridden(&self, entity: &EntityName) -> bool {
        self.overridden.contains(entity)
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("entities", &self.generators.keys().collect::<Vec<_>>())
            .field("overridden", &self.overridden)
            .finish()
    }
}
