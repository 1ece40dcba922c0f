use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::EntityName;

/// Outcome of one entity's stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity: EntityName,
    /// Rows present before the stage.
    pub existing: u64,
    pub minimum: u64,
    pub inserted: u64,
    /// Unique-constraint collisions absorbed by the retry budget.
    pub retries: u64,
}

impl EntityReport {
    pub fn total(&self) -> u64 {
        self.existing + self.inserted
    }
}

/// Report for a completed seeding run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    /// Stage reports in execution order.
    pub entities: Vec<EntityReport>,
    pub inserted_total: u64,
    pub retries_total: u64,
    pub duration_ms: u64,
}

impl SeedReport {
    pub fn new(run_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            entities: Vec::new(),
            inserted_total: 0,
            retries_total: 0,
            duration_ms: 0,
        }
    }

    pub fn push(&mut self, report: EntityReport) {
        self.inserted_total += report.inserted;
        self.retries_total += report.retries;
        self.entities.push(report);
    }

    /// Stage report for `entity`, matched on the qualified or bare table name.
    pub fn entity(&self, name: &str) -> Option<&EntityReport> {
        self.entities
            .iter()
            .find(|report| report.entity.as_str() == name)
            .or_else(|| self.entities.iter().find(|report| report.entity.table() == name))
    }

    /// Entities in the order their stages ran.
    pub fn order(&self) -> Vec<&EntityName> {
        self.entities.iter().map(|report| &report.entity).collect()
    }
}
