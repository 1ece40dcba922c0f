use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use boilingseed_seed::SeedConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Contents of a `boilingseed.toml` settings file.
///
/// ```toml
/// retries = 2
/// seed = 42
/// fk_candidate_limit = 500
///
/// [minimums]
/// authors = 10
/// "public.books" = 50
///
/// [retry_overrides]
/// categories = 5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedSettings {
    pub retries: Option<u32>,
    pub seed: Option<u64>,
    pub fk_candidate_limit: Option<u64>,
    pub minimums: BTreeMap<String, u64>,
    pub retry_overrides: BTreeMap<String, u32>,
}

impl SeedSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Command-line values win over file values.
    pub fn apply_overrides(
        &mut self,
        minimums: &[(String, u64)],
        retries: Option<u32>,
        seed: Option<u64>,
        fk_candidate_limit: Option<u64>,
    ) {
        for (entity, count) in minimums {
            self.minimums.insert(entity.clone(), *count);
        }
        if retries.is_some() {
            self.retries = retries;
        }
        if seed.is_some() {
            self.seed = seed;
        }
        if fk_candidate_limit.is_some() {
            self.fk_candidate_limit = fk_candidate_limit;
        }
    }

    pub fn to_config(&self) -> SeedConfig {
        let mut config = SeedConfig::new();
        if let Some(retries) = self.retries {
            config = config.with_retry_budget(retries);
        }
        for (entity, count) in &self.minimums {
            config = config.with_minimum(entity.clone(), *count);
        }
        for (entity, budget) in &self.retry_overrides {
            config = config.with_entity_retry_budget(entity.clone(), *budget);
        }
        if let Some(seed) = self.seed {
            config = config.with_rng_seed(seed);
        }
        if let Some(limit) = self.fk_candidate_limit {
            config = config.with_fk_candidate_limit(limit);
        }
        config
    }
}

/// Parse an `ENTITY=N` minimum-count argument.
pub fn parse_minimum(value: &str) -> Result<(String, u64), String> {
    let (entity, count) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ENTITY=N, got '{value}'"))?;
    let entity = entity.trim();
    if entity.is_empty() {
        return Err(format!("missing entity name in '{value}'"));
    }
    let count = count
        .trim()
        .parse::<u64>()
        .map_err(|err| format!("invalid count in '{value}': {err}"))?;
    Ok((entity.to_string(), count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_settings_file() {
        let settings: SeedSettings = toml::from_str(
            r#"
            retries = 3
            seed = 7

            [minimums]
            authors = 10
            "public.books" = 25
            "#,
        )
        .expect("settings");

        assert_eq!(settings.retries, Some(3));
        assert_eq!(settings.seed, Some(7));
        assert_eq!(settings.fk_candidate_limit, None);
        assert_eq!(settings.minimums.get("public.books"), Some(&25));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<SeedSettings>("retry = 3").is_err());
    }

    #[test]
    fn command_line_overrides_file_values() {
        let mut settings = SeedSettings {
            retries: Some(3),
            seed: Some(1),
            minimums: BTreeMap::from([("authors".to_string(), 10)]),
            ..SeedSettings::default()
        };
        settings.apply_overrides(&[("authors".to_string(), 2)], None, Some(9), None);

        assert_eq!(settings.retries, Some(3));
        assert_eq!(settings.seed, Some(9));
        assert_eq!(settings.minimums.get("authors"), Some(&2));

        let config = settings.to_config();
        assert_eq!(config.retry_budget, 3);
        assert_eq!(config.rng_seed, Some(9));
        assert_eq!(config.minimum_counts.get("authors"), Some(&2));
    }

    #[test]
    fn parses_minimum_arguments() {
        assert_eq!(
            parse_minimum("authors=5").expect("valid"),
            ("authors".to_string(), 5)
        );
        assert!(parse_minimum("authors").is_err());
        assert!(parse_minimum("=5").is_err());
        assert!(parse_minimum("authors=-1").is_err());
    }
}
