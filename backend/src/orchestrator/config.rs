//! Session and model configuration
//!
//! Plain serde structs with defaults. Every config is validated by the
//! constructor that consumes it, so a bad parameter fails before any
//! patient is simulated.

use crate::models::catalog::{CatalogError, ModelCatalog};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors, raised at model construction time
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Missing clinical parameter: {0}")]
    MissingParameter(String),

    #[error("Config parse error: {0}")]
    Parse(String),
}

fn default_ticks_per_year() -> usize {
    365
}

/// Per-session run parameters
///
/// # Example
/// ```
/// use cohort_sim_core::SessionConfig;
///
/// let config = SessionConfig::from_json(
///     r#"{"rng_seed": 7, "n_patients": 100, "horizon_years": 20}"#,
/// ).unwrap();
/// assert_eq!(config.ticks_per_year, 365);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seed of the session RNG (profile sampling)
    pub rng_seed: u64,

    /// Cohort size for a fresh cohort
    pub n_patients: usize,

    /// Simulated years
    pub horizon_years: usize,

    /// Time resolution (365 = daily ticks)
    #[serde(default = "default_ticks_per_year")]
    pub ticks_per_year: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rng_seed: 12345,
            n_patients: 1000,
            horizon_years: 60,
            ticks_per_year: default_ticks_per_year(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_year == 0 {
            return Err(ConfigError::Invalid("ticks_per_year must be > 0".to_string()));
        }
        if self.horizon_years == 0 {
            return Err(ConfigError::Invalid("horizon_years must be > 0".to_string()));
        }
        if self.ticks_per_year.checked_mul(self.horizon_years).is_none() {
            return Err(ConfigError::Invalid(format!(
                "horizon of {} years at {} ticks per year overflows the tick range",
                self.horizon_years, self.ticks_per_year
            )));
        }
        Ok(())
    }
}

/// One chronic complication and its stages, in severity order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub stages: Vec<String>,
}

/// Serializable description of a model catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub acute: Vec<String>,
}

impl CatalogConfig {
    /// Register every category, stage and acute kind in declaration order
    pub fn build(&self) -> Result<ModelCatalog, CatalogError> {
        let mut catalog = ModelCatalog::new();
        for category in &self.categories {
            let id = catalog.add_category(&category.name)?;
            for stage in &category.stages {
                catalog.add_stage(id, stage)?;
            }
        }
        for acute in &self.acute {
            catalog.add_acute(acute)?;
        }
        catalog.validate()?;
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_horizon_rejected() {
        let config = SessionConfig {
            horizon_years: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_overflowing_horizon_rejected() {
        let config = SessionConfig {
            horizon_years: usize::MAX / 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let json = format!(
            r#"{{"rng_seed": 1, "n_patients": 1, "horizon_years": {}}}"#,
            usize::MAX / 2
        );
        assert!(matches!(
            SessionConfig::from_json(&json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            SessionConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_catalog_config_rejects_shared_names() {
        let config: CatalogConfig = serde_json::from_str(
            r#"{
                "categories": [
                    {"name": "NEP", "stages": ["ALB1", "ALB2", "ESRD"]},
                    {"name": "CHD", "stages": ["CHD"]}
                ],
                "acute": ["SHE"]
            }"#,
        )
        .unwrap();

        // "CHD" is used for both a category and a stage
        assert_eq!(
            config.build().unwrap_err(),
            CatalogError::DuplicateName("CHD".to_string())
        );
    }

    #[test]
    fn test_catalog_config_valid() {
        let config = CatalogConfig {
            categories: vec![CategoryConfig {
                name: "NEP".to_string(),
                stages: vec!["ALB1".to_string(), "ESRD".to_string()],
            }],
            acute: vec!["SHE".to_string()],
        };
        let catalog = config.build().unwrap();
        assert_eq!(catalog.num_stages(), 2);
        assert_eq!(catalog.num_acute(), 1);
    }
}
