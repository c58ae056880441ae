//! Baseline profile generation
//!
//! A `ProfileSource` hands the cohort generator one `PatientProfile` per
//! patient. The bundled `PopulationGenerator` samples each attribute from a
//! configured `ValueDistribution` using the session RNG, then draws the
//! patient's stream seed from the same RNG.
//!
//! # Example
//!
//! ```
//! use cohort_sim_core::population::{PopulationConfig, PopulationGenerator, ProfileSource};
//! use cohort_sim_core::RngManager;
//!
//! let mut source = PopulationGenerator::new(PopulationConfig::default()).unwrap();
//! let mut rng = RngManager::new(42);
//! let profile = source.next_profile(&mut rng);
//! assert!(profile.age >= 18.0);
//! ```

use crate::models::profile::{PatientProfile, Sex};
use crate::orchestrator::config::ConfigError;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Source of baseline patient profiles
pub trait ProfileSource {
    /// Produce the next profile; all randomness comes from `rng`
    fn next_profile(&mut self, rng: &mut RngManager) -> PatientProfile;
}

/// Distribution of one continuous baseline attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueDistribution {
    /// Always the same value
    Constant { value: f64 },

    /// Uniform on `[min, max)`
    Uniform { min: f64, max: f64 },

    /// Normal, truncated by clamping into `[min, max]`
    Normal {
        mean: f64,
        std_dev: f64,
        min: f64,
        max: f64,
    },
}

impl ValueDistribution {
    /// Sample one value
    ///
    /// Each variant consumes a fixed number of draws (0, 1 and 2).
    pub fn sample(&self, rng: &mut RngManager) -> f64 {
        match self {
            ValueDistribution::Constant { value } => *value,
            ValueDistribution::Uniform { min, max } => min + (max - min) * rng.next_f64(),
            ValueDistribution::Normal {
                mean,
                std_dev,
                min,
                max,
            } => (mean + std_dev * rng.standard_normal()).clamp(*min, *max),
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        let ok = match self {
            ValueDistribution::Constant { value } => value.is_finite(),
            ValueDistribution::Uniform { min, max } => {
                min.is_finite() && max.is_finite() && min <= max
            }
            ValueDistribution::Normal {
                mean,
                std_dev,
                min,
                max,
            } => {
                mean.is_finite()
                    && std_dev.is_finite()
                    && *std_dev >= 0.0
                    && min.is_finite()
                    && max.is_finite()
                    && min <= max
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!("bad distribution for {field}: {self:?}")))
        }
    }
}

/// Baseline population parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Age at entry (years)
    pub age: ValueDistribution,
    /// Baseline HbA1c (%)
    pub hba1c: ValueDistribution,
    /// Years since diagnosis
    pub duration_of_diabetes: ValueDistribution,
    /// Share of male patients, in `[0, 1]`
    pub male_proportion: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            age: ValueDistribution::Normal {
                mean: 27.0,
                std_dev: 8.0,
                min: 18.0,
                max: 80.0,
            },
            hba1c: ValueDistribution::Normal {
                mean: 8.3,
                std_dev: 1.2,
                min: 5.0,
                max: 14.0,
            },
            duration_of_diabetes: ValueDistribution::Uniform { min: 5.0, max: 25.0 },
            male_proportion: 0.5,
        }
    }
}

impl PopulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.age.validate("age")?;
        self.hba1c.validate("hba1c")?;
        self.duration_of_diabetes.validate("duration_of_diabetes")?;
        if !(0.0..=1.0).contains(&self.male_proportion) {
            return Err(ConfigError::Invalid(format!(
                "male_proportion must be in [0, 1], got {}",
                self.male_proportion
            )));
        }
        Ok(())
    }
}

/// Samples independent profiles from a `PopulationConfig`
#[derive(Debug, Clone)]
pub struct PopulationGenerator {
    config: PopulationConfig,
}

impl PopulationGenerator {
    pub fn new(config: PopulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }
}

impl ProfileSource for PopulationGenerator {
    fn next_profile(&mut self, rng: &mut RngManager) -> PatientProfile {
        let age = self.config.age.sample(rng);
        let sex = if rng.bernoulli(self.config.male_proportion) {
            Sex::Male
        } else {
            Sex::Female
        };
        let hba1c = self.config.hba1c.sample(rng);
        // Duration cannot exceed age
        let duration_of_diabetes = self.config.duration_of_diabetes.sample(rng).min(age);

        PatientProfile {
            age,
            sex,
            hba1c,
            duration_of_diabetes,
            stream_seed: rng.next(),
        }
    }
}

/// Replays a fixed list of profiles in order, cycling when exhausted
///
/// Consumes no randomness.
#[derive(Debug, Clone)]
pub struct FixedProfiles {
    profiles: Vec<PatientProfile>,
    cursor: usize,
}

impl FixedProfiles {
    pub fn new(profiles: Vec<PatientProfile>) -> Result<Self, ConfigError> {
        if profiles.is_empty() {
            return Err(ConfigError::Invalid("FixedProfiles needs at least one profile".to_string()));
        }
        for (i, profile) in profiles.iter().enumerate() {
            let fields = [
                ("age", profile.age),
                ("hba1c", profile.hba1c),
                ("duration_of_diabetes", profile.duration_of_diabetes),
            ];
            for (name, value) in fields {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "profile {i}: {name} must be finite and >= 0, got {value}"
                    )));
                }
            }
        }
        Ok(Self {
            profiles,
            cursor: 0,
        })
    }
}

impl ProfileSource for FixedProfiles {
    fn next_profile(&mut self, _rng: &mut RngManager) -> PatientProfile {
        let profile = self.profiles[self.cursor % self.profiles.len()].clone();
        self.cursor += 1;
        profile
    }
}
