//! Baseline patient profiles and interventions
//!
//! A profile is the immutable part of a patient: everything sampled at
//! creation time, plus the seed of its random streams. Paired runs copy the
//! profile verbatim and only swap the intervention.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for invalid intervention definitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterventionError {
    #[error("Intervention name must not be empty")]
    EmptyName,

    #[error("Effect duration must be positive, got {0}")]
    NonPositiveDuration(f64),

    #[error("HbA1c reduction must be finite, got {0}")]
    NonFiniteReduction(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

/// Immutable baseline attributes of one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Age at simulation start (years)
    pub age: f64,

    pub sex: Sex,

    /// Baseline HbA1c (%)
    pub hba1c: f64,

    /// Years since diagnosis at simulation start
    pub duration_of_diabetes: f64,

    /// Seed of the patient's common-random-number streams
    pub stream_seed: u64,
}

/// A treatment arm being compared
///
/// # Example
/// ```
/// use cohort_sim_core::Intervention;
///
/// let arm = Intervention::new("intensive", 1.0).with_effect_duration(5.0);
/// assert!(arm.validate().is_ok());
/// assert_eq!(arm.treated_hba1c(8.5), 7.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub name: String,

    /// Absolute HbA1c reduction while the treatment effect lasts
    pub hba1c_reduction: f64,

    /// Years the effect lasts (None = for life)
    #[serde(default)]
    pub effect_duration_years: Option<f64>,
}

impl Intervention {
    pub fn new(name: &str, hba1c_reduction: f64) -> Self {
        Self {
            name: name.to_string(),
            hba1c_reduction,
            effect_duration_years: None,
        }
    }

    /// Limit the treatment effect to `years`
    pub fn with_effect_duration(mut self, years: f64) -> Self {
        self.effect_duration_years = Some(years);
        self
    }

    pub fn validate(&self) -> Result<(), InterventionError> {
        if self.name.is_empty() {
            return Err(InterventionError::EmptyName);
        }
        if !self.hba1c_reduction.is_finite() {
            return Err(InterventionError::NonFiniteReduction(self.hba1c_reduction));
        }
        if let Some(years) = self.effect_duration_years {
            if years.is_nan() || years <= 0.0 {
                return Err(InterventionError::NonPositiveDuration(years));
            }
        }
        Ok(())
    }

    /// HbA1c while the treatment effect is active
    pub fn treated_hba1c(&self, baseline: f64) -> f64 {
        baseline - self.hba1c_reduction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_duration_rejected() {
        let arm = Intervention::new("short", 0.5).with_effect_duration(0.0);
        assert_eq!(
            arm.validate(),
            Err(InterventionError::NonPositiveDuration(0.0))
        );
    }

    #[test]
    fn test_lifelong_effect_by_default() {
        let arm: Intervention =
            serde_json::from_str(r#"{"name": "usual", "hba1c_reduction": 0.0}"#).unwrap();
        assert_eq!(arm.effect_duration_years, None);
        assert!(arm.validate().is_ok());
    }
}
