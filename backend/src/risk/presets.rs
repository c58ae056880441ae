//! Example type 1 diabetes model
//!
//! Illustrative catalog and parameters for demos and tests. The numbers are
//! round figures of the right order of magnitude, not calibrated estimates.

use crate::models::catalog::{CatalogError, ModelCatalog};
use crate::orchestrator::config::{CatalogConfig, CategoryConfig, ConfigError};
use crate::risk::parametric::{
    AcuteParams, MortalityParams, ParametricRiskRepository, PrevalenceParams, RiskParams,
    StageMortalityParams, TransitionParams,
};

fn category(name: &str, stages: &[&str]) -> CategoryConfig {
    CategoryConfig {
        name: name.to_string(),
        stages: stages.iter().map(|s| s.to_string()).collect(),
    }
}

/// Nephropathy, retinopathy, neuropathy and coronary disease; severe
/// hypoglycemia and ketoacidosis as acute kinds
pub fn example_catalog_config() -> CatalogConfig {
    CatalogConfig {
        categories: vec![
            category("NEP", &["ALB1", "ALB2", "ESRD"]),
            category("RET", &["BGRET", "PRET", "ME", "BLI"]),
            category("NEU", &["PNEU", "LEA"]),
            category("CHD", &["ANGINA", "MI", "HF", "STROKE"]),
        ],
        acute: vec!["SHE".to_string(), "KETO".to_string()],
    }
}

pub fn example_catalog() -> Result<ModelCatalog, CatalogError> {
    example_catalog_config().build()
}

fn step(from: Option<&str>, to: &str, p: f64, rr: f64, lethal: f64) -> TransitionParams {
    TransitionParams {
        from: from.map(str::to_string),
        to: to.to_string(),
        annual_probability: p,
        hba1c_rr_per_point: rr,
        lethal_probability: lethal,
    }
}

/// Parameters matching `example_catalog`
pub fn example_params() -> RiskParams {
    RiskParams {
        mortality: MortalityParams {
            gompertz_a: 0.00003,
            gompertz_b: 0.09,
            male_hazard_ratio: 1.3,
            hba1c_rr_per_point: 1.1,
        },
        stage_mortality: vec![
            StageMortalityParams {
                stage: "ESRD".to_string(),
                hazard_ratio: 4.5,
            },
            StageMortalityParams {
                stage: "LEA".to_string(),
                hazard_ratio: 2.5,
            },
            StageMortalityParams {
                stage: "HF".to_string(),
                hazard_ratio: 3.0,
            },
            StageMortalityParams {
                stage: "MI".to_string(),
                hazard_ratio: 1.8,
            },
        ],
        transitions: vec![
            step(None, "ALB1", 0.036, 1.4, 0.0),
            step(Some("ALB1"), "ALB2", 0.014, 1.3, 0.0),
            step(Some("ALB2"), "ESRD", 0.011, 1.2, 0.0),
            step(None, "ESRD", 0.0002, 1.0, 0.0),
            step(None, "BGRET", 0.046, 1.6, 0.0),
            step(Some("BGRET"), "PRET", 0.013, 1.5, 0.0),
            step(Some("BGRET"), "ME", 0.012, 1.3, 0.0),
            step(Some("PRET"), "BLI", 0.01, 1.1, 0.0),
            step(None, "PNEU", 0.035, 1.3, 0.0),
            step(Some("PNEU"), "LEA", 0.006, 1.2, 0.0),
            step(None, "ANGINA", 0.004, 1.15, 0.0),
            step(None, "MI", 0.003, 1.15, 0.25),
            step(Some("ANGINA"), "MI", 0.01, 1.15, 0.2),
            step(Some("MI"), "HF", 0.02, 1.1, 0.0),
            step(None, "STROKE", 0.002, 1.1, 0.15),
        ],
        prevalence: vec![
            PrevalenceParams {
                stage: "ALB1".to_string(),
                probability: 0.1,
            },
            PrevalenceParams {
                stage: "BGRET".to_string(),
                probability: 0.25,
            },
            PrevalenceParams {
                stage: "PNEU".to_string(),
                probability: 0.08,
            },
        ],
        acute: vec![
            AcuteParams {
                kind: "SHE".to_string(),
                annual_rate: 0.2,
                hba1c_rr_per_point: 0.85,
                on_treatment_rate_ratio: 1.5,
                lethal_probability: 0.001,
            },
            AcuteParams {
                kind: "KETO".to_string(),
                annual_rate: 0.01,
                hba1c_rr_per_point: 1.3,
                on_treatment_rate_ratio: 1.0,
                lethal_probability: 0.005,
            },
        ],
        reference_hba1c: 7.0,
        ticks_per_year: 365,
    }
}

/// Repository over `example_params`, resolved against `catalog`
pub fn example_repository(catalog: &ModelCatalog) -> Result<ParametricRiskRepository, ConfigError> {
    ParametricRiskRepository::new(example_params(), catalog)
}
