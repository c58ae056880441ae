//! Parametric risk repository
//!
//! Time-to-event draws from constant annual hazards (Gompertz for background
//! mortality), scaled by multiplicative relative risks:
//!
//! ```text
//! rate = base_rate * rr_hba1c ^ (hba1c - reference_hba1c) * other ratios
//! ```
//!
//! Each patient's draws come from its own `RandomStreams`, one stream per
//! purpose, and every query consumes a fixed number of draws per parameter
//! entry whether or not the entry applies. Paired patients therefore see the
//! same uniforms for the same purpose, and the arms differ only through the
//! HbA1c-dependent rates.

use crate::core::time::{years_to_ticks, Tick};
use crate::models::catalog::{AcuteId, CategoryId, ModelCatalog, StageId};
use crate::models::patient::PatientView;
use crate::models::profile::Sex;
use crate::models::progression::{AcuteDescriptor, ProgressionBatch, ProgressionDescriptor};
use crate::orchestrator::config::ConfigError;
use crate::rng::{RandomStreams, StreamKey};
use crate::risk::RiskRepository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Parameters
// ============================================================================

/// Gompertz background mortality, `h(age) = a * exp(b * age)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityParams {
    pub gompertz_a: f64,
    pub gompertz_b: f64,
    #[serde(default = "one")]
    pub male_hazard_ratio: f64,
    /// Relative risk per HbA1c point above the reference
    #[serde(default = "one")]
    pub hba1c_rr_per_point: f64,
}

/// Hazard ratio applied to mortality once a stage is reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMortalityParams {
    pub stage: String,
    pub hazard_ratio: f64,
}

/// One chronic transition
///
/// `from: None` applies while the category has no reached stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionParams {
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    pub annual_probability: f64,
    #[serde(default = "one")]
    pub hba1c_rr_per_point: f64,
    #[serde(default)]
    pub lethal_probability: f64,
}

/// Probability that a stage is present at baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrevalenceParams {
    pub stage: String,
    pub probability: f64,
}

/// One acute event kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcuteParams {
    pub kind: String,
    pub annual_rate: f64,
    #[serde(default = "one")]
    pub hba1c_rr_per_point: f64,
    /// Rate ratio while the intervention effect lasts
    #[serde(default = "one")]
    pub on_treatment_rate_ratio: f64,
    #[serde(default)]
    pub lethal_probability: f64,
}

fn one() -> f64 {
    1.0
}

fn default_reference_hba1c() -> f64 {
    7.0
}

fn default_ticks_per_year() -> usize {
    365
}

/// All parameters of a `ParametricRiskRepository`
///
/// `ticks_per_year` must match the session that uses the repository; a
/// session built with a different resolution is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub mortality: MortalityParams,
    #[serde(default)]
    pub stage_mortality: Vec<StageMortalityParams>,
    pub transitions: Vec<TransitionParams>,
    #[serde(default)]
    pub prevalence: Vec<PrevalenceParams>,
    #[serde(default)]
    pub acute: Vec<AcuteParams>,
    #[serde(default = "default_reference_hba1c")]
    pub reference_hba1c: f64,
    #[serde(default = "default_ticks_per_year")]
    pub ticks_per_year: usize,
}

impl RiskParams {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn check_probability(what: &str, p: f64) -> Result<(), ConfigError> {
    if (0.0..1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{what}: probability {p} not in [0, 1)")))
    }
}

fn check_ratio(what: &str, r: f64) -> Result<(), ConfigError> {
    if r.is_finite() && r > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{what}: ratio {r} must be finite and > 0")))
    }
}

// ============================================================================
// Repository
// ============================================================================

#[derive(Debug, Clone)]
struct Transition {
    from: Option<StageId>,
    to: StageId,
    /// Annual hazard at the reference HbA1c
    rate: f64,
    hba1c_rr: f64,
    lethal_probability: f64,
}

#[derive(Debug, Clone)]
struct Acute {
    rate: f64,
    hba1c_rr: f64,
    on_treatment: f64,
    lethal_probability: f64,
}

/// Reference `RiskRepository` built from `RiskParams`
#[derive(Debug, Clone)]
pub struct ParametricRiskRepository {
    ticks_per_year: usize,
    reference_hba1c: f64,
    mortality: MortalityParams,
    stage_hr: BTreeMap<StageId, f64>,
    transitions: BTreeMap<CategoryId, Vec<Transition>>,
    category_stages: BTreeMap<CategoryId, Vec<StageId>>,
    prevalence: Vec<(StageId, CategoryId, f64)>,
    acute: BTreeMap<AcuteId, Acute>,
}

impl ParametricRiskRepository {
    /// Resolve every parameter name against `catalog`
    ///
    /// Fails with `MissingParameter` if a category has no entry transition or
    /// an acute kind has no parameters, and with `Invalid` for unknown names
    /// or out-of-range values.
    pub fn new(params: RiskParams, catalog: &ModelCatalog) -> Result<Self, ConfigError> {
        if params.ticks_per_year == 0 {
            return Err(ConfigError::Invalid("ticks_per_year must be > 0".to_string()));
        }
        let m = &params.mortality;
        if !(m.gompertz_a.is_finite() && m.gompertz_a > 0.0) {
            return Err(ConfigError::Invalid("gompertz_a must be > 0".to_string()));
        }
        if !(m.gompertz_b.is_finite() && m.gompertz_b >= 0.0) {
            return Err(ConfigError::Invalid("gompertz_b must be >= 0".to_string()));
        }
        check_ratio("male_hazard_ratio", m.male_hazard_ratio)?;
        check_ratio("mortality hba1c_rr_per_point", m.hba1c_rr_per_point)?;

        let stage = |name: &str| {
            catalog
                .stage_by_name(name)
                .map_err(|e| ConfigError::Invalid(e.to_string()))
        };

        let mut stage_hr = BTreeMap::new();
        for entry in &params.stage_mortality {
            check_ratio(&entry.stage, entry.hazard_ratio)?;
            stage_hr.insert(stage(&entry.stage)?, entry.hazard_ratio);
        }

        let mut transitions: BTreeMap<CategoryId, Vec<Transition>> = BTreeMap::new();
        for entry in &params.transitions {
            let to = stage(&entry.to)?;
            let category = catalog
                .category_of(to)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            let from = match &entry.from {
                Some(name) => {
                    let from = stage(name)?;
                    if catalog.category_of(from).ok() != Some(category) {
                        return Err(ConfigError::Invalid(format!(
                            "transition {name} -> {} crosses categories",
                            entry.to
                        )));
                    }
                    Some(from)
                }
                None => None,
            };
            check_probability(&entry.to, entry.annual_probability)?;
            check_probability(&entry.to, entry.lethal_probability)?;
            check_ratio(&entry.to, entry.hba1c_rr_per_point)?;

            transitions.entry(category).or_default().push(Transition {
                from,
                to,
                rate: -(1.0 - entry.annual_probability).ln(),
                hba1c_rr: entry.hba1c_rr_per_point,
                lethal_probability: entry.lethal_probability,
            });
        }

        let mut category_stages = BTreeMap::new();
        for category in catalog.category_ids() {
            let has_entry = transitions
                .get(&category)
                .is_some_and(|list| list.iter().any(|t| t.from.is_none()));
            if !has_entry {
                let name = catalog.category(category).map_or("?", |c| c.name());
                return Err(ConfigError::MissingParameter(format!(
                    "no entry transition for category {name}"
                )));
            }
            let stages = catalog
                .category(category)
                .map(|c| c.stages().to_vec())
                .unwrap_or_default();
            category_stages.insert(category, stages);
        }

        let mut prevalence = Vec::with_capacity(params.prevalence.len());
        for entry in &params.prevalence {
            check_probability(&entry.stage, entry.probability)?;
            let id = stage(&entry.stage)?;
            let category = catalog
                .category_of(id)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            prevalence.push((id, category, entry.probability));
        }

        let mut acute = BTreeMap::new();
        for entry in &params.acute {
            let id = catalog
                .acute_by_name(&entry.kind)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            if !(entry.annual_rate.is_finite() && entry.annual_rate >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{}: annual_rate must be >= 0",
                    entry.kind
                )));
            }
            check_ratio(&entry.kind, entry.hba1c_rr_per_point)?;
            check_ratio(&entry.kind, entry.on_treatment_rate_ratio)?;
            check_probability(&entry.kind, entry.lethal_probability)?;
            acute.insert(
                id,
                Acute {
                    rate: entry.annual_rate,
                    hba1c_rr: entry.hba1c_rr_per_point,
                    on_treatment: entry.on_treatment_rate_ratio,
                    lethal_probability: entry.lethal_probability,
                },
            );
        }
        for kind in catalog.acute_ids() {
            if !acute.contains_key(&kind) {
                let name = catalog.acute(kind).map_or("?", |a| a.name());
                return Err(ConfigError::MissingParameter(format!(
                    "no parameters for acute kind {name}"
                )));
            }
        }

        Ok(Self {
            ticks_per_year: params.ticks_per_year,
            reference_hba1c: params.reference_hba1c,
            mortality: params.mortality,
            stage_hr,
            transitions,
            category_stages,
            prevalence,
            acute,
        })
    }

    fn hba1c_multiplier(&self, rr_per_point: f64, hba1c: f64) -> f64 {
        rr_per_point.powf(hba1c - self.reference_hba1c)
    }

    /// Waiting time in ticks for an annual `rate`; `None` if it never happens
    ///
    /// Never less than one tick, so an overflowing rate cannot stall the clock.
    fn wait(&self, rate: f64, exposure: f64) -> Option<Tick> {
        if rate.is_nan() || rate <= 0.0 {
            return None;
        }
        let years = exposure / rate;
        years
            .is_finite()
            .then(|| years_to_ticks(years, self.ticks_per_year).max(1))
    }
}

impl RiskRepository for ParametricRiskRepository {
    fn time_to_death(&self, patient: &PatientView<'_>, streams: &mut RandomStreams) -> Tick {
        let exposure = streams.stream(StreamKey::Mortality).exponential(1.0);
        let m = &self.mortality;

        let mut multiplier = self.hba1c_multiplier(m.hba1c_rr_per_point, patient.state.hba1c());
        if patient.profile.sex == Sex::Male {
            multiplier *= m.male_hazard_ratio;
        }
        for stage in patient.state.reached_stages() {
            multiplier *= self.stage_hr.get(stage).copied().unwrap_or(1.0);
        }

        let age = patient.age(self.ticks_per_year);
        let hazard_now = m.gompertz_a * (m.gompertz_b * age).exp() * multiplier;

        // Invert the cumulative Gompertz hazard from the current age
        let years = if m.gompertz_b > 0.0 {
            (1.0 + exposure * m.gompertz_b / hazard_now).ln() / m.gompertz_b
        } else {
            exposure / hazard_now
        };
        years_to_ticks(years, self.ticks_per_year)
    }

    fn initial_stages(
        &self,
        _patient: &PatientView<'_>,
        streams: &mut RandomStreams,
    ) -> Vec<StageId> {
        self.prevalence
            .iter()
            .filter_map(|(stage, category, probability)| {
                streams
                    .stream(StreamKey::Chronic(*category))
                    .bernoulli(*probability)
                    .then_some(*stage)
            })
            .collect()
    }

    fn increases_mortality(&self, stage: StageId) -> bool {
        self.stage_hr.get(&stage).is_some_and(|hr| *hr > 1.0)
    }

    fn progression(
        &self,
        patient: &PatientView<'_>,
        category: CategoryId,
        streams: &mut RandomStreams,
    ) -> ProgressionBatch {
        let mut batch = ProgressionBatch::new();
        let state = patient.state;

        // Everything still pending in this category is redrawn
        if let Some(stages) = self.category_stages.get(&category) {
            for stage in stages {
                if patient.is_pending(*stage) {
                    batch = batch.cancel(*stage);
                }
            }
        }

        let Some(transitions) = self.transitions.get(&category) else {
            return batch;
        };
        let hba1c = state.hba1c();
        let rng = streams.stream(StreamKey::Chronic(category));

        // Earliest candidate per target stage
        let mut earliest: BTreeMap<StageId, ProgressionDescriptor> = BTreeMap::new();
        for transition in transitions {
            let exposure = rng.exponential(1.0);
            let lethal = rng.bernoulli(transition.lethal_probability);

            let eligible = match transition.from {
                Some(from) => state.has_reached(from),
                None => !state.has_category(category),
            };
            if !eligible || state.has_reached(transition.to) {
                continue;
            }
            let rate = transition.rate * self.hba1c_multiplier(transition.hba1c_rr, hba1c);
            let Some(delay) = self.wait(rate, exposure) else {
                continue;
            };

            let mut descriptor = ProgressionDescriptor::new(transition.to, delay);
            if lethal {
                descriptor = descriptor.lethal();
            }
            let earlier = earliest
                .get(&transition.to)
                .map_or(true, |current| delay < current.delay);
            if earlier {
                earliest.insert(transition.to, descriptor);
            }
        }

        for descriptor in earliest.into_values() {
            batch = batch.schedule(descriptor);
        }
        batch
    }

    fn acute_draw(
        &self,
        patient: &PatientView<'_>,
        kind: AcuteId,
        after_effect_loss: bool,
        streams: &mut RandomStreams,
    ) -> Option<AcuteDescriptor> {
        let params = self.acute.get(&kind)?;
        let rng = streams.stream(StreamKey::Acute(kind));
        let exposure = rng.exponential(1.0);
        let lethal = rng.bernoulli(params.lethal_probability);

        let mut rate = params.rate * self.hba1c_multiplier(params.hba1c_rr, patient.state.hba1c());
        if !after_effect_loss && patient.state.is_treatment_effect_active() {
            rate *= params.on_treatment;
        }
        let delay = self.wait(rate, exposure)?;

        let descriptor = AcuteDescriptor::new(kind, delay);
        Some(if lethal { descriptor.lethal() } else { descriptor })
    }

    fn ticks_per_year(&self) -> Option<usize> {
        Some(self.ticks_per_year)
    }
}
