//! Shared helpers for cascade-level tests
//!
//! `Harness` drives patients directly through the cascade engine without a
//! session, so tests can script the risk repository call by call.

#![allow(dead_code)]

use cohort_sim_core::models::patient::{Patient, PatientId};
use cohort_sim_core::models::profile::{Intervention, PatientProfile, Sex};
use cohort_sim_core::{
    AcuteDescriptor, AcuteId, CascadeContext, CatalogConfig, CategoryConfig, CategoryId,
    EventLog, EventQueue, FireOutcome, FiredEvent, ModelCatalog, PatientView, ProgressionBatch,
    RandomStreams, RiskRepository, SimClock, SimulationError, StageId, Tick,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

pub const TICKS_PER_YEAR: usize = 100;
pub const HORIZON_YEARS: usize = 50;

// ============================================================================
// Catalog and patients
// ============================================================================

/// Two categories (`C1`: X, X2; `C2`: Y) and two acute kinds (`A1`, `A2`)
pub fn catalog() -> ModelCatalog {
    CatalogConfig {
        categories: vec![
            CategoryConfig {
                name: "C1".to_string(),
                stages: vec!["X".to_string(), "X2".to_string()],
            },
            CategoryConfig {
                name: "C2".to_string(),
                stages: vec!["Y".to_string()],
            },
        ],
        acute: vec!["A1".to_string(), "A2".to_string()],
    }
    .build()
    .unwrap()
}

pub fn profile(seed: u64) -> PatientProfile {
    PatientProfile {
        age: 35.0,
        sex: Sex::Female,
        hba1c: 9.0,
        duration_of_diabetes: 12.0,
        stream_seed: seed,
    }
}

pub fn patient(id: usize, intervention: Intervention) -> Patient {
    Patient::new(PatientId(id), profile(id as u64 + 1), intervention)
}

// ============================================================================
// Scripted risk repository
// ============================================================================

/// Risk repository answering from per-call scripts
///
/// Exhausted scripts answer "nothing happens": no batch entries, no acute
/// episode and a death far beyond the horizon.
#[derive(Default)]
pub struct ScriptedRisk {
    pub deaths: RefCell<VecDeque<Tick>>,
    pub initial: Vec<StageId>,
    pub mortality_stages: BTreeSet<StageId>,
    pub batches: RefCell<BTreeMap<CategoryId, VecDeque<ProgressionBatch>>>,
    pub acute: RefCell<BTreeMap<AcuteId, VecDeque<Option<AcuteDescriptor>>>>,
    /// (category, tick) of every progression query
    pub progression_calls: RefCell<Vec<(CategoryId, Tick)>>,
    /// (kind, after_effect_loss, tick) of every acute query
    pub acute_calls: RefCell<Vec<(AcuteId, bool, Tick)>>,
}

impl ScriptedRisk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deaths(self, deaths: &[Tick]) -> Self {
        self.deaths.borrow_mut().extend(deaths.iter().copied());
        self
    }

    pub fn with_batch(self, category: CategoryId, batch: ProgressionBatch) -> Self {
        self.batches
            .borrow_mut()
            .entry(category)
            .or_default()
            .push_back(batch);
        self
    }

    pub fn with_acute(self, kind: AcuteId, draw: Option<AcuteDescriptor>) -> Self {
        self.acute.borrow_mut().entry(kind).or_default().push_back(draw);
        self
    }
}

impl RiskRepository for ScriptedRisk {
    fn time_to_death(&self, _patient: &PatientView<'_>, _streams: &mut RandomStreams) -> Tick {
        self.deaths.borrow_mut().pop_front().unwrap_or(1_000_000)
    }

    fn initial_stages(
        &self,
        _patient: &PatientView<'_>,
        _streams: &mut RandomStreams,
    ) -> Vec<StageId> {
        self.initial.clone()
    }

    fn increases_mortality(&self, stage: StageId) -> bool {
        self.mortality_stages.contains(&stage)
    }

    fn progression(
        &self,
        patient: &PatientView<'_>,
        category: CategoryId,
        _streams: &mut RandomStreams,
    ) -> ProgressionBatch {
        self.progression_calls
            .borrow_mut()
            .push((category, patient.now));
        self.batches
            .borrow_mut()
            .get_mut(&category)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default()
    }

    fn acute_draw(
        &self,
        patient: &PatientView<'_>,
        kind: AcuteId,
        after_effect_loss: bool,
        _streams: &mut RandomStreams,
    ) -> Option<AcuteDescriptor> {
        self.acute_calls
            .borrow_mut()
            .push((kind, after_effect_loss, patient.now));
        self.acute
            .borrow_mut()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .flatten()
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Kernel, catalog and log for driving patients without a session
pub struct Harness {
    pub queue: EventQueue,
    pub catalog: ModelCatalog,
    pub log: EventLog,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            queue: EventQueue::new(SimClock::new(TICKS_PER_YEAR, HORIZON_YEARS)),
            catalog: catalog(),
            log: EventLog::new(),
        }
    }

    pub fn stage(&self, name: &str) -> StageId {
        self.catalog.stage_by_name(name).unwrap()
    }

    pub fn category(&self, name: &str) -> CategoryId {
        self.catalog.category_by_name(name).unwrap()
    }

    pub fn acute(&self, name: &str) -> AcuteId {
        self.catalog.acute_by_name(name).unwrap()
    }

    pub fn start(
        &mut self,
        patient: &mut Patient,
        risk: &dyn RiskRepository,
    ) -> Result<(), SimulationError> {
        let mut ctx = CascadeContext::new(&mut self.queue, &self.catalog, risk, &mut self.log);
        patient.start(&mut ctx)
    }

    /// Fire the next event; `None` when the queue is exhausted
    pub fn step(
        &mut self,
        patients: &mut [Patient],
        risk: &dyn RiskRepository,
    ) -> Result<Option<(FiredEvent, FireOutcome)>, SimulationError> {
        let Some(fired) = self.queue.pop_next() else {
            return Ok(None);
        };
        let patient = &mut patients[fired.target.patient.0];
        let mut ctx = CascadeContext::new(&mut self.queue, &self.catalog, risk, &mut self.log);
        let outcome = patient.fire(&fired, &mut ctx)?;
        Ok(Some((fired, outcome)))
    }

    /// Fire events until the queue is exhausted
    pub fn run(
        &mut self,
        patients: &mut [Patient],
        risk: &dyn RiskRepository,
    ) -> Result<usize, SimulationError> {
        let mut fired = 0;
        while self.step(patients, risk)?.is_some() {
            fired += 1;
        }
        Ok(fired)
    }
}

/// Live events held by all patients' registries
pub fn registry_size(patients: &[Patient]) -> usize {
    patients.iter().map(Patient::live_event_count).sum()
}
