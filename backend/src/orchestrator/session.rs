//! Simulation Session
//!
//! One session is one intervention arm of one replication. It owns the
//! cohort, the event queue and the event log, and borrows the read-only model
//! (catalog and risk repository) through `Arc`s so that many sessions can
//! share it, including across threads.
//!
//! # Event Loop
//!
//! ```text
//! start every patient (tick 0)
//! while the queue yields an event at or before the horizon:
//!     1. advance time to the event's tick
//!     2. validate it against the owning patient's registry
//!     3. run the cascade for its kind
//!     4. on death, drop the patient from the alive count
//! ```
//!
//! # Example
//!
//! ```rust
//! use cohort_sim_core::population::{PopulationConfig, PopulationGenerator};
//! use cohort_sim_core::risk::presets;
//! use cohort_sim_core::{Intervention, SessionConfig, SimulationSession};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(presets::example_catalog().unwrap());
//! let risk = Arc::new(presets::example_repository(&catalog).unwrap());
//! let config = SessionConfig { n_patients: 20, horizon_years: 10, ..Default::default() };
//!
//! let mut usual = SimulationSession::new(
//!     config,
//!     catalog,
//!     risk,
//!     Intervention::new("usual", 0.0),
//! ).unwrap();
//! let mut source = PopulationGenerator::new(PopulationConfig::default()).unwrap();
//! usual.generate_cohort(&mut source).unwrap();
//!
//! let mut intensive = usual.paired(Intervention::new("intensive", 1.0)).unwrap();
//!
//! let a = usual.run().unwrap();
//! let b = intensive.run().unwrap();
//! assert_eq!(a.patients, b.patients);
//! assert_eq!(a.cohort_fingerprint, b.cohort_fingerprint);
//! ```

use crate::cascade::{CascadeContext, FireOutcome};
use crate::core::time::{SimClock, Tick};
use crate::models::catalog::{CatalogError, ModelCatalog, StageId};
use crate::models::event::{Event, EventLog, EventSink};
use crate::models::patient::{Patient, PatientId};
use crate::models::profile::{Intervention, InterventionError};
use crate::orchestrator::cohort;
use crate::orchestrator::config::{ConfigError, SessionConfig};
use crate::orchestrator::fingerprint::cohort_fingerprint;
use crate::population::ProfileSource;
use crate::rng::RngManager;
use crate::risk::RiskRepository;
use crate::scheduler::{EventId, EventKind, EventQueue, FiredEvent};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Simulation error types
///
/// Invariant violations (`StaleEvent`, `StageAlreadyReached`, `PatientDead`,
/// `PatientNotFound`) abort the replication; they are never recovered.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Invalid intervention: {0}")]
    Intervention(#[from] InterventionError),

    #[error("Patient not found: {0:?}")]
    PatientNotFound(PatientId),

    #[error("Patient {0:?} already started")]
    AlreadyStarted(PatientId),

    #[error("Event {event:?} ({kind:?}) fired but is not live for patient {patient:?}")]
    StaleEvent {
        patient: PatientId,
        event: EventId,
        kind: EventKind,
    },

    #[error("Patient {patient:?} reached stage {stage:?} twice")]
    StageAlreadyReached { patient: PatientId, stage: StageId },

    #[error("Event fired for dead patient {0:?}")]
    PatientDead(PatientId),

    #[error("Cohort already generated for this session")]
    CohortAlreadyGenerated,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub intervention: String,
    pub patients: usize,
    pub deaths: usize,
    pub events_fired: usize,
    /// Tick of the last fired event
    pub final_tick: Tick,
    pub cohort_fingerprint: String,
}

/// Sink that forwards every event to the listeners and then the log
struct Fanout<'a> {
    log: &'a mut EventLog,
    listeners: &'a mut [Box<dyn EventSink + Send>],
}

impl EventSink for Fanout<'_> {
    fn notify(&mut self, event: Event) {
        for listener in self.listeners.iter_mut() {
            listener.notify(event.clone());
        }
        self.log.log(event);
    }
}

/// Per-intervention run context
pub struct SimulationSession {
    run_id: Uuid,
    config: SessionConfig,
    intervention: Intervention,
    catalog: Arc<ModelCatalog>,
    risk: Arc<dyn RiskRepository + Send + Sync>,

    /// Session RNG: profile sampling only
    rng: RngManager,

    /// Every patient created, in creation order (kept for paired runs)
    patients: Vec<Patient>,

    queue: EventQueue,
    event_log: EventLog,
    listeners: Vec<Box<dyn EventSink + Send>>,

    alive: usize,
    events_fired: usize,
    started: bool,

    /// Cohort copied from another session; no fresh patients may join
    paired_from: Option<Uuid>,
}

impl SimulationSession {
    /// Create an empty session
    ///
    /// Validates the config, catalog and intervention before anything runs.
    pub fn new(
        config: SessionConfig,
        catalog: Arc<ModelCatalog>,
        risk: Arc<dyn RiskRepository + Send + Sync>,
        intervention: Intervention,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        catalog.validate()?;
        intervention.validate()?;
        if let Some(risk_resolution) = risk.ticks_per_year() {
            if risk_resolution != config.ticks_per_year {
                return Err(ConfigError::Invalid(format!(
                    "risk repository uses {} ticks per year, session uses {}",
                    risk_resolution, config.ticks_per_year
                ))
                .into());
            }
        }

        let clock = SimClock::new(config.ticks_per_year, config.horizon_years);
        Ok(Self {
            run_id: Uuid::new_v4(),
            rng: RngManager::new(config.rng_seed),
            queue: EventQueue::new(clock),
            config,
            intervention,
            catalog,
            risk,
            patients: Vec::new(),
            event_log: EventLog::new(),
            listeners: Vec::new(),
            alive: 0,
            events_fired: 0,
            started: false,
            paired_from: None,
        })
    }

    /// Draw `config.n_patients` fresh profiles from `source`
    pub fn generate_cohort(&mut self, source: &mut dyn ProfileSource) -> Result<(), SimulationError> {
        let n = self.config.n_patients;
        self.generate_patients(n, source)
    }

    /// Draw `n` fresh profiles from `source`
    pub fn generate_patients(
        &mut self,
        n: usize,
        source: &mut dyn ProfileSource,
    ) -> Result<(), SimulationError> {
        if self.started || self.paired_from.is_some() {
            return Err(SimulationError::CohortAlreadyGenerated);
        }
        let first_id = self.patients.len();
        let patients =
            cohort::generate_fresh(n, first_id, source, &mut self.rng, &self.intervention);
        self.patients.extend(patients);
        Ok(())
    }

    /// New session over the same profiles under `intervention`
    ///
    /// Shares the catalog and risk repository; patient outcomes are not copied.
    pub fn paired(&self, intervention: Intervention) -> Result<SimulationSession, SimulationError> {
        let mut session = SimulationSession::new(
            self.config.clone(),
            Arc::clone(&self.catalog),
            Arc::clone(&self.risk),
            intervention,
        )?;
        session.patients = cohort::generate_from_template(&self.patients, &session.intervention);
        session.paired_from = Some(self.run_id);
        Ok(session)
    }

    /// Register an additional statistics listener
    pub fn add_listener(&mut self, listener: Box<dyn EventSink + Send>) {
        self.listeners.push(listener);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn intervention(&self) -> &Intervention {
        &self.intervention
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn patient(&self, id: PatientId) -> Option<&Patient> {
        self.patients.get(id.0).filter(|p| p.id() == id)
    }

    pub fn now(&self) -> Tick {
        self.queue.now()
    }

    pub fn alive(&self) -> usize {
        self.alive
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Run id of the session this cohort was copied from
    pub fn paired_from(&self) -> Option<Uuid> {
        self.paired_from
    }

    // ========================================================================
    // Event Loop
    // ========================================================================

    /// Start every patient at the current tick
    pub fn start(&mut self) -> Result<(), SimulationError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        info!(
            run_id = %self.run_id,
            intervention = %self.intervention.name,
            patients = self.patients.len(),
            horizon = self.queue.clock().horizon(),
            "session starting"
        );

        let mut sink = Fanout {
            log: &mut self.event_log,
            listeners: &mut self.listeners,
        };
        let mut ctx = CascadeContext::new(
            &mut self.queue,
            &self.catalog,
            self.risk.as_ref(),
            &mut sink,
        );
        for patient in self.patients.iter_mut() {
            patient.start(&mut ctx)?;
        }
        self.alive = self.patients.len();
        Ok(())
    }

    /// Fire the next event; `None` when the run is over
    pub fn step(&mut self) -> Result<Option<FiredEvent>, SimulationError> {
        if !self.started {
            self.start()?;
        }
        let Some(fired) = self.queue.pop_next() else {
            return Ok(None);
        };

        let index = fired.target.patient.0;
        let Some(patient) = self
            .patients
            .get_mut(index)
            .filter(|p| p.id() == fired.target.patient)
        else {
            error!(patient = index, event = fired.id.0, "event for unknown patient");
            return Err(SimulationError::PatientNotFound(fired.target.patient));
        };

        let mut sink = Fanout {
            log: &mut self.event_log,
            listeners: &mut self.listeners,
        };
        let mut ctx = CascadeContext::new(
            &mut self.queue,
            &self.catalog,
            self.risk.as_ref(),
            &mut sink,
        );
        let outcome = patient.fire(&fired, &mut ctx)?;
        self.events_fired += 1;

        if outcome == FireOutcome::Died {
            self.alive = self.alive.saturating_sub(1);
            debug!(alive = self.alive, tick = fired.at, "patient released");
        }
        Ok(Some(fired))
    }

    /// Run until the horizon or until every patient has died
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        let mut final_tick = self.queue.now();
        while let Some(fired) = self.step()? {
            final_tick = fired.at;
        }

        let summary = RunSummary {
            run_id: self.run_id,
            intervention: self.intervention.name.clone(),
            patients: self.patients.len(),
            deaths: self.patients.len() - self.alive,
            events_fired: self.events_fired,
            final_tick,
            cohort_fingerprint: cohort_fingerprint(&self.patients)?,
        };
        info!(
            run_id = %self.run_id,
            deaths = summary.deaths,
            events = summary.events_fired,
            final_tick,
            "session finished"
        );
        Ok(summary)
    }
}
