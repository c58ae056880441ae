//! Cohort Progression Simulator Core
//!
//! Per-patient discrete-event disease progression with deterministic,
//! paired replay of a cohort under competing interventions.
//!
//! # Architecture
//!
//! - **core**: Discrete simulation time
//! - **models**: Catalog, profiles, patients, descriptors and notifications
//! - **scheduler**: Time-ordered event queue with cancellation
//! - **risk**: Risk repository interface and a parametric reference model
//! - **cascade**: Event cascade engine (what each firing does to a patient)
//! - **population**: Baseline profile sources
//! - **orchestrator**: Sessions, cohort generation and paired runs
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. At most one live event per (patient, complication stage)
//! 2. Every live event of a patient fires strictly before its death
//! 3. The scheduled death tick never moves later
//! 4. All randomness is deterministic (seeded RNG, one stream per purpose)

pub mod cascade;
pub mod core;
pub mod models;
pub mod orchestrator;
pub mod population;
pub mod risk;
pub mod rng;
pub mod scheduler;

pub use crate::core::time::{SimClock, Tick};
pub use cascade::{CascadeContext, FireOutcome};
pub use models::{
    catalog::{AcuteId, CatalogError, CategoryId, ModelCatalog, StageId},
    event::{DeathCause, Event, EventLog, EventSink},
    patient::{Patient, PatientId, PatientState, PatientView},
    profile::{Intervention, InterventionError, PatientProfile, Sex},
    progression::{AcuteDescriptor, ProgressionBatch, ProgressionDescriptor},
};
pub use orchestrator::{
    CatalogConfig, CategoryConfig, ConfigError, RunSummary, SessionConfig, SimulationError,
    SimulationSession,
};
pub use population::{PopulationConfig, PopulationGenerator, ProfileSource};
pub use risk::{ParametricRiskRepository, RiskParams, RiskRepository};
pub use rng::{RandomStreams, RngManager, StreamKey};
pub use scheduler::{EventId, EventKind, EventQueue, EventTarget, FiredEvent};
