//! Orchestrator - simulation sessions and paired cohorts
//!
//! See `session.rs` for the event loop.

pub mod cohort;
pub mod config;
pub mod fingerprint;
pub mod session;

pub use config::{CatalogConfig, CategoryConfig, ConfigError, SessionConfig};
pub use fingerprint::{canonical_hash, cohort_fingerprint};
pub use session::{RunSummary, SimulationError, SimulationSession};
