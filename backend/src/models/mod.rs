//! Domain models for the progression engine

pub mod catalog;
pub mod event;
pub mod patient;
pub mod profile;
pub mod progression;

pub use catalog::{AcuteId, CatalogError, CategoryId, ModelCatalog, StageId};
pub use event::{DeathCause, Event, EventLog, EventSink};
pub use patient::{Patient, PatientId};
pub use profile::{Intervention, PatientProfile};
