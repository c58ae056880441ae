//! Notifications emitted by the progression engine.
//!
//! Every state transition of a patient produces one `Event`. Statistics
//! listeners consume them through the `EventSink` trait; `EventLog` is the
//! in-memory sink used for replay checks and tests.
//!
//! # Event Types
//!
//! - **PatientStart**: patient entered the simulation
//! - **StageReached**: chronic complication stage reached (at baseline or by progression)
//! - **AcuteEpisode**: one acute episode occurred
//! - **TreatmentEffectLost**: the intervention's effect expired
//! - **Death**: terminal event
//!
//! # Example
//!
//! ```rust
//! use cohort_sim_core::models::event::{DeathCause, Event, EventLog, EventSink};
//! use cohort_sim_core::models::patient::PatientId;
//!
//! let mut log = EventLog::new();
//! log.notify(Event::Death {
//!     tick: 42,
//!     patient_id: PatientId(3),
//!     cause: DeathCause::Background,
//! });
//!
//! assert_eq!(log.events_of_type("Death").len(), 1);
//! assert_eq!(log.events()[0].tick(), 42);
//! ```

use crate::core::time::Tick;
use crate::models::catalog::{AcuteId, StageId};
use crate::models::patient::PatientId;

/// Why a patient died
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// General mortality, not attributed to a complication
    Background,
    /// A lethal chronic complication onset
    Stage(StageId),
    /// A lethal acute episode
    Acute(AcuteId),
}

/// Simulation event capturing a patient state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PatientStart {
        tick: Tick,
        patient_id: PatientId,
    },

    /// Stage reached; `initial` marks complications present at baseline
    StageReached {
        tick: Tick,
        patient_id: PatientId,
        stage: StageId,
        initial: bool,
    },

    AcuteEpisode {
        tick: Tick,
        patient_id: PatientId,
        kind: AcuteId,
        lethal: bool,
    },

    TreatmentEffectLost {
        tick: Tick,
        patient_id: PatientId,
    },

    Death {
        tick: Tick,
        patient_id: PatientId,
        cause: DeathCause,
    },
}

impl Event {
    /// Get the tick when this event occurred
    pub fn tick(&self) -> Tick {
        match self {
            Event::PatientStart { tick, .. } => *tick,
            Event::StageReached { tick, .. } => *tick,
            Event::AcuteEpisode { tick, .. } => *tick,
            Event::TreatmentEffectLost { tick, .. } => *tick,
            Event::Death { tick, .. } => *tick,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::PatientStart { .. } => "PatientStart",
            Event::StageReached { .. } => "StageReached",
            Event::AcuteEpisode { .. } => "AcuteEpisode",
            Event::TreatmentEffectLost { .. } => "TreatmentEffectLost",
            Event::Death { .. } => "Death",
        }
    }

    pub fn patient_id(&self) -> PatientId {
        match self {
            Event::PatientStart { patient_id, .. } => *patient_id,
            Event::StageReached { patient_id, .. } => *patient_id,
            Event::AcuteEpisode { patient_id, .. } => *patient_id,
            Event::TreatmentEffectLost { patient_id, .. } => *patient_id,
            Event::Death { patient_id, .. } => *patient_id,
        }
    }
}

/// Consumer of progression notifications
pub trait EventSink {
    fn notify(&mut self, event: Event);
}

/// Event log for storing and querying simulation events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific tick
    pub fn events_at_tick(&self, tick: Tick) -> Vec<&Event> {
        self.events.iter().filter(|e| e.tick() == tick).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific patient
    pub fn events_for_patient(&self, patient_id: PatientId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.patient_id() == patient_id)
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for EventLog {
    fn notify(&mut self, event: Event) {
        self.log(event);
    }
}
