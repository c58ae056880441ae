//! Clinical risk repository interface
//!
//! The cascade engine never samples anything itself: every time-to-event
//! comes from a `RiskRepository`. Implementations are read-only for the
//! duration of a run and may be shared across sessions and threads; all
//! randomness comes from the patient's own `RandomStreams`.
//!
//! All returned times are *relative* to `PatientView::now`.

pub mod parametric;
pub mod presets;

use crate::core::time::Tick;
use crate::models::catalog::{AcuteId, CategoryId, StageId};
use crate::models::patient::PatientView;
use crate::models::progression::{AcuteDescriptor, ProgressionBatch};
use crate::rng::RandomStreams;

pub use parametric::{
    AcuteParams, MortalityParams, ParametricRiskRepository, PrevalenceParams, RiskParams,
    StageMortalityParams, TransitionParams,
};

/// Source of time-to-event draws for the progression engine
pub trait RiskRepository {
    /// Ticks until death from any cause, given the current state
    fn time_to_death(&self, patient: &PatientView<'_>, streams: &mut RandomStreams) -> Tick;

    /// Stages present when the patient enters the simulation
    fn initial_stages(&self, patient: &PatientView<'_>, streams: &mut RandomStreams)
        -> Vec<StageId>;

    /// Whether having `stage` raises mortality (triggers a death recomputation at baseline)
    fn increases_mortality(&self, stage: StageId) -> bool;

    /// Fresh progression batch for one chronic category
    fn progression(
        &self,
        patient: &PatientView<'_>,
        category: CategoryId,
        streams: &mut RandomStreams,
    ) -> ProgressionBatch;

    /// Next episode of one acute kind, or `None` if it cannot happen
    fn acute_draw(
        &self,
        patient: &PatientView<'_>,
        kind: AcuteId,
        after_effect_loss: bool,
        streams: &mut RandomStreams,
    ) -> Option<AcuteDescriptor>;

    /// Time resolution the returned delays are expressed in, if fixed
    ///
    /// A session refuses a repository whose resolution differs from its own.
    fn ticks_per_year(&self) -> Option<usize> {
        None
    }
}
