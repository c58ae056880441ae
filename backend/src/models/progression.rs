//! Progression descriptors and batches
//!
//! These are the values the risk repository hands back to the cascade
//! engine. They carry no identity and are never mutated after they are
//! returned.

use crate::core::time::Tick;
use crate::models::catalog::{AcuteId, StageId};
use std::collections::BTreeSet;

/// A proposed state change: reach `target` after `delay` ticks
///
/// `delay` is relative to the tick at which the repository was queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionDescriptor<T = StageId> {
    pub target: T,
    pub delay: Tick,
    pub causes_death: bool,
}

/// Descriptor for one acute episode
pub type AcuteDescriptor = ProgressionDescriptor<AcuteId>;

impl<T> ProgressionDescriptor<T> {
    pub fn new(target: T, delay: Tick) -> Self {
        Self {
            target,
            delay,
            causes_death: false,
        }
    }

    /// Same descriptor, marked as lethal
    pub fn lethal(mut self) -> Self {
        self.causes_death = true;
        self
    }

    /// Absolute firing tick when queried at `now`
    pub fn fire_at(&self, now: Tick) -> Tick {
        now.saturating_add(self.delay)
    }
}

/// Result of one risk recomputation for one chronic category
///
/// # Example
/// ```
/// use cohort_sim_core::models::catalog::StageId;
/// use cohort_sim_core::models::progression::{ProgressionBatch, ProgressionDescriptor};
///
/// let batch = ProgressionBatch::new()
///     .schedule(ProgressionDescriptor::new(StageId(1), 30))
///     .cancel(StageId(0));
///
/// assert_eq!(batch.to_schedule().len(), 1);
/// assert!(batch.to_cancel().contains(&StageId(0)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressionBatch {
    schedule: Vec<ProgressionDescriptor>,
    cancel: BTreeSet<StageId>,
}

impl ProgressionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor to schedule
    pub fn schedule(mut self, descriptor: ProgressionDescriptor) -> Self {
        self.schedule.push(descriptor);
        self
    }

    /// Add a stage whose pending event must be cancelled
    pub fn cancel(mut self, stage: StageId) -> Self {
        self.cancel.insert(stage);
        self
    }

    pub fn to_schedule(&self) -> &[ProgressionDescriptor] {
        &self.schedule
    }

    pub fn to_cancel(&self) -> &BTreeSet<StageId> {
        &self.cancel
    }

    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty() && self.cancel.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_at_saturates() {
        let never = ProgressionDescriptor::new(StageId(0), Tick::MAX);
        assert_eq!(never.fire_at(10), Tick::MAX);
    }

    #[test]
    fn test_lethal_flag() {
        let d = ProgressionDescriptor::new(AcuteId(0), 5).lethal();
        assert!(d.causes_death);
        assert_eq!(d.fire_at(100), 105);
    }
}
