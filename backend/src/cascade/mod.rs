//! Event cascade engine
//!
//! Everything that changes a patient's pending events goes through the
//! primitives in this module:
//!
//! - `replace_death_if_earlier` / `force_death_now`: the only places the
//!   death event is replaced. Both prune events that no longer precede death.
//! - `apply_batch`: cancellations first, then insertions, so a stage never
//!   transiently holds two live events.
//! - `schedule_stage`, `cancel_stage`, `draw_acute`, `cancel_acute`,
//!   `cancel_all`.
//!
//! The per-kind firing handlers live in `handlers`.
//!
//! # Critical Invariants
//!
//! 1. Cancellation is idempotent: cancelling a missing event is a no-op
//! 2. Registry and kernel change together (never one without the other)
//! 3. The scheduled death tick never increases as a side effect of progression

mod handlers;

pub use handlers::FireOutcome;

use crate::core::time::Tick;
use crate::models::catalog::{AcuteId, ModelCatalog, StageId};
use crate::models::event::{DeathCause, EventSink};
use crate::models::patient::{Patient, PendingEvent, ScheduledDeath};
use crate::models::progression::{ProgressionBatch, ProgressionDescriptor};
use crate::risk::RiskRepository;
use crate::scheduler::{EventKind, EventQueue, EventTarget};
use tracing::{debug, trace};

/// Collaborators a cascade step needs, borrowed from the session
pub struct CascadeContext<'a> {
    pub queue: &'a mut EventQueue,
    pub catalog: &'a ModelCatalog,
    pub risk: &'a dyn RiskRepository,
    pub sink: &'a mut dyn EventSink,
}

impl<'a> CascadeContext<'a> {
    pub fn new(
        queue: &'a mut EventQueue,
        catalog: &'a ModelCatalog,
        risk: &'a dyn RiskRepository,
        sink: &'a mut dyn EventSink,
    ) -> Self {
        Self {
            queue,
            catalog,
            risk,
            sink,
        }
    }

    pub fn now(&self) -> Tick {
        self.queue.now()
    }
}

impl Patient {
    /// Current death tick (`Tick::MAX` before start)
    pub(crate) fn death_at(&self) -> Tick {
        self.death.map_or(Tick::MAX, |d| d.at)
    }

    fn target(&self, kind: EventKind) -> EventTarget {
        EventTarget::new(self.id(), kind)
    }

    // ========================================================================
    // Death reconciliation
    // ========================================================================

    /// Ask the repository for a fresh time to death and keep it if earlier
    pub(crate) fn recompute_death(&mut self, ctx: &mut CascadeContext<'_>) -> bool {
        let now = ctx.now();
        let (view, streams) = self.split_for_risk(now);
        let delay = ctx.risk.time_to_death(&view, streams);
        let candidate = now.saturating_add(delay);
        self.replace_death_if_earlier(candidate, DeathCause::Background, ctx)
    }

    /// Replace the death event if `candidate` is earlier than the current one
    ///
    /// Returns `true` if the death event was replaced. A later candidate is
    /// ignored: the death tick only ever moves earlier.
    pub(crate) fn replace_death_if_earlier(
        &mut self,
        candidate: Tick,
        cause: DeathCause,
        ctx: &mut CascadeContext<'_>,
    ) -> bool {
        if let Some(current) = self.death {
            if candidate >= current.at {
                return false;
            }
            ctx.queue.cancel(current.id);
            debug!(
                patient = self.id().0,
                from = current.at,
                to = candidate,
                "death moved earlier"
            );
        }
        let id = ctx.queue.schedule(self.target(EventKind::Death), candidate);
        self.death = Some(ScheduledDeath {
            id,
            at: candidate,
            cause,
        });
        self.prune_after_death(ctx.queue);
        true
    }

    /// Replace the death event with one firing now (lethal onset or episode)
    pub(crate) fn force_death_now(&mut self, cause: DeathCause, ctx: &mut CascadeContext<'_>) {
        let now = ctx.now();
        if let Some(current) = self.death.take() {
            ctx.queue.cancel(current.id);
        }
        let id = ctx.queue.schedule(self.target(EventKind::Death), now);
        self.death = Some(ScheduledDeath { id, at: now, cause });
        self.prune_after_death(ctx.queue);
    }

    /// Cancel every non-death event that no longer fires before death
    fn prune_after_death(&mut self, queue: &mut EventQueue) {
        let death_at = self.death_at();

        self.chronic.retain(|_, pending| {
            let keep = pending.at < death_at;
            if !keep {
                queue.cancel(pending.id);
            }
            keep
        });
        for events in self.acute.values_mut() {
            events.retain(|pending| {
                let keep = pending.at < death_at;
                if !keep {
                    queue.cancel(pending.id);
                }
                keep
            });
        }
        self.acute.retain(|_, events| !events.is_empty());
        if let Some(expiry) = self.expiry {
            if expiry.at >= death_at {
                queue.cancel(expiry.id);
                self.expiry = None;
            }
        }
    }

    // ========================================================================
    // Chronic stages
    // ========================================================================

    /// Apply one progression batch: cancellations first, then insertions
    ///
    /// With `allow_cancel == false` the cancel set is ignored (used at start,
    /// where nothing can legitimately be pending yet).
    pub(crate) fn apply_batch(
        &mut self,
        batch: &ProgressionBatch,
        allow_cancel: bool,
        ctx: &mut CascadeContext<'_>,
    ) -> usize {
        if allow_cancel {
            for stage in batch.to_cancel() {
                self.cancel_stage(*stage, ctx.queue);
            }
        }
        let mut scheduled = 0;
        for descriptor in batch.to_schedule() {
            if self.schedule_stage(descriptor, ctx) {
                scheduled += 1;
            }
        }
        scheduled
    }

    /// Schedule one stage descriptor
    ///
    /// No-op (returns `false`) if the stage is already reached or the event
    /// would not fire before death. A live event for the same stage is
    /// replaced.
    pub(crate) fn schedule_stage(
        &mut self,
        descriptor: &ProgressionDescriptor,
        ctx: &mut CascadeContext<'_>,
    ) -> bool {
        let stage = descriptor.target;
        if self.state.has_reached(stage) {
            trace!(patient = self.id().0, stage = stage.0, "stage already reached");
            return false;
        }
        let at = descriptor.fire_at(ctx.now());
        if at >= self.death_at() {
            return false;
        }
        self.cancel_stage(stage, ctx.queue);

        let id = ctx.queue.schedule(self.target(EventKind::Chronic(stage)), at);
        self.chronic.insert(
            stage,
            PendingEvent {
                id,
                at,
                causes_death: descriptor.causes_death,
            },
        );
        true
    }

    /// Cancel the pending event of `stage`; `false` if there was none
    pub(crate) fn cancel_stage(&mut self, stage: StageId, queue: &mut EventQueue) -> bool {
        match self.chronic.remove(&stage) {
            Some(pending) => queue.cancel(pending.id),
            None => false,
        }
    }

    /// Request and apply a fresh batch for every chronic category
    pub(crate) fn recompute_progression(&mut self, ctx: &mut CascadeContext<'_>) {
        let now = ctx.now();
        let categories: Vec<_> = ctx.catalog.category_ids().collect();
        for category in categories {
            let (view, streams) = self.split_for_risk(now);
            let batch = ctx.risk.progression(&view, category, streams);
            self.apply_batch(&batch, true, ctx);
        }
    }

    // ========================================================================
    // Acute episodes
    // ========================================================================

    /// Draw the next episode of `kind` and schedule it if it precedes death
    pub(crate) fn draw_acute(
        &mut self,
        kind: AcuteId,
        after_effect_loss: bool,
        ctx: &mut CascadeContext<'_>,
    ) -> bool {
        let now = ctx.now();
        let (view, streams) = self.split_for_risk(now);
        let Some(descriptor) = ctx.risk.acute_draw(&view, kind, after_effect_loss, streams) else {
            return false;
        };
        let at = descriptor.fire_at(now);
        if at >= self.death_at() {
            return false;
        }
        let id = ctx.queue.schedule(self.target(EventKind::Acute(kind)), at);
        self.acute.entry(kind).or_default().push(PendingEvent {
            id,
            at,
            causes_death: descriptor.causes_death,
        });
        true
    }

    /// Cancel every pending episode of `kind`; returns how many were live
    pub(crate) fn cancel_acute(&mut self, kind: AcuteId, queue: &mut EventQueue) -> usize {
        self.acute
            .remove(&kind)
            .map(|events| events.iter().filter(|p| queue.cancel(p.id)).count())
            .unwrap_or(0)
    }

    /// Cancel every live chronic, acute and expiry event (death excluded)
    pub(crate) fn cancel_all(&mut self, queue: &mut EventQueue) {
        for pending in std::mem::take(&mut self.chronic).into_values() {
            queue.cancel(pending.id);
        }
        for events in std::mem::take(&mut self.acute).into_values() {
            for pending in events {
                queue.cancel(pending.id);
            }
        }
        if let Some(expiry) = self.expiry.take() {
            queue.cancel(expiry.id);
        }
    }
}
