//! Firing handlers: what happens when each kind of pending event fires

use super::CascadeContext;
use crate::models::catalog::{AcuteId, StageId};
use crate::models::event::{DeathCause, Event};
use crate::models::patient::{Patient, PendingEvent};
use crate::orchestrator::SimulationError;
use crate::scheduler::{EventId, EventKind, EventTarget, FiredEvent};
use tracing::{debug, error, warn};

/// What a fired event did to its patient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Patient still alive
    Continued,
    /// Death fired; the patient holds no more events
    Died,
}

impl Patient {
    /// Enter the simulation: draw death, baseline complications, first batches,
    /// first acute episodes and the effect expiry
    pub fn start(&mut self, ctx: &mut CascadeContext<'_>) -> Result<(), SimulationError> {
        if self.started {
            return Err(SimulationError::AlreadyStarted(self.id()));
        }
        self.started = true;
        let now = ctx.now();
        ctx.sink.notify(Event::PatientStart {
            tick: now,
            patient_id: self.id(),
        });

        self.recompute_death(ctx);

        let initial = {
            let (view, streams) = self.split_for_risk(now);
            ctx.risk.initial_stages(&view, streams)
        };
        for stage in initial {
            let category = ctx.catalog.category_of(stage)?;
            if !self.state.mark_reached(stage, category, now, true) {
                continue;
            }
            ctx.sink.notify(Event::StageReached {
                tick: now,
                patient_id: self.id(),
                stage,
                initial: true,
            });
            if ctx.risk.increases_mortality(stage) {
                self.recompute_death(ctx);
            }
        }

        let categories: Vec<_> = ctx.catalog.category_ids().collect();
        for category in categories {
            let batch = {
                let (view, streams) = self.split_for_risk(now);
                ctx.risk.progression(&view, category, streams)
            };
            if !batch.to_cancel().is_empty() {
                warn!(
                    patient = self.id().0,
                    category = category.0,
                    cancellations = batch.to_cancel().len(),
                    "initial progression batch requested cancellations; ignored"
                );
            }
            self.apply_batch(&batch, false, ctx);
        }

        let kinds: Vec<_> = ctx.catalog.acute_ids().collect();
        for kind in kinds {
            self.draw_acute(kind, false, ctx);
        }

        if let Some(years) = self.intervention().effect_duration_years {
            let at = now.saturating_add(ctx.queue.clock().years_to_ticks(years));
            if at < self.death_at() {
                let target = EventTarget::new(self.id(), EventKind::EffectExpiry);
                let id = ctx.queue.schedule(target, at);
                self.expiry = Some(PendingEvent {
                    id,
                    at,
                    causes_death: false,
                });
            }
        }

        debug!(
            patient = self.id().0,
            death_at = self.death_at(),
            live = self.live_event_count(),
            "patient started"
        );
        Ok(())
    }

    /// Validate a fired event against the registry and dispatch it
    pub fn fire(
        &mut self,
        fired: &FiredEvent,
        ctx: &mut CascadeContext<'_>,
    ) -> Result<FireOutcome, SimulationError> {
        match fired.target.kind {
            EventKind::Chronic(stage) => self.on_chronic_fire(fired.id, stage, ctx),
            EventKind::Acute(kind) => self.on_acute_fire(fired.id, kind, ctx),
            EventKind::EffectExpiry => self.on_effect_expiry(fired.id, ctx),
            EventKind::Death => self.on_death(fired.id, ctx),
        }
    }

    fn check_live(&self, kind: EventKind, id: EventId) -> Result<(), SimulationError> {
        if self.is_dead() {
            error!(patient = self.id().0, event = id.0, "event fired for dead patient");
            return Err(SimulationError::PatientDead(self.id()));
        }
        if !self.holds(kind, id) {
            error!(patient = self.id().0, event = id.0, ?kind, "stale event fired");
            return Err(SimulationError::StaleEvent {
                patient: self.id(),
                event: id,
                kind,
            });
        }
        Ok(())
    }

    /// A chronic complication stage is reached
    pub fn on_chronic_fire(
        &mut self,
        id: EventId,
        stage: StageId,
        ctx: &mut CascadeContext<'_>,
    ) -> Result<FireOutcome, SimulationError> {
        self.check_live(EventKind::Chronic(stage), id)?;
        if self.state.has_reached(stage) {
            error!(patient = self.id().0, stage = stage.0, "stage reached twice");
            return Err(SimulationError::StageAlreadyReached {
                patient: self.id(),
                stage,
            });
        }

        let now = ctx.now();
        let category = ctx.catalog.category_of(stage)?;
        let pending = self.chronic.remove(&stage);
        self.state.mark_reached(stage, category, now, false);
        ctx.sink.notify(Event::StageReached {
            tick: now,
            patient_id: self.id(),
            stage,
            initial: false,
        });

        if pending.is_some_and(|p| p.causes_death) {
            self.force_death_now(DeathCause::Stage(stage), ctx);
            return Ok(FireOutcome::Continued);
        }

        self.recompute_death(ctx);
        self.recompute_progression(ctx);
        Ok(FireOutcome::Continued)
    }

    /// An acute episode occurs
    pub fn on_acute_fire(
        &mut self,
        id: EventId,
        kind: AcuteId,
        ctx: &mut CascadeContext<'_>,
    ) -> Result<FireOutcome, SimulationError> {
        self.check_live(EventKind::Acute(kind), id)?;

        let now = ctx.now();
        let mut lethal = false;
        if let Some(events) = self.acute.get_mut(&kind) {
            if let Some(pos) = events.iter().position(|p| p.id == id) {
                lethal = events.remove(pos).causes_death;
            }
            if events.is_empty() {
                self.acute.remove(&kind);
            }
        }
        self.state.record_acute(kind);
        ctx.sink.notify(Event::AcuteEpisode {
            tick: now,
            patient_id: self.id(),
            kind,
            lethal,
        });

        if lethal {
            self.force_death_now(DeathCause::Acute(kind), ctx);
            return Ok(FireOutcome::Continued);
        }

        let after_effect_loss = !self.state.is_treatment_effect_active();
        self.draw_acute(kind, after_effect_loss, ctx);
        Ok(FireOutcome::Continued)
    }

    /// The intervention's effect wears off
    pub fn on_effect_expiry(
        &mut self,
        id: EventId,
        ctx: &mut CascadeContext<'_>,
    ) -> Result<FireOutcome, SimulationError> {
        self.check_live(EventKind::EffectExpiry, id)?;

        let now = ctx.now();
        self.expiry = None;
        let baseline = self.profile().hba1c;
        self.state.lose_treatment_effect(baseline);
        ctx.sink.notify(Event::TreatmentEffectLost {
            tick: now,
            patient_id: self.id(),
        });

        self.recompute_death(ctx);
        self.recompute_progression(ctx);

        let live_kinds: Vec<AcuteId> = self.acute.keys().copied().collect();
        for kind in live_kinds {
            self.cancel_acute(kind, ctx.queue);
            self.draw_acute(kind, true, ctx);
        }
        Ok(FireOutcome::Continued)
    }

    /// Terminal: cancel everything still pending and record the death
    pub fn on_death(
        &mut self,
        id: EventId,
        ctx: &mut CascadeContext<'_>,
    ) -> Result<FireOutcome, SimulationError> {
        self.check_live(EventKind::Death, id)?;

        let now = ctx.now();
        let cause = self.death.take().map_or(DeathCause::Background, |d| d.cause);
        self.cancel_all(ctx.queue);
        self.state.mark_dead(now, cause);
        ctx.sink.notify(Event::Death {
            tick: now,
            patient_id: self.id(),
            cause,
        });
        debug!(patient = self.id().0, tick = now, ?cause, "patient died");
        Ok(FireOutcome::Died)
    }
}
