//! Patient entity
//!
//! A patient owns its clinical state and the registry of its pending events.
//! The cascade engine (`crate::cascade`) is the only code that mutates the
//! registry; this module provides the state and the read side.
//!
//! # Critical Invariants
//!
//! 1. **One event per stage**: `chronic` maps each stage to at most one live event
//! 2. **Reached is final**: a reached stage is never scheduled again
//! 3. **Death dominates**: once started, exactly one death event is live and
//!    every other live event fires strictly before it
//! 4. **Registry = kernel**: an event is in the registry iff it is live in the queue

use crate::core::time::Tick;
use crate::models::catalog::{AcuteId, CategoryId, StageId};
use crate::models::event::DeathCause;
use crate::models::profile::{Intervention, PatientProfile};
use crate::rng::RandomStreams;
use crate::scheduler::{EventId, EventKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Index of a patient inside its session
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PatientId(pub usize);

/// Registry entry for a live chronic, acute or expiry event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEvent {
    pub id: EventId,
    pub at: Tick,
    pub causes_death: bool,
}

/// Registry entry for the authoritative death event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledDeath {
    pub id: EventId,
    pub at: Tick,
    pub cause: DeathCause,
}

/// Mutable clinical state of one patient
#[derive(Debug, Clone, PartialEq)]
pub struct PatientState {
    categories_reached: BTreeSet<CategoryId>,
    /// Stage -> onset tick
    stages_reached: BTreeMap<StageId, Tick>,
    /// Reached stages in onset order
    onset_order: Vec<StageId>,
    initial_stages: BTreeSet<StageId>,
    acute_episodes: BTreeMap<AcuteId, u32>,
    hba1c: f64,
    effect_active: bool,
    death: Option<(Tick, DeathCause)>,
}

impl PatientState {
    fn new(hba1c: f64) -> Self {
        Self {
            categories_reached: BTreeSet::new(),
            stages_reached: BTreeMap::new(),
            onset_order: Vec::new(),
            initial_stages: BTreeSet::new(),
            acute_episodes: BTreeMap::new(),
            hba1c,
            effect_active: true,
            death: None,
        }
    }

    pub fn has_reached(&self, stage: StageId) -> bool {
        self.stages_reached.contains_key(&stage)
    }

    pub fn has_category(&self, category: CategoryId) -> bool {
        self.categories_reached.contains(&category)
    }

    pub fn categories_reached(&self) -> &BTreeSet<CategoryId> {
        &self.categories_reached
    }

    /// Reached stages in the order they were reached
    pub fn reached_stages(&self) -> &[StageId] {
        &self.onset_order
    }

    pub fn onset_tick(&self, stage: StageId) -> Option<Tick> {
        self.stages_reached.get(&stage).copied()
    }

    /// Whether `stage` was present at creation rather than reached by progression
    pub fn is_initial(&self, stage: StageId) -> bool {
        self.initial_stages.contains(&stage)
    }

    pub fn acute_count(&self, kind: AcuteId) -> u32 {
        self.acute_episodes.get(&kind).copied().unwrap_or(0)
    }

    /// Current HbA1c (%), which depends on the treatment effect
    pub fn hba1c(&self) -> f64 {
        self.hba1c
    }

    pub fn is_treatment_effect_active(&self) -> bool {
        self.effect_active
    }

    pub fn is_dead(&self) -> bool {
        self.death.is_some()
    }

    pub fn death_tick(&self) -> Option<Tick> {
        self.death.map(|(tick, _)| tick)
    }

    pub fn death_cause(&self) -> Option<DeathCause> {
        self.death.map(|(_, cause)| cause)
    }

    // ========================================================================
    // Mutation (cascade engine only)
    // ========================================================================

    /// Mark `stage` reached; returns `false` if it already was
    pub(crate) fn mark_reached(
        &mut self,
        stage: StageId,
        category: CategoryId,
        tick: Tick,
        initial: bool,
    ) -> bool {
        if self.stages_reached.contains_key(&stage) {
            return false;
        }
        self.stages_reached.insert(stage, tick);
        self.onset_order.push(stage);
        self.categories_reached.insert(category);
        if initial {
            self.initial_stages.insert(stage);
        }
        true
    }

    pub(crate) fn record_acute(&mut self, kind: AcuteId) {
        *self.acute_episodes.entry(kind).or_insert(0) += 1;
    }

    pub(crate) fn lose_treatment_effect(&mut self, baseline_hba1c: f64) {
        self.effect_active = false;
        self.hba1c = baseline_hba1c;
    }

    pub(crate) fn mark_dead(&mut self, tick: Tick, cause: DeathCause) {
        self.death = Some((tick, cause));
    }
}

/// Read-only view of a patient handed to the risk repository
#[derive(Debug, Clone, Copy)]
pub struct PatientView<'a> {
    pub id: PatientId,
    pub profile: &'a PatientProfile,
    pub state: &'a PatientState,
    pub intervention: &'a Intervention,
    pending_stages: &'a BTreeMap<StageId, PendingEvent>,
    /// Tick at which the repository is queried
    pub now: Tick,
}

impl<'a> PatientView<'a> {
    /// Whether `stage` currently has a live pending event
    pub fn is_pending(&self, stage: StageId) -> bool {
        self.pending_stages.contains_key(&stage)
    }

    /// Age in years at the query tick
    pub fn age(&self, ticks_per_year: usize) -> f64 {
        self.profile.age + self.now as f64 / ticks_per_year as f64
    }
}

/// One simulated patient under one intervention
#[derive(Debug, Clone)]
pub struct Patient {
    id: PatientId,
    profile: PatientProfile,
    intervention: Intervention,
    pub(crate) state: PatientState,
    pub(crate) streams: RandomStreams,
    pub(crate) started: bool,
    pub(crate) chronic: BTreeMap<StageId, PendingEvent>,
    pub(crate) acute: BTreeMap<AcuteId, Vec<PendingEvent>>,
    pub(crate) death: Option<ScheduledDeath>,
    pub(crate) expiry: Option<PendingEvent>,
}

impl Patient {
    /// Create a patient that has not started yet
    ///
    /// # Example
    /// ```
    /// use cohort_sim_core::models::patient::{Patient, PatientId};
    /// use cohort_sim_core::models::profile::{Intervention, PatientProfile, Sex};
    ///
    /// let profile = PatientProfile {
    ///     age: 40.0,
    ///     sex: Sex::Female,
    ///     hba1c: 8.5,
    ///     duration_of_diabetes: 12.0,
    ///     stream_seed: 99,
    /// };
    /// let patient = Patient::new(PatientId(0), profile, Intervention::new("intensive", 1.0));
    ///
    /// assert_eq!(patient.state().hba1c(), 7.5);
    /// assert_eq!(patient.live_event_count(), 0);
    /// ```
    pub fn new(id: PatientId, profile: PatientProfile, intervention: Intervention) -> Self {
        let state = PatientState::new(intervention.treated_hba1c(profile.hba1c));
        let streams = RandomStreams::new(profile.stream_seed);
        Self {
            id,
            profile,
            intervention,
            state,
            streams,
            started: false,
            chronic: BTreeMap::new(),
            acute: BTreeMap::new(),
            death: None,
            expiry: None,
        }
    }

    /// Copy `template`'s profile (not its outcomes) under a new intervention
    pub fn from_template(id: PatientId, template: &Patient, intervention: Intervention) -> Self {
        Self::new(id, template.profile.clone(), intervention)
    }

    pub fn id(&self) -> PatientId {
        self.id
    }

    pub fn profile(&self) -> &PatientProfile {
        &self.profile
    }

    pub fn intervention(&self) -> &Intervention {
        &self.intervention
    }

    pub fn state(&self) -> &PatientState {
        &self.state
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_dead(&self) -> bool {
        self.state.is_dead()
    }

    // ========================================================================
    // Registry (read side)
    // ========================================================================

    pub fn pending_stage(&self, stage: StageId) -> Option<&PendingEvent> {
        self.chronic.get(&stage)
    }

    /// Live chronic events in stage rank order
    pub fn pending_stages(&self) -> impl Iterator<Item = (StageId, &PendingEvent)> + '_ {
        self.chronic.iter().map(|(stage, pending)| (*stage, pending))
    }

    pub fn pending_acute(&self, kind: AcuteId) -> &[PendingEvent] {
        self.acute.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn death_event(&self) -> Option<&ScheduledDeath> {
        self.death.as_ref()
    }

    pub fn expiry_event(&self) -> Option<&PendingEvent> {
        self.expiry.as_ref()
    }

    /// Number of live events of every kind, death included
    pub fn live_event_count(&self) -> usize {
        self.chronic.len()
            + self.acute.values().map(Vec::len).sum::<usize>()
            + usize::from(self.death.is_some())
            + usize::from(self.expiry.is_some())
    }

    /// Whether `id` is the live registry entry for `kind`
    pub fn holds(&self, kind: EventKind, id: EventId) -> bool {
        match kind {
            EventKind::Chronic(stage) => self.chronic.get(&stage).map(|p| p.id) == Some(id),
            EventKind::Acute(acute) => self.pending_acute(acute).iter().any(|p| p.id == id),
            EventKind::EffectExpiry => self.expiry.map(|p| p.id) == Some(id),
            EventKind::Death => self.death.map(|d| d.id) == Some(id),
        }
    }

    /// Borrow the risk view and the random streams at the same time
    pub(crate) fn split_for_risk(&mut self, now: Tick) -> (PatientView<'_>, &mut RandomStreams) {
        let view = PatientView {
            id: self.id,
            profile: &self.profile,
            state: &self.state,
            intervention: &self.intervention,
            pending_stages: &self.chronic,
            now,
        };
        (view, &mut self.streams)
    }

    /// Read-only risk view without access to the random streams
    pub fn view(&self, now: Tick) -> PatientView<'_> {
        PatientView {
            id: self.id,
            profile: &self.profile,
            state: &self.state,
            intervention: &self.intervention,
            pending_stages: &self.chronic,
            now,
        }
    }
}
