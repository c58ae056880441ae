//! Event kernel: the time-ordered queue of pending patient events
//!
//! The queue owns simulation time. Events are popped in
//! `(tick ASC, death first, scheduling order ASC)` order; a death scheduled
//! for the same tick as another event of any patient therefore always fires
//! first.
//!
//! Cancellation is O(1): the entry is dropped from the live table and the
//! stale heap slot is skipped when it surfaces. A cancelled event can never
//! be popped.
//!
//! # Example
//!
//! ```rust
//! use cohort_sim_core::models::patient::PatientId;
//! use cohort_sim_core::scheduler::{EventKind, EventQueue, EventTarget};
//! use cohort_sim_core::SimClock;
//!
//! let mut queue = EventQueue::new(SimClock::new(365, 1));
//! let a = queue.schedule(EventTarget::new(PatientId(0), EventKind::EffectExpiry), 20);
//! let b = queue.schedule(EventTarget::new(PatientId(0), EventKind::Death), 30);
//!
//! assert!(queue.cancel(a));
//! assert!(!queue.cancel(a)); // second cancel is a no-op
//!
//! let fired = queue.pop_next().unwrap();
//! assert_eq!(fired.id, b);
//! assert_eq!(queue.now(), 30);
//! ```

use crate::core::time::{SimClock, Tick};
use crate::models::catalog::{AcuteId, StageId};
use crate::models::patient::PatientId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::trace;

/// Kernel handle of one scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

/// What a pending event does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Chronic(StageId),
    Acute(AcuteId),
    EffectExpiry,
    Death,
}

impl EventKind {
    /// Tie-break class among events sharing a tick (lower fires first)
    fn class(&self) -> u8 {
        match self {
            EventKind::Death => 0,
            _ => 1,
        }
    }
}

/// Patient and kind an event is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventTarget {
    pub patient: PatientId,
    pub kind: EventKind,
}

impl EventTarget {
    pub fn new(patient: PatientId, kind: EventKind) -> Self {
        Self { patient, kind }
    }
}

/// An event handed out by `pop_next`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredEvent {
    pub id: EventId,
    pub at: Tick,
    pub target: EventTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueSlot {
    at: Tick,
    class: u8,
    id: EventId,
}

/// Time-ordered event queue with cancellation
#[derive(Debug, Clone)]
pub struct EventQueue {
    clock: SimClock,
    heap: BinaryHeap<Reverse<QueueSlot>>,
    live: HashMap<EventId, (Tick, EventTarget)>,
    next_id: u64,
}

impl EventQueue {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_id: 0,
        }
    }

    /// Schedule `target` to fire at absolute tick `at`
    pub fn schedule(&mut self, target: EventTarget, at: Tick) -> EventId {
        debug_assert!(at >= self.clock.now(), "event scheduled in the past");
        let id = EventId(self.next_id);
        self.next_id += 1;

        self.heap.push(Reverse(QueueSlot {
            at,
            class: target.kind.class(),
            id,
        }));
        self.live.insert(id, (at, target));
        trace!(event = id.0, patient = target.patient.0, kind = ?target.kind, at, "scheduled");
        id
    }

    /// Cancel a scheduled event
    ///
    /// Returns `false` if the event already fired or was already cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.live.remove(&id).is_some();
        if removed {
            trace!(event = id.0, "cancelled");
        }
        removed
    }

    /// Pop the earliest live event, advancing the clock to its tick
    ///
    /// Returns `None` once no live event remains at or before the horizon.
    pub fn pop_next(&mut self) -> Option<FiredEvent> {
        while let Some(Reverse(slot)) = self.heap.peek().copied() {
            if !self.live.contains_key(&slot.id) {
                self.heap.pop();
                continue;
            }
            if self.clock.is_past_horizon(slot.at) {
                return None;
            }
            self.heap.pop();
            let (at, target) = self.live.remove(&slot.id)?;
            self.clock.advance_to(at);
            return Some(FiredEvent {
                id: slot.id,
                at,
                target,
            });
        }
        None
    }

    /// Current simulation tick
    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Whether `id` is scheduled and not yet fired or cancelled
    pub fn is_live(&self, id: EventId) -> bool {
        self.live.contains_key(&id)
    }

    /// Tick a live event is scheduled for
    pub fn scheduled_at(&self, id: EventId) -> Option<Tick> {
        self.live.get(&id).map(|(at, _)| *at)
    }

    /// Number of live events
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> EventQueue {
        EventQueue::new(SimClock::new(365, 10))
    }

    fn target(patient: usize, kind: EventKind) -> EventTarget {
        EventTarget::new(PatientId(patient), kind)
    }

    #[test]
    fn test_pops_in_time_order() {
        let mut q = queue();
        q.schedule(target(0, EventKind::Chronic(StageId(1))), 50);
        q.schedule(target(1, EventKind::Chronic(StageId(0))), 10);

        assert_eq!(q.pop_next().unwrap().at, 10);
        assert_eq!(q.pop_next().unwrap().at, 50);
        assert!(q.pop_next().is_none());
    }

    #[test]
    fn test_death_fires_first_on_tie() {
        let mut q = queue();
        let chronic = q.schedule(target(0, EventKind::Chronic(StageId(0))), 10);
        let death = q.schedule(target(1, EventKind::Death), 10);

        assert_eq!(q.pop_next().unwrap().id, death);
        assert_eq!(q.pop_next().unwrap().id, chronic);
    }

    #[test]
    fn test_same_tick_keeps_scheduling_order() {
        let mut q = queue();
        let first = q.schedule(target(0, EventKind::Acute(AcuteId(0))), 5);
        let second = q.schedule(target(0, EventKind::Chronic(StageId(0))), 5);

        assert_eq!(q.pop_next().unwrap().id, first);
        assert_eq!(q.pop_next().unwrap().id, second);
    }

    #[test]
    fn test_horizon_stops_queue() {
        let mut q = EventQueue::new(SimClock::new(10, 1));
        q.schedule(target(0, EventKind::Death), 11);

        assert!(q.pop_next().is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_cancelled_event_never_fires() {
        let mut q = queue();
        let id = q.schedule(target(0, EventKind::Death), 3);
        assert!(q.cancel(id));
        assert!(!q.is_live(id));
        assert!(q.pop_next().is_none());
    }
}
