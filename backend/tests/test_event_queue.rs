//! Event kernel tests: ordering, cancellation, horizon

use cohort_sim_core::models::patient::PatientId;
use cohort_sim_core::{EventKind, EventQueue, EventTarget, SimClock, StageId};

fn queue() -> EventQueue {
    EventQueue::new(SimClock::new(100, 10))
}

fn target(patient: usize, kind: EventKind) -> EventTarget {
    EventTarget::new(PatientId(patient), kind)
}

#[test]
fn test_events_interleave_across_patients() {
    let mut q = queue();
    q.schedule(target(0, EventKind::Chronic(StageId(0))), 30);
    q.schedule(target(1, EventKind::Chronic(StageId(0))), 10);
    q.schedule(target(0, EventKind::EffectExpiry), 20);

    let order: Vec<_> = std::iter::from_fn(|| q.pop_next())
        .map(|e| (e.at, e.target.patient.0))
        .collect();
    assert_eq!(order, vec![(10, 1), (20, 0), (30, 0)]);
}

#[test]
fn test_clock_follows_fired_events() {
    let mut q = queue();
    q.schedule(target(0, EventKind::Death), 42);
    assert_eq!(q.now(), 0);
    q.pop_next();
    assert_eq!(q.now(), 42);
}

#[test]
fn test_cancel_is_idempotent() {
    let mut q = queue();
    let id = q.schedule(target(0, EventKind::EffectExpiry), 5);

    assert!(q.cancel(id));
    assert!(!q.cancel(id));
    assert!(!q.cancel(id));
    assert!(q.is_empty());
}

#[test]
fn test_cancel_after_fire_is_noop() {
    let mut q = queue();
    let id = q.schedule(target(0, EventKind::Death), 5);
    assert_eq!(q.pop_next().map(|e| e.id), Some(id));
    assert!(!q.cancel(id));
}

#[test]
fn test_cancelled_slot_is_skipped() {
    let mut q = queue();
    let early = q.schedule(target(0, EventKind::Chronic(StageId(1))), 5);
    let late = q.schedule(target(0, EventKind::Chronic(StageId(2))), 9);
    q.cancel(early);

    let fired = q.pop_next().unwrap();
    assert_eq!(fired.id, late);
    assert_eq!(q.now(), 9);
}

#[test]
fn test_death_wins_ties_regardless_of_scheduling_order() {
    let mut q = queue();
    let expiry = q.schedule(target(0, EventKind::EffectExpiry), 7);
    let death = q.schedule(target(0, EventKind::Death), 7);

    assert_eq!(q.pop_next().unwrap().id, death);
    assert_eq!(q.pop_next().unwrap().id, expiry);
}

#[test]
fn test_events_past_horizon_never_fire() {
    let mut q = queue();
    q.schedule(target(0, EventKind::Death), 1000);
    let last = q.schedule(target(0, EventKind::Death), 1001);

    assert_eq!(q.pop_next().map(|e| e.at), Some(1000));
    assert!(q.pop_next().is_none());
    assert_eq!(q.scheduled_at(last), Some(1001));
}
