//! Tests for SimClock and year/tick conversion

use cohort_sim_core::core::time::years_to_ticks;
use cohort_sim_core::{SimClock, Tick};

#[test]
fn test_clock_new() {
    let clock = SimClock::new(365, 60);
    assert_eq!(clock.now(), 0);
    assert_eq!(clock.current_year(), 0);
    assert_eq!(clock.horizon(), 365 * 60);
    assert_eq!(clock.ticks_per_year(), 365);
}

#[test]
fn test_clock_never_runs_backwards() {
    let mut clock = SimClock::new(12, 10);
    clock.advance_to(30);
    clock.advance_to(29);
    assert_eq!(clock.now(), 30);
    assert_eq!(clock.current_year(), 2);
}

#[test]
fn test_horizon_is_inclusive() {
    let clock = SimClock::new(10, 2);
    assert!(!clock.is_past_horizon(20));
    assert!(clock.is_past_horizon(21));
}

#[test]
fn test_huge_horizon_saturates() {
    let clock = SimClock::new(365, usize::MAX / 2);
    assert_eq!(clock.horizon(), Tick::MAX);
}

#[test]
#[should_panic(expected = "ticks_per_year must be positive")]
fn test_zero_resolution_panics() {
    SimClock::new(0, 1);
}

#[test]
fn test_years_to_ticks_rounds_up() {
    assert_eq!(years_to_ticks(1.0, 365), 365);
    assert_eq!(years_to_ticks(0.5, 12), 6);
    assert_eq!(years_to_ticks(0.51, 12), 7);
}

#[test]
fn test_positive_duration_is_at_least_one_tick() {
    assert_eq!(years_to_ticks(1e-9, 365), 1);
}

#[test]
fn test_non_positive_duration_is_zero() {
    assert_eq!(years_to_ticks(0.0, 365), 0);
    assert_eq!(years_to_ticks(-3.0, 365), 0);
}

#[test]
fn test_infinite_duration_saturates() {
    assert_eq!(years_to_ticks(f64::INFINITY, 365), Tick::MAX);
    assert_eq!(years_to_ticks(f64::NAN, 365), Tick::MAX);
    assert_eq!(years_to_ticks(1e300, 365), Tick::MAX);
}

#[test]
fn test_ticks_to_years() {
    let clock = SimClock::new(100, 5);
    assert_eq!(clock.ticks_to_years(250), 2.5);
    assert_eq!(clock.years_to_ticks(2.5), 250);
}
