//! Paired replay: the same cohort under a second intervention

use cohort_sim_core::population::{FixedProfiles, PopulationConfig, PopulationGenerator};
use cohort_sim_core::risk::presets;
use cohort_sim_core::{Intervention, SessionConfig, SimulationSession};
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn config() -> SessionConfig {
    SessionConfig {
        rng_seed: 2024,
        n_patients: 40,
        horizon_years: 25,
        ticks_per_year: 365,
    }
}

fn session(intervention: Intervention) -> SimulationSession {
    let catalog = Arc::new(presets::example_catalog().unwrap());
    let risk = Arc::new(presets::example_repository(&catalog).unwrap());
    let mut session = SimulationSession::new(config(), catalog, risk, intervention).unwrap();
    let mut source = PopulationGenerator::new(PopulationConfig::default()).unwrap();
    session.generate_cohort(&mut source).unwrap();
    session
}

// ============================================================================
// Pairing
// ============================================================================

#[test]
fn test_paired_cohort_has_same_profiles() {
    let usual = session(Intervention::new("usual", 0.0));
    let intensive = usual.paired(Intervention::new("intensive", 1.0)).unwrap();

    assert_eq!(usual.patients().len(), intensive.patients().len());
    for (a, b) in usual.patients().iter().zip(intensive.patients()) {
        assert_eq!(a.id(), b.id());
        assert_eq!(a.profile(), b.profile());
        assert_eq!(b.intervention().name, "intensive");
        assert_eq!(b.state().hba1c(), a.state().hba1c() - 1.0);
    }
}

#[test]
fn test_paired_cohort_shares_fingerprint() {
    let mut usual = session(Intervention::new("usual", 0.0));
    let mut intensive = usual.paired(Intervention::new("intensive", 1.0)).unwrap();

    let a = usual.run().unwrap();
    let b = intensive.run().unwrap();

    assert_eq!(a.patients, b.patients);
    assert_eq!(a.cohort_fingerprint, b.cohort_fingerprint);
    assert_eq!(a.intervention, "usual");
    assert_eq!(b.intervention, "intensive");
    assert_ne!(a.run_id, b.run_id);
}

#[test]
fn test_pairing_after_run_does_not_copy_outcomes() {
    let mut usual = session(Intervention::new("usual", 0.0));
    usual.run().unwrap();
    let paired = usual.paired(Intervention::new("intensive", 1.0)).unwrap();

    for p in paired.patients() {
        assert!(!p.is_started());
        assert!(!p.is_dead());
        assert!(p.state().reached_stages().is_empty());
        assert_eq!(p.live_event_count(), 0);
    }
}

#[test]
fn test_same_intervention_replays_identically() {
    // Common random numbers: the replay consumes the same draws per purpose
    let mut first = session(Intervention::new("usual", 0.0).with_effect_duration(5.0));
    let mut second = first.paired(first.intervention().clone()).unwrap();

    first.run().unwrap();
    second.run().unwrap();

    assert_eq!(first.event_log().events(), second.event_log().events());
}

#[test]
fn test_paired_arms_differ_only_through_treatment() {
    let mut usual = session(Intervention::new("usual", 0.0));
    let mut intensive = usual.paired(Intervention::new("intensive", 2.0)).unwrap();

    usual.run().unwrap();
    intensive.run().unwrap();

    // Baseline complications do not depend on HbA1c and must match pairwise
    for (a, b) in usual.patients().iter().zip(intensive.patients()) {
        let initial_a: Vec<_> = a
            .state()
            .reached_stages()
            .iter()
            .filter(|s| a.state().is_initial(**s))
            .collect();
        let initial_b: Vec<_> = b
            .state()
            .reached_stages()
            .iter()
            .filter(|s| b.state().is_initial(**s))
            .collect();
        assert_eq!(initial_a, initial_b);
    }
}

#[test]
fn test_fixed_profiles_source_pairs_with_generated_cohort() {
    let usual = session(Intervention::new("usual", 0.0));
    let profiles: Vec<_> = usual.patients().iter().map(|p| p.profile().clone()).collect();

    let catalog = Arc::new(presets::example_catalog().unwrap());
    let risk = Arc::new(presets::example_repository(&catalog).unwrap());
    let mut replay =
        SimulationSession::new(config(), catalog, risk, Intervention::new("usual", 0.0)).unwrap();
    replay
        .generate_cohort(&mut FixedProfiles::new(profiles).unwrap())
        .unwrap();

    assert_eq!(
        cohort_sim_core::orchestrator::cohort_fingerprint(usual.patients()).unwrap(),
        cohort_sim_core::orchestrator::cohort_fingerprint(replay.patients()).unwrap()
    );
}
