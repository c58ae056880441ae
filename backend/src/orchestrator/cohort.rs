//! Cohort generation and paired replay
//!
//! A fresh cohort draws one profile per patient from a `ProfileSource`. A
//! paired cohort copies the profiles of an existing cohort, position by
//! position, under a different intervention. Because each profile carries
//! the seed of the patient's random streams, the paired patient consumes the
//! same draw positions per sampling purpose (common random numbers).

use crate::models::patient::{Patient, PatientId};
use crate::models::profile::Intervention;
use crate::population::ProfileSource;
use crate::rng::RngManager;

/// Create `n` patients with profiles drawn from `source`
///
/// Patient ids are assigned in creation order starting at `first_id`.
pub fn generate_fresh(
    n: usize,
    first_id: usize,
    source: &mut dyn ProfileSource,
    rng: &mut RngManager,
    intervention: &Intervention,
) -> Vec<Patient> {
    (0..n)
        .map(|i| {
            let profile = source.next_profile(rng);
            Patient::new(PatientId(first_id + i), profile, intervention.clone())
        })
        .collect()
}

/// Create one patient per template, copying its profile under `intervention`
///
/// The i-th patient keeps the i-th template's id, so paired outcomes can be
/// joined on `PatientId`.
pub fn generate_from_template(templates: &[Patient], intervention: &Intervention) -> Vec<Patient> {
    templates
        .iter()
        .map(|template| Patient::from_template(template.id(), template, intervention.clone()))
        .collect()
}
