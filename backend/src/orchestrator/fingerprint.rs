//! Cohort fingerprints
//!
//! A fingerprint is the SHA-256 of the canonical JSON of the ordered baseline
//! profiles. Two cohorts with the same fingerprint are pairwise identical at
//! baseline, which is what a paired comparison requires.

use crate::models::patient::Patient;
use crate::models::profile::PatientProfile;
use crate::orchestrator::SimulationError;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Compute a deterministic SHA-256 hash of any serializable value
///
/// Object keys are sorted before hashing so the result does not depend on
/// map iteration order.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<String, SimulationError> {
    let value = serde_json::to_value(value)
        .map_err(|e| SimulationError::Serialization(e.to_string()))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| SimulationError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint of a cohort's baseline profiles, in cohort order
pub fn cohort_fingerprint(patients: &[Patient]) -> Result<String, SimulationError> {
    let profiles: Vec<&PatientProfile> = patients.iter().map(Patient::profile).collect();
    canonical_hash(&profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::patient::PatientId;
    use crate::models::profile::{Intervention, Sex};

    fn patient(id: usize, seed: u64) -> Patient {
        let profile = PatientProfile {
            age: 50.0,
            sex: Sex::Female,
            hba1c: 8.0,
            duration_of_diabetes: 10.0,
            stream_seed: seed,
        };
        Patient::new(PatientId(id), profile, Intervention::new("usual", 0.0))
    }

    #[test]
    fn test_fingerprint_ignores_intervention() {
        let a = vec![patient(0, 1), patient(1, 2)];
        let b: Vec<Patient> = a
            .iter()
            .map(|p| Patient::from_template(p.id(), p, Intervention::new("new", 2.0)))
            .collect();

        assert_eq!(cohort_fingerprint(&a).unwrap(), cohort_fingerprint(&b).unwrap());
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let a = vec![patient(0, 1), patient(1, 2)];
        let b = vec![patient(0, 2), patient(1, 1)];

        assert_ne!(cohort_fingerprint(&a).unwrap(), cohort_fingerprint(&b).unwrap());
    }
}
