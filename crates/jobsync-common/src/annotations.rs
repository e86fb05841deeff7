//! Annotation conventions shared by Deployments and CronJobs
//!
//! Two keys drive image synchronization:
//! - `jobsync.k8s.io/enabled`: opt-in marker. Only its presence matters.
//! - `jobsync.k8s.io/jobs`: on a Deployment, a JSON object `{"jobs": [...]}`
//!   naming the CronJobs that should run the Deployment's image.
//!
//! Decoding never fails outward. A partially configured resource is simply
//! treated as having no targets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Presence of this annotation opts a resource into image sync
pub const SYNC_ENABLED_ANNOTATION: &str = "jobsync.k8s.io/enabled";

/// Annotation holding the JSON list of target CronJob names
pub const SYNC_JOBS_ANNOTATION: &str = "jobsync.k8s.io/jobs";

/// Wire shape of the jobs annotation value
#[derive(Debug, Default, Serialize, Deserialize)]
struct JobsAnnotation {
    #[serde(default)]
    jobs: Vec<String>,
}

/// Why a target list decoded to nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    /// The jobs annotation is not set
    Missing,
    /// The jobs annotation is set but is not `{"jobs": [string, ...]}`
    Malformed(String),
}

/// Result of decoding the jobs annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedTargets {
    /// Target CronJob names in annotation order
    Targets(Vec<String>),
    /// Nothing usable was found
    Empty(EmptyReason),
}

impl DecodedTargets {
    /// Collapse to the target list, treating any `Empty` as no targets
    pub fn into_names(self) -> Vec<String> {
        match self {
            Self::Targets(names) => names,
            Self::Empty(_) => Vec::new(),
        }
    }
}

/// True iff the sync-enabled annotation is present, whatever its value
pub fn is_sync_enabled(annotations: &BTreeMap<String, String>) -> bool {
    annotations.contains_key(SYNC_ENABLED_ANNOTATION)
}

/// Decode the jobs annotation, keeping track of why it may be empty
pub fn decode_targets(annotations: &BTreeMap<String, String>) -> DecodedTargets {
    let Some(raw) = annotations.get(SYNC_JOBS_ANNOTATION) else {
        return DecodedTargets::Empty(EmptyReason::Missing);
    };

    match serde_json::from_str::<JobsAnnotation>(raw) {
        Ok(parsed) => DecodedTargets::Targets(parsed.jobs),
        Err(e) => DecodedTargets::Empty(EmptyReason::Malformed(e.to_string())),
    }
}

/// Target CronJob names from the jobs annotation; empty on any decode problem
pub fn target_names(annotations: &BTreeMap<String, String>) -> Vec<String> {
    decode_targets(annotations).into_names()
}

/// Render target names in the annotation wire format
pub fn encode_targets<S: AsRef<str>>(names: &[S]) -> String {
    serde_json::json!({
        "jobs": names.iter().map(|n| n.as_ref()).collect::<Vec<_>>()
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn enabled_when_key_present() {
        assert!(is_sync_enabled(&annotations(&[(
            SYNC_ENABLED_ANNOTATION,
            "true"
        )])));
    }

    #[test]
    fn enabled_ignores_value() {
        assert!(is_sync_enabled(&annotations(&[(SYNC_ENABLED_ANNOTATION, "")])));
        assert!(is_sync_enabled(&annotations(&[(
            SYNC_ENABLED_ANNOTATION,
            "false"
        )])));
    }

    #[test]
    fn not_enabled_without_key() {
        assert!(!is_sync_enabled(&BTreeMap::new()));
        assert!(!is_sync_enabled(&annotations(&[(
            "jobsync.k8s.io/enable",
            "true"
        )])));
    }

    #[test]
    fn decodes_job_list_in_order() {
        let a = annotations(&[(SYNC_JOBS_ANNOTATION, r#"{"jobs": ["a", "b"]}"#)]);
        assert_eq!(
            decode_targets(&a),
            DecodedTargets::Targets(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(target_names(&a), vec!["a", "b"]);
    }

    #[test]
    fn missing_key_is_empty() {
        let a = annotations(&[(SYNC_ENABLED_ANNOTATION, "true")]);
        assert_eq!(
            decode_targets(&a),
            DecodedTargets::Empty(EmptyReason::Missing)
        );
        assert!(target_names(&a).is_empty());
    }

    #[test]
    fn empty_string_is_malformed_and_empty() {
        let a = annotations(&[(SYNC_JOBS_ANNOTATION, "")]);
        assert!(matches!(
            decode_targets(&a),
            DecodedTargets::Empty(EmptyReason::Malformed(_))
        ));
        assert!(target_names(&a).is_empty());
    }

    #[test]
    fn invalid_json_is_empty() {
        let a = annotations(&[(SYNC_JOBS_ANNOTATION, "{jobs: [a")]);
        assert!(target_names(&a).is_empty());
    }

    #[test]
    fn wrong_shape_is_empty() {
        for raw in [r#"["a", "b"]"#, r#"{"jobs": "a"}"#, r#"{"jobs": [1, 2]}"#] {
            let a = annotations(&[(SYNC_JOBS_ANNOTATION, raw)]);
            assert!(
                matches!(
                    decode_targets(&a),
                    DecodedTargets::Empty(EmptyReason::Malformed(_))
                ),
                "expected malformed for {raw}"
            );
        }
    }

    #[test]
    fn object_without_jobs_field_has_no_targets() {
        let a = annotations(&[(SYNC_JOBS_ANNOTATION, r#"{"other": 1}"#)]);
        assert_eq!(decode_targets(&a), DecodedTargets::Targets(vec![]));
    }

    #[test]
    fn encoded_targets_decode_back() {
        let raw = encode_targets(&["nightly", "hourly"]);
        let a = annotations(&[(SYNC_JOBS_ANNOTATION, raw.as_str())]);
        assert_eq!(target_names(&a), vec!["nightly", "hourly"]);
    }
}
