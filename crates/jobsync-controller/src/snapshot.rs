//! Immutable view of a Deployment as seen by the gate and resolver
//!
//! Only the fields that influence synchronization are copied out of the
//! `Deployment`, so snapshot equality is exactly "nothing the controller
//! cares about changed".

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;

use jobsync_common::Error;

/// A single Deployment status condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadCondition {
    /// Condition status ("True", "False", "Unknown")
    pub status: String,
    /// Machine-readable reason for the last transition
    pub reason: Option<String>,
}

impl WorkloadCondition {
    /// True when the status reads "true" in any casing
    pub fn is_true(&self) -> bool {
        self.status.eq_ignore_ascii_case("true")
    }
}

/// Snapshot of a Deployment at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSnapshot {
    /// Deployment name
    pub name: String,
    /// Deployment namespace
    pub namespace: String,
    /// `metadata.generation`, 0 when unset
    pub generation: i64,
    /// `status.observedGeneration`, 0 when unset
    pub observed_generation: i64,
    /// Status conditions in API order
    pub conditions: Vec<WorkloadCondition>,
    /// Metadata annotations
    pub annotations: BTreeMap<String, String>,
    /// Image of the first container in the pod template
    pub image: String,
}

impl WorkloadSnapshot {
    /// Build a snapshot from a Deployment.
    ///
    /// Fails with `MissingContainer` when the pod template has no container
    /// or the first container has no image.
    pub fn from_deployment(deployment: &Deployment) -> Result<Self, Error> {
        let name = deployment.name_any();

        let image = deployment
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .and_then(|ps| ps.containers.first())
            .and_then(|c| c.image.clone())
            .ok_or_else(|| Error::missing_container("Deployment", &name))?;

        let status = deployment.status.as_ref();
        let conditions = status
            .and_then(|s| s.conditions.as_ref())
            .map(|conds| {
                conds
                    .iter()
                    .map(|c| WorkloadCondition {
                        status: c.status.clone(),
                        reason: c.reason.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            namespace: deployment.namespace().unwrap_or_default(),
            generation: deployment.metadata.generation.unwrap_or(0),
            observed_generation: status.and_then(|s| s.observed_generation).unwrap_or(0),
            conditions,
            annotations: deployment.annotations().clone(),
            image,
            name,
        })
    }
}
