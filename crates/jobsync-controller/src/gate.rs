//! Availability gate
//!
//! Decides whether a Deployment snapshot is worth syncing. A snapshot passes
//! only when all three hold:
//! 1. it carries the `jobsync.k8s.io/enabled` annotation
//! 2. `generation > observedGeneration` (the control plane has not caught up yet)
//! 3. at least one status condition is "True"
//!
//! Anything else is dropped silently. No conditions at all counts as
//! unavailable.

use jobsync_common::annotations::is_sync_enabled;

use crate::snapshot::WorkloadSnapshot;

/// Why the gate dropped a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The Deployment has not opted in
    NotAnnotated,
    /// The control plane already observed this generation
    AlreadyObserved {
        /// `metadata.generation`
        generation: i64,
        /// `status.observedGeneration`
        observed_generation: i64,
    },
    /// No status condition is true
    Unavailable,
}

/// Gate verdict for one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Propagate the image to the target CronJobs
    Sync,
    /// Do nothing
    Skip(SkipReason),
}

impl GateDecision {
    /// True when the snapshot should be synced
    pub fn is_sync(&self) -> bool {
        matches!(self, Self::Sync)
    }
}

/// Evaluate the gate for a snapshot
pub fn evaluate(snapshot: &WorkloadSnapshot) -> GateDecision {
    if !is_sync_enabled(&snapshot.annotations) {
        return GateDecision::Skip(SkipReason::NotAnnotated);
    }

    if snapshot.generation <= snapshot.observed_generation {
        return GateDecision::Skip(SkipReason::AlreadyObserved {
            generation: snapshot.generation,
            observed_generation: snapshot.observed_generation,
        });
    }

    if !snapshot.conditions.iter().any(|c| c.is_true()) {
        return GateDecision::Skip(SkipReason::Unavailable);
    }

    GateDecision::Sync
}
