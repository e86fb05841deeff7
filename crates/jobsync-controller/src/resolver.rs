//! Target resolution: which CronJob gets which image

use std::collections::BTreeMap;

use jobsync_common::annotations::{decode_targets, DecodedTargets, EmptyReason};
use tracing::debug;

use crate::snapshot::WorkloadSnapshot;

/// Desired image per target CronJob name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageAssignment {
    images: BTreeMap<String, String>,
}

impl ImageAssignment {
    /// Assign `image` to a CronJob, replacing any earlier assignment
    pub fn assign(&mut self, cron_job: impl Into<String>, image: impl Into<String>) {
        self.images.insert(cron_job.into(), image.into());
    }

    /// Desired image for a CronJob, if it is a target
    pub fn image_for(&self, cron_job: &str) -> Option<&str> {
        self.images.get(cron_job).map(String::as_str)
    }

    /// Number of target CronJobs
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// True when there are no targets
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ImageAssignment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut assignment = Self::default();
        for (k, v) in iter {
            assignment.assign(k, v);
        }
        assignment
    }
}

/// Map every target named on the Deployment to the Deployment's image
pub fn build_assignment(snapshot: &WorkloadSnapshot) -> ImageAssignment {
    let targets = match decode_targets(&snapshot.annotations) {
        DecodedTargets::Targets(names) => names,
        DecodedTargets::Empty(EmptyReason::Missing) => {
            debug!(deployment = %snapshot.name, "no jobs annotation, nothing to sync");
            Vec::new()
        }
        DecodedTargets::Empty(EmptyReason::Malformed(error)) => {
            debug!(
                deployment = %snapshot.name,
                %error,
                "ignoring malformed jobs annotation"
            );
            Vec::new()
        }
    };

    targets
        .into_iter()
        .map(|name| (name, snapshot.image.clone()))
        .collect()
}
