//! Sync engine: applies an image assignment to the CronJobs in a namespace
//!
//! One pass lists every CronJob in the namespace, keeps those that opted in
//! and are named by the assignment, and rewrites the image of their first
//! container. Per-CronJob failures are recorded and logged but never stop the
//! pass. Only a failed list aborts it.
//!
//! Nothing is retried here. A CronJob that failed to update is picked up again
//! by the next qualifying Deployment event.

use std::sync::Arc;

use k8s_openapi::api::batch::v1::CronJob;
use kube::ResourceExt;
use tracing::{debug, error, info, instrument, warn};

use jobsync_common::annotations::is_sync_enabled;
use jobsync_common::{metrics, Error};

use crate::client::CronJobClient;
use crate::resolver::ImageAssignment;

/// What happened to one listed CronJob during a pass
#[derive(Debug)]
pub enum TargetOutcome {
    /// Image written
    Updated,
    /// Dry run: the image would have been written
    WouldUpdate,
    /// The write (or preparing it) failed
    Failed(Error),
    /// CronJob lacks the enabled annotation
    SkippedDisabled,
    /// CronJob is not named by the Deployment
    SkippedUnassigned,
}

impl TargetOutcome {
    fn metric_label(&self) -> Option<&'static str> {
        match self {
            Self::Updated => Some("updated"),
            Self::WouldUpdate => Some("would_update"),
            Self::Failed(_) => Some("failed"),
            Self::SkippedDisabled | Self::SkippedUnassigned => None,
        }
    }
}

/// Outcome for one CronJob
#[derive(Debug)]
pub struct TargetResult {
    /// CronJob name
    pub cron_job: String,
    /// Image that was (or would have been) applied
    pub image: Option<String>,
    /// What happened
    pub outcome: TargetOutcome,
}

/// Result of a sync pass, in listing order
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Whether the pass ran in dry-run mode
    pub dry_run: bool,
    /// One entry per listed CronJob
    pub results: Vec<TargetResult>,
}

impl SyncReport {
    fn names_where(&self, pred: impl Fn(&TargetOutcome) -> bool) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| pred(&r.outcome))
            .map(|r| r.cron_job.as_str())
            .collect()
    }

    /// CronJobs whose image was written
    pub fn updated(&self) -> Vec<&str> {
        self.names_where(|o| matches!(o, TargetOutcome::Updated))
    }

    /// CronJobs that would have been written in dry-run mode
    pub fn would_update(&self) -> Vec<&str> {
        self.names_where(|o| matches!(o, TargetOutcome::WouldUpdate))
    }

    /// Failed targets with their errors
    pub fn failed(&self) -> Vec<&TargetResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, TargetOutcome::Failed(_)))
            .collect()
    }

    /// CronJobs that were listed but not targeted
    pub fn skipped(&self) -> Vec<&str> {
        self.names_where(|o| {
            matches!(
                o,
                TargetOutcome::SkippedDisabled | TargetOutcome::SkippedUnassigned
            )
        })
    }
}

/// Applies image assignments to CronJobs in one namespace
pub struct SyncEngine {
    client: Arc<dyn CronJobClient>,
    namespace: String,
    dry_run: bool,
}

impl SyncEngine {
    /// Create an engine for `namespace`. With `dry_run` no CronJob is written.
    pub fn new(
        client: Arc<dyn CronJobClient>,
        namespace: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            dry_run,
        }
    }

    /// Run one sync pass.
    ///
    /// Returns an error only when the CronJob list fails. Per-CronJob update
    /// failures are reported in the returned `SyncReport`.
    #[instrument(skip_all, fields(namespace = %self.namespace, targets = assignment.len(), dry_run = self.dry_run))]
    pub async fn apply(&self, assignment: &ImageAssignment) -> Result<SyncReport, Error> {
        let timer = metrics::PassTimer::start();

        let cron_jobs = match self.client.list_cron_jobs(&self.namespace).await {
            Ok(cron_jobs) => cron_jobs,
            Err(e) => {
                let seconds = timer.list_failed();
                error!(error = %e, seconds, "failed to list CronJobs");
                return Err(e);
            }
        };

        let mut report = SyncReport {
            dry_run: self.dry_run,
            results: Vec::with_capacity(cron_jobs.len()),
        };

        for mut cron_job in cron_jobs {
            let name = cron_job.name_any();
            let enabled = is_sync_enabled(cron_job.annotations());
            debug!(cron_job = %name, enabled, "evaluating CronJob");

            if !enabled {
                report.results.push(TargetResult {
                    cron_job: name,
                    image: None,
                    outcome: TargetOutcome::SkippedDisabled,
                });
                continue;
            }

            let Some(image) = assignment.image_for(&name) else {
                report.results.push(TargetResult {
                    cron_job: name,
                    image: None,
                    outcome: TargetOutcome::SkippedUnassigned,
                });
                continue;
            };

            let outcome = self.update_image(&mut cron_job, &name, image).await;
            if let Some(label) = outcome.metric_label() {
                metrics::record_update(label);
            }
            report.results.push(TargetResult {
                cron_job: name,
                image: Some(image.to_string()),
                outcome,
            });
        }

        let seconds = timer.completed();
        debug!(seconds, results = report.results.len(), "CronJob sync pass timed");
        Ok(report)
    }

    async fn update_image(
        &self,
        cron_job: &mut CronJob,
        name: &str,
        image: &str,
    ) -> TargetOutcome {
        let previous = match set_image(cron_job, image) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(cron_job = %name, image = %image, error = %e, "cannot set CronJob image");
                return TargetOutcome::Failed(e);
            }
        };

        if self.dry_run {
            info!(
                cron_job = %name,
                from = ?previous,
                to = %image,
                "dry run: would update CronJob image"
            );
            return TargetOutcome::WouldUpdate;
        }

        match self.client.replace_cron_job(&self.namespace, cron_job).await {
            Ok(()) => {
                info!(cron_job = %name, from = ?previous, to = %image, "updated CronJob image");
                TargetOutcome::Updated
            }
            Err(e) => {
                error!(
                    cron_job = %name,
                    image = %image,
                    conflict = e.is_conflict(),
                    error = %e,
                    "failed to update CronJob image"
                );
                TargetOutcome::Failed(e)
            }
        }
    }
}

/// Set the image of the CronJob's first container, returning the old image
fn set_image(cron_job: &mut CronJob, image: &str) -> Result<Option<String>, Error> {
    let name = cron_job.name_any();
    let container = cron_job
        .spec
        .as_mut()
        .and_then(|s| s.job_template.spec.as_mut())
        .and_then(|js| js.template.spec.as_mut())
        .and_then(|ps| ps.containers.first_mut())
        .ok_or_else(|| Error::missing_container("CronJob", name))?;

    Ok(container.image.replace(image.to_string()))
}

/// Image of the CronJob's first container
pub fn current_image(cron_job: &CronJob) -> Option<&str> {
    cron_job
        .spec
        .as_ref()
        .and_then(|s| s.job_template.spec.as_ref())
        .and_then(|js| js.template.spec.as_ref())
        .and_then(|ps| ps.containers.first())
        .and_then(|c| c.image.as_deref())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;

    use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, JobSpec, JobTemplateSpec};
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use jobsync_common::annotations::SYNC_ENABLED_ANNOTATION;
    use jobsync_common::Error;

    /// CronJob in namespace "default" whose single container runs `image`
    pub fn cron_job(name: &str, image: &str, enabled: bool) -> CronJob {
        let annotations = enabled.then(|| {
            BTreeMap::from([(SYNC_ENABLED_ANNOTATION.to_string(), "true".to_string())])
        });

        CronJob {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                resource_version: Some("100".to_string()),
                annotations,
                ..Default::default()
            },
            spec: Some(CronJobSpec {
                schedule: "0 * * * *".to_string(),
                job_template: JobTemplateSpec {
                    metadata: None,
                    spec: Some(JobSpec {
                        template: PodTemplateSpec {
                            spec: Some(PodSpec {
                                containers: vec![Container {
                                    name: "job".to_string(),
                                    image: Some(image.to_string()),
                                    ..Default::default()
                                }],
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        }
    }

    /// The error the API server returns when a replace loses an
    /// optimistic-concurrency race
    pub fn conflict(name: &str) -> Error {
        Error::from(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: format!(
                "Operation cannot be fulfilled on cronjobs.batch \"{}\": the object has been modified",
                name
            ),
            reason: "Conflict".to_string(),
            code: 409,
        }))
    }
}
