//! Kubernetes client seam for CronJob reads and writes

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::CronJob;
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use jobsync_common::{Error, FIELD_MANAGER};

/// Trait abstracting the CronJob operations the sync engine needs
///
/// Allows mocking the Kubernetes client in tests while using the real
/// client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CronJobClient: Send + Sync {
    /// List all CronJobs in a namespace
    async fn list_cron_jobs(&self, namespace: &str) -> Result<Vec<CronJob>, Error>;

    /// Replace a CronJob. The object's `resourceVersion` is sent back, so the
    /// write fails with a conflict if the CronJob changed since it was read.
    async fn replace_cron_job(&self, namespace: &str, cron_job: &CronJob) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeCronJobClient {
    client: Client,
}

impl KubeCronJobClient {
    /// Create a new KubeCronJobClient wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CronJobClient for KubeCronJobClient {
    async fn list_cron_jobs(&self, namespace: &str) -> Result<Vec<CronJob>, Error> {
        let api: Api<CronJob> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        debug!(namespace = %namespace, count = list.items.len(), "listed CronJobs");
        Ok(list.items)
    }

    async fn replace_cron_job(&self, namespace: &str, cron_job: &CronJob) -> Result<(), Error> {
        let api: Api<CronJob> = Api::namespaced(self.client.clone(), namespace);
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        api.replace(&cron_job.name_any(), &params, cron_job).await?;
        Ok(())
    }
}
