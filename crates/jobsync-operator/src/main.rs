//! jobsync - keep CronJob images in step with their Deployment

use std::sync::Arc;

use clap::Parser;
use kube::Client;
use tokio_util::sync::CancellationToken;

use jobsync_common::telemetry::{init_telemetry, TelemetryConfig};
use jobsync_controller::{
    deployment_events, Controller, ImageSyncHandler, KubeCronJobClient, SyncEngine,
};
use jobsync_operator::{
    bind_health, build_client, serve_health, wait_for_shutdown_signal, Cli, OperatorConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(TelemetryConfig {
        service_name: "jobsync-operator".to_string(),
        ..Default::default()
    })?;

    let config = OperatorConfig::try_from(Cli::parse())?;

    if config.dry_run {
        tracing::info!("performing dry run, CronJobs will not be modified");
    }
    tracing::info!(namespace = %config.namespace, "syncing deployments");

    let client = build_client(config.run_outside_cluster).await?;
    let version = client
        .apiserver_version()
        .await
        .map_err(|e| anyhow::anyhow!("failed to reach the Kubernetes API server: {}", e))?;
    tracing::info!(
        version = %version.git_version,
        platform = %version.platform,
        "connected to Kubernetes"
    );

    run_controller(client, config).await
}

async fn run_controller(client: Client, config: OperatorConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let cron_jobs = Arc::new(KubeCronJobClient::new(client.clone()));
    let engine = SyncEngine::new(cron_jobs, &config.namespace, config.dry_run);
    let controller = Controller::new(Arc::new(ImageSyncHandler::new(engine)));

    let listener = bind_health(config.health_port).await.map_err(|e| {
        anyhow::anyhow!(
            "failed to bind health port {}: {}",
            config.health_port,
            e
        )
    })?;
    let health = tokio::spawn({
        let state = controller.subscribe();
        let shutdown = shutdown.clone();
        async move {
            let result = serve_health(listener, state, shutdown.clone()).await;
            if result.is_err() {
                // A failed probe server stops the controller
                shutdown.cancel();
            }
            result
        }
    });
    tokio::spawn(wait_for_shutdown_signal(shutdown.clone()));

    controller
        .run(deployment_events(client, &config.namespace), shutdown.clone())
        .await;

    // The event stream may end on its own; stop the probes either way
    shutdown.cancel();
    health
        .await?
        .map_err(|e| anyhow::anyhow!("health server failed: {}", e))?;

    tracing::info!("jobsync shut down");
    Ok(())
}
