//! Kubernetes client construction and shutdown signals

use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use jobsync_common::Error;

/// Build a client from in-cluster credentials, or from the local kubeconfig
/// when `run_outside_cluster` is set.
///
/// In-cluster resolution falls back to the kubeconfig so the binary also
/// works from a workstation without the flag.
pub async fn build_client(run_outside_cluster: bool) -> Result<Client, Error> {
    let config = if run_outside_cluster {
        info!("using kubeconfig credentials");
        load_kubeconfig().await?
    } else {
        match Config::incluster() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "in-cluster credentials unavailable, trying kubeconfig");
                load_kubeconfig().await?
            }
        }
    };

    Ok(Client::try_from(config)?)
}

async fn load_kubeconfig() -> Result<Config, Error> {
    Config::from_kubeconfig(&KubeConfigOptions::default())
        .await
        .map_err(|e| Error::config(format!("failed to load kubeconfig: {e}")))
}

/// Cancel `shutdown` on SIGINT or SIGTERM
pub async fn wait_for_shutdown_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            info!("received SIGINT");
        }
        _ = terminate => info!("received SIGTERM"),
        _ = shutdown.cancelled() => return,
    }

    shutdown.cancel();
}
