//! Liveness and readiness probes

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use jobsync_controller::ControllerState;

/// Build the probe router.
///
/// `/healthz` always answers once the process is serving. `/readyz` answers
/// 200 only while the controller is consuming events.
pub fn health_router(state: watch::Receiver<ControllerState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .with_state(state)
}

async fn readyz(
    State(state): State<watch::Receiver<ControllerState>>,
) -> (StatusCode, &'static str) {
    match *state.borrow() {
        ControllerState::Running => (StatusCode::OK, "ready"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

/// Bind the probe port on all interfaces
pub async fn bind_health(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "health server listening");
    Ok(listener)
}

/// Serve the probes on `listener` until `shutdown` fires
pub async fn serve_health(
    listener: TcpListener,
    state: watch::Receiver<ControllerState>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, health_router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn status(router: Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn healthz_is_always_ok() {
        let (_tx, rx) = watch::channel(ControllerState::Created);
        assert_eq!(status(health_router(rx), "/healthz").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_follows_controller_state() {
        let (tx, rx) = watch::channel(ControllerState::Created);
        let router = health_router(rx);

        assert_eq!(
            status(router.clone(), "/readyz").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        tx.send_replace(ControllerState::Running);
        assert_eq!(status(router.clone(), "/readyz").await, StatusCode::OK);

        tx.send_replace(ControllerState::Stopping);
        assert_eq!(
            status(router, "/readyz").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (_tx, rx) = watch::channel(ControllerState::Running);
        assert_eq!(
            status(health_router(rx), "/metrics").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn server_stops_on_cancel() {
        let (_tx, rx) = watch::channel(ControllerState::Running);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let listener = bind_health(0).await.unwrap();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            serve_health(listener, rx, shutdown),
        )
        .await
        .expect("server should exit once cancelled");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn port_in_use_fails_to_bind() {
        let held = bind_health(0).await.unwrap();
        let port = held.local_addr().unwrap().port();

        let err = bind_health(port).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
    }
}
