//! Deployment controller loop
//!
//! Consumes a Deployment watch stream and turns each event into an
//! `on_add` / `on_update` call on a [`DeploymentHandler`]. The previous
//! version of an object comes from a reflector store that is updated as events
//! flow through, so a periodic relist shows up as updates whose previous value
//! is what the store held before the relist.
//!
//! Lifecycle: `Created → Running → Stopping → Stopped`. Events are handled one
//! at a time on the calling task. No new event is pulled once shutdown fires,
//! but a sync pass that has started always runs to completion.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::reflector::store::Writer;
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

#[cfg(test)]
use mockall::automock;

use jobsync_common::metrics::{self, PassResult};
use jobsync_common::Error;

use crate::gate::{self, GateDecision};
use crate::resolver::build_assignment;
use crate::snapshot::WorkloadSnapshot;
use crate::sync::{SyncEngine, SyncReport};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// so the API server closes idle watches before the client times out.
pub const WATCH_TIMEOUT_SECS: u32 = 25;

/// Receives Deployment notifications from the controller loop
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeploymentHandler: Send + Sync {
    /// A Deployment was seen for the first time
    async fn on_add(&self, deployment: &Deployment);

    /// A known Deployment was delivered again
    async fn on_update(&self, previous: &Deployment, current: &Deployment);
}

/// Propagates Deployment images to CronJobs: gate → resolver → sync engine
pub struct ImageSyncHandler {
    engine: SyncEngine,
}

impl ImageSyncHandler {
    /// Create a handler that syncs through `engine`
    pub fn new(engine: SyncEngine) -> Self {
        Self { engine }
    }

    /// Run one reconciliation pass for a snapshot.
    ///
    /// Returns `Ok(None)` when the gate drops the snapshot and
    /// `Err` only when the CronJob list fails.
    pub async fn reconcile(
        &self,
        snapshot: &WorkloadSnapshot,
    ) -> Result<Option<SyncReport>, Error> {
        if let GateDecision::Skip(reason) = gate::evaluate(snapshot) {
            debug!(deployment = %snapshot.name, ?reason, "deployment not eligible for sync");
            metrics::record_pass(PassResult::Skipped);
            return Ok(None);
        }

        let assignment = build_assignment(snapshot);
        info!(
            deployment = %snapshot.name,
            namespace = %snapshot.namespace,
            image = %snapshot.image,
            targets = assignment.len(),
            "syncing deployment image to CronJobs"
        );

        let report = self
            .engine
            .apply(&assignment)
            .await
            .inspect_err(|_| metrics::record_pass(PassResult::ListFailed))?;
        metrics::record_pass(PassResult::Synced);

        info!(
            deployment = %snapshot.name,
            updated = report.updated().len(),
            would_update = report.would_update().len(),
            failed = report.failed().len(),
            "CronJob sync pass finished"
        );

        Ok(Some(report))
    }

    async fn dispatch(&self, snapshot: &WorkloadSnapshot) {
        if let Err(e) = self.reconcile(snapshot).await {
            error!(
                deployment = %snapshot.name,
                namespace = %snapshot.namespace,
                error = %e,
                "CronJob sync pass failed"
            );
        }
    }
}

fn snapshot_or_warn(deployment: &Deployment) -> Option<WorkloadSnapshot> {
    match WorkloadSnapshot::from_deployment(deployment) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(deployment = %deployment.name_any(), error = %e, "ignoring deployment");
            None
        }
    }
}

#[async_trait]
impl DeploymentHandler for ImageSyncHandler {
    async fn on_add(&self, deployment: &Deployment) {
        if let Some(snapshot) = snapshot_or_warn(deployment) {
            self.dispatch(&snapshot).await;
        }
    }

    async fn on_update(&self, previous: &Deployment, current: &Deployment) {
        let Some(current) = snapshot_or_warn(current) else {
            return;
        };

        let unchanged = WorkloadSnapshot::from_deployment(previous)
            .map(|prev| prev == current)
            .unwrap_or(false);
        if unchanged {
            trace!(deployment = %current.name, "deployment unchanged");
            return;
        }

        self.dispatch(&current).await;
    }
}

/// Lifecycle of the controller loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Constructed, not consuming events yet
    Created,
    /// Consuming events
    Running,
    /// Shutdown requested, finishing up
    Stopping,
    /// Loop exited
    Stopped,
}

/// Single-worker loop feeding Deployment events to a handler
pub struct Controller {
    handler: Arc<dyn DeploymentHandler>,
    state: watch::Sender<ControllerState>,
    store: Store<Deployment>,
    writer: Writer<Deployment>,
}

impl Controller {
    /// Create a controller in the `Created` state
    pub fn new(handler: Arc<dyn DeploymentHandler>) -> Self {
        let (store, writer) = reflector::store();
        let (state, _) = watch::channel(ControllerState::Created);
        Self {
            handler,
            state,
            store,
            writer,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ControllerState {
        *self.state.borrow()
    }

    /// Observe lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    /// Consume `events` until the stream ends or `shutdown` fires.
    ///
    /// Each event is fully handled before the next one is pulled. A shutdown
    /// that arrives mid-event moves the state to `Stopping` at once and lets
    /// the event finish.
    pub async fn run<S>(mut self, events: S, shutdown: CancellationToken)
    where
        S: Stream<Item = Result<watcher::Event<Deployment>, watcher::Error>>,
    {
        let mut events = std::pin::pin!(events);
        self.state.send_replace(ControllerState::Running);
        info!("listening for deployment changes");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("shutdown requested, no longer accepting deployment events");
                    break;
                }
                next = events.next() => match next {
                    Some(Ok(event)) => {
                        let handling = handle_event(
                            self.handler.as_ref(),
                            &self.store,
                            &mut self.writer,
                            event,
                        );
                        let mut handling = std::pin::pin!(handling);
                        tokio::select! {
                            biased;
                            () = &mut handling => {}
                            _ = shutdown.cancelled() => {
                                self.state.send_replace(ControllerState::Stopping);
                                info!("shutdown requested, finishing in-flight deployment event");
                                handling.await;
                            }
                        }
                    }
                    Some(Err(e)) => warn!(error = %e, "deployment watch error"),
                    None => {
                        warn!("deployment event stream ended");
                        break;
                    }
                },
            }
        }

        self.state.send_replace(ControllerState::Stopping);
        self.state.send_replace(ControllerState::Stopped);
        info!("controller stopped");
    }
}

/// Route one event to the handler, pairing updates with the cached object
async fn handle_event(
    handler: &dyn DeploymentHandler,
    store: &Store<Deployment>,
    writer: &mut Writer<Deployment>,
    event: watcher::Event<Deployment>,
) {
    match &event {
        watcher::Event::Apply(current) | watcher::Event::InitApply(current) => {
            let previous = store.get(&ObjectRef::from_obj(current));
            writer.apply_watcher_event(&event);
            match previous {
                Some(previous) => handler.on_update(&previous, current).await,
                None => handler.on_add(current).await,
            }
        }
        watcher::Event::Delete(deployment) => {
            debug!(deployment = %deployment.name_any(), "deployment deleted");
            writer.apply_watcher_event(&event);
        }
        watcher::Event::Init | watcher::Event::InitDone => {
            writer.apply_watcher_event(&event);
        }
    }
}

/// Watch Deployments in `namespace`, reconnecting with backoff on errors
pub fn deployment_events(
    client: Client,
    namespace: &str,
) -> impl Stream<Item = Result<watcher::Event<Deployment>, watcher::Error>> + Send {
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    watcher(api, watcher::Config::default().timeout(WATCH_TIMEOUT_SECS)).default_backoff()
}
