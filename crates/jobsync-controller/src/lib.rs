//! Deployment → CronJob image synchronization
//!
//! Watches Deployments in one namespace. When an opted-in Deployment rolls out
//! a new generation, its first container image is copied onto every CronJob it
//! names in the `jobsync.k8s.io/jobs` annotation, provided that CronJob opted
//! in as well:
//! - `gate` decides whether a Deployment change is worth acting on
//! - `resolver` maps target CronJob names to the image
//! - `sync` lists CronJobs and writes the new image, tolerating per-CronJob failures
//! - `controller` drives the above from a watch stream with graceful shutdown

#![deny(missing_docs)]

pub mod client;
pub mod controller;
pub mod gate;
pub mod resolver;
pub mod snapshot;
pub mod sync;

pub use client::{CronJobClient, KubeCronJobClient};
pub use controller::{
    deployment_events, Controller, ControllerState, DeploymentHandler, ImageSyncHandler,
};
pub use resolver::{build_assignment, ImageAssignment};
pub use snapshot::WorkloadSnapshot;
pub use sync::{SyncEngine, SyncReport, TargetOutcome, TargetResult};
