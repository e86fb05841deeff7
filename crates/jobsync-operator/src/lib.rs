//! jobsync operator process
//!
//! Startup plumbing around the jobsync controller: flag and environment
//! parsing, Kubernetes credential resolution, health probes and signal
//! driven shutdown.

#![deny(missing_docs)]

pub mod config;
pub mod health;
pub mod startup;

pub use config::{Cli, OperatorConfig};
pub use health::{bind_health, health_router, serve_health};
pub use startup::{build_client, wait_for_shutdown_signal};
