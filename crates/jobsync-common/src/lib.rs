//! Common types for jobsync: annotations, errors, and telemetry

#![deny(missing_docs)]

pub mod annotations;
pub mod error;
pub mod metrics;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager / user agent name used for API writes
pub const FIELD_MANAGER: &str = "jobsync-controller";
