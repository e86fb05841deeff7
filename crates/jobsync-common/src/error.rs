//! Error types for jobsync
//!
//! Errors carry the resource names involved so that a single log line is
//! enough to tell which Deployment or CronJob a failure belongs to.

use thiserror::Error;

/// Main error type for jobsync operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A workload has no container to read or write an image on
    #[error("{kind} {name} has no container image")]
    MissingContainer {
        /// Resource kind (Deployment, CronJob)
        kind: &'static str,
        /// Resource name
        name: String,
    },

    /// Invalid operator configuration
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "client", "controller")
        context: String,
    },
}

impl Error {
    /// Create a missing-container error for the given resource
    pub fn missing_container(kind: &'static str, name: impl Into<String>) -> Self {
        Self::MissingContainer {
            kind,
            name: name.into(),
        }
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// True when the API server rejected a write because the object changed
    /// since it was read (HTTP 409)
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Kube {
                source: kube::Error::Api(ae)
            } if ae.code == 409
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16, reason: &str) -> Error {
        Error::from(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{} from api server", reason),
            reason: reason.to_string(),
            code,
        }))
    }

    #[test]
    fn conflict_detected_from_409() {
        assert!(api_error(409, "Conflict").is_conflict());
    }

    #[test]
    fn other_api_errors_are_not_conflicts() {
        assert!(!api_error(403, "Forbidden").is_conflict());
        assert!(!api_error(404, "NotFound").is_conflict());
        assert!(!Error::config("namespace is empty").is_conflict());
    }

    #[test]
    fn missing_container_message_names_resource() {
        let err = Error::missing_container("CronJob", "nightly-report");
        assert_eq!(err.to_string(), "CronJob nightly-report has no container image");
    }

    #[test]
    fn internal_error_formats_context() {
        let err = Error::internal_with_context("controller", "event stream closed");
        assert_eq!(
            err.to_string(),
            "internal error [controller]: event stream closed"
        );
    }
}
