//! Error types for control-plane calls and job polling.

use std::time::Duration;

use fabdeploy_core::ExecutionIdentity;

/// The result type used throughout fabdeploy-client.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the resource client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The control plane answered a synchronous call with a non-2xx status.
    #[error("{operation} failed ({status}): {message}")]
    RemoteCall {
        /// Logical operation name.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Remote error message, or the raw body.
        message: String,
    },

    /// The request never produced a response.
    #[error("{operation} transport error: {message}")]
    Transport {
        /// Logical operation name.
        operation: String,
        /// Description of the failure.
        message: String,
    },

    /// A job trigger was not acknowledged as accepted.
    #[error("{operation} was not accepted (status {status})")]
    JobStart {
        /// Logical operation name.
        operation: String,
        /// Status the trigger returned.
        status: u16,
    },

    /// A polled job reached a failed terminal state.
    #[error("job {job_id} failed: {reason}")]
    JobExecution {
        /// Job, refresh or import handle.
        job_id: String,
        /// Remote failure reason.
        reason: String,
    },

    /// A polled job did not finish before its deadline.
    #[error("job {job_id} did not finish within {waited:?}")]
    JobTimeout {
        /// Job, refresh or import handle.
        job_id: String,
        /// Time spent waiting.
        waited: Duration,
    },

    /// The run was cancelled while waiting.
    #[error("{operation} cancelled")]
    Cancelled {
        /// Logical operation name.
        operation: String,
    },

    /// The capability is not available on the current API surface.
    #[error("not supported: {capability}")]
    NotSupported {
        /// Capability name.
        capability: String,
    },

    /// The workspace could not be assigned to the capacity.
    #[error("failed to assign capacity {capacity_id}: {message}")]
    CapacityAssignment {
        /// Target capacity.
        capacity_id: String,
        /// Underlying failure.
        message: String,
    },

    /// A call was made under an identity whose credentials were never configured.
    #[error("no credentials configured for identity {identity}")]
    IdentityUnavailable {
        /// The identity requested.
        identity: ExecutionIdentity,
    },

    /// A response could not be decoded or lacked a required field.
    #[error("{operation} returned a malformed response: {message}")]
    MalformedResponse {
        /// Logical operation name.
        operation: String,
        /// Description of what was wrong.
        message: String,
    },

    /// Configuration or identifier error.
    #[error(transparent)]
    Core(#[from] fabdeploy_core::Error),
}

impl Error {
    /// Creates a remote call error.
    #[must_use]
    pub fn remote(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::RemoteCall {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a malformed response error.
    #[must_use]
    pub fn malformed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a not-supported error.
    #[must_use]
    pub fn not_supported(capability: impl Into<String>) -> Self {
        Self::NotSupported {
            capability: capability.into(),
        }
    }

    /// Returns true for failures worth retrying: throttling, server errors,
    /// request timeouts and transport failures.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::RemoteCall { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            Self::Transport { .. } => true,
            _ => false,
        }
    }

    /// Returns the HTTP status of a remote call error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteCall { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(Error::remote("list items", 429, "slow down").is_transient());
        assert!(Error::remote("list items", 503, "unavailable").is_transient());
        assert!(!Error::remote("create item", 409, "exists").is_transient());
        assert!(
            Error::Transport {
                operation: "list items".into(),
                message: "reset".into()
            }
            .is_transient()
        );
        assert!(!Error::not_supported("list lakehouse tables").is_transient());
    }

    #[test]
    fn job_errors_are_distinct() {
        let execution = Error::JobExecution {
            job_id: "j1".into(),
            reason: "boom".into(),
        };
        let timeout = Error::JobTimeout {
            job_id: "j1".into(),
            waited: Duration::from_secs(60),
        };
        assert_eq!(execution.to_string(), "job j1 failed: boom");
        assert!(timeout.to_string().contains("did not finish"));
    }

    #[test]
    fn identity_unavailable_names_identity() {
        let err = Error::IdentityUnavailable {
            identity: ExecutionIdentity::DelegatedUser,
        };
        assert_eq!(
            err.to_string(),
            "no credentials configured for identity delegated_user"
        );
    }
}
