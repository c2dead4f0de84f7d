//! Error types and result aliases shared by every fabdeploy crate.
//!
//! Only failures that can happen before any remote call lives here:
//! configuration problems and malformed identifiers. Remote and job
//! failures are defined by `fabdeploy-client`.

/// The result type used throughout fabdeploy-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or parsing identifiers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required setting or secret is missing or invalid. Fatal at startup.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the missing or invalid setting.
        message: String,
    },

    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// A local file could not be read.
    #[error("io error: {message}")]
    Io {
        /// Description of the failed operation.
        message: String,
        /// The underlying cause.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new io error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn configuration_error_display() {
        let err = Error::configuration("FABDEPLOY_CAPACITY_ID is required");
        assert_eq!(
            err.to_string(),
            "configuration error: FABDEPLOY_CAPACITY_ID is required"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io("failed to read config.yaml", source);
        assert!(err.to_string().contains("config.yaml"));
        assert!(StdError::source(&err).is_some());
    }
}
