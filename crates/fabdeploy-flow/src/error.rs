//! Error types for deployment orchestration.

use std::path::PathBuf;

/// The result type used throughout fabdeploy-flow.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building definitions or running a deployment.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A substitution named a definition part that does not exist.
    #[error("definition part not found: {path}")]
    PartNotFound {
        /// Requested part path.
        path: String,
    },

    /// A replacement value contains one of the tokens being replaced.
    #[error("replacement values contain the token {token}")]
    OverlappingTokens {
        /// Offending token.
        token: String,
    },

    /// A required template file or folder is absent.
    #[error("template not found: {}", path.display())]
    TemplateMissing {
        /// Missing path.
        path: PathBuf,
    },

    /// A template exists but cannot be used.
    #[error("invalid template {}: {message}", path.display())]
    InvalidTemplate {
        /// Template path.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// A stage ran before a value it depends on was produced.
    #[error("stage {stage} needs {needs}, which no earlier stage produced")]
    MissingPrerequisite {
        /// Stage that ran.
        stage: String,
        /// Missing value.
        needs: String,
    },

    /// A resource the flow only looks up does not exist.
    #[error("{kind} not found: {name}")]
    ResourceNotFound {
        /// Resource kind.
        kind: String,
        /// Name that was looked up.
        name: String,
    },

    /// The stage graph contains a cycle.
    #[error("cycle detected in stage graph: {cycle:?}")]
    CycleDetected {
        /// Stages on the cycle.
        cycle: Vec<String>,
    },

    /// A stage graph node was not found.
    #[error("stage graph node not found: {node}")]
    DagNodeNotFound {
        /// Node identifier.
        node: String,
    },

    /// A local file operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// What was being done.
        message: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A control-plane call failed.
    #[error(transparent)]
    Client(#[from] fabdeploy_client::Error),

    /// A configuration or identifier error.
    #[error(transparent)]
    Core(#[from] fabdeploy_core::Error),
}

impl Error {
    /// Creates an I/O error.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a missing prerequisite error.
    #[must_use]
    pub fn missing(stage: impl std::fmt::Display, needs: &str) -> Self {
        Self::MissingPrerequisite {
            stage: stage.to_string(),
            needs: needs.to_string(),
        }
    }

    /// Maps a file read failure to [`Error::TemplateMissing`] when the file
    /// does not exist.
    #[must_use]
    pub fn template_read(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::TemplateMissing { path }
        } else {
            Self::io(format!("reading {}", path.display()), source)
        }
    }
}
