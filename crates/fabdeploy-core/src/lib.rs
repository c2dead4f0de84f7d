//! # fabdeploy-core
//!
//! Shared primitives for the fabdeploy provisioning tool.
//!
//! - **Identifiers**: strongly-typed UUID identifiers for remote resources
//! - **Identities**: the execution identities a deployment switches between
//! - **Configuration**: layered settings (defaults, YAML file, environment, secret store)
//! - **Error Types**: configuration and identifier errors
//! - **Observability**: logging initialisation, span helpers and secret redaction
//!
//! ## Example
//!
//! ```rust
//! use fabdeploy_core::prelude::*;
//!
//! let workspace: WorkspaceId = "6f1c2a4e-0c3b-4f55-9f7e-2d9a1b0c3d4e".parse().unwrap();
//! assert!(!workspace.is_nil());
//! assert_eq!(
//!     AuthenticationMode::ServicePrincipal.provisioning_identity(),
//!     ExecutionIdentity::ServicePrincipal,
//! );
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod environments;
pub mod error;
pub mod id;
pub mod identity;
pub mod observability;
pub mod secrets;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::environments::{DeploymentFlow, EnvironmentMap, EnvironmentTarget};
    pub use crate::error::{Error, Result};
    pub use crate::id::{
        CapacityId, ConnectionId, ItemId, JobId, PrincipalId, ProfileId, WorkspaceId,
    };
    pub use crate::identity::{AuthenticationMode, ExecutionIdentity, Principal, PrincipalType};
    pub use crate::observability::Redacted;
}

pub use config::Settings;
pub use environments::{DeploymentFlow, EnvironmentMap, EnvironmentTarget};
pub use error::{Error, Result};
pub use id::{CapacityId, ConnectionId, ItemId, JobId, PrincipalId, ProfileId, WorkspaceId};
pub use identity::{AuthenticationMode, ExecutionIdentity, Principal, PrincipalType};
pub use observability::{LogFormat, Redacted, init_logging};
