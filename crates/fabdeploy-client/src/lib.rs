//! # fabdeploy-client
//!
//! Resource client for the workspace/item control plane and the legacy
//! report/dataset surface.
//!
//! - [`control_plane::ControlPlane`]: one async call per remote endpoint
//! - [`rest::RestControlPlane`]: the HTTP implementation
//! - [`auth::CredentialCache`]: per-identity bearer tokens with timer refresh
//! - [`resource::ResourceClient`]: find-first creates, retries, identity rules
//! - [`jobs::JobPoller`]: bounded, cancellable polling of remote work

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod control_plane;
pub mod error;
pub mod jobs;
pub mod model;
pub mod resource;
pub mod rest;
pub mod retry;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::auth::{CredentialCache, LayeredTokenSource, TokenSource};
    pub use crate::control_plane::ControlPlane;
    pub use crate::error::{Error, Result};
    pub use crate::jobs::JobPoller;
    pub use crate::model::{Item, ItemDefinition, ItemDefinitionPart, ItemType, Workspace};
    pub use crate::resource::ResourceClient;
    pub use crate::rest::RestControlPlane;
}

pub use control_plane::ControlPlane;
pub use error::{Error, Result};
pub use resource::ResourceClient;
pub use rest::RestControlPlane;
