//! # fabdeploy-flow
//!
//! Deployment orchestration on top of `fabdeploy-client`.
//!
//! - [`template`]: token substitution in item definition parts and text
//! - [`definitions`]: item definitions assembled from template files
//! - [`stage`]: deployment stages and the graph that orders them
//! - [`orchestrator`]: the flows, run stage by stage with find-or-create
//! - [`embed`]: the embedding page and the viewer that opens it
//!
//! ## Example
//!
//! ```rust
//! use fabdeploy_flow::prelude::*;
//!
//! let order = StageGraph::for_flow(FlowKind::EmbedOnly)?.order()?;
//! assert_eq!(
//!     order,
//!     vec![Stage::ResolveWorkspace, Stage::ResolveReport, Stage::GenerateEmbedPage],
//! );
//! # Ok::<(), fabdeploy_flow::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dag;
pub mod definitions;
pub mod embed;
pub mod error;
pub mod orchestrator;
pub mod stage;
pub mod template;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::definitions::TemplateLibrary;
    pub use crate::embed::{BrowserViewer, EmbeddingPageGenerator, NoViewer, Viewer};
    pub use crate::error::{Error, Result};
    pub use crate::orchestrator::{
        Blueprint, DeploymentOutcome, DeploymentState, Orchestrator, WorkspacePolicy,
    };
    pub use crate::stage::{FlowKind, Stage, StageGraph};
    pub use crate::template::{Substitutions, substitute_part, substitute_text};
}

pub use error::{Error, Result};
pub use orchestrator::{DeploymentOutcome, Orchestrator};
pub use stage::FlowKind;
