//! CLI command implementations.

pub mod capacities;
pub mod deploy;
pub mod embed;
pub mod profiles;
pub mod workspaces;
