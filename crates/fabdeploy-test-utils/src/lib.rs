//! Shared test utilities for fabdeploy integration tests.
//!
//! This crate provides:
//! - [`MemoryControlPlane`]: an in-memory control plane with call recording,
//!   scripted job and refresh outcomes, and fault injection
//! - [`TemplateFixture`]: a temporary template tree with every file the
//!   flows read
//! - [`TestContext`]: a resource client wired to both
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use fabdeploy_flow::FlowKind;
//! use fabdeploy_test_utils::TestContext;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let ctx = TestContext::new();
//!     let outcome = ctx.orchestrator().deploy(FlowKind::Hybrid, "Contoso").await.unwrap();
//!     assert!(outcome.workspace_created);
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod memory;

pub use assertions::*;
pub use fixtures::*;
pub use memory::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("fabdeploy=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
