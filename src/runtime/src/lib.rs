//! Orca Build Runtime - image build implementation.
//!
//! This crate drives the external image tools to turn a Dockerfile and a
//! build context into an OCI image layout: path-safe filesystem helpers,
//! the tool front-end, and the build engine.

#![allow(clippy::result_large_err)]

pub mod fs;
pub mod oci;
pub mod process;

// Re-export common types
pub use oci::build::{build, BuildEngine, BuildResult, BuildState, Dockerfile, TagChain};
pub use oci::{ConfigDirective, OciTools, RuntimeConfig};
pub use process::{SystemRunner, ToolRunner};

/// Orca Build Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
