//! Orca Core - Shared Types
//!
//! Error taxonomy, build configuration, log levels and the external tool
//! invocation value used across the orca-build crates.

pub mod config;
pub mod error;
pub mod exec;
pub mod log;

// Re-export commonly used types
pub use config::{BuildConfig, ToolPaths, DEFAULT_SCRIPT};
pub use error::{BuildError, Result};
pub use exec::ToolInvocation;
pub use log::LogLevel;

/// orca-build version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
