//! OCI image building on top of external image tools.
//!
//! ```text
//! ┌──────────────┐   skopeo copy    ┌──────────────────────────────┐
//! │   Registry   │ ───────────────▶ │          OCI layout          │
//! └──────────────┘                  │  index.json  blobs/sha256/   │
//!                                   └──────────────────────────────┘
//!                                      ▲ repack / config      │ unpack
//!                                      │                      ▼
//!                                   ┌──────────────────────────────┐
//!                                   │  bundle/config.json rootfs/  │ ◀── runc run
//!                                   └──────────────────────────────┘
//! ```

pub mod build;
pub mod runtime_config;
pub mod tools;

pub use build::{BuildEngine, BuildResult, Dockerfile};
pub use runtime_config::RuntimeConfig;
pub use tools::{ConfigDirective, OciTools};
