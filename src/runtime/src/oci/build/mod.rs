//! Dockerfile build support.
//!
//! Parses a Dockerfile and replays it step by step against an OCI layout,
//! delegating image work to the external image tools.
//!
//! # Usage
//!
//! ```text
//! orca-build -t latest -o ./image .
//! ```
//!
//! # Supported Instructions
//!
//! FROM, RUN, COPY, ADD, CMD, ENTRYPOINT, ENV, LABEL, MAINTAINER, EXPOSE,
//! VOLUME, USER, WORKDIR, ARG, SHELL. STOPSIGNAL, ONBUILD and HEALTHCHECK
//! are accepted and ignored with a warning.

pub mod dockerfile;
pub mod engine;
pub mod expand;
pub mod instructions;
pub mod state;
pub mod tags;

pub use dockerfile::{BuildStep, Dockerfile};
pub use engine::{build, BuildEngine, BuildResult};
pub use expand::{expand, expand_all};
pub use instructions::InstructionKind;
pub use state::BuildState;
pub use tags::TagChain;
