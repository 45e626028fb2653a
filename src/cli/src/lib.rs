//! Orca Build CLI - build OCI images from Dockerfiles.

pub mod commands;
