//! Mutable state threaded through the build steps.

use std::collections::HashMap;
use std::path::PathBuf;

use orca_core::error::{BuildError, Result};

use super::tags::TagChain;

/// Shell used for shell-form RUN, CMD and ENTRYPOINT until SHELL changes it.
pub const DEFAULT_SHELL: [&str; 2] = ["/bin/sh", "-c"];

/// State accumulated while executing a build.
#[derive(Debug, Clone)]
pub struct BuildState {
    /// OCI layout every intermediate image lives in.
    pub layout: PathBuf,
    /// Intermediate image tags.
    pub chain: TagChain,
    /// Build arguments: caller values first, then ARG defaults.
    pub build_args: HashMap<String, String>,
    /// Current shell prefix.
    pub shell: Vec<String>,
}

impl BuildState {
    pub fn new(layout: PathBuf, seed: &str, build_args: HashMap<String, String>) -> Self {
        Self {
            layout,
            chain: TagChain::new(seed),
            build_args,
            shell: DEFAULT_SHELL.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Exec-form arguments as-is; shell-form arguments joined behind the shell.
    pub fn with_shell(&self, args: &[String], json_form: bool) -> Vec<String> {
        if json_form {
            return args.to_vec();
        }
        let mut full = self.shell.clone();
        full.push(args.join(" "));
        full
    }

    /// Current `(source, destination)` tags of an image-producing step.
    pub fn tags(&self) -> Result<(&str, &str)> {
        let source = self.chain.source().ok_or_else(|| {
            BuildError::FormatError("no base image: FROM must come first".to_string())
        })?;
        let destination = self.chain.destination().unwrap_or(source);
        Ok((source, destination))
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(PathBuf::from("/layout"), "seed", HashMap::new())
    }
}
