use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default build script name inside the context directory.
pub const DEFAULT_SCRIPT: &str = "Dockerfile";

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Build context directory; host files outside it are unreachable
    pub context_dir: PathBuf,

    /// Build script path, relative to the context directory
    pub script: PathBuf,

    /// OCI layout to build into (a fresh temporary layout when unset)
    pub layout: Option<PathBuf>,

    /// Tags applied to the final image
    pub tags: Vec<String>,

    /// Caller-supplied build arguments; these win over ARG defaults
    pub build_args: HashMap<String, String>,

    /// Remove every intermediate tag this build created
    pub cleanup: bool,

    /// Garbage-collect unreferenced blobs after the build
    pub gc: bool,

    /// Unpack and run without elevated privileges
    pub rootless: bool,

    /// State directory handed to the runtime tool (`--root`)
    pub runc_root: Option<PathBuf>,

    /// Keep unpacked bundles instead of removing them after each step
    pub keep_bundles: bool,

    /// External tool locations
    pub tools: ToolPaths,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            context_dir: PathBuf::from("."),
            script: PathBuf::from(DEFAULT_SCRIPT),
            layout: None,
            tags: Vec::new(),
            build_args: HashMap::new(),
            cleanup: false,
            gc: false,
            rootless: false,
            runc_root: None,
            keep_bundles: false,
            tools: ToolPaths::default(),
        }
    }
}

/// Locations of the three external tools driven by a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Registry-copy tool
    pub skopeo: PathBuf,

    /// Image layout and config tool
    pub umoci: PathBuf,

    /// Container runtime
    pub runc: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            skopeo: PathBuf::from("skopeo"),
            umoci: PathBuf::from("umoci"),
            runc: PathBuf::from("runc"),
        }
    }
}
