//! `orca-build` command - Build an image from a Dockerfile.
//!
//! Validates the build context, assembles a `BuildConfig` from the flags and
//! runs the build engine against the external image tools.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;
use orca_core::config::{BuildConfig, ToolPaths};
use orca_core::error::BuildError;
use orca_runtime::oci::tools::image_ref;
use orca_runtime::BuildEngine;

#[derive(Args)]
pub struct BuildArgs {
    /// Build context directory (contains the Dockerfile and source files)
    pub context: String,

    /// Dockerfile name, resolved inside the context directory
    #[arg(short = 'f', long = "file", default_value = orca_core::DEFAULT_SCRIPT)]
    pub file: String,

    /// OCI layout to build into (default: a new temporary directory)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Tag for the final image, can be repeated
    #[arg(short = 't', long = "tag")]
    pub tag: Vec<String>,

    /// Set build-time variables (KEY=VALUE), can be repeated
    #[arg(long = "build-arg")]
    pub build_arg: Vec<String>,

    /// Remove intermediate tags once the build finishes
    #[arg(long)]
    pub cleanup: bool,

    /// Garbage-collect unreferenced blobs once the build finishes
    #[arg(long)]
    pub gc: bool,

    /// Unpack and run without root (implied when not running as root)
    #[arg(long)]
    pub rootless: bool,

    /// State directory for runc (default in rootless mode: $XDG_RUNTIME_DIR/orca-build/runc)
    #[arg(long = "runc-root")]
    pub runc_root: Option<PathBuf>,

    /// Keep unpacked bundles for debugging
    #[arg(long = "keep-bundles")]
    pub keep_bundles: bool,

    /// skopeo executable
    #[arg(long, env = "ORCA_SKOPEO", default_value = "skopeo")]
    pub skopeo: PathBuf,

    /// umoci executable
    #[arg(long, env = "ORCA_UMOCI", default_value = "umoci")]
    pub umoci: PathBuf,

    /// runc executable
    #[arg(long, env = "ORCA_RUNC", default_value = "runc")]
    pub runc: PathBuf,
}

pub fn execute(args: BuildArgs) -> Result<(), Box<dyn std::error::Error>> {
    let context_dir = PathBuf::from(&args.context)
        .canonicalize()
        .map_err(|e| format!("Invalid build context path '{}': {}", args.context, e))?;

    if !context_dir.is_dir() {
        return Err(format!(
            "Build context '{}' is not a directory",
            context_dir.display()
        )
        .into());
    }

    let config = build_config(args, context_dir, running_as_root())?;
    tracing::debug!(?config, "Build configuration");

    let engine = BuildEngine::from_config(config)?;
    let result = engine.build()?;

    for tag in &result.tags {
        println!("{}", image_ref(&result.layout, tag));
    }

    Ok(())
}

/// Turn parsed flags into a build configuration.
fn build_config(
    args: BuildArgs,
    context_dir: PathBuf,
    as_root: bool,
) -> orca_core::Result<BuildConfig> {
    let build_args = parse_build_args(&args.build_arg).map_err(BuildError::ConfigError)?;
    let rootless = args.rootless || !as_root;
    let runc_root = match args.runc_root {
        Some(root) => Some(root),
        None if rootless => default_runc_root(),
        None => None,
    };

    Ok(BuildConfig {
        context_dir,
        script: PathBuf::from(args.file),
        layout: args.output,
        tags: args.tag,
        build_args,
        cleanup: args.cleanup,
        gc: args.gc,
        rootless,
        runc_root,
        keep_bundles: args.keep_bundles,
        tools: ToolPaths {
            skopeo: args.skopeo,
            umoci: args.umoci,
            runc: args.runc,
        },
    })
}

/// Parse KEY=VALUE pairs into a HashMap.
pub fn parse_build_args(args: &[String]) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("Invalid build arg (expected KEY=VALUE): {arg}"))?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Per-user runc state directory, so rootless runs never touch /run/runc.
fn default_runc_root() -> Option<PathBuf> {
    dirs::runtime_dir().map(|dir| dir.join("orca-build").join("runc"))
}
