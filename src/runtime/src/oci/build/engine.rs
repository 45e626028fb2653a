//! Build engine for constructing OCI images from Dockerfiles.
//!
//! Orchestrates the build: reads and parses the Dockerfile, prepares the
//! layout, runs each step through its instruction handler while advancing
//! the tag chain, then tags the result and cleans up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use orca_core::config::BuildConfig;
use orca_core::error::{BuildError, Result};

use super::dockerfile::{BuildStep, Dockerfile};
use super::expand::expand_all;
use super::instructions::{self, BuildContext, InstructionKind, Step};
use super::state::BuildState;
use super::tags::sha256_hex;
use crate::fs::secure_join;
use crate::oci::runtime_config::RuntimeConfig;
use crate::oci::tools::OciTools;
use crate::process::{SystemRunner, ToolRunner};

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// OCI layout holding the image
    pub layout: PathBuf,
    /// Tags naming the final image inside the layout
    pub tags: Vec<String>,
    /// Number of Dockerfile steps executed
    pub steps: usize,
}

/// Drives one build against one layout.
pub struct BuildEngine<R> {
    config: BuildConfig,
    tools: OciTools<R>,
    dockerfile: Dockerfile,
    script_digest: String,
}

impl BuildEngine<SystemRunner> {
    /// Engine that runs the real external tools.
    pub fn from_config(config: BuildConfig) -> Result<Self> {
        Self::new(config, SystemRunner)
    }
}

impl<R: ToolRunner> BuildEngine<R> {
    /// Load the script from the build context and parse it.
    ///
    /// The script path is resolved inside the context directory, so a
    /// symlinked or `..`-laden path cannot point outside it.
    pub fn new(config: BuildConfig, runner: R) -> Result<Self> {
        let path = secure_join(&config.context_dir, &config.script)?;
        let content = std::fs::read_to_string(&path).map_err(|e| {
            BuildError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to read Dockerfile {}: {}", path.display(), e),
            ))
        })?;
        Self::with_script(config, runner, &content)
    }

    /// Build from script text that is already in memory.
    pub fn with_script(config: BuildConfig, runner: R, content: &str) -> Result<Self> {
        let dockerfile = Dockerfile::parse(content)?;
        let tools = OciTools::new(config.tools.clone(), runner);
        Ok(Self {
            config,
            tools,
            dockerfile,
            script_digest: sha256_hex(content),
        })
    }

    pub fn dockerfile(&self) -> &Dockerfile {
        &self.dockerfile
    }

    /// Fresh state: the configured layout (or a new temporary one) and the
    /// caller's build arguments.
    pub fn initial_state(&self) -> Result<BuildState> {
        let layout = match &self.config.layout {
            Some(layout) => layout.clone(),
            None => {
                let parent = tempfile::Builder::new()
                    .prefix("orca-build.")
                    .tempdir()?
                    .keep();
                parent.join("image")
            }
        };
        Ok(BuildState::new(
            layout,
            &self.script_digest,
            self.config.build_args.clone(),
        ))
    }

    /// Execute the full build.
    pub fn build(&self) -> Result<BuildResult> {
        let mut state = self.initial_state()?;
        self.run(&mut state)
    }

    /// Execute the full build against `state`, leaving it as the last step
    /// left it (also on failure).
    ///
    /// # Process
    ///
    /// 1. Run every step in order; the first failure stops the build
    /// 2. Tag the final image with each requested tag
    /// 3. Optionally remove intermediate tags and garbage-collect
    pub fn run(&self, state: &mut BuildState) -> Result<BuildResult> {
        let span = tracing::info_span!(
            "build",
            context = %self.config.context_dir.display(),
            layout = %state.layout.display()
        );
        let _guard = span.enter();

        let total = self.dockerfile.len();
        tracing::info!(steps = total, "Starting build");

        for (idx, build_step) in self.dockerfile.steps.iter().enumerate() {
            tracing::info!(
                "Step {}/{}: {} {}",
                idx + 1,
                total,
                build_step.command.to_uppercase(),
                build_step.args.join(" ")
            );
            self.execute_step(state, build_step)
                .map_err(|e| BuildError::StepFailed {
                    index: idx + 1,
                    command: build_step.command.to_uppercase(),
                    source: Box::new(e),
                })?;
        }

        let result = self.finish(state, total)?;
        tracing::info!(
            layout = %result.layout.display(),
            tags = ?result.tags,
            "Successfully built image"
        );
        Ok(result)
    }

    /// Expand, tag and dispatch one step.
    fn execute_step(&self, state: &mut BuildState, build_step: &BuildStep) -> Result<()> {
        let kind: InstructionKind = build_step.command.parse()?;

        let (args, runtime) = if kind.expands_variables() {
            let runtime = self.source_runtime_config(state)?;
            let vars = variables(&state.build_args, &runtime);
            (expand_all(&build_step.args, &vars)?, Some(runtime))
        } else {
            (build_step.args.clone(), None)
        };

        if kind.produces_image() {
            let destination = state.chain.next_destination()?;
            tracing::debug!(%destination, "Writing step image");
        }

        let step = Step {
            kind,
            args,
            json_form: build_step.json_form,
            runtime,
        };
        let ctx = BuildContext {
            config: &self.config,
            tools: &self.tools,
        };
        match instructions::dispatch(&ctx, state, &step) {
            Ok(()) => {
                state.chain.commit();
                Ok(())
            }
            Err(e) => {
                state.chain.abort();
                Err(e)
            }
        }
    }

    /// Runtime config of the current source image.
    fn source_runtime_config(&self, state: &BuildState) -> Result<RuntimeConfig> {
        let (source, _) = state.tags()?;
        let dir = tempfile::Builder::new()
            .prefix("orca-config.")
            .tempdir()?;
        let path = dir.path().join("config.json");
        self.tools
            .raw_runtime_config(&state.layout, source, &path)?;
        RuntimeConfig::load(&path)
    }

    /// Apply output tags, then optional cleanup and garbage collection.
    fn finish(&self, state: &BuildState, steps: usize) -> Result<BuildResult> {
        let final_tag = state
            .chain
            .source()
            .ok_or_else(|| BuildError::FormatError("build produced no image".to_string()))?
            .to_string();

        let tags = if self.config.tags.is_empty() {
            vec![final_tag]
        } else {
            for tag in &self.config.tags {
                tracing::debug!(%tag, "Tagging final image");
                self.tools.tag(&state.layout, &final_tag, tag)?;
            }
            self.config.tags.clone()
        };

        if self.config.cleanup {
            remove_intermediate(&self.tools, &state.layout, state.chain.owned(), &tags)?;
        }
        if self.config.gc {
            self.tools.gc(&state.layout)?;
        }

        Ok(BuildResult {
            layout: state.layout.clone(),
            tags,
            steps,
        })
    }
}

/// Convenience wrapper: build with the real tools.
pub fn build(config: BuildConfig) -> Result<BuildResult> {
    BuildEngine::from_config(config)?.build()
}

/// Variables visible to expansion: build arguments, overridden by the
/// source image's environment.
fn variables(build_args: &HashMap<String, String>, runtime: &RuntimeConfig) -> HashMap<String, String> {
    let mut vars = build_args.clone();
    vars.extend(runtime.env());
    vars
}

fn remove_intermediate<R: ToolRunner>(
    tools: &OciTools<R>,
    layout: &Path,
    owned: &[String],
    keep: &[String],
) -> Result<()> {
    for tag in owned.iter().filter(|t| !keep.contains(t)) {
        tracing::debug!(%tag, "Removing intermediate tag");
        tools.remove(layout, tag)?;
    }
    Ok(())
}
