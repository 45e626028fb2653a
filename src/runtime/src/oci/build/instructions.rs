//! Instruction handlers.
//!
//! Each Dockerfile instruction maps to one [`InstructionKind`] and one
//! handler. A handler validates its arguments first, then performs exactly
//! one image-producing action: a registry copy, an `umoci config`, or an
//! unpack / modify / repack cycle.

use std::path::{Path, PathBuf};

use orca_core::config::BuildConfig;
use orca_core::error::{BuildError, Result};
use tempfile::TempDir;

use super::state::BuildState;
use crate::fs::{clean, copy_into, secure_join};
use crate::oci::runtime_config::RuntimeConfig;
use crate::oci::tools::{ConfigDirective, OciTools};
use crate::process::ToolRunner;

/// Base image name that starts from an empty image instead of a registry copy.
pub const SCRATCH: &str = "scratch";

/// Every supported Dockerfile instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    From,
    Run,
    Copy,
    Add,
    Cmd,
    Entrypoint,
    Env,
    Label,
    Maintainer,
    Expose,
    Volume,
    User,
    Workdir,
    Arg,
    Shell,
    StopSignal,
    OnBuild,
    HealthCheck,
}

impl InstructionKind {
    /// Lowercase instruction name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::From => "from",
            Self::Run => "run",
            Self::Copy => "copy",
            Self::Add => "add",
            Self::Cmd => "cmd",
            Self::Entrypoint => "entrypoint",
            Self::Env => "env",
            Self::Label => "label",
            Self::Maintainer => "maintainer",
            Self::Expose => "expose",
            Self::Volume => "volume",
            Self::User => "user",
            Self::Workdir => "workdir",
            Self::Arg => "arg",
            Self::Shell => "shell",
            Self::StopSignal => "stopsignal",
            Self::OnBuild => "onbuild",
            Self::HealthCheck => "healthcheck",
        }
    }

    /// Arguments are run through variable expansion before the handler.
    pub fn expands_variables(&self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Copy
                | Self::Env
                | Self::Expose
                | Self::Label
                | Self::User
                | Self::Workdir
                | Self::Volume
                | Self::StopSignal
        )
    }

    /// The handler writes a new image under a fresh destination tag.
    ///
    /// `from` creates the chain's first tag itself; the build-state-only
    /// and warning-only instructions leave the chain where it is.
    pub fn produces_image(&self) -> bool {
        !matches!(
            self,
            Self::From
                | Self::Arg
                | Self::Shell
                | Self::StopSignal
                | Self::OnBuild
                | Self::HealthCheck
        )
    }
}

impl std::fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for InstructionKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "from" => Self::From,
            "run" => Self::Run,
            "copy" => Self::Copy,
            "add" => Self::Add,
            "cmd" => Self::Cmd,
            "entrypoint" => Self::Entrypoint,
            "env" => Self::Env,
            "label" => Self::Label,
            "maintainer" => Self::Maintainer,
            "expose" => Self::Expose,
            "volume" => Self::Volume,
            "user" => Self::User,
            "workdir" => Self::Workdir,
            "arg" => Self::Arg,
            "shell" => Self::Shell,
            "stopsignal" => Self::StopSignal,
            "onbuild" => Self::OnBuild,
            "healthcheck" => Self::HealthCheck,
            _ => {
                return Err(BuildError::FormatError(format!(
                    "unknown build command {}",
                    s
                )))
            }
        })
    }
}

/// Everything a handler reads but does not own.
pub struct BuildContext<'a, R> {
    pub config: &'a BuildConfig,
    pub tools: &'a OciTools<R>,
}

/// One instruction ready for its handler: arguments are already expanded.
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: InstructionKind,
    pub args: Vec<String>,
    pub json_form: bool,
    /// Runtime config of the source image, when it was read for expansion.
    pub runtime: Option<RuntimeConfig>,
}

impl Step {
    fn upper(&self) -> String {
        self.kind.name().to_uppercase()
    }

    fn exactly(&self, n: usize) -> Result<()> {
        if self.args.len() != n {
            return Err(BuildError::FormatError(format!(
                "{} requires exactly {} argument{}, got {:?}",
                self.upper(),
                n,
                if n == 1 { "" } else { "s" },
                self.args
            )));
        }
        Ok(())
    }

    fn at_least(&self, n: usize) -> Result<()> {
        if self.args.len() < n {
            return Err(BuildError::FormatError(format!(
                "{} requires at least {} argument{}",
                self.upper(),
                n,
                if n == 1 { "" } else { "s" }
            )));
        }
        Ok(())
    }

    fn no_json(&self) -> Result<()> {
        if self.json_form {
            return Err(BuildError::FormatError(format!(
                "{} does not accept the JSON form",
                self.upper()
            )));
        }
        Ok(())
    }
}

/// Run the handler for `step`.
pub fn dispatch<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    match step.kind {
        InstructionKind::From => handle_from(ctx, state, step),
        InstructionKind::Run => handle_run(ctx, state, step),
        InstructionKind::Copy => handle_copy(ctx, state, step),
        InstructionKind::Add => handle_add(ctx, state, step),
        InstructionKind::Cmd => handle_command_field(ctx, state, step, "cmd"),
        InstructionKind::Entrypoint => handle_command_field(ctx, state, step, "entrypoint"),
        InstructionKind::Env => handle_env(ctx, state, step),
        InstructionKind::Label => handle_label(ctx, state, step),
        InstructionKind::Maintainer => handle_maintainer(ctx, state, step),
        InstructionKind::Expose => handle_expose(ctx, state, step),
        InstructionKind::Volume => handle_volume(ctx, state, step),
        InstructionKind::User => handle_user(ctx, state, step),
        InstructionKind::Workdir => handle_workdir(ctx, state, step),
        InstructionKind::Arg => handle_arg(state, step),
        InstructionKind::Shell => handle_shell(state, step),
        InstructionKind::StopSignal => handle_stopsignal(step),
        InstructionKind::OnBuild | InstructionKind::HealthCheck => handle_unsupported(step),
    }
}

// =============================================================================
// Image-producing handlers
// =============================================================================

/// FROM: import the base image (or create an empty one for `scratch`).
fn handle_from<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    if state.chain.is_started() {
        return Err(BuildError::FormatError(
            "FROM must be the first instruction (multi-stage builds are not supported)"
                .to_string(),
        ));
    }
    step.no_json()?;
    step.exactly(1)?;

    let reference = &step.args[0];
    let source = format!("docker://{}", reference);
    let tag = state.chain.start(&source);

    if reference == SCRATCH {
        ensure_layout(ctx, &state.layout)?;
        ctx.tools.new_image(&state.layout, &tag)
    } else {
        ctx.tools.copy_image(&source, &state.layout, &tag)
    }
}

/// `umoci new` needs an initialized layout. An empty directory is replaced
/// by one; anything else without an `index.json` is refused.
fn ensure_layout<R: ToolRunner>(ctx: &BuildContext<'_, R>, layout: &Path) -> Result<()> {
    if layout.join("index.json").exists() {
        return Ok(());
    }
    if layout.exists() {
        std::fs::remove_dir(layout).map_err(|e| {
            BuildError::ConfigError(format!(
                "{} exists and is not an OCI layout: {}",
                layout.display(),
                e
            ))
        })?;
    }
    ctx.tools.init_layout(layout)
}

/// RUN: execute a command inside the unpacked source image.
fn handle_run<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    step.at_least(1)?;

    let bundle = Bundle::unpack(ctx, state)?;

    let mut config = RuntimeConfig::load(&bundle.config_path())?;
    config.set_args(state.with_shell(&step.args, step.json_form))?;
    config.set_readonly_root(false)?;
    config.set_terminal(false)?;
    config.merge_env(&state.build_args)?;
    config.save(&bundle.config_path())?;

    let id = format!("orca-build-{}", uuid::Uuid::new_v4());
    ctx.tools
        .run_container(ctx.config.runc_root.as_deref(), bundle.path(), &id)?;

    bundle.repack(ctx, state)
}

/// COPY: copy a file or tree from the build context into the image.
fn handle_copy<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    step.exactly(2)?;
    let (src_arg, dst_arg) = (&step.args[0], &step.args[1]);

    let bundle = Bundle::unpack(ctx, state)?;

    let context = &ctx.config.context_dir;
    let src = secure_join(context, Path::new(src_arg))?;
    if std::fs::symlink_metadata(&src).is_err() {
        return Err(BuildError::InvalidPath(format!(
            "COPY source {} not found in build context {}",
            src_arg,
            context.display()
        )));
    }

    let dst_path = if dst_arg.starts_with('/') {
        dst_arg.clone()
    } else {
        let cwd = RuntimeConfig::load(&bundle.config_path())?.cwd();
        format!("{}/{}", cwd, dst_arg)
    };
    let rootfs = bundle.rootfs_path();
    let dst = secure_join(&rootfs, Path::new(&dst_path))?;
    if dst_arg.ends_with('/') {
        std::fs::create_dir_all(&dst)?;
    }

    if is_same_path(&src, context) && dst.is_dir() {
        // Copying the whole context merges its contents into the destination.
        for entry in std::fs::read_dir(&src)? {
            copy_into(&entry?.path(), &rootfs, &dst)?;
        }
    } else {
        copy_into(&src, &rootfs, &dst)?;
    }
    tracing::debug!(src = %src.display(), dst = %dst.display(), "Copied into image");

    bundle.repack(ctx, state)
}

/// ADD: COPY without remote fetches or archive extraction.
fn handle_add<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    tracing::warn!(
        "ADD does not implement remote downloads or archive decompression; behaving like COPY"
    );
    handle_copy(ctx, state, step)
}

/// CMD / ENTRYPOINT: set or clear the configured command.
fn handle_command_field<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
    field: &'static str,
) -> Result<()> {
    let directives = if step.args.is_empty() {
        vec![ConfigDirective::clear(field)]
    } else {
        if !step.json_form {
            tracing::warn!(
                instruction = %step.upper(),
                "Shell form does not reproduce Docker's CMD/ENTRYPOINT interaction; prefer the JSON form"
            );
        }
        state
            .with_shell(&step.args, step.json_form)
            .into_iter()
            .map(|arg| ConfigDirective::set(field, arg))
            .collect()
    };
    apply_config(ctx, state, &directives)
}

/// ENV: `KEY=VALUE...` or the legacy `KEY VALUE...` form.
fn handle_env<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    step.no_json()?;
    step.at_least(1)?;

    let directives = if step.args[0].contains('=') {
        step.args
            .iter()
            .map(|arg| {
                if arg.contains('=') {
                    Ok(ConfigDirective::set("env", arg.clone()))
                } else {
                    Err(BuildError::FormatError(format!(
                        "ENV arguments must all be KEY=VALUE, got {}",
                        arg
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        step.at_least(2)?;
        let value = step.args[1..].join(" ");
        vec![ConfigDirective::set(
            "env",
            format!("{}={}", step.args[0], value),
        )]
    };
    apply_config(ctx, state, &directives)
}

/// LABEL: one `--config.label` per `key=value`.
fn handle_label<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    step.no_json()?;
    step.at_least(1)?;

    let directives = step
        .args
        .iter()
        .map(|arg| {
            if arg.contains('=') {
                Ok(ConfigDirective::set("label", arg.clone()))
            } else {
                Err(BuildError::FormatError(format!(
                    "LABEL arguments must be key=value, got {}",
                    arg
                )))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    apply_config(ctx, state, &directives)
}

/// MAINTAINER: sets the author and the conventional `maintainer` label.
fn handle_maintainer<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    step.no_json()?;
    step.at_least(1)?;

    let author = step.args.join(" ");
    apply_config(
        ctx,
        state,
        &[
            ConfigDirective::Author(author.clone()),
            ConfigDirective::set("label", format!("maintainer={}", author)),
        ],
    )
}

fn handle_expose<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    step.no_json()?;
    step.at_least(1)?;

    let directives: Vec<_> = step
        .args
        .iter()
        .map(|port| ConfigDirective::set("exposedports", port.clone()))
        .collect();
    apply_config(ctx, state, &directives)
}

/// VOLUME: the JSON form is allowed here.
fn handle_volume<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    step.at_least(1)?;

    let directives: Vec<_> = step
        .args
        .iter()
        .map(|volume| ConfigDirective::set("volume", volume.clone()))
        .collect();
    apply_config(ctx, state, &directives)
}

fn handle_user<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    step.no_json()?;
    step.exactly(1)?;
    apply_config(ctx, state, &[ConfigDirective::set("user", step.args[0].clone())])
}

/// WORKDIR: relative paths resolve against the current working directory.
fn handle_workdir<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &mut BuildState,
    step: &Step,
) -> Result<()> {
    step.no_json()?;
    step.exactly(1)?;

    let path = &step.args[0];
    let workdir = if path.starts_with('/') {
        clean(path)
    } else {
        let cwd = step
            .runtime
            .as_ref()
            .map(RuntimeConfig::cwd)
            .unwrap_or_else(|| "/".to_string());
        clean(&format!("{}/{}", cwd, path))
    };
    apply_config(ctx, state, &[ConfigDirective::set("workdir", workdir)])
}

// =============================================================================
// Build-state and warning-only handlers
// =============================================================================

/// ARG: record a default; values already present always win.
fn handle_arg(state: &mut BuildState, step: &Step) -> Result<()> {
    step.no_json()?;
    step.exactly(1)?;

    match step.args[0].split_once('=') {
        Some((name, value)) => {
            if state.build_args.contains_key(name) {
                tracing::debug!(name, "Build argument already set, keeping existing value");
            } else {
                state
                    .build_args
                    .insert(name.to_string(), value.to_string());
            }
        }
        None => {
            tracing::debug!(name = %step.args[0], "ARG without default, nothing to do");
        }
    }
    Ok(())
}

/// SHELL: replace the shell used by shell-form RUN/CMD/ENTRYPOINT.
fn handle_shell(state: &mut BuildState, step: &Step) -> Result<()> {
    if !step.json_form {
        return Err(BuildError::FormatError(
            "SHELL requires the JSON form".to_string(),
        ));
    }
    step.at_least(1)?;
    state.shell = step.args.clone();
    Ok(())
}

fn handle_stopsignal(step: &Step) -> Result<()> {
    step.no_json()?;
    step.exactly(1)?;
    tracing::warn!(
        signal = %step.args[0],
        "STOPSIGNAL is not supported by the OCI image format, ignoring"
    );
    Ok(())
}

fn handle_unsupported(step: &Step) -> Result<()> {
    tracing::warn!(
        instruction = %step.upper(),
        "Instruction is not supported by the OCI image format, ignoring"
    );
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

/// `umoci config` from the source tag to the destination tag.
fn apply_config<R: ToolRunner>(
    ctx: &BuildContext<'_, R>,
    state: &BuildState,
    directives: &[ConfigDirective],
) -> Result<()> {
    let (source, destination) = state.tags()?;
    ctx.tools
        .config(&state.layout, source, destination, directives)
}

fn is_same_path(a: &Path, b: &Path) -> bool {
    match (a.to_str(), b.to_str()) {
        (Some(a), Some(b)) => clean(a) == clean(b),
        _ => a == b,
    }
}

/// An unpacked image bundle in a temporary directory.
///
/// The directory is removed when the bundle is dropped, unless the build
/// was configured to keep bundles.
struct Bundle {
    path: PathBuf,
    _dir: Option<TempDir>,
}

impl Bundle {
    /// Unpack the current source image into a fresh bundle.
    fn unpack<R: ToolRunner>(ctx: &BuildContext<'_, R>, state: &BuildState) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("orca-bundle.").tempdir()?;
        let path = dir.path().join("bundle");
        let dir = if ctx.config.keep_bundles {
            let kept = dir.keep();
            tracing::info!(bundle = %kept.display(), "Keeping bundle");
            None
        } else {
            Some(dir)
        };

        let (source, _) = state.tags()?;
        ctx.tools
            .unpack(&state.layout, source, &path, ctx.config.rootless)?;

        Ok(Self { path, _dir: dir })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn config_path(&self) -> PathBuf {
        self.path.join("config.json")
    }

    fn rootfs_path(&self) -> PathBuf {
        self.path.join("rootfs")
    }

    /// Repack the bundle into the destination tag.
    fn repack<R: ToolRunner>(&self, ctx: &BuildContext<'_, R>, state: &BuildState) -> Result<()> {
        let (_, destination) = state.tags()?;
        ctx.tools.repack(&state.layout, destination, &self.path)
    }
}
