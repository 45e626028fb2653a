//! Command-line shapes for the external image tools.
//!
//! - `skopeo` copies images from a registry into an OCI layout.
//! - `umoci` creates, unpacks, repacks, configures and tags images inside
//!   the layout.
//! - `runc` executes an unpacked bundle.
//!
//! Each method builds exactly one [`ToolInvocation`] and hands it to the
//! [`ToolRunner`].

use std::path::Path;

use orca_core::config::ToolPaths;
use orca_core::error::Result;
use orca_core::exec::ToolInvocation;

use crate::process::ToolRunner;

/// One `umoci config` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigDirective {
    /// `--config.<field>=<value>`
    Set { field: &'static str, value: String },
    /// `--clear=config.<field>`
    Clear { field: &'static str },
    /// `--author=<value>`
    Author(String),
}

impl ConfigDirective {
    pub fn set(field: &'static str, value: impl Into<String>) -> Self {
        Self::Set {
            field,
            value: value.into(),
        }
    }

    pub fn clear(field: &'static str) -> Self {
        Self::Clear { field }
    }
}

impl std::fmt::Display for ConfigDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Set { field, value } => write!(f, "--config.{}={}", field, value),
            Self::Clear { field } => write!(f, "--clear=config.{}", field),
            Self::Author(value) => write!(f, "--author={}", value),
        }
    }
}

/// `<layout>:<tag>` image reference understood by umoci.
pub fn image_ref(layout: &Path, tag: &str) -> String {
    format!("{}:{}", layout.display(), tag)
}

/// Typed front-end over the three external tools.
pub struct OciTools<R> {
    paths: ToolPaths,
    runner: R,
}

impl<R: ToolRunner> OciTools<R> {
    pub fn new(paths: ToolPaths, runner: R) -> Self {
        Self { paths, runner }
    }

    /// The runner every invocation goes through.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn skopeo(&self) -> ToolInvocation {
        ToolInvocation::new(&self.paths.skopeo)
    }

    fn umoci(&self) -> ToolInvocation {
        ToolInvocation::new(&self.paths.umoci)
    }

    fn runc(&self) -> ToolInvocation {
        ToolInvocation::new(&self.paths.runc)
    }

    /// `skopeo copy <source> oci:<layout>:<tag>`
    pub fn copy_image(&self, source: &str, layout: &Path, tag: &str) -> Result<()> {
        let destination = format!("oci:{}", image_ref(layout, tag));
        self.runner
            .run(&self.skopeo().args(["copy", source]).arg(destination))
    }

    /// `umoci init --layout=<layout>`
    pub fn init_layout(&self, layout: &Path) -> Result<()> {
        self.runner.run(
            &self
                .umoci()
                .arg("init")
                .arg(format!("--layout={}", layout.display())),
        )
    }

    /// `umoci new --image=<layout>:<tag>`
    pub fn new_image(&self, layout: &Path, tag: &str) -> Result<()> {
        self.runner.run(
            &self
                .umoci()
                .arg("new")
                .arg(format!("--image={}", image_ref(layout, tag))),
        )
    }

    /// `umoci unpack [--rootless] --image=<layout>:<tag> <bundle>`
    pub fn unpack(&self, layout: &Path, tag: &str, bundle: &Path, rootless: bool) -> Result<()> {
        let mut inv = self.umoci().arg("unpack");
        if rootless {
            inv = inv.arg("--rootless");
        }
        self.runner.run(
            &inv.arg(format!("--image={}", image_ref(layout, tag)))
                .arg(bundle.display().to_string()),
        )
    }

    /// `umoci repack --image=<layout>:<tag> <bundle>`
    pub fn repack(&self, layout: &Path, tag: &str, bundle: &Path) -> Result<()> {
        self.runner.run(
            &self
                .umoci()
                .arg("repack")
                .arg(format!("--image={}", image_ref(layout, tag)))
                .arg(bundle.display().to_string()),
        )
    }

    /// `umoci config --image=<layout>:<src> --tag=<dst> <directive>...`
    pub fn config(
        &self,
        layout: &Path,
        source_tag: &str,
        destination_tag: &str,
        directives: &[ConfigDirective],
    ) -> Result<()> {
        self.runner.run(
            &self
                .umoci()
                .arg("config")
                .arg(format!("--image={}", image_ref(layout, source_tag)))
                .arg(format!("--tag={}", destination_tag))
                .args(directives.iter().map(ToString::to_string)),
        )
    }

    /// `umoci raw runtime-config --image=<layout>:<tag> <output>`
    pub fn raw_runtime_config(&self, layout: &Path, tag: &str, output: &Path) -> Result<()> {
        self.runner.run(
            &self
                .umoci()
                .args(["raw", "runtime-config"])
                .arg(format!("--image={}", image_ref(layout, tag)))
                .arg(output.display().to_string()),
        )
    }

    /// `umoci tag --image=<layout>:<tag> <new_tag>`
    pub fn tag(&self, layout: &Path, tag: &str, new_tag: &str) -> Result<()> {
        self.runner.run(
            &self
                .umoci()
                .arg("tag")
                .arg(format!("--image={}", image_ref(layout, tag)))
                .arg(new_tag),
        )
    }

    /// `umoci rm --image=<layout>:<tag>`
    pub fn remove(&self, layout: &Path, tag: &str) -> Result<()> {
        self.runner.run(
            &self
                .umoci()
                .arg("rm")
                .arg(format!("--image={}", image_ref(layout, tag))),
        )
    }

    /// `umoci gc --layout=<layout>`
    pub fn gc(&self, layout: &Path) -> Result<()> {
        self.runner.run(
            &self
                .umoci()
                .arg("gc")
                .arg(format!("--layout={}", layout.display())),
        )
    }

    /// `runc [--root=<state>] run --bundle=<bundle> <id>`
    pub fn run_container(&self, state_root: Option<&Path>, bundle: &Path, id: &str) -> Result<()> {
        let mut inv = self.runc();
        if let Some(root) = state_root {
            inv = inv.arg(format!("--root={}", root.display()));
        }
        self.runner.run(
            &inv.arg("run")
                .arg(format!("--bundle={}", bundle.display()))
                .arg(id),
        )
    }
}
