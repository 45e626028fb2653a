//! External tool invocation value.
//!
//! Describes one command line handed to an external tool. The runtime crate
//! executes it; tests record and inspect it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One external tool command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Program to execute (name looked up in `PATH`, or a path).
    pub program: PathBuf,
    /// Arguments, in order.
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// File name of the program, e.g. `umoci` for `/usr/bin/umoci`.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Arguments as OS strings for `std::process::Command`.
    pub fn os_args(&self) -> Vec<OsString> {
        self.args.iter().map(OsString::from).collect()
    }
}

impl std::fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
