//! ToolRunner - Trait for executing external tools.

use std::process::{Command, Stdio};

use orca_core::error::{BuildError, Result};
use orca_core::exec::ToolInvocation;

/// Executes one external tool invocation to completion.
pub trait ToolRunner {
    /// Run the invocation, blocking until it exits. Any unsuccessful exit
    /// is a [`BuildError::SubprocessError`].
    fn run(&self, invocation: &ToolInvocation) -> Result<()>;
}

/// Runs tools as real child processes.
///
/// Standard input is `/dev/null` so a tool can never wait on the terminal;
/// standard output and error are inherited so progress stays visible.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<()> {
        tracing::debug!(command = %invocation, "Executing");

        let status = Command::new(&invocation.program)
            .args(invocation.os_args())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| BuildError::SubprocessError {
                command: invocation.to_string(),
                status: format!("spawn error: {}", e),
            })?;

        if !status.success() {
            tracing::error!(command = %invocation, %status, "Command failed");
            return Err(BuildError::SubprocessError {
                command: invocation.to_string(),
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

impl<R: ToolRunner + ?Sized> ToolRunner for &R {
    fn run(&self, invocation: &ToolInvocation) -> Result<()> {
        (**self).run(invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_command() {
        let inv = ToolInvocation::new("true");
        assert!(SystemRunner.run(&inv).is_ok());
    }

    #[test]
    fn test_nonzero_exit_is_subprocess_error() {
        let inv = ToolInvocation::new("sh").args(["-c", "exit 3"]);
        let err = SystemRunner.run(&inv).unwrap_err();
        assert!(err.is_subprocess_error());
        assert!(err.to_string().contains("sh -c exit 3"));
    }

    #[test]
    fn test_missing_program_is_subprocess_error() {
        let inv = ToolInvocation::new("/nonexistent/orca-test-tool");
        let err = SystemRunner.run(&inv).unwrap_err();
        assert!(matches!(err, BuildError::SubprocessError { .. }));
    }

    #[test]
    fn test_stdin_is_closed() {
        // `cat` returns immediately on EOF instead of blocking on the terminal.
        let inv = ToolInvocation::new("cat");
        assert!(SystemRunner.run(&inv).is_ok());
    }
}
