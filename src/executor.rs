//! Execution of a confirmed command line in the native shell.
//!
//! The line is handed to the platform shell as-is (`sh -c` on Unix,
//! `cmd /C` on Windows) with the terminal's stdio inherited, so pipes,
//! globs and redirects behave as if the operator had typed them.

use anyhow::{Context, Result, anyhow};
use std::process::Command;
use tracing::{info, warn};

/// Trait for running a shell line.
///
/// This abstraction enables testing without spawning real processes.
pub trait ShellRunner: Send + Sync {
    /// Runs `line` to completion and returns its exit code.
    fn run(&self, line: &str) -> Result<i32>;
}

/// Default runner using std::process::Command and the platform shell.
pub struct SystemShellRunner;

impl SystemShellRunner {
    fn shell_command(line: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", line]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", line]);
            cmd
        }
    }
}

impl ShellRunner for SystemShellRunner {
    fn run(&self, line: &str) -> Result<i32> {
        info!("Executing: {}", line);
        let status = Self::shell_command(line)
            .status()
            .context("Failed to start shell")?;

        match status.code() {
            Some(code) => Ok(code),
            None => {
                warn!("Command terminated by signal");
                Err(anyhow!("Command terminated by signal"))
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_success_returns_zero() {
        assert_eq!(SystemShellRunner.run("true").unwrap(), 0);
    }

    #[test]
    fn test_run_propagates_exit_code() {
        assert_eq!(SystemShellRunner.run("exit 3").unwrap(), 3);
    }

    #[test]
    fn test_run_uses_shell_syntax() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let line = format!("echo one | tr a-z A-Z > '{}'", target.display());

        assert_eq!(SystemShellRunner.run(&line).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "ONE\n");
    }
}
