//! External command execution for verify steps and post-deploy actions.
//!
//! Commands are argument vectors executed without a shell. Output of both
//! streams is captured, and every run is bounded by a timeout after which the
//! child process is killed.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::domain::errors::CommandError;
use crate::domain::models::PATH_PLACEHOLDER;

/// Result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status was zero.
    pub success: bool,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout followed by stderr.
    pub output: String,
}

/// Runs argument vectors with a fixed timeout.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    /// Runner cutting every command off after `timeout`.
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Wall-clock limit applied to each command.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `argv[0]` with the remaining tokens as arguments.
    ///
    /// A non-zero exit is reported through [`CommandOutput::success`]; only
    /// failures to start or finish in time are errors.
    pub async fn run(&self, argv: &[String]) -> Result<CommandOutput, CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;

        tracing::trace!(program = %program, args = ?args, "Running command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Dropping the child on timeout kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CommandError::TimedOut {
                program: program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            output: combined,
        })
    }
}

/// Replace the path placeholder in every token of `argv`.
pub fn substitute(argv: &[String], path: &Path) -> Vec<String> {
    let path = path.display().to_string();
    argv.iter()
        .map(|token| token.replace(PATH_PLACEHOLDER, &path))
        .collect()
}
