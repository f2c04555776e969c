//! Best-effort actions run after a ConfigMap was written or removed.

use super::command_runner::CommandRunner;
use crate::domain::models::PostDeployAction;

/// Outcome of a single post-deploy action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    /// Name of the action as configured.
    pub name: String,
    /// The command ran and exited with status zero.
    pub success: bool,
    /// Captured output, or the reason the command could not run.
    pub output: String,
}

/// Runs a job's post-deploy actions in order.
///
/// A failing action is logged and the remaining actions still run; nothing is
/// reported back as an error.
#[derive(Debug, Clone)]
pub struct PostDeployRunner {
    runner: CommandRunner,
    actions: Vec<PostDeployAction>,
}

impl PostDeployRunner {
    /// Runner for `actions`, executed in order.
    pub fn new(runner: CommandRunner, actions: Vec<PostDeployAction>) -> Self {
        Self { runner, actions }
    }

    /// True when the job has no post-deploy actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every action and report each outcome.
    pub async fn run(&self) -> Vec<ActionReport> {
        let mut reports = Vec::with_capacity(self.actions.len());

        for action in &self.actions {
            let report = match self.runner.run(&action.cmd).await {
                Ok(output) if output.success => {
                    tracing::info!(
                        action = %action.name,
                        output = %output.output,
                        "Successfully executed post-deploy action"
                    );
                    ActionReport {
                        name: action.name.clone(),
                        success: true,
                        output: output.output,
                    }
                }
                Ok(output) => {
                    tracing::error!(
                        action = %action.name,
                        exit_code = ?output.exit_code,
                        output = %output.output,
                        "Post-deploy action failed"
                    );
                    ActionReport {
                        name: action.name.clone(),
                        success: false,
                        output: output.output,
                    }
                }
                Err(err) => {
                    tracing::error!(
                        action = %action.name,
                        error = %err,
                        "Failed to execute post-deploy action"
                    );
                    ActionReport {
                        name: action.name.clone(),
                        success: false,
                        output: err.to_string(),
                    }
                }
            };
            reports.push(report);
        }

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn action(name: &str, cmd: &[&str]) -> PostDeployAction {
        PostDeployAction {
            name: name.to_string(),
            cmd: cmd.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_actions() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join("reloaded");
        let marker_path = marker.display().to_string();

        let runner = PostDeployRunner::new(
            CommandRunner::new(Duration::from_secs(10)),
            vec![
                action("broken", &["false"]),
                action("reload", &["sh", "-c", "echo reloaded > \"$0\"", &marker_path]),
            ],
        );

        let reports = runner.run().await;

        assert_eq!(reports.len(), 2);
        assert!(!reports[0].success);
        assert!(reports[1].success);
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "reloaded\n");
    }

    #[tokio::test]
    async fn test_spawn_error_and_timeout_are_reported() {
        let runner = PostDeployRunner::new(
            CommandRunner::new(Duration::from_millis(100)),
            vec![
                action("missing", &["/nonexistent/reload"]),
                action("hung", &["sleep", "5"]),
                action("fine", &["true"]),
            ],
        );

        let reports = runner.run().await;

        let outcomes: Vec<bool> = reports.iter().map(|r| r.success).collect();
        assert_eq!(outcomes, vec![false, false, true]);
        assert!(reports[1].output.contains("did not finish"));
    }

    #[tokio::test]
    async fn test_no_actions() {
        let runner = PostDeployRunner::new(CommandRunner::new(Duration::from_secs(1)), vec![]);
        assert!(runner.is_empty());
        assert!(runner.run().await.is_empty());
    }
}
