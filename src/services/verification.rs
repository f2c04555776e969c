//! Verification of ConfigMap content before it is written.
//!
//! Every data key is materialized once in a scoped temporary directory under
//! its own name, then each verify step runs against each file. The first
//! failing command rejects the whole ConfigMap.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use super::command_runner::{substitute, CommandRunner};
use crate::domain::errors::VerificationFailure;
use crate::domain::models::{ConfigEntry, VerifyStep};

/// Runs a job's verify steps against ConfigMaps.
#[derive(Debug, Clone)]
pub struct VerificationPipeline {
    runner: CommandRunner,
    steps: Vec<VerifyStep>,
}

impl VerificationPipeline {
    /// Pipeline running `steps` in order through `runner`.
    pub fn new(runner: CommandRunner, steps: Vec<VerifyStep>) -> Self {
        Self { runner, steps }
    }

    /// True when the job has no verify steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Configured steps, in execution order.
    pub fn steps(&self) -> &[VerifyStep] {
        &self.steps
    }

    /// Verify every key of `entry` against every step, in order.
    ///
    /// Returns the verified keys when all commands succeed. The temporary
    /// files are removed before returning, whatever the outcome.
    pub async fn verify(&self, entry: &ConfigEntry) -> Result<Vec<String>, VerificationFailure> {
        if self.steps.is_empty() {
            return Ok(entry.data.keys().cloned().collect());
        }

        let workdir = materialize(entry)?;
        let mut verified = Vec::with_capacity(entry.data.len());

        for (index, step) in self.steps.iter().enumerate() {
            let last_step = index + 1 == self.steps.len();

            for key in entry.data.keys() {
                let path = workdir.path().join(key);
                let argv = substitute(&step.cmd, &path);

                let rejected = |reason: String, output: String| VerificationFailure::Rejected {
                    step: step.name.clone(),
                    key: key.clone(),
                    reason,
                    verified: verified.clone(),
                    output,
                };

                match self.runner.run(&argv).await {
                    Ok(output) if output.success => {
                        tracing::trace!(step = %step.name, key = %key, "Verify step passed");
                    }
                    Ok(output) => {
                        let reason = output.exit_code.map_or_else(
                            || "terminated by signal".to_string(),
                            |code| format!("exited with status {code}"),
                        );
                        return Err(rejected(reason, output.output));
                    }
                    Err(err) => {
                        return Err(rejected(err.to_string(), String::new()));
                    }
                }

                if last_step {
                    verified.push(key.clone());
                }
            }
        }

        Ok(verified)
    }
}

fn materialize(entry: &ConfigEntry) -> Result<TempDir, VerificationFailure> {
    let workdir = tempfile::Builder::new()
        .prefix("trovilo-verify-")
        .tempdir()
        .map_err(|source| VerificationFailure::Prepare {
            key: String::new(),
            source,
        })?;

    for (key, content) in &entry.data {
        let path: PathBuf = workdir.path().join(key);
        fs::write(&path, content).map_err(|source| VerificationFailure::Prepare {
            key: key.clone(),
            source,
        })?;
    }

    Ok(workdir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn step(name: &str, cmd: &[&str]) -> VerifyStep {
        VerifyStep {
            name: name.to_string(),
            cmd: cmd.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    fn entry(data: &[(&str, &str)]) -> ConfigEntry {
        ConfigEntry::new(
            "monitoring",
            "alerts",
            data.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        )
    }

    fn pipeline(steps: Vec<VerifyStep>) -> VerificationPipeline {
        VerificationPipeline::new(CommandRunner::new(Duration::from_secs(10)), steps)
    }

    #[tokio::test]
    async fn test_no_steps_accepts_everything() {
        let result = pipeline(vec![]).verify(&entry(&[("a.yml", "anything")])).await;
        assert_eq!(result.unwrap(), vec!["a.yml".to_string()]);
    }

    #[tokio::test]
    async fn test_all_keys_pass_all_steps() {
        let pipeline = pipeline(vec![
            step("contains groups", &["grep", "-q", "groups:", "%s"]),
            step("is readable", &["test", "-r", "%s"]),
        ]);

        let verified = pipeline
            .verify(&entry(&[("a.yml", "groups: []"), ("b.yml", "groups: [x]")]))
            .await
            .unwrap();

        assert_eq!(verified, vec!["a.yml".to_string(), "b.yml".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_key_rejects_whole_entry() {
        let pipeline = pipeline(vec![step(
            "contains groups",
            &["sh", "-c", "grep -q groups: \"$0\" || { echo \"bad file\"; exit 1; }", "%s"],
        )]);

        let err = pipeline
            .verify(&entry(&[("a.yml", "groups: []"), ("b.yml", "nope")]))
            .await
            .unwrap_err();

        match err {
            VerificationFailure::Rejected {
                step, key, output, ..
            } => {
                assert_eq!(step, "contains groups");
                assert_eq!(key, "b.yml");
                assert_eq!(output, "bad file\n");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_later_step_failure_reports_fully_verified_keys_only() {
        let pipeline = pipeline(vec![
            step("always ok", &["true", "%s"]),
            step("second", &["grep", "-q", "ok", "%s"]),
        ]);

        let err = pipeline
            .verify(&entry(&[("a.yml", "ok"), ("b.yml", "broken")]))
            .await
            .unwrap_err();

        assert_eq!(err.verified(), &["a.yml".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_verifier_is_a_failure() {
        let pipeline = pipeline(vec![step("missing", &["/nonexistent/verifier", "%s"])]);

        let err = pipeline.verify(&entry(&[("a.yml", "x")])).await.unwrap_err();

        assert!(matches!(err, VerificationFailure::Rejected { .. }));
        assert!(err.output().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let pipeline = VerificationPipeline::new(
            CommandRunner::new(Duration::from_millis(100)),
            vec![step("slow", &["sh", "-c", "sleep 5", "%s"])],
        );

        let err = pipeline.verify(&entry(&[("a.yml", "x")])).await.unwrap_err();

        assert!(err.to_string().contains("did not finish"));
    }

    #[tokio::test]
    async fn test_files_keep_their_key_name_and_are_cleaned_up() {
        let record = tempfile::NamedTempFile::new().unwrap();
        let record_path = record.path().display().to_string();
        let pipeline = pipeline(vec![step(
            "record path",
            &["sh", "-c", "echo \"$0\" > \"$1\"", "%s", &record_path],
        )]);

        pipeline.verify(&entry(&[("rules.yml", "x")])).await.unwrap();

        let seen = fs::read_to_string(record.path()).unwrap();
        let seen = PathBuf::from(seen.trim());
        assert_eq!(seen.file_name().unwrap(), "rules.yml");
        assert!(!seen.exists());
    }
}
