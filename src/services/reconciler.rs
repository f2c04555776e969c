//! Reconciliation loop for one job.
//!
//! Consumes watch events in delivery order and decides, per event, whether to
//! write, remove or skip a ConfigMap's files and whether post-deploy actions
//! run. Registrar errors end the loop. A rejected ConfigMap is skipped and
//! its previous files stay in place.

use std::path::PathBuf;

use tracing::{Instrument, Span};

use super::command_runner::CommandRunner;
use super::file_registrar::FileRegistrar;
use super::post_deploy::{ActionReport, PostDeployRunner};
use super::verification::VerificationPipeline;
use super::watch_session::WatchSession;
use crate::domain::errors::ReconcileError;
use crate::domain::models::{ConfigEntry, Job, WatchEvent, WatchEventKind};
use crate::domain::ports::WatchSource;

/// Why an event did not change the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A verify step rejected the content; the message describes which.
    VerificationFailed(String),
    /// Data keys that cannot be written as files.
    UnsafeKeys(Vec<String>),
    /// The ConfigMap carries no data keys.
    NoData,
}

/// What handling one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Files were written and post-deploy actions ran.
    Registered {
        paths: Vec<PathBuf>,
        actions: Vec<ActionReport>,
    },
    /// Files were removed and post-deploy actions ran.
    Removed {
        paths: Vec<PathBuf>,
        actions: Vec<ActionReport>,
    },
    /// The filesystem was left as it was.
    Skipped(SkipReason),
    /// Deletion of a ConfigMap that has no files on disk.
    Ignored,
}

/// Applies watch events of one job to its target directory.
pub struct Reconciler {
    job: Job,
    registrar: FileRegistrar,
    verification: VerificationPipeline,
    post_deploy: PostDeployRunner,
    span: Span,
}

impl Reconciler {
    /// Create a reconciler logging into a new `job` span.
    pub fn new(job: Job, runner: CommandRunner) -> Self {
        let span = tracing::info_span!(
            "job",
            job = %job.name,
            target_dir = %job.target_dir.display(),
        );
        Self::with_span(job, runner, span)
    }

    /// Create a reconciler logging into `span`.
    pub fn with_span(job: Job, runner: CommandRunner, span: Span) -> Self {
        Self {
            registrar: FileRegistrar::for_job(&job),
            verification: VerificationPipeline::new(runner.clone(), job.verify.clone()),
            post_deploy: PostDeployRunner::new(runner, job.post_deploy.clone()),
            job,
            span,
        }
    }

    /// The job this reconciler applies events for.
    pub const fn job(&self) -> &Job {
        &self.job
    }

    /// Span every event of this job is logged under.
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Process events from `session` until a fatal error occurs.
    pub async fn run<S: WatchSource>(&self, session: WatchSession<S>) -> Result<(), ReconcileError> {
        self.event_loop(session)
            .instrument(self.span.clone())
            .await
    }

    async fn event_loop<S: WatchSource>(
        &self,
        mut session: WatchSession<S>,
    ) -> Result<(), ReconcileError> {
        loop {
            let event = session.next().await?;
            self.process(event).await?;
        }
    }

    /// Handle a single event.
    pub async fn handle_event(&self, event: WatchEvent) -> Result<EventOutcome, ReconcileError> {
        self.process(event).instrument(self.span.clone()).await
    }

    async fn process(&self, event: WatchEvent) -> Result<EventOutcome, ReconcileError> {
        let span = tracing::info_span!(
            "configmap",
            namespace = %event.entry.namespace,
            configmap = %event.entry.name,
            event_type = %event.kind,
        );

        async {
            match event.kind {
                WatchEventKind::Deleted => self.handle_deleted(&event.entry).await,
                WatchEventKind::Added | WatchEventKind::Modified => {
                    self.handle_applied(&event.entry).await
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn handle_deleted(&self, entry: &ConfigEntry) -> Result<EventOutcome, ReconcileError> {
        // Such entries were never written, so there is nothing of theirs on disk.
        if let Some(reason) = unsafe_keys(entry) {
            tracing::warn!(
                reason = ?reason,
                "Deleted ConfigMap has keys that are not valid file names, nothing to do"
            );
            return Ok(EventOutcome::Skipped(reason));
        }

        if !self.registrar.is_registered(entry) {
            tracing::debug!("Deleted ConfigMap has no files in target directory, nothing to do");
            return Ok(EventOutcome::Ignored);
        }

        tracing::info!("ConfigMap has been deleted from namespace, removing it from target directory");

        let removed = self.registrar.remove(entry).map_err(|source| {
            tracing::error!(
                error = %source,
                removed_files = ?source.completed,
                "Failed to remove ConfigMap from target directory"
            );
            ReconcileError::Remove {
                entry: entry.to_string(),
                source,
            }
        })?;

        tracing::info!(removed_files = ?removed, "Successfully removed ConfigMap from target directory");

        let actions = self.run_post_deploy().await;
        Ok(EventOutcome::Removed {
            paths: removed,
            actions,
        })
    }

    async fn handle_applied(&self, entry: &ConfigEntry) -> Result<EventOutcome, ReconcileError> {
        tracing::info!(
            actual_labels = ?entry.labels,
            expected_labels = ?self.job.selector,
            "Found matching ConfigMap"
        );

        if let Some(reason) = unsafe_keys(entry) {
            tracing::warn!(
                reason = ?reason,
                "ConfigMap has keys that are not valid file names, skipping it"
            );
            return Ok(EventOutcome::Skipped(reason));
        }

        if entry.data.is_empty() {
            tracing::info!("ConfigMap has no data keys, nothing to register");
            return Ok(EventOutcome::Skipped(SkipReason::NoData));
        }

        if !self.verification.is_empty() {
            let step_names: Vec<&str> = self
                .verification
                .steps()
                .iter()
                .map(|step| step.name.as_str())
                .collect();
            tracing::debug!(verify_steps = ?step_names, "Verifying ConfigMap");

            match self.verification.verify(entry).await {
                Ok(verified) => {
                    tracing::debug!(
                        verified_files = ?verified,
                        "Successfully verified ConfigMap, ready to register"
                    );
                }
                Err(failure) => {
                    // Files from an earlier valid version stay in place.
                    tracing::warn!(
                        error = %failure,
                        verify_steps = ?step_names,
                        verified_files = ?failure.verified(),
                        latest_output = %failure.output(),
                        "Failed to verify ConfigMap, skipping it"
                    );
                    return Ok(EventOutcome::Skipped(SkipReason::VerificationFailed(
                        failure.to_string(),
                    )));
                }
            }
        }

        let registered = self.registrar.register(entry).map_err(|source| {
            tracing::error!(
                error = %source,
                registered_files = ?source.completed,
                "Failed to register ConfigMap"
            );
            ReconcileError::Register {
                entry: entry.to_string(),
                source,
            }
        })?;

        tracing::info!(registered_files = ?registered, "Successfully registered ConfigMap");

        let actions = self.run_post_deploy().await;
        Ok(EventOutcome::Registered {
            paths: registered,
            actions,
        })
    }

    async fn run_post_deploy(&self) -> Vec<ActionReport> {
        if self.post_deploy.is_empty() {
            return Vec::new();
        }
        self.post_deploy.run().await
    }
}

fn unsafe_keys(entry: &ConfigEntry) -> Option<SkipReason> {
    let keys: Vec<String> = entry.unsafe_keys().into_iter().map(str::to_string).collect();
    if keys.is_empty() {
        None
    } else {
        Some(SkipReason::UnsafeKeys(keys))
    }
}
