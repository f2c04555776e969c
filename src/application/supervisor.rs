//! Job supervision.
//!
//! Every configured job gets its own task running an independent watch and
//! reconciliation loop. Jobs share nothing mutable. The first job to fail
//! stops all others.

use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use crate::domain::errors::ReconcileError;
use crate::domain::models::{Config, Job};
use crate::domain::ports::WatchSource;
use crate::services::{CommandRunner, ReconnectPolicy, Reconciler, WatchSession};

/// Why supervision ended.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("job '{job}' stopped: {source}")]
    JobFailed {
        job: String,
        #[source]
        source: ReconcileError,
    },

    #[error("job task aborted: {0}")]
    TaskAborted(#[from] JoinError),
}

/// Runs one reconciliation loop per job.
pub struct JobSupervisor<S> {
    source: S,
    runner: CommandRunner,
    policy: ReconnectPolicy,
}

impl<S> JobSupervisor<S>
where
    S: WatchSource + Clone + 'static,
{
    /// Supervisor opening watches on `source`.
    pub const fn new(source: S, runner: CommandRunner, policy: ReconnectPolicy) -> Self {
        Self {
            source,
            runner,
            policy,
        }
    }

    /// Supervisor using the command and watch settings of `config`.
    pub fn from_config(source: S, config: &Config) -> Self {
        Self::new(
            source,
            CommandRunner::new(config.commands.timeout()),
            ReconnectPolicy::from(&config.watch),
        )
    }

    /// Run every job until one fails.
    ///
    /// Returns `Ok` only when `jobs` is empty or every loop ended on its own.
    pub async fn run(&self, jobs: Vec<Job>) -> Result<(), SupervisorError> {
        let mut tasks = JoinSet::new();

        for job in jobs {
            let source = self.source.clone();
            let runner = self.runner.clone();
            let policy = self.policy;

            tasks.spawn(async move {
                let name = job.name.clone();
                let result = run_job(source, job, runner, policy).await;
                (name, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((job, Err(source))) => {
                    tasks.abort_all();
                    return Err(SupervisorError::JobFailed { job, source });
                }
                Err(err) => {
                    tasks.abort_all();
                    return Err(SupervisorError::TaskAborted(err));
                }
            }
        }

        Ok(())
    }
}

async fn run_job<S: WatchSource>(
    source: S,
    job: Job,
    runner: CommandRunner,
    policy: ReconnectPolicy,
) -> Result<(), ReconcileError> {
    let reconciler = Reconciler::new(job, runner);
    let span = reconciler.span().clone();

    tracing::info!(parent: &span, "Configure job");

    let session = WatchSession::open(source, reconciler.job(), policy)
        .instrument(span.clone())
        .await
        .map_err(|err| {
            tracing::error!(parent: &span, error = %err, "Failed to open ConfigMap watch");
            ReconcileError::from(err)
        })?;

    reconciler.run(session).await
}
