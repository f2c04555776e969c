//! Long-lived ConfigMap watch for one job.
//!
//! A session hides stream breakage from its consumer: when the stream fails
//! it is dropped and reopened with the same scope, resuming from the last
//! resource version seen. Reconnects back off exponentially and the session
//! gives up after a configured number of consecutive failures.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures::StreamExt;

use crate::domain::errors::SessionError;
use crate::domain::models::{Job, WatchConfig, WatchEvent};
use crate::domain::ports::{EventStream, WatchScope, WatchSource};

/// How a session reacts to a broken watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt.
    pub initial_backoff: Duration,
    /// Upper bound of the reconnect delay.
    pub max_backoff: Duration,
    /// Failures in a row (broken streams or failed reopens) before giving up.
    pub max_consecutive_failures: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&WatchConfig::default())
    }
}

impl From<&WatchConfig> for ReconnectPolicy {
    fn from(config: &WatchConfig) -> Self {
        Self {
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

impl ReconnectPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        backoff.reset();
        backoff
    }
}

/// The single active watch of a job.
pub struct WatchSession<S> {
    source: S,
    job: String,
    scope: WatchScope,
    policy: ReconnectPolicy,
    backoff: ExponentialBackoff,
    stream: Option<EventStream>,
    /// The current stream yielded at least one event.
    delivered: bool,
    resource_version: Option<String>,
    failures: u32,
}

impl<S: WatchSource> WatchSession<S> {
    /// Open the initial watch. Failure here is fatal for the job.
    pub async fn open(source: S, job: &Job, policy: ReconnectPolicy) -> Result<Self, SessionError> {
        let scope = WatchScope::for_job(job);
        let stream = source.open(&scope, None).await?;

        tracing::info!(scope = %scope, "Opened ConfigMap watch");

        Ok(Self {
            source,
            job: job.name.clone(),
            scope,
            backoff: policy.backoff(),
            policy,
            stream: Some(stream),
            delivered: false,
            resource_version: None,
            failures: 0,
        })
    }

    /// Namespace and selector every (re)open uses.
    pub const fn scope(&self) -> &WatchScope {
        &self.scope
    }

    /// Resource version the next reopen would resume from.
    pub fn resource_version(&self) -> Option<&str> {
        self.resource_version.as_deref()
    }

    /// Wait for the next change, reconnecting as needed.
    pub async fn next(&mut self) -> Result<WatchEvent, SessionError> {
        loop {
            let Some(stream) = self.stream.as_mut() else {
                self.reconnect().await?;
                continue;
            };

            match stream.next().await {
                Some(Ok(event)) => {
                    self.delivered = true;
                    self.failures = 0;
                    self.backoff.reset();
                    if let Some(version) = &event.entry.resource_version {
                        self.resource_version = Some(version.clone());
                    }
                    return Ok(event);
                }
                Some(Err(err)) if err.is_expired() => {
                    tracing::info!(error = %err, "Watch position expired, restarting from current state");
                    self.stream = None;
                    self.resource_version = None;
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "ConfigMap watch failed, reconnecting");
                    self.stream = None;
                    self.record_failure(err.to_string())?;
                    self.wait().await;
                }
                None if self.delivered => {
                    tracing::debug!("ConfigMap watch closed by server, reopening");
                    self.stream = None;
                }
                None => {
                    // Not a failure, but reopening at once could spin.
                    tracing::debug!("ConfigMap watch closed without events, backing off");
                    self.stream = None;
                    self.wait().await;
                }
            }
        }
    }

    async fn reconnect(&mut self) -> Result<(), SessionError> {
        loop {
            match self
                .source
                .open(&self.scope, self.resource_version.as_deref())
                .await
            {
                Ok(stream) => {
                    tracing::debug!(
                        scope = %self.scope,
                        resource_version = ?self.resource_version,
                        "Reopened ConfigMap watch"
                    );
                    self.stream = Some(stream);
                    self.delivered = false;
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to reopen ConfigMap watch");
                    self.record_failure(err.to_string())?;
                    self.wait().await;
                }
            }
        }
    }

    fn record_failure(&mut self, last_error: String) -> Result<(), SessionError> {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.policy.max_consecutive_failures {
            return Err(SessionError::ReconnectExhausted {
                job: self.job.clone(),
                failures: self.failures,
                last_error,
            });
        }
        Ok(())
    }

    async fn wait(&mut self) {
        let delay = self
            .backoff
            .next_backoff()
            .unwrap_or(self.policy.max_backoff);
        tracing::debug!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            failures = self.failures,
            "Backing off before reconnecting"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted::{ScriptedOpen, ScriptedWatchSource};
    use crate::domain::errors::StreamError;
    use crate::domain::models::ConfigEntry;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn job() -> Job {
        Job {
            name: "alerts".to_string(),
            namespace: "monitoring".to_string(),
            selector: BTreeMap::from([("type".to_string(), "alerts".to_string())]),
            verify: vec![],
            target_dir: PathBuf::from("/tmp/unused"),
            flatten: true,
            post_deploy: vec![],
        }
    }

    fn fast_policy(max_consecutive_failures: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            max_consecutive_failures,
        }
    }

    fn added(name: &str, version: &str) -> WatchEvent {
        let mut entry = ConfigEntry::new("monitoring", name, []);
        entry.resource_version = Some(version.to_string());
        WatchEvent::added(entry)
    }

    #[tokio::test]
    async fn test_initial_open_failure_is_returned() {
        let source = ScriptedWatchSource::new([ScriptedOpen::Fail("forbidden".to_string())]);

        let result = WatchSession::open(source, &job(), fast_policy(3)).await;

        assert!(matches!(result, Err(SessionError::Open(_))));
    }

    #[tokio::test]
    async fn test_open_uses_job_scope() {
        let source = Arc::new(ScriptedWatchSource::new([ScriptedOpen::events(vec![])]));

        let session = WatchSession::open(Arc::clone(&source), &job(), fast_policy(3))
            .await
            .unwrap();

        assert_eq!(session.scope().namespace.as_deref(), Some("monitoring"));
        assert_eq!(session.scope().label_selector, "type=alerts");
        assert_eq!(source.opens()[0].1, None);
    }

    #[tokio::test]
    async fn test_stream_error_is_hidden_by_reconnect() {
        let source = Arc::new(ScriptedWatchSource::new([
            ScriptedOpen::Stream(vec![
                Ok(added("cm1", "10")),
                Err(StreamError::Transport("connection reset".to_string())),
            ]),
            ScriptedOpen::events(vec![added("cm2", "11")]),
        ]));

        let mut session = WatchSession::open(Arc::clone(&source), &job(), fast_policy(3))
            .await
            .unwrap();

        assert_eq!(session.next().await.unwrap().entry.name, "cm1");
        assert_eq!(session.next().await.unwrap().entry.name, "cm2");

        let opens = source.opens();
        assert_eq!(opens.len(), 2);
        assert_eq!(opens[0].0, opens[1].0);
        assert_eq!(opens[1].1.as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn test_server_close_reopens_without_counting_failure() {
        let source = Arc::new(ScriptedWatchSource::new([
            ScriptedOpen::events(vec![]),
            ScriptedOpen::events(vec![]),
            ScriptedOpen::events(vec![added("cm1", "3")]),
        ]));

        let mut session = WatchSession::open(Arc::clone(&source), &job(), fast_policy(1))
            .await
            .unwrap();

        assert_eq!(session.next().await.unwrap().entry.name, "cm1");
        assert_eq!(source.opens().len(), 3);
    }

    #[tokio::test]
    async fn test_expired_version_restarts_from_scratch() {
        let source = Arc::new(ScriptedWatchSource::new([
            ScriptedOpen::Stream(vec![
                Ok(added("cm1", "10")),
                Err(StreamError::Expired("too old resource version".to_string())),
            ]),
            ScriptedOpen::events(vec![added("cm1", "42")]),
        ]));

        let mut session = WatchSession::open(Arc::clone(&source), &job(), fast_policy(1))
            .await
            .unwrap();

        session.next().await.unwrap();
        session.next().await.unwrap();

        assert_eq!(source.opens()[1].1, None);
        assert_eq!(session.resource_version(), Some("42"));
    }

    #[tokio::test]
    async fn test_persistent_failures_exhaust_budget() {
        let source = Arc::new(ScriptedWatchSource::new([
            ScriptedOpen::Stream(vec![Err(StreamError::Api {
                code: 500,
                message: "internal error".to_string(),
            })]),
            ScriptedOpen::Fail("connection refused".to_string()),
            ScriptedOpen::Fail("connection refused".to_string()),
        ]));

        let mut session = WatchSession::open(Arc::clone(&source), &job(), fast_policy(3))
            .await
            .unwrap();

        let err = session.next().await.unwrap_err();

        match err {
            SessionError::ReconnectExhausted {
                job,
                failures,
                last_error,
            } => {
                assert_eq!(job, "alerts");
                assert_eq!(failures, 3);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_event_resets_failure_count() {
        let transport = || Err(StreamError::Transport("reset".to_string()));
        let source = Arc::new(ScriptedWatchSource::new([
            ScriptedOpen::Stream(vec![transport()]),
            ScriptedOpen::Stream(vec![Ok(added("cm1", "1")), transport()]),
            ScriptedOpen::Stream(vec![Ok(added("cm2", "2"))]),
        ]));

        let mut session = WatchSession::open(Arc::clone(&source), &job(), fast_policy(2))
            .await
            .unwrap();

        // One failure before cm1 and one after: never two in a row.
        assert_eq!(session.next().await.unwrap().entry.name, "cm1");
        assert_eq!(session.next().await.unwrap().entry.name, "cm2");
    }

    #[tokio::test]
    async fn test_empty_streams_back_off_between_reopens() {
        let source = Arc::new(ScriptedWatchSource::new([
            ScriptedOpen::events(vec![]),
            ScriptedOpen::events(vec![]),
            ScriptedOpen::events(vec![added("cm1", "7")]),
        ]));
        let policy = ReconnectPolicy {
            initial_backoff: Duration::from_millis(40),
            max_backoff: Duration::from_millis(40),
            max_consecutive_failures: 1,
        };

        let mut session = WatchSession::open(Arc::clone(&source), &job(), policy)
            .await
            .unwrap();
        let started = std::time::Instant::now();

        assert_eq!(session.next().await.unwrap().entry.name, "cm1");

        // Two waits of at least half the interval each (randomization 0.5).
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(source.opens().len(), 3);
    }

}
