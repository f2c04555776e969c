use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

use crate::domain::errors::{StreamError, WatchOpenError};
use crate::domain::models::{Job, WatchEvent};

/// Stream of changes produced by one open watch.
///
/// Ends when the server closes the watch; yields `Err` when the watch broke.
pub type EventStream = BoxStream<'static, Result<WatchEvent, StreamError>>;

/// What a watch is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchScope {
    /// `None` watches every namespace.
    pub namespace: Option<String>,
    /// Label selector in API form (`k1=v1,k2=v2`), empty for all objects.
    pub label_selector: String,
}

impl WatchScope {
    /// Scope covering the namespace and selector of `job`.
    pub fn for_job(job: &Job) -> Self {
        Self {
            namespace: job.namespace_scope().map(str::to_string),
            label_selector: job.label_selector(),
        }
    }
}

impl fmt::Display for WatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let namespace = self.namespace.as_deref().unwrap_or("<all namespaces>");
        if self.label_selector.is_empty() {
            write!(f, "{namespace}")
        } else {
            write!(f, "{namespace} [{}]", self.label_selector)
        }
    }
}

/// Port for opening ConfigMap watches.
///
/// Each call to [`open`](WatchSource::open) must return a fresh, independent
/// stream. `resource_version` resumes after a previously observed change;
/// `None` starts with the current state of every matching object.
#[async_trait]
pub trait WatchSource: Send + Sync {
    async fn open(
        &self,
        scope: &WatchScope,
        resource_version: Option<&str>,
    ) -> Result<EventStream, WatchOpenError>;
}

#[async_trait]
impl<T: WatchSource + ?Sized> WatchSource for std::sync::Arc<T> {
    async fn open(
        &self,
        scope: &WatchScope,
        resource_version: Option<&str>,
    ) -> Result<EventStream, WatchOpenError> {
        (**self).open(scope, resource_version).await
    }
}
