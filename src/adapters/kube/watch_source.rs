use async_trait::async_trait;
use futures::{future, StreamExt};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, WatchParams};
use kube::core::WatchEvent as ApiWatchEvent;
use kube::Client;

use crate::domain::errors::{StreamError, WatchOpenError};
use crate::domain::models::{ConfigEntry, WatchEvent};
use crate::domain::ports::{EventStream, WatchScope, WatchSource};

/// HTTP status the API server uses for an expired resource version.
const GONE: u16 = 410;

/// `WatchSource` backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeWatchSource {
    client: Client,
}

impl KubeWatchSource {
    /// Source watching ConfigMaps through `client`.
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, scope: &WatchScope) -> Api<ConfigMap> {
        match &scope.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl WatchSource for KubeWatchSource {
    async fn open(
        &self,
        scope: &WatchScope,
        resource_version: Option<&str>,
    ) -> Result<EventStream, WatchOpenError> {
        let mut params = WatchParams::default().disable_bookmarks();
        if !scope.label_selector.is_empty() {
            params = params.labels(&scope.label_selector);
        }

        // "0" starts with synthetic ADDED events for every existing object.
        let version = resource_version.unwrap_or("0");

        let stream = self
            .api(scope)
            .watch(&params, version)
            .await
            .map_err(|err| WatchOpenError {
                scope: scope.to_string(),
                message: err.to_string(),
            })?;

        Ok(stream
            .filter_map(|item| future::ready(convert(item)))
            .boxed())
    }
}

fn convert(
    item: Result<ApiWatchEvent<ConfigMap>, kube::Error>,
) -> Option<Result<WatchEvent, StreamError>> {
    match item {
        Ok(ApiWatchEvent::Added(cm)) => Some(Ok(WatchEvent::added(to_entry(cm)))),
        Ok(ApiWatchEvent::Modified(cm)) => Some(Ok(WatchEvent::modified(to_entry(cm)))),
        Ok(ApiWatchEvent::Deleted(cm)) => Some(Ok(WatchEvent::deleted(to_entry(cm)))),
        Ok(ApiWatchEvent::Bookmark(_)) => None,
        Ok(ApiWatchEvent::Error(response)) => Some(Err(classify(response.code, response.message))),
        Err(err) => Some(Err(StreamError::Transport(err.to_string()))),
    }
}

fn classify(code: u16, message: String) -> StreamError {
    if code == GONE {
        StreamError::Expired(message)
    } else {
        StreamError::Api { code, message }
    }
}

/// Snapshot of the fields the reconciler needs.
pub fn to_entry(cm: ConfigMap) -> ConfigEntry {
    let metadata = cm.metadata;
    ConfigEntry {
        namespace: metadata.namespace.unwrap_or_default(),
        name: metadata.name.unwrap_or_default(),
        labels: metadata.labels.unwrap_or_default(),
        data: cm.data.unwrap_or_default(),
        resource_version: metadata.resource_version,
    }
}
