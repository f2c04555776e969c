//! Scripted watch source for testing.
//!
//! Each call to `open` consumes the next scripted step: either a finite
//! stream of events and errors, or an open failure. Once the script is used
//! up every further `open` fails.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::domain::errors::{StreamError, WatchOpenError};
use crate::domain::models::WatchEvent;
use crate::domain::ports::{EventStream, WatchScope, WatchSource};

/// What a single `open` call returns.
#[derive(Debug, Clone)]
pub enum ScriptedOpen {
    /// A stream yielding these items, then closing.
    Stream(Vec<Result<WatchEvent, StreamError>>),
    /// `open` fails with this message.
    Fail(String),
}

impl ScriptedOpen {
    /// A stream yielding `events` without errors.
    pub fn events(events: Vec<WatchEvent>) -> Self {
        Self::Stream(events.into_iter().map(Ok).collect())
    }
}

/// Watch source replaying a fixed script.
#[derive(Debug, Default)]
pub struct ScriptedWatchSource {
    script: Mutex<VecDeque<ScriptedOpen>>,
    opens: Mutex<Vec<(WatchScope, Option<String>)>>,
}

impl ScriptedWatchSource {
    /// Source answering successive `open` calls with `script`.
    pub fn new(script: impl IntoIterator<Item = ScriptedOpen>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            opens: Mutex::new(Vec::new()),
        }
    }

    /// Every `open` call so far, with the resource version it resumed from.
    pub fn opens(&self) -> Vec<(WatchScope, Option<String>)> {
        self.opens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl WatchSource for ScriptedWatchSource {
    async fn open(
        &self,
        scope: &WatchScope,
        resource_version: Option<&str>,
    ) -> Result<EventStream, WatchOpenError> {
        self.opens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((scope.clone(), resource_version.map(str::to_string)));

        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match step {
            Some(ScriptedOpen::Stream(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(ScriptedOpen::Fail(message)) => Err(WatchOpenError {
                scope: scope.to_string(),
                message,
            }),
            None => Err(WatchOpenError {
                scope: scope.to_string(),
                message: "script exhausted".to_string(),
            }),
        }
    }
}
