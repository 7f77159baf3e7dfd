//! Mock context channel for testing.
//!
//! Captures published contexts, serves a settable received context, and
//! simulates peer deliveries through the registered sink.

use super::{ChannelError, ContextChannel, RemoteUpdateSink};
use async_trait::async_trait;
use clicker_sync_types::{context_entry, wrap_context, ApplicationContext, Payload};
use std::sync::{Arc, Mutex};

/// Mock context channel for testing.
///
/// Clones share state.
#[derive(Debug, Default, Clone)]
pub struct MockContextChannel {
    inner: Arc<Mutex<MockChannelInner>>,
}

#[derive(Debug, Default)]
struct MockChannelInner {
    received: Option<ApplicationContext>,
    published: Vec<ApplicationContext>,
    sink: Option<RemoteUpdateSink>,
    unreachable: bool,
    fail_next_publish: Option<String>,
}

impl MockContextChannel {
    /// Create a channel with nothing received yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context returned by snapshot pulls, as if it had arrived
    /// before startup.
    pub fn set_received_context(&self, context: ApplicationContext) {
        let mut inner = self.inner.lock().unwrap();
        inner.received = Some(context);
    }

    /// Simulate the peer delivering `context` now.
    ///
    /// Updates the received snapshot, then hands the context to the
    /// registered sink. Fails with [`ChannelError::Closed`] if no sink is
    /// registered or the coordinator has stopped.
    pub async fn deliver(&self, context: ApplicationContext) -> Result<(), ChannelError> {
        let sink = {
            let mut inner = self.inner.lock().unwrap();
            inner.received = Some(context.clone());
            inner.sink.clone()
        };
        match sink {
            Some(sink) => sink.deliver(context).await,
            None => Err(ChannelError::Closed),
        }
    }

    /// Whether a sink has been registered.
    pub fn has_sink(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.sink.is_some()
    }

    /// The registered sink, for delivering from outside the mock.
    pub fn sink(&self) -> Option<RemoteUpdateSink> {
        let inner = self.inner.lock().unwrap();
        inner.sink.clone()
    }

    /// All contexts published so far.
    pub fn published(&self) -> Vec<ApplicationContext> {
        let inner = self.inner.lock().unwrap();
        inner.published.clone()
    }

    /// The most recently published context.
    pub fn last_published(&self) -> Option<ApplicationContext> {
        let inner = self.inner.lock().unwrap();
        inner.published.last().cloned()
    }

    /// Make every publish fail until cleared.
    pub fn set_unreachable(&self, unreachable: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.unreachable = unreachable;
    }

    /// Cause the next publish to fail with the given error.
    pub fn fail_next_publish(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_publish = Some(error.to_string());
    }
}

#[async_trait]
impl ContextChannel for MockContextChannel {
    fn current_remote_snapshot(&self, key: &str) -> Option<Payload> {
        let inner = self.inner.lock().unwrap();
        let received = inner.received.as_ref()?;
        context_entry(received, key)?.ok().cloned()
    }

    async fn publish(&self, key: &str, payload: Payload) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.unreachable {
            return Err(ChannelError::PeerUnreachable);
        }

        if let Some(error) = inner.fail_next_publish.take() {
            return Err(ChannelError::PublishFailed(error));
        }

        inner.published.push(wrap_context(key, payload));
        Ok(())
    }

    fn on_remote_update(&self, sink: RemoteUpdateSink) {
        let mut inner = self.inner.lock().unwrap();
        inner.sink = Some(sink);
    }
}
