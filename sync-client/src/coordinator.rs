//! SyncCoordinator - the owner of the authoritative counter.
//!
//! # Architecture
//!
//! The coordinator runs as a single tokio task. It is the only code that
//! reads or writes the authoritative counter and the observer list; callers
//! reach it through two bounded queues:
//!
//! ```text
//! CoordinatorHandle ──commands──┐
//!                               ├──> SyncCoordinator task ──> StateStore
//! ContextChannel ──RemoteUpdateSink─┘        │          └──> ContextChannel
//!                                            ↓
//!                              sync-core (pure state machine)
//! ```
//!
//! Each command or delivery is applied to completion before the next one is
//! taken, so persist-then-publish order holds per mutation and remote
//! updates apply in arrival order. When both queues have work, pending
//! remote updates go first.
//!
//! # Example
//!
//! ```ignore
//! let (mut coordinator, handle) = SyncCoordinator::new(config, store, channel);
//! coordinator.subscribe(|count| println!("{count}"));
//! let task = coordinator.start();
//!
//! let count = handle.increment(2).await?;
//! ```

use clicker_sync_core::{
    Action, CountObserver, CounterState, Event, ObserverRegistry, SubscriptionId,
    DEFAULT_INCREMENT_STEP,
};
use clicker_sync_types::{
    context_entry, ApplicationContext, Counter, Payload, COUNTER_KEY,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::channel::{ChannelError, ContextChannel, RemoteUpdateSink};
use crate::store::{StateStore, StoreError};

/// Default capacity of the command and remote-update queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Coordinator errors.
///
/// Propagation failures carry the new count: the local change is kept even
/// though it did not reach the store or the peer.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The store rejected the write. The peer was not told either.
    #[error("count {count} kept locally but not persisted: {source}")]
    Persistence {
        /// The authoritative count after the mutation.
        count: i64,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// Persisted, but the peer could not be reached.
    #[error("count {count} persisted but not published: {source}")]
    Publish {
        /// The authoritative count after the mutation.
        count: i64,
        /// Underlying channel error.
        #[source]
        source: ChannelError,
    },

    /// The coordinator task is no longer running.
    #[error("coordinator stopped")]
    Stopped,
}

impl CoordinatorError {
    /// The count kept locally, for propagation failures.
    pub fn kept_count(&self) -> Option<i64> {
        match self {
            Self::Persistence { count, .. } | Self::Publish { count, .. } => Some(*count),
            Self::Stopped => None,
        }
    }
}

/// Configuration for SyncCoordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Key the counter is persisted and published under.
    pub counter_key: String,
    /// Capacity of each queue (minimum 1).
    pub queue_capacity: usize,
    /// Amount one multiplier unit moves the counter.
    pub increment_step: i64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            counter_key: COUNTER_KEY.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            increment_step: DEFAULT_INCREMENT_STEP,
        }
    }
}

impl CoordinatorConfig {
    /// Set the counter key.
    pub fn with_counter_key(mut self, key: &str) -> Self {
        self.counter_key = key.to_string();
        self
    }

    /// Set the queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the increment step.
    pub fn with_increment_step(mut self, step: i64) -> Self {
        self.increment_step = step;
        self
    }
}

enum Command {
    Mutate {
        event: Event,
        reply: oneshot::Sender<Result<i64, CoordinatorError>>,
    },
    Current {
        reply: oneshot::Sender<i64>,
    },
    Subscribe {
        observer: Box<dyn CountObserver>,
        reply: oneshot::Sender<SubscriptionId>,
    },
    Unsubscribe {
        id: SubscriptionId,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Owner of the authoritative counter.
///
/// Build with [`SyncCoordinator::new`], attach observers that must see the
/// initial value, then [`start`](SyncCoordinator::start) it.
pub struct SyncCoordinator<S: StateStore, C: ContextChannel> {
    config: CoordinatorConfig,
    store: S,
    channel: C,
    state: CounterState,
    observers: ObserverRegistry,
    commands: mpsc::Receiver<Command>,
}

impl<S: StateStore, C: ContextChannel> SyncCoordinator<S, C> {
    /// Create a coordinator and the handle used to drive it.
    ///
    /// Commands sent through the handle before [`start`](Self::start) are
    /// queued and applied after initialization.
    pub fn new(config: CoordinatorConfig, store: S, channel: C) -> (Self, CoordinatorHandle) {
        let (tx, commands) = mpsc::channel(config.queue_capacity.max(1));
        let state = CounterState::with_step(config.increment_step);
        let coordinator = Self {
            config,
            store,
            channel,
            state,
            observers: ObserverRegistry::new(),
            commands,
        };
        (coordinator, CoordinatorHandle { tx })
    }

    /// Subscribe an observer before the coordinator starts.
    pub fn subscribe(&mut self, observer: impl CountObserver + 'static) -> SubscriptionId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Spawn the coordinator loop on the current tokio runtime.
    pub fn start(self) -> JoinHandle<()>
    where
        S: 'static,
        C: 'static,
    {
        tokio::spawn(self.run())
    }

    /// Run the coordinator loop on the calling task.
    ///
    /// Registers for remote updates, initializes, then applies commands and
    /// deliveries until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        let (remote_tx, mut remote_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        self.channel.on_remote_update(RemoteUpdateSink::new(remote_tx));

        self.initialize().await;

        let mut remote_open = true;
        loop {
            tokio::select! {
                biased;

                delivery = remote_rx.recv(), if remote_open => match delivery {
                    Some(context) => self.on_remote_update(&context),
                    None => remote_open = false,
                },

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command).await,
                },
            }
        }

        tracing::info!(
            "Coordinator stopped at count {}",
            self.state.authoritative().count()
        );
    }

    /// Reconcile the stored counter with the peer's last context.
    async fn initialize(&mut self) {
        let key = self.config.counter_key.clone();

        let local = match self.store.get(&key).await {
            Ok(Some(payload)) => Counter::from_payload(&payload),
            Ok(None) => Counter::zero(),
            Err(e) => {
                tracing::warn!("Failed to read stored counter, starting from zero: {}", e);
                Counter::zero()
            }
        };

        let remote = self
            .channel
            .current_remote_snapshot(&key)
            .and_then(|payload| decode_remote(&payload));

        tracing::info!(
            "Initializing from local {} and remote {:?}",
            local,
            remote.map(|c| c.count())
        );

        let (state, actions) = self.state.on_event(Event::Initialized { local, remote });
        self.state = state;
        if let Err(e) = self.execute(actions).await {
            tracing::warn!("Initialization side effect failed: {}", e);
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Mutate { event, reply } => {
                let result = self.apply(event).await;
                let _ = reply.send(result);
            }
            Command::Current { reply } => {
                let _ = reply.send(self.state.authoritative().count());
            }
            Command::Subscribe { observer, reply } => {
                let id = self.observers.subscribe(observer);
                let _ = reply.send(id);
            }
            Command::Unsubscribe { id, reply } => {
                let _ = reply.send(self.observers.unsubscribe(id));
            }
            Command::Shutdown => {}
        }
    }

    /// Apply a local mutation: notify, persist, then publish.
    async fn apply(&mut self, event: Event) -> Result<i64, CoordinatorError> {
        let (state, actions) = self.state.on_event(event);
        self.state = state;
        self.execute(actions).await?;
        Ok(self.state.authoritative().count())
    }

    /// Merge a delivered context into the authoritative counter.
    ///
    /// Contexts without the counter key belong to someone else and are
    /// skipped; undecodable payloads are dropped. Neither is an error to the
    /// delivering side. Remote values are never re-published.
    fn on_remote_update(&mut self, context: &ApplicationContext) {
        let key = &self.config.counter_key;
        let payload = match context_entry(context, key) {
            None => {
                tracing::debug!("Ignoring context without {:?}", key);
                return;
            }
            Some(Err(e)) => {
                tracing::warn!("Dropping remote {:?} entry: {}", key, e);
                return;
            }
            Some(Ok(payload)) => payload,
        };
        let Some(remote) = decode_remote(payload) else {
            return;
        };

        let before = self.state.authoritative();
        let (state, actions) = self.state.on_event(Event::RemoteUpdated { remote });
        self.state = state;
        tracing::debug!(
            "Remote update {} merged with {} -> {}",
            remote,
            before,
            self.state.authoritative()
        );

        for action in actions {
            if let Action::Notify { count } = action {
                self.observers.notify(count);
            }
        }
    }

    /// Execute actions in order, stopping at the first failure.
    async fn execute(&mut self, actions: Vec<Action>) -> Result<(), CoordinatorError> {
        for action in actions {
            match action {
                Action::Notify { count } => self.observers.notify(count),
                Action::Persist { counter } => {
                    self.store
                        .put(&self.config.counter_key, counter.to_payload())
                        .await
                        .map_err(|source| {
                            tracing::warn!("Failed to persist count {}: {}", counter, source);
                            CoordinatorError::Persistence {
                                count: counter.count(),
                                source,
                            }
                        })?;
                }
                Action::Publish { counter } => {
                    self.channel
                        .publish(&self.config.counter_key, counter.to_payload())
                        .await
                        .map_err(|source| {
                            tracing::warn!("Failed to publish count {}: {}", counter, source);
                            CoordinatorError::Publish {
                                count: counter.count(),
                                source,
                            }
                        })?;
                }
            }
        }
        Ok(())
    }
}

/// Decode a remote counter payload, logging and dropping failures.
fn decode_remote(payload: &Payload) -> Option<Counter> {
    match Counter::try_from_payload(payload) {
        Ok(counter) => Some(counter),
        Err(e) => {
            tracing::warn!("Dropping undecodable remote counter: {}", e);
            None
        }
    }
}

/// Cloneable handle to a running [`SyncCoordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Increment by `multiplier` steps. Returns the new count.
    pub async fn increment(&self, multiplier: i64) -> Result<i64, CoordinatorError> {
        self.mutate(Event::IncrementRequested { multiplier }).await
    }

    /// Decrement by `multiplier` steps. Returns the new count.
    pub async fn decrement(&self, multiplier: i64) -> Result<i64, CoordinatorError> {
        self.mutate(Event::DecrementRequested { multiplier }).await
    }

    /// Reset to zero. Returns the new count.
    pub async fn reset(&self) -> Result<i64, CoordinatorError> {
        self.mutate(Event::ResetRequested).await
    }

    /// The current authoritative count.
    pub async fn current(&self) -> Result<i64, CoordinatorError> {
        self.request(|reply| Command::Current { reply }).await
    }

    /// Subscribe an observer to future count changes.
    pub async fn subscribe(
        &self,
        observer: impl CountObserver + 'static,
    ) -> Result<SubscriptionId, CoordinatorError> {
        let observer: Box<dyn CountObserver> = Box::new(observer);
        self.request(|reply| Command::Subscribe { observer, reply })
            .await
    }

    /// Remove a subscription. Returns `false` if it was not present.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, CoordinatorError> {
        self.request(|reply| Command::Unsubscribe { id, reply }).await
    }

    /// Stop the coordinator after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| CoordinatorError::Stopped)
    }

    /// Whether the coordinator task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn mutate(&self, event: Event) -> Result<i64, CoordinatorError> {
        self.request(|reply| Command::Mutate { event, reply })
            .await?
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CoordinatorError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| CoordinatorError::Stopped)?;
        response.await.map_err(|_| CoordinatorError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockContextChannel;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use clicker_sync_types::wrap_context;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn context(value: Value) -> ApplicationContext {
        value.as_object().cloned().unwrap()
    }

    fn counter_context(count: i64) -> ApplicationContext {
        wrap_context(COUNTER_KEY, Counter::new(count).to_payload())
    }

    fn seeded(local: Option<i64>, remote: Option<i64>) -> (MemoryStore, MockContextChannel) {
        let store = MemoryStore::new();
        let channel = MockContextChannel::new();
        if let Some(n) = local {
            store.insert(COUNTER_KEY, Counter::new(n).to_payload());
        }
        if let Some(n) = remote {
            channel.set_received_context(counter_context(n));
        }
        (store, channel)
    }

    fn recorder(log: &Arc<Mutex<Vec<i64>>>) -> impl CountObserver + 'static {
        let log = Arc::clone(log);
        move |count: i64| log.lock().unwrap().push(count)
    }

    async fn started(
        store: MemoryStore,
        channel: MockContextChannel,
    ) -> (CoordinatorHandle, JoinHandle<()>, Arc<Mutex<Vec<i64>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut coordinator, handle) =
            SyncCoordinator::new(CoordinatorConfig::default(), store, channel);
        coordinator.subscribe(recorder(&log));
        let task = coordinator.start();
        // Round-trip a query so initialization has finished.
        handle.current().await.unwrap();
        (handle, task, log)
    }

    // ===========================================
    // Initialization Tests
    // ===========================================

    #[tokio::test]
    async fn init_with_nothing_stored_is_zero() {
        let (store, channel) = seeded(None, None);
        let (handle, _task, log) = started(store, channel).await;

        assert_eq!(handle.current().await.unwrap(), 0);
        assert_eq!(*log.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn init_equal_local_and_remote() {
        let (store, channel) = seeded(Some(5), Some(5));
        let (handle, _task, log) = started(store, channel).await;

        assert_eq!(handle.current().await.unwrap(), 5);
        assert_eq!(*log.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn init_newer_remote_wins() {
        let (store, channel) = seeded(Some(3), Some(7));
        let (handle, _task, log) = started(store.clone(), channel.clone()).await;

        assert_eq!(handle.current().await.unwrap(), 7);
        assert_eq!(*log.lock().unwrap(), vec![7]);
        // Initialization neither writes nor publishes.
        assert!(store.writes().is_empty());
        assert!(channel.published().is_empty());
    }

    #[tokio::test]
    async fn init_larger_local_wins() {
        let (store, channel) = seeded(Some(9), Some(2));
        let (handle, _task, _log) = started(store, channel).await;
        assert_eq!(handle.current().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn init_store_failure_starts_from_zero() {
        let (store, channel) = seeded(Some(9), None);
        store.fail_next_get("locked");
        let (handle, _task, _log) = started(store, channel).await;
        assert_eq!(handle.current().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn init_ignores_malformed_snapshot() {
        let (store, channel) = seeded(Some(-3), None);
        channel.set_received_context(context(json!({"clicker": {"cnt": 50}})));
        let (handle, _task, _log) = started(store, channel).await;
        assert_eq!(handle.current().await.unwrap(), -3);
    }

    #[tokio::test]
    async fn init_registers_remote_sink() {
        let (store, channel) = seeded(None, None);
        let (_handle, _task, _log) = started(store, channel.clone()).await;
        assert!(channel.has_sink());
    }

    // ===========================================
    // Local Mutation Tests
    // ===========================================

    #[tokio::test]
    async fn increment_persists_and_publishes() {
        let (store, channel) = seeded(Some(10), None);
        let (handle, _task, log) = started(store.clone(), channel.clone()).await;

        assert_eq!(handle.increment(2).await.unwrap(), 12);

        assert_eq!(*log.lock().unwrap(), vec![10, 12]);
        assert_eq!(
            store.payload(COUNTER_KEY).map(Value::Object),
            Some(json!({"count": 12}))
        );
        assert_eq!(
            channel.last_published().map(Value::Object),
            Some(json!({"clicker": {"count": 12}}))
        );
    }

    #[tokio::test]
    async fn decrement_persists_and_publishes() {
        let (store, channel) = seeded(Some(1), None);
        let (handle, _task, _log) = started(store.clone(), channel.clone()).await;

        assert_eq!(handle.decrement(3).await.unwrap(), -2);
        assert_eq!(
            store.payload(COUNTER_KEY).map(Value::Object),
            Some(json!({"count": -2}))
        );
        assert_eq!(channel.last_published(), Some(counter_context(-2)));
    }

    #[tokio::test]
    async fn reset_persists_and_publishes_zero() {
        let (store, channel) = seeded(Some(9), None);
        let (handle, _task, log) = started(store.clone(), channel.clone()).await;

        assert_eq!(handle.reset().await.unwrap(), 0);
        assert_eq!(*log.lock().unwrap(), vec![9, 0]);
        assert_eq!(
            store.payload(COUNTER_KEY).map(Value::Object),
            Some(json!({"count": 0}))
        );
        assert_eq!(channel.last_published(), Some(counter_context(0)));
    }

    #[tokio::test]
    async fn configured_step_scales_increments() {
        let (store, channel) = seeded(None, None);
        let (coordinator, handle) = SyncCoordinator::new(
            CoordinatorConfig::default().with_increment_step(5),
            store,
            channel,
        );
        let _task = coordinator.start();

        assert_eq!(handle.increment(3).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn custom_counter_key() {
        let (store, channel) = (MemoryStore::new(), MockContextChannel::new());
        let (coordinator, handle) = SyncCoordinator::new(
            CoordinatorConfig::default().with_counter_key("tally"),
            store.clone(),
            channel.clone(),
        );
        let _task = coordinator.start();

        handle.increment(1).await.unwrap();
        assert!(store.payload("tally").is_some());
        assert!(store.payload(COUNTER_KEY).is_none());
        assert!(channel.last_published().unwrap().contains_key("tally"));
    }

    #[tokio::test]
    async fn persist_happens_before_publish() {
        #[derive(Clone)]
        struct LoggingStore(Arc<Mutex<Vec<&'static str>>>);
        #[async_trait]
        impl StateStore for LoggingStore {
            async fn get(&self, _key: &str) -> Result<Option<Payload>, StoreError> {
                Ok(None)
            }
            async fn put(&self, _key: &str, _payload: Payload) -> Result<(), StoreError> {
                self.0.lock().unwrap().push("persist");
                Ok(())
            }
        }

        struct LoggingChannel(Arc<Mutex<Vec<&'static str>>>);
        #[async_trait]
        impl ContextChannel for LoggingChannel {
            fn current_remote_snapshot(&self, _key: &str) -> Option<Payload> {
                None
            }
            async fn publish(&self, _key: &str, _payload: Payload) -> Result<(), ChannelError> {
                self.0.lock().unwrap().push("publish");
                Ok(())
            }
            fn on_remote_update(&self, _sink: RemoteUpdateSink) {}
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut coordinator, handle) = SyncCoordinator::new(
            CoordinatorConfig::default(),
            LoggingStore(Arc::clone(&log)),
            LoggingChannel(Arc::clone(&log)),
        );
        let notify_log = Arc::clone(&log);
        coordinator.subscribe(move |_: i64| notify_log.lock().unwrap().push("notify"));
        let _task = coordinator.start();

        handle.increment(1).await.unwrap();
        handle.reset().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "notify", // initial value
                "notify", "persist", "publish", //
                "notify", "persist", "publish",
            ]
        );
    }

    // ===========================================
    // Propagation Failure Tests
    // ===========================================

    #[tokio::test]
    async fn persistence_failure_keeps_count_and_skips_publish() {
        let (store, channel) = seeded(Some(4), None);
        let (handle, _task, log) = started(store.clone(), channel.clone()).await;
        store.fail_next_put("disk full");

        let err = handle.increment(1).await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Persistence { count: 5, .. }
        ));
        assert_eq!(err.kept_count(), Some(5));

        assert_eq!(handle.current().await.unwrap(), 5);
        assert_eq!(*log.lock().unwrap(), vec![4, 5]);
        assert!(channel.published().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_keeps_count_and_persists() {
        let (store, channel) = seeded(Some(4), None);
        let (handle, _task, _log) = started(store.clone(), channel.clone()).await;
        channel.set_unreachable(true);

        let err = handle.increment(1).await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Publish {
                count: 5,
                source: ChannelError::PeerUnreachable
            }
        ));
        assert_eq!(handle.current().await.unwrap(), 5);
        assert_eq!(
            store.payload(COUNTER_KEY).map(Value::Object),
            Some(json!({"count": 5}))
        );
    }

    #[tokio::test]
    async fn next_publish_carries_latest_value() {
        let (store, channel) = seeded(None, None);
        let (handle, _task, _log) = started(store, channel.clone()).await;
        channel.fail_next_publish("inactive");

        assert!(handle.increment(1).await.is_err());
        assert_eq!(handle.increment(1).await.unwrap(), 2);
        assert_eq!(channel.published(), vec![counter_context(2)]);
    }

    // ===========================================
    // Remote Update Tests
    // ===========================================

    #[tokio::test]
    async fn stale_remote_update_keeps_local_without_republish() {
        let (store, channel) = seeded(Some(4), None);
        let (handle, _task, log) = started(store.clone(), channel.clone()).await;

        channel.deliver(counter_context(2)).await.unwrap();

        assert_eq!(handle.current().await.unwrap(), 4);
        assert_eq!(*log.lock().unwrap(), vec![4, 4]);
        assert!(channel.published().is_empty());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn newer_remote_update_replaces_local() {
        let (store, channel) = seeded(Some(4), None);
        let (handle, _task, log) = started(store, channel.clone()).await;

        channel.deliver(counter_context(11)).await.unwrap();

        assert_eq!(handle.current().await.unwrap(), 11);
        assert_eq!(*log.lock().unwrap(), vec![4, 11]);
        assert!(channel.published().is_empty());
    }

    #[tokio::test]
    async fn malformed_remote_update_is_ignored() {
        let (store, channel) = seeded(Some(-3), None);
        let (handle, _task, log) = started(store, channel.clone()).await;

        let delivered = channel
            .deliver(context(json!({"clicker": {"total": 8}})))
            .await;
        assert!(delivered.is_ok());
        channel
            .deliver(context(json!({"clicker": "eight"})))
            .await
            .unwrap();

        assert_eq!(handle.current().await.unwrap(), -3);
        assert_eq!(*log.lock().unwrap(), vec![-3]);
    }

    #[tokio::test]
    async fn unrelated_context_is_ignored() {
        let (store, channel) = seeded(Some(2), None);
        let (handle, _task, log) = started(store, channel.clone()).await;

        channel
            .deliver(context(json!({"settings": {"color": "BlueColor"}})))
            .await
            .unwrap();

        assert_eq!(handle.current().await.unwrap(), 2);
        assert_eq!(*log.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn remote_updates_apply_in_delivery_order() {
        let (store, channel) = seeded(None, None);
        let (handle, _task, log) = started(store, channel.clone()).await;

        for n in [3, 8, 5, 9] {
            channel.deliver(counter_context(n)).await.unwrap();
        }

        assert_eq!(handle.current().await.unwrap(), 9);
        assert_eq!(*log.lock().unwrap(), vec![0, 3, 8, 8, 9]);
    }

    #[tokio::test]
    async fn remote_update_from_plain_thread() {
        let (store, channel) = seeded(None, None);
        let (handle, _task, _log) = started(store, channel.clone()).await;

        let sink = channel.sink().unwrap();
        std::thread::spawn(move || sink.blocking_deliver(counter_context(6)))
            .join()
            .unwrap()
            .unwrap();

        assert_eq!(handle.current().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn local_mutation_after_remote_builds_on_merged_value() {
        let (store, channel) = seeded(Some(1), None);
        let (handle, _task, _log) = started(store, channel.clone()).await;

        channel.deliver(counter_context(20)).await.unwrap();
        assert_eq!(handle.increment(1).await.unwrap(), 21);
        assert_eq!(channel.last_published(), Some(counter_context(21)));
    }

    // ===========================================
    // Observer Tests
    // ===========================================

    #[tokio::test]
    async fn subscribe_and_unsubscribe_through_handle() {
        let (store, channel) = seeded(None, None);
        let (handle, _task, _log) = started(store, channel).await;

        let late = Arc::new(Mutex::new(Vec::new()));
        let id = handle.subscribe(recorder(&late)).await.unwrap();
        handle.increment(1).await.unwrap();

        assert!(handle.unsubscribe(id).await.unwrap());
        assert!(!handle.unsubscribe(id).await.unwrap());
        handle.increment(1).await.unwrap();

        assert_eq!(*late.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn observers_called_in_subscription_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (mut coordinator, handle) = SyncCoordinator::new(
            CoordinatorConfig::default(),
            MemoryStore::new(),
            MockContextChannel::new(),
        );
        for tag in ["display", "complication", "haptics"] {
            let order = Arc::clone(&order);
            coordinator.subscribe(move |count: i64| order.lock().unwrap().push((tag, count)));
        }
        let _task = coordinator.start();

        handle.increment(1).await.unwrap();

        assert_eq!(
            order.lock().unwrap()[3..],
            [("display", 1), ("complication", 1), ("haptics", 1)]
        );
    }

    #[tokio::test]
    async fn unsubscribe_raised_during_notify_applies_after_the_pass() {
        let (store, channel) = seeded(None, None);
        let (handle, _task, _log) = started(store, channel).await;

        let target: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let pending = Arc::new(Mutex::new(None));
        let first_seen = Arc::new(Mutex::new(Vec::new()));
        let first = {
            let handle = handle.clone();
            let target = Arc::clone(&target);
            let pending = Arc::clone(&pending);
            let seen = Arc::clone(&first_seen);
            move |count: i64| {
                seen.lock().unwrap().push(count);
                if let Some(id) = target.lock().unwrap().take() {
                    let handle = handle.clone();
                    let task = tokio::spawn(async move { handle.unsubscribe(id).await });
                    *pending.lock().unwrap() = Some(task);
                }
            }
        };
        let second_seen = Arc::new(Mutex::new(Vec::new()));
        let third_seen = Arc::new(Mutex::new(Vec::new()));

        handle.subscribe(first).await.unwrap();
        let second = handle.subscribe(recorder(&second_seen)).await.unwrap();
        handle.subscribe(recorder(&third_seen)).await.unwrap();
        *target.lock().unwrap() = Some(second);

        handle.increment(1).await.unwrap();
        assert_eq!(*first_seen.lock().unwrap(), vec![1]);
        assert_eq!(*second_seen.lock().unwrap(), vec![1]);
        assert_eq!(*third_seen.lock().unwrap(), vec![1]);

        let task = pending.lock().unwrap().take().unwrap();
        assert!(task.await.unwrap().unwrap());

        handle.increment(1).await.unwrap();
        assert_eq!(*first_seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(*second_seen.lock().unwrap(), vec![1]);
        assert_eq!(*third_seen.lock().unwrap(), vec![1, 2]);
    }

    // ===========================================
    // Lifecycle Tests
    // ===========================================

    #[tokio::test]
    async fn commands_queued_before_start_run_after_init() {
        let (store, channel) = seeded(Some(5), None);
        let (coordinator, handle) =
            SyncCoordinator::new(CoordinatorConfig::default(), store, channel);

        let pending = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.increment(1).await })
        };
        tokio::task::yield_now().await;
        let _task = coordinator.start();

        assert_eq!(pending.await.unwrap().unwrap(), 6);
    }

    #[tokio::test]
    async fn shutdown_stops_task() {
        let (store, channel) = seeded(None, None);
        let (handle, task, _log) = started(store, channel.clone()).await;

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(handle.is_closed());
        assert!(matches!(
            handle.increment(1).await,
            Err(CoordinatorError::Stopped)
        ));
        assert!(matches!(
            channel.deliver(counter_context(1)).await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn dropping_all_handles_stops_task() {
        let (store, channel) = seeded(None, None);
        let (handle, task, _log) = started(store, channel).await;

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let (coordinator, handle) = SyncCoordinator::new(
            CoordinatorConfig::default().with_queue_capacity(0),
            MemoryStore::new(),
            MockContextChannel::new(),
        );
        let _task = coordinator.start();
        assert_eq!(handle.increment(1).await.unwrap(), 1);
    }

    #[test]
    fn error_display_mentions_kept_count() {
        let err = CoordinatorError::Persistence {
            count: 7,
            source: StoreError::WriteFailed("disk full".into()),
        };
        assert_eq!(
            err.to_string(),
            "count 7 kept locally but not persisted: write failed: disk full"
        );
        assert_eq!(CoordinatorError::Stopped.kept_count(), None);
    }

    #[test]
    fn default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.counter_key, "clicker");
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.increment_step, 1);
    }
}
