//! Supervision of the single live item subscription.
//!
//! ## State machine
//!
//! ```text
//! Idle -> Connecting -> Live
//!                    -> Offline   (timeout, no runtime, listener error, empty snapshot)
//!                    -> Failed    (fallback dataset unavailable)
//! Live -> Offline                 (listener error, empty snapshot)
//! any  -> Connecting              (retry)
//! any  -> Idle                    (shutdown)
//! ```
//!
//! Every `start`/`retry` opens a new attempt with a higher generation.
//! Listener callbacks and the connect timer carry the generation they were
//! created for and are ignored once it is stale, so an abandoned
//! subscription can never touch the current dataset.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, trace, warn};

use lustre_core::{normalize_items, CatalogEvent, EventBus, ItemRecord, SyncError};

use crate::config::SyncConfig;
use crate::fallback::FallbackSource;
use crate::lock;
use crate::remote::{Listener, RemoteEvent, RemoteSource, SubscriptionHandle, Teardown};

/// Where the current dataset comes from, and whether a connection is pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not started, or shut down.
    #[default]
    Idle,
    /// Waiting for the first emission of the current attempt.
    Connecting,
    /// Dataset comes from the live subscription.
    Live,
    /// Dataset comes from the bundled fallback.
    Offline,
    /// No dataset at all.
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Connecting => "connecting",
            SyncStatus::Live => "live",
            SyncStatus::Offline => "offline",
            SyncStatus::Failed => "failed",
        }
    }

    /// Whether the current attempt still accepts remote deliveries.
    fn is_open(&self) -> bool {
        matches!(self, SyncStatus::Connecting | SyncStatus::Live)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a consumer can observe about the item store.
#[derive(Debug, Clone)]
pub struct SyncSnapshot {
    /// The active dataset. Replaced wholesale, never mutated.
    pub items: Arc<[ItemRecord]>,
    pub status: SyncStatus,
    /// Why the store is not live, when it is not.
    pub error: Option<SyncError>,
    /// Human-readable form of `error` for display.
    pub reason: Option<String>,
    /// When `items` was last replaced.
    pub last_updated: Option<DateTime<Utc>>,
    /// Generation of the attempt this snapshot belongs to.
    pub attempt: u64,
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self {
            items: Arc::from(Vec::new()),
            status: SyncStatus::Idle,
            error: None,
            reason: None,
            last_updated: None,
            attempt: 0,
        }
    }
}

impl SyncSnapshot {
    pub fn is_live(&self) -> bool {
        self.status == SyncStatus::Live
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

struct State {
    generation: u64,
    subscription: Option<Box<dyn SubscriptionHandle>>,
    timer: Option<AbortHandle>,
    snapshot: SyncSnapshot,
}

impl State {
    fn take_teardown(&mut self) -> Teardown {
        Teardown {
            subscription: self.subscription.take(),
            timer: self.timer.take(),
        }
    }
}

struct Shared {
    remote: Arc<dyn RemoteSource>,
    fallback: Arc<dyn FallbackSource>,
    config: SyncConfig,
    events: OnceLock<EventBus>,
    state: Mutex<State>,
    tx: watch::Sender<SyncSnapshot>,
}

impl Shared {
    fn publish(&self, state: &State) {
        self.tx.send_replace(state.snapshot.clone());
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(bus) = self.events.get() {
            bus.emit(event);
        }
    }

    /// Lock the state if `generation` is the current, still-open attempt.
    fn lock_open(&self, generation: u64) -> Option<MutexGuard<'_, State>> {
        let state = lock(&self.state);
        if state.generation != generation || !state.snapshot.status.is_open() {
            trace!(
                component = "sync_store",
                attempt = generation,
                current = state.generation,
                status = %state.snapshot.status,
                "Dropping delivery for closed attempt"
            );
            return None;
        }
        Some(state)
    }

    fn on_event(&self, generation: u64, event: RemoteEvent) {
        match event {
            RemoteEvent::Snapshot(docs) => self.on_snapshot(generation, docs),
            RemoteEvent::Error(message) => self.on_failure(generation, SyncError::Listener(message)),
        }
    }

    fn on_snapshot(&self, generation: u64, docs: Vec<JsonValue>) {
        let items = normalize_items(&docs);
        let Some(mut state) = self.lock_open(generation) else {
            return;
        };
        if items.is_empty() {
            let event = self.apply_fallback(&mut state, SyncError::EmptyDataset);
            let teardown = state.take_teardown();
            drop(state);
            teardown.run();
            self.emit(event);
            return;
        }

        let was_live = state.snapshot.status == SyncStatus::Live;
        let timer = state.timer.take();
        let item_count = items.len();
        state.snapshot = SyncSnapshot {
            items: Arc::from(items),
            status: SyncStatus::Live,
            error: None,
            reason: None,
            last_updated: Some(Utc::now()),
            attempt: generation,
        };
        self.publish(&state);
        drop(state);

        if let Some(timer) = timer {
            timer.abort();
        }
        if was_live {
            debug!(component = "sync_store", attempt = generation, item_count, "Remote snapshot applied");
        } else {
            info!(
                component = "sync_store",
                collection = %self.config.collection,
                attempt = generation,
                item_count,
                "Remote collection live"
            );
        }
        self.emit(CatalogEvent::SyncLive {
            collection: self.config.collection.clone(),
            attempt: generation,
            item_count,
        });
    }

    fn on_failure(&self, generation: u64, cause: SyncError) {
        let Some(mut state) = self.lock_open(generation) else {
            return;
        };
        let event = self.apply_fallback(&mut state, cause);
        let teardown = state.take_teardown();
        drop(state);
        teardown.run();
        self.emit(event);
    }

    fn on_timeout(&self, generation: u64, cause: SyncError) {
        let mut state = lock(&self.state);
        if state.generation != generation || state.snapshot.status != SyncStatus::Connecting {
            return;
        }
        // Called from the timer task itself, or when no timer could be armed.
        state.timer = None;
        let event = self.apply_fallback(&mut state, cause);
        let teardown = state.take_teardown();
        drop(state);
        teardown.run();
        self.emit(event);
    }

    /// Replace the dataset with the bundled one and close the attempt.
    ///
    /// The dataset is replaced, never extended, so repeated fallback always
    /// yields the bundled records exactly once.
    fn apply_fallback(&self, state: &mut State, cause: SyncError) -> CatalogEvent {
        let generation = state.generation;
        let collection = self.config.collection.clone();
        let loaded = self.fallback.load_items().map(|docs| normalize_items(&docs));

        let event = match loaded {
            Ok(items) if !items.is_empty() => {
                let item_count = items.len();
                let reason = format!("{}; showing offline catalog", cause);
                warn!(
                    component = "sync_store",
                    op = "fallback",
                    collection = %collection,
                    attempt = generation,
                    reason = %cause,
                    item_count,
                    "Remote unavailable, bundled dataset applied"
                );
                state.snapshot = SyncSnapshot {
                    items: Arc::from(items),
                    status: SyncStatus::Offline,
                    error: Some(cause),
                    reason: Some(reason.clone()),
                    last_updated: Some(Utc::now()),
                    attempt: generation,
                };
                CatalogEvent::SyncOffline {
                    collection,
                    attempt: generation,
                    reason,
                    item_count,
                }
            }
            other => {
                let detail = match other {
                    Ok(_) => "bundled dataset is empty".to_string(),
                    Err(e) => e.to_string(),
                };
                let fatal = SyncError::FallbackLoad(detail);
                let reason = format!("{}; {}", cause, fatal);
                error!(
                    component = "sync_store",
                    op = "fallback",
                    collection = %collection,
                    attempt = generation,
                    reason = %reason,
                    "No dataset available"
                );
                state.snapshot = SyncSnapshot {
                    items: Arc::from(Vec::new()),
                    status: SyncStatus::Failed,
                    error: Some(fatal),
                    reason: Some(reason.clone()),
                    last_updated: state.snapshot.last_updated,
                    attempt: generation,
                };
                CatalogEvent::SyncFailed {
                    collection,
                    attempt: generation,
                    reason,
                }
            }
        };
        self.publish(state);
        event
    }

    fn arm_timer(self: &Arc<Self>, generation: u64) -> Option<AbortHandle> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(
                    component = "sync_store",
                    attempt = generation,
                    "No tokio runtime, connect timeout cannot be armed"
                );
                return None;
            }
        };
        let weak = Arc::downgrade(self);
        let timeout = self.config.connect_timeout();
        let timeout_ms = self.config.connect_timeout_ms;
        let task = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = weak.upgrade() {
                shared.on_timeout(generation, SyncError::ConnectionTimeout { timeout_ms });
            }
        });
        Some(task.abort_handle())
    }
}

/// Owner of the one live subscription to the remote item collection.
///
/// Construct once per session and share the snapshot through
/// [`SyncStore::watch`]. No operation fails towards the caller: every
/// failure ends in [`SyncStatus::Offline`] or [`SyncStatus::Failed`] with a
/// reason on the snapshot.
///
/// Dropping the store shuts it down.
pub struct SyncStore {
    shared: Arc<Shared>,
}

impl SyncStore {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        fallback: Arc<dyn FallbackSource>,
        config: SyncConfig,
    ) -> Self {
        let (tx, _) = watch::channel(SyncSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                remote,
                fallback,
                config,
                events: OnceLock::new(),
                state: Mutex::new(State {
                    generation: 0,
                    subscription: None,
                    timer: None,
                    snapshot: SyncSnapshot::default(),
                }),
                tx,
            }),
        }
    }

    /// Publish lifecycle transitions on `bus`.
    pub fn with_events(self, bus: EventBus) -> Self {
        if self.shared.events.set(bus).is_err() {
            debug!(component = "sync_store", "Event bus already attached");
        }
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }

    /// Open a new connection attempt.
    ///
    /// Any previous subscription and timer are released first, so at most
    /// one subscription is live. The connect timeout is armed unless the
    /// first snapshot arrived while subscribing. Outside a tokio runtime no
    /// timeout can be armed, so the attempt falls back at once instead of
    /// waiting forever.
    pub fn start(&self) {
        let shared = &self.shared;
        let (generation, teardown) = {
            let mut state = lock(&shared.state);
            let teardown = state.take_teardown();
            state.generation += 1;
            let generation = state.generation;
            state.snapshot.status = SyncStatus::Connecting;
            state.snapshot.error = None;
            state.snapshot.reason = None;
            state.snapshot.attempt = generation;
            shared.publish(&state);
            (generation, teardown)
        };
        teardown.run();

        let collection = shared.config.collection.as_str();
        info!(
            component = "sync_store",
            op = "start",
            collection = %collection,
            attempt = generation,
            "Connecting to remote collection"
        );
        shared.emit(CatalogEvent::SyncConnecting {
            collection: collection.to_string(),
            attempt: generation,
        });

        let weak = Arc::downgrade(shared);
        let listener: Listener = Arc::new(move |event: RemoteEvent| {
            if let Some(shared) = weak.upgrade() {
                shared.on_event(generation, event);
            }
        });
        match shared.remote.subscribe(collection, listener) {
            Ok(handle) => self.install(generation, handle),
            Err(e) => shared.on_failure(generation, SyncError::Listener(e.to_string())),
        }
    }

    fn install(&self, generation: u64, mut handle: Box<dyn SubscriptionHandle>) {
        let shared = &self.shared;
        let mut state = lock(&shared.state);
        if state.generation != generation || !state.snapshot.status.is_open() {
            drop(state);
            debug!(
                component = "sync_store",
                attempt = generation,
                "Attempt closed while subscribing, releasing subscription"
            );
            handle.unsubscribe();
            return;
        }
        state.subscription = Some(handle);
        if state.snapshot.status != SyncStatus::Connecting {
            return;
        }
        match shared.arm_timer(generation) {
            Some(timer) => state.timer = Some(timer),
            None => {
                drop(state);
                shared.on_timeout(generation, SyncError::TimerUnavailable);
            }
        }
    }

    /// Start over with a fresh subscription and timeout.
    pub fn retry(&self) {
        debug!(component = "sync_store", op = "retry", "Retry requested");
        self.start();
    }

    /// Release the subscription and timer; keeps the last dataset.
    ///
    /// Safe to call any number of times.
    pub fn shutdown(&self) {
        let teardown = {
            let mut state = lock(&self.shared.state);
            let teardown = state.take_teardown();
            if state.snapshot.status == SyncStatus::Idle && teardown.is_empty() {
                return;
            }
            state.generation += 1;
            state.snapshot.status = SyncStatus::Idle;
            self.shared.publish(&state);
            teardown
        };
        teardown.run();
        info!(
            component = "sync_store",
            op = "shutdown",
            collection = %self.shared.config.collection,
            "Sync store shut down"
        );
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        lock(&self.shared.state).snapshot.clone()
    }

    pub fn items(&self) -> Arc<[ItemRecord]> {
        Arc::clone(&lock(&self.shared.state).snapshot.items)
    }

    pub fn status(&self) -> SyncStatus {
        lock(&self.shared.state).snapshot.status
    }

    /// Receiver that observes every snapshot change.
    pub fn watch(&self) -> watch::Receiver<SyncSnapshot> {
        self.shared.tx.subscribe()
    }
}

impl Drop for SyncStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryRemote, StaticFallback};
    use serde_json::json;
    use std::time::Duration;

    const COLLECTION: &str = "diamonds";

    fn fallback_docs() -> Vec<JsonValue> {
        vec![
            json!({"id": "fb-1", "shape": "Round", "carat": 1.0, "price": "$4,000"}),
            json!({"id": "fb-2", "shape": "Oval", "carat": 0.8, "price": "$2,400"}),
        ]
    }

    fn live_docs(prefix: &str, n: usize) -> Vec<JsonValue> {
        (0..n)
            .map(|i| json!({"id": format!("{}-{}", prefix, i), "shape": "Pear", "carat": 1.1, "price": "$5,000"}))
            .collect()
    }

    fn store_with(remote: &MemoryRemote, fallback: StaticFallback) -> SyncStore {
        SyncStore::new(
            Arc::new(remote.clone()),
            Arc::new(fallback),
            SyncConfig::default(),
        )
    }

    fn ids(store: &SyncStore) -> Vec<String> {
        store.items().iter().map(|i| i.id.to_string()).collect()
    }

    #[test]
    fn test_start_without_runtime_falls_back_instead_of_hanging() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.start();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, SyncStatus::Offline);
        assert_eq!(snapshot.error, Some(SyncError::TimerUnavailable));
        assert!(snapshot.reason.is_some());
        assert_eq!(ids(&store), vec!["fb-1", "fb-2"]);
        assert_eq!(remote.active_subscriptions(COLLECTION), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_emission_goes_live_and_cancels_timer() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.start();
        assert_eq!(store.status(), SyncStatus::Connecting);

        remote.emit(COLLECTION, live_docs("live", 3));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, SyncStatus::Live);
        assert_eq!(snapshot.item_count(), 3);
        assert!(snapshot.error.is_none());
        assert!(snapshot.last_updated.is_some());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.status(), SyncStatus::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_and_tears_down() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.start();

        tokio::time::sleep(Duration::from_millis(9_999)).await;
        assert_eq!(store.status(), SyncStatus::Connecting);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, SyncStatus::Offline);
        assert_eq!(
            snapshot.error,
            Some(SyncError::ConnectionTimeout { timeout_ms: 10_000 })
        );
        assert!(snapshot.reason.unwrap().contains("timed out"));
        assert_eq!(ids(&store), vec!["fb-1", "fb-2"]);
        assert_eq!(remote.active_subscriptions(COLLECTION), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_emission_is_offline_not_live() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.start();
        remote.emit(COLLECTION, vec![]);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, SyncStatus::Offline);
        assert_eq!(snapshot.error, Some(SyncError::EmptyDataset));
        assert_eq!(snapshot.item_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_error_falls_back_without_retrying() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.start();
        remote.emit(COLLECTION, live_docs("live", 2));
        remote.emit_error(COLLECTION, "permission-denied");

        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, SyncStatus::Offline);
        assert_eq!(
            snapshot.error,
            Some(SyncError::Listener("permission-denied".into()))
        );
        assert_eq!(remote.subscribe_count(COLLECTION), 1);
        assert_eq!(remote.active_subscriptions(COLLECTION), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_failure_handled_as_listener_error() {
        let remote = MemoryRemote::new();
        remote.fail_next_subscribe("unavailable");
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.start();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, SyncStatus::Offline);
        assert!(matches!(snapshot.error, Some(SyncError::Listener(ref m)) if m.contains("unavailable")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_during_subscribe_skips_timer() {
        let remote = MemoryRemote::new();
        remote.replay_on_subscribe(COLLECTION, live_docs("replayed", 2));
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.start();
        assert_eq!(store.status(), SyncStatus::Live);
        assert_eq!(remote.active_subscriptions(COLLECTION), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(store.status(), SyncStatus::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_replay_during_subscribe_releases_handle() {
        let remote = MemoryRemote::new();
        remote.replay_on_subscribe(COLLECTION, vec![]);
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.start();
        assert_eq!(store.status(), SyncStatus::Offline);
        assert_eq!(remote.active_subscriptions(COLLECTION), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_failure_is_fatal() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::failing("bundle missing"));
        store.start();
        remote.emit_error(COLLECTION, "network");

        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, SyncStatus::Failed);
        assert!(snapshot.items.is_empty());
        assert!(snapshot.error.as_ref().is_some_and(SyncError::is_fatal));
        let reason = snapshot.reason.unwrap();
        assert!(reason.contains("network") && reason.contains("bundle missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_fallback_is_fatal() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::new(vec![], vec![]));
        store.start();
        remote.emit(COLLECTION, vec![]);
        assert_eq!(store.status(), SyncStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_idempotent() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.shutdown();
        assert_eq!(store.status(), SyncStatus::Idle);

        store.start();
        remote.emit(COLLECTION, live_docs("live", 1));
        store.shutdown();
        store.shutdown();
        assert_eq!(store.status(), SyncStatus::Idle);
        assert_eq!(store.items().len(), 1, "last dataset is kept");
        assert_eq!(remote.unsubscribe_calls(), 1);

        // A late delivery after shutdown changes nothing.
        let stale = remote.listener(COLLECTION, 0).unwrap();
        stale(RemoteEvent::Snapshot(live_docs("late", 4)));
        assert_eq!(store.items().len(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.status(), SyncStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_subscription() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        store.start();
        assert_eq!(remote.active_subscriptions(COLLECTION), 1);
        drop(store);
        assert_eq!(remote.active_subscriptions(COLLECTION), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_published() {
        let remote = MemoryRemote::new();
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let store =
            store_with(&remote, StaticFallback::new(fallback_docs(), vec![])).with_events(bus);
        store.start();
        remote.emit(COLLECTION, vec![]);

        assert_eq!(rx.recv().await.unwrap().event_type, "sync.connecting");
        let offline = rx.recv().await.unwrap();
        assert_eq!(offline.event_type, "sync.offline");
        assert!(matches!(
            offline.payload,
            CatalogEvent::SyncOffline {
                attempt: 1,
                item_count: 2,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_observes_transitions() {
        let remote = MemoryRemote::new();
        let store = store_with(&remote, StaticFallback::new(fallback_docs(), vec![]));
        let mut rx = store.watch();
        store.start();
        assert_eq!(rx.borrow_and_update().status, SyncStatus::Connecting);

        remote.emit(COLLECTION, live_docs("live", 2));
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert!(seen.is_live());
        assert_eq!(seen.attempt, 1);
    }
}
