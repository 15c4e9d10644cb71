//! In-memory collaborators for deterministic testing.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use lustre_sync::mock::{MemoryRemote, StaticFallback};
//! use lustre_sync::{SyncConfig, SyncStore};
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_times_out_to_fallback() {
//!     let remote = MemoryRemote::new();
//!     let store = SyncStore::new(
//!         Arc::new(remote.clone()),
//!         Arc::new(StaticFallback::bundled()),
//!         SyncConfig::default(),
//!     );
//!     store.start();
//!     tokio::time::sleep(std::time::Duration::from_secs(11)).await;
//!     assert!(!store.snapshot().items.is_empty());
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use lustre_core::{CategoryDraft, CategoryPatch, Error, Result};

use crate::fallback::{BundledFallback, FallbackSource};
use crate::lock;
use crate::remote::{Listener, RemoteEvent, RemoteSource, SubscriptionHandle};
use crate::writer::CategoryWriter;

// =============================================================================
// REMOTE
// =============================================================================

struct Registration {
    id: u64,
    collection: String,
    listener: Listener,
}

#[derive(Default)]
struct RemoteState {
    next_id: u64,
    active: Vec<Registration>,
    history: Vec<(String, Listener)>,
    replay: HashMap<String, Vec<JsonValue>>,
    fail_next: Option<String>,
    unsubscribe_calls: usize,
}

/// Remote source whose deliveries are driven by the test.
///
/// Clones share the same subscriptions, so a test keeps one clone to emit
/// while the store owns another.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<RemoteState>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a snapshot to every active listener on `collection`.
    pub fn emit(&self, collection: &str, docs: Vec<JsonValue>) {
        self.deliver(collection, RemoteEvent::Snapshot(docs));
    }

    /// Deliver an error to every active listener on `collection`.
    pub fn emit_error(&self, collection: &str, message: impl Into<String>) {
        self.deliver(collection, RemoteEvent::Error(message.into()));
    }

    fn deliver(&self, collection: &str, event: RemoteEvent) {
        let listeners: Vec<Listener> = lock(&self.inner)
            .active
            .iter()
            .filter(|r| r.collection == collection)
            .map(|r| Arc::clone(&r.listener))
            .collect();
        for listener in listeners {
            listener(event.clone());
        }
    }

    /// Make the next `subscribe` call fail synchronously.
    pub fn fail_next_subscribe(&self, message: impl Into<String>) {
        lock(&self.inner).fail_next = Some(message.into());
    }

    /// Deliver `docs` from inside every later `subscribe` on `collection`,
    /// before the handle is returned.
    pub fn replay_on_subscribe(&self, collection: &str, docs: Vec<JsonValue>) {
        lock(&self.inner).replay.insert(collection.to_string(), docs);
    }

    pub fn active_subscriptions(&self, collection: &str) -> usize {
        lock(&self.inner)
            .active
            .iter()
            .filter(|r| r.collection == collection)
            .count()
    }

    /// Successful subscriptions ever made on `collection`.
    pub fn subscribe_count(&self, collection: &str) -> usize {
        lock(&self.inner)
            .history
            .iter()
            .filter(|(c, _)| c == collection)
            .count()
    }

    pub fn unsubscribe_calls(&self) -> usize {
        lock(&self.inner).unsubscribe_calls
    }

    /// Listener of the `index`-th subscription on `collection`, still
    /// callable after it was unsubscribed. Used to simulate late deliveries.
    pub fn listener(&self, collection: &str, index: usize) -> Option<Listener> {
        lock(&self.inner)
            .history
            .iter()
            .filter(|(c, _)| c == collection)
            .nth(index)
            .map(|(_, l)| Arc::clone(l))
    }
}

impl RemoteSource for MemoryRemote {
    fn subscribe(&self, collection: &str, listener: Listener) -> Result<Box<dyn SubscriptionHandle>> {
        let (id, replay) = {
            let mut state = lock(&self.inner);
            if let Some(message) = state.fail_next.take() {
                return Err(Error::Remote(message));
            }
            state.next_id += 1;
            let id = state.next_id;
            state.active.push(Registration {
                id,
                collection: collection.to_string(),
                listener: Arc::clone(&listener),
            });
            state
                .history
                .push((collection.to_string(), Arc::clone(&listener)));
            (id, state.replay.get(collection).cloned())
        };
        if let Some(docs) = replay {
            listener(RemoteEvent::Snapshot(docs));
        }
        Ok(Box::new(MemorySubscription {
            id,
            remote: Arc::downgrade(&self.inner),
            closed: false,
        }))
    }
}

struct MemorySubscription {
    id: u64,
    remote: Weak<Mutex<RemoteState>>,
    closed: bool,
}

impl SubscriptionHandle for MemorySubscription {
    fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(remote) = self.remote.upgrade() {
            let mut state = lock(&remote);
            state.active.retain(|r| r.id != self.id);
            state.unsubscribe_calls += 1;
        }
    }
}

// =============================================================================
// FALLBACK
// =============================================================================

/// Fallback source with fixed contents and a load counter.
#[derive(Clone, Default)]
pub struct StaticFallback {
    items: Vec<JsonValue>,
    categories: Vec<JsonValue>,
    failure: Option<String>,
    item_loads: Arc<AtomicUsize>,
}

impl StaticFallback {
    pub fn new(items: Vec<JsonValue>, categories: Vec<JsonValue>) -> Self {
        Self {
            items,
            categories,
            ..Self::default()
        }
    }

    /// A copy of the bundled dataset.
    pub fn bundled() -> Self {
        Self::new(
            BundledFallback.load_items().unwrap_or_default(),
            BundledFallback.load_categories().unwrap_or_default(),
        )
    }

    /// A source whose every load fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// How many times `load_items` was called.
    pub fn item_loads(&self) -> usize {
        self.item_loads.load(Ordering::SeqCst)
    }
}

impl FallbackSource for StaticFallback {
    fn load_items(&self) -> Result<Vec<JsonValue>> {
        self.item_loads.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(Error::Internal(message.clone())),
            None => Ok(self.items.clone()),
        }
    }

    fn load_categories(&self) -> Result<Vec<JsonValue>> {
        match &self.failure {
            Some(message) => Err(Error::Internal(message.clone())),
            None => Ok(self.categories.clone()),
        }
    }
}

// =============================================================================
// CATEGORY WRITER
// =============================================================================

/// One call received by [`MemoryCategoryWriter`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriterCall {
    Create(CategoryDraft),
    Update { id: String, patch: CategoryPatch },
    Delete(String),
}

#[derive(Default)]
struct WriterState {
    calls: Vec<WriterCall>,
    docs: Vec<JsonValue>,
    next_id: u64,
    failure: Option<String>,
    echo: Option<(MemoryRemote, String)>,
}

/// Category writer that records calls and keeps the written documents.
///
/// When linked to a [`MemoryRemote`] with [`MemoryCategoryWriter::echo_to`],
/// every successful write re-emits the full document set on the category
/// collection, the way a document database would.
#[derive(Clone, Default)]
pub struct MemoryCategoryWriter {
    inner: Arc<Mutex<WriterState>>,
}

impl MemoryCategoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo_to(self, remote: MemoryRemote, collection: impl Into<String>) -> Self {
        lock(&self.inner).echo = Some((remote, collection.into()));
        self
    }

    /// Fail every later write with `Error::Remote(message)`.
    pub fn fail_with(&self, message: impl Into<String>) {
        lock(&self.inner).failure = Some(message.into());
    }

    pub fn calls(&self) -> Vec<WriterCall> {
        lock(&self.inner).calls.clone()
    }

    /// Record `call`, apply `write` to the stored documents, and echo them.
    fn record<T>(
        &self,
        call: WriterCall,
        write: impl FnOnce(&mut WriterState) -> Result<T>,
    ) -> Result<T> {
        let (result, echo) = {
            let mut state = lock(&self.inner);
            state.calls.push(call);
            if let Some(message) = &state.failure {
                return Err(Error::Remote(message.clone()));
            }
            let result = write(&mut *state)?;
            let echo = state
                .echo
                .clone()
                .map(|(remote, collection)| (remote, collection, state.docs.clone()));
            (result, echo)
        };
        if let Some((remote, collection, docs)) = echo {
            remote.emit(&collection, docs);
        }
        Ok(result)
    }
}

fn doc_id(doc: &JsonValue) -> Option<&str> {
    doc.get("id").and_then(JsonValue::as_str)
}

#[async_trait]
impl CategoryWriter for MemoryCategoryWriter {
    async fn create(&self, draft: &CategoryDraft) -> Result<String> {
        self.record(WriterCall::Create(draft.clone()), |state| {
            state.next_id += 1;
            let id = format!("custom-{}", state.next_id);
            state.docs.push(json!({
                "id": id,
                "value": draft.value,
                "label": draft.label,
                "color": draft.color,
                "icon": draft.icon.key(),
                "subcategories": draft.subcategories,
                "createdAt": state.next_id as i64 * 1000,
            }));
            Ok(id)
        })
    }

    async fn update(&self, id: &str, patch: &CategoryPatch) -> Result<()> {
        let call = WriterCall::Update {
            id: id.to_string(),
            patch: patch.clone(),
        };
        self.record(call, |state| {
            let doc = state
                .docs
                .iter_mut()
                .find(|d| doc_id(d) == Some(id))
                .ok_or_else(|| Error::NotFound(format!("category {}", id)))?;
            if let Some(label) = &patch.label {
                doc["label"] = json!(label);
            }
            if let Some(color) = &patch.color {
                doc["color"] = json!(color);
            }
            if let Some(icon) = &patch.icon {
                doc["icon"] = json!(icon.key());
            }
            if let Some(subcategories) = &patch.subcategories {
                doc["subcategories"] = json!(subcategories);
            }
            Ok(())
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.record(WriterCall::Delete(id.to_string()), |state| {
            let before = state.docs.len();
            state.docs.retain(|d| doc_id(d) != Some(id));
            if state.docs.len() == before {
                return Err(Error::NotFound(format!("category {}", id)));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lustre_core::CategoryIcon;

    fn counting_listener(counter: Arc<AtomicUsize>) -> Listener {
        Arc::new(move |_event: RemoteEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_reaches_only_active_listeners() {
        let remote = MemoryRemote::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut handle = remote
            .subscribe("diamonds", counting_listener(hits.clone()))
            .unwrap();

        remote.emit("diamonds", vec![]);
        remote.emit("categories", vec![]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        handle.unsubscribe();
        handle.unsubscribe();
        remote.emit("diamonds", vec![]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(remote.unsubscribe_calls(), 1);
        assert_eq!(remote.active_subscriptions("diamonds"), 0);
        assert_eq!(remote.subscribe_count("diamonds"), 1);
    }

    #[test]
    fn test_fail_next_subscribe_is_one_shot() {
        let remote = MemoryRemote::new();
        remote.fail_next_subscribe("permission-denied");
        let hits = Arc::new(AtomicUsize::new(0));
        assert!(remote
            .subscribe("diamonds", counting_listener(hits.clone()))
            .is_err());
        assert!(remote.subscribe("diamonds", counting_listener(hits)).is_ok());
        assert_eq!(remote.subscribe_count("diamonds"), 1);
    }

    #[test]
    fn test_static_fallback_counts_loads() {
        let fallback = StaticFallback::new(vec![json!({"id": 1})], vec![]);
        fallback.load_items().unwrap();
        fallback.load_items().unwrap();
        assert_eq!(fallback.item_loads(), 2);
        assert!(StaticFallback::failing("disk").load_items().is_err());
    }

    #[tokio::test]
    async fn test_writer_echoes_documents() {
        let remote = MemoryRemote::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _handle = remote
            .subscribe(
                "categories",
                Arc::new(move |event: RemoteEvent| {
                    if let RemoteEvent::Snapshot(docs) = event {
                        sink.lock().unwrap().push(docs.len());
                    }
                }),
            )
            .unwrap();
        let writer = MemoryCategoryWriter::new().echo_to(remote.clone(), "categories");

        let draft = CategoryDraft {
            value: "bridal".into(),
            label: "Bridal".into(),
            color: "#be185d".into(),
            icon: CategoryIcon::Heart,
            subcategories: vec![],
        };
        let id = writer.create(&draft).await.unwrap();
        writer.delete(&id).await.unwrap();
        assert!(writer.delete(&id).await.is_err());

        assert_eq!(*seen.lock().unwrap(), vec![1, 0]);
        assert_eq!(writer.calls().len(), 3);
    }
}
