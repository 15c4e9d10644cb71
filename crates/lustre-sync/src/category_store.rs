//! Category list: one subscription, built-in merge, guarded mutations.

use std::sync::{Arc, Mutex, OnceLock};

use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use lustre_core::{
    built_in_categories, is_built_in_id, is_built_in_value, merge_categories,
    normalize_categories, slugify, CatalogEvent, CategoryDraft, CategoryPatch, CategoryRecord,
    Error, EventBus, Result,
};

use crate::config::CategoryConfig;
use crate::fallback::FallbackSource;
use crate::lock;
use crate::remote::{Listener, RemoteEvent, RemoteSource, SubscriptionHandle};
use crate::writer::CategoryWriter;

/// Where the current category list comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    /// Built-ins only; not subscribed.
    #[default]
    Idle,
    Live,
    /// Built-ins plus any bundled customs, after a listener error.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    /// Built-ins first, then customs newest first. Never empty.
    pub categories: Arc<[CategoryRecord]>,
    pub source: CategorySource,
}

impl Default for CategorySnapshot {
    fn default() -> Self {
        Self {
            categories: Arc::from(built_in_categories()),
            source: CategorySource::Idle,
        }
    }
}

struct State {
    generation: u64,
    open: bool,
    subscription: Option<Box<dyn SubscriptionHandle>>,
    snapshot: CategorySnapshot,
}

struct Shared {
    remote: Arc<dyn RemoteSource>,
    config: CategoryConfig,
    fallback: OnceLock<Arc<dyn FallbackSource>>,
    events: OnceLock<EventBus>,
    state: Mutex<State>,
    tx: watch::Sender<CategorySnapshot>,
}

impl Shared {
    fn publish(&self, state: &State) {
        self.tx.send_replace(state.snapshot.clone());
    }

    fn emit(&self, category_count: usize, fallback: bool) {
        if let Some(bus) = self.events.get() {
            bus.emit(CatalogEvent::CategoriesUpdated {
                category_count,
                fallback,
            });
        }
    }

    fn on_event(&self, generation: u64, event: RemoteEvent) {
        match event {
            RemoteEvent::Snapshot(docs) => self.on_snapshot(generation, docs),
            RemoteEvent::Error(message) => self.on_error(generation, message),
        }
    }

    fn on_snapshot(&self, generation: u64, docs: Vec<JsonValue>) {
        let merged = merge_categories(normalize_categories(&docs));
        let count = merged.len();
        {
            let mut state = lock(&self.state);
            if state.generation != generation || !state.open {
                trace!(component = "category_store", attempt = generation, "Dropping stale category snapshot");
                return;
            }
            state.snapshot = CategorySnapshot {
                categories: Arc::from(merged),
                source: CategorySource::Live,
            };
            self.publish(&state);
        }
        debug!(component = "category_store", category_count = count, "Categories updated");
        self.emit(count, false);
    }

    fn on_error(&self, generation: u64, message: String) {
        let (subscription, count) = {
            let mut state = lock(&self.state);
            if state.generation != generation || !state.open {
                return;
            }
            let merged = merge_categories(self.fallback_customs());
            let count = merged.len();
            state.open = false;
            state.snapshot = CategorySnapshot {
                categories: Arc::from(merged),
                source: CategorySource::Fallback,
            };
            self.publish(&state);
            (state.subscription.take(), count)
        };
        if let Some(mut subscription) = subscription {
            subscription.unsubscribe();
        }
        warn!(
            component = "category_store",
            op = "fallback",
            collection = %self.config.collection,
            reason = %message,
            category_count = count,
            "Category listener failed, using built-in categories"
        );
        self.emit(count, true);
    }

    fn fallback_customs(&self) -> Vec<CategoryRecord> {
        let Some(fallback) = self.fallback.get() else {
            return Vec::new();
        };
        match fallback.load_categories() {
            Ok(docs) => normalize_categories(&docs),
            Err(e) => {
                warn!(component = "category_store", error = %e, "Bundled categories unavailable");
                Vec::new()
            }
        }
    }
}

fn clean_draft(draft: CategoryDraft) -> Result<CategoryDraft> {
    let label = draft.label.trim().to_string();
    if label.is_empty() {
        return Err(Error::InvalidInput("category label must not be empty".into()));
    }
    let value = match draft.value.trim() {
        "" => slugify(&label),
        v => v.to_string(),
    };
    if value.is_empty() {
        return Err(Error::InvalidInput("category value must not be empty".into()));
    }
    Ok(CategoryDraft {
        value,
        label,
        color: draft.color.trim().to_string(),
        icon: draft.icon,
        subcategories: draft
            .subcategories
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    })
}

/// The merged category list and its mutation pass-throughs.
///
/// Mutations never touch the list directly: they are validated, built-in
/// targets are rejected, and the accepted request goes to the
/// [`CategoryWriter`]. The result shows up through the subscription.
pub struct CategoryStore {
    shared: Arc<Shared>,
    writer: Arc<dyn CategoryWriter>,
}

impl CategoryStore {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        writer: Arc<dyn CategoryWriter>,
        config: CategoryConfig,
    ) -> Self {
        let (tx, _) = watch::channel(CategorySnapshot::default());
        Self {
            shared: Arc::new(Shared {
                remote,
                config,
                fallback: OnceLock::new(),
                events: OnceLock::new(),
                state: Mutex::new(State {
                    generation: 0,
                    open: false,
                    subscription: None,
                    snapshot: CategorySnapshot::default(),
                }),
                tx,
            }),
            writer,
        }
    }

    /// Also show the bundled custom categories while offline.
    pub fn with_fallback(self, fallback: Arc<dyn FallbackSource>) -> Self {
        if self.shared.fallback.set(fallback).is_err() {
            debug!(component = "category_store", "Fallback source already attached");
        }
        self
    }

    pub fn with_events(self, bus: EventBus) -> Self {
        if self.shared.events.set(bus).is_err() {
            debug!(component = "category_store", "Event bus already attached");
        }
        self
    }

    /// Subscribe to the category collection, replacing any prior subscription.
    pub fn start(&self) {
        let shared = &self.shared;
        let (generation, previous) = {
            let mut state = lock(&shared.state);
            state.generation += 1;
            state.open = true;
            (state.generation, state.subscription.take())
        };
        if let Some(mut previous) = previous {
            previous.unsubscribe();
        }
        info!(
            component = "category_store",
            op = "start",
            collection = %shared.config.collection,
            attempt = generation,
            "Subscribing to categories"
        );

        let weak = Arc::downgrade(shared);
        let listener: Listener = Arc::new(move |event: RemoteEvent| {
            if let Some(shared) = weak.upgrade() {
                shared.on_event(generation, event);
            }
        });
        match shared.remote.subscribe(&shared.config.collection, listener) {
            Ok(mut handle) => {
                let mut state = lock(&shared.state);
                if state.generation == generation && state.open {
                    state.subscription = Some(handle);
                } else {
                    drop(state);
                    handle.unsubscribe();
                }
            }
            Err(e) => shared.on_error(generation, e.to_string()),
        }
    }

    pub fn retry(&self) {
        self.start();
    }

    /// Release the subscription. Safe to call any number of times.
    pub fn shutdown(&self) {
        let subscription = {
            let mut state = lock(&self.shared.state);
            let subscription = state.subscription.take();
            if !state.open && subscription.is_none() {
                return;
            }
            state.generation += 1;
            state.open = false;
            state.snapshot.source = CategorySource::Idle;
            self.shared.publish(&state);
            subscription
        };
        if let Some(mut subscription) = subscription {
            subscription.unsubscribe();
        }
        info!(component = "category_store", op = "shutdown", "Category store shut down");
    }

    pub fn categories(&self) -> Arc<[CategoryRecord]> {
        Arc::clone(&lock(&self.shared.state).snapshot.categories)
    }

    pub fn source(&self) -> CategorySource {
        lock(&self.shared.state).snapshot.source
    }

    pub fn watch(&self) -> watch::Receiver<CategorySnapshot> {
        self.shared.tx.subscribe()
    }

    /// Category with the given internal value, compared case-insensitively.
    pub fn find(&self, value: &str) -> Option<CategoryRecord> {
        let value = value.trim();
        self.categories()
            .iter()
            .find(|c| c.value.eq_ignore_ascii_case(value))
            .cloned()
    }

    /// Create a custom category. An empty value is derived from the label.
    pub async fn add_category(&self, draft: CategoryDraft) -> Result<String> {
        let draft = clean_draft(draft)?;
        if is_built_in_value(&draft.value) {
            return Err(Error::BuiltInCategory(draft.value));
        }
        if self.find(&draft.value).is_some() {
            return Err(Error::InvalidInput(format!(
                "category value already exists: {}",
                draft.value
            )));
        }
        let id = self.writer.create(&draft).await?;
        info!(component = "category_store", op = "add", category_id = %id, "Category created");
        Ok(id)
    }

    pub async fn update_category(&self, id: &str, patch: CategoryPatch) -> Result<()> {
        self.ensure_mutable(id)?;
        if patch.is_empty() {
            return Err(Error::InvalidInput("category patch is empty".into()));
        }
        if patch.label.as_deref().is_some_and(|l| l.trim().is_empty()) {
            return Err(Error::InvalidInput("category label must not be empty".into()));
        }
        self.writer.update(id, &patch).await?;
        info!(component = "category_store", op = "update", category_id = %id, "Category updated");
        Ok(())
    }

    pub async fn delete_category(&self, id: &str) -> Result<()> {
        self.ensure_mutable(id)?;
        self.writer.delete(id).await?;
        info!(component = "category_store", op = "delete", category_id = %id, "Category deleted");
        Ok(())
    }

    fn ensure_mutable(&self, id: &str) -> Result<()> {
        if is_built_in_id(id) {
            return Err(Error::BuiltInCategory(id.to_string()));
        }
        match self.categories().iter().find(|c| c.id == id) {
            Some(c) if c.built_in => Err(Error::BuiltInCategory(id.to_string())),
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("category {}", id))),
        }
    }
}

impl Drop for CategoryStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}
