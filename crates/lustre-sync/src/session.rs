//! Per-session wiring of the catalog stores.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lustre_core::EventBus;
use lustre_filter::{load_or_default, spawn_persistence, FilterStateRepository, FilterStore};

use crate::category_store::CategoryStore;
use crate::config::{CategoryConfig, SyncConfig};
use crate::fallback::FallbackSource;
use crate::remote::RemoteSource;
use crate::sync_store::SyncStore;
use crate::writer::CategoryWriter;

/// Configuration for a [`CatalogSession`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub sync: SyncConfig,
    pub categories: CategoryConfig,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self {
            sync: SyncConfig::from_env(),
            categories: CategoryConfig::from_env(),
        }
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_categories(mut self, categories: CategoryConfig) -> Self {
        self.categories = categories;
        self
    }
}

/// The single owner of the catalog stores for one application session.
///
/// Item snapshots from the [`SyncStore`] are forwarded into the
/// [`FilterStore`] by a background task; unchanged datasets are recognised
/// by identity, so status-only transitions cost nothing. Dropping the
/// session shuts down both subscriptions and stops forwarding.
pub struct CatalogSession {
    sync: SyncStore,
    categories: CategoryStore,
    filters: Arc<RwLock<FilterStore>>,
    events: EventBus,
    forwarder: JoinHandle<()>,
    persistence: Option<JoinHandle<()>>,
}

impl CatalogSession {
    /// Build the stores, restore saved filter preferences when a repository
    /// is given, and start both subscriptions.
    pub async fn open(
        remote: Arc<dyn RemoteSource>,
        fallback: Arc<dyn FallbackSource>,
        writer: Arc<dyn CategoryWriter>,
        config: SessionConfig,
        repository: Option<Arc<dyn FilterStateRepository>>,
    ) -> Self {
        let events = EventBus::default();

        let filter_store = match &repository {
            Some(repo) => FilterStore::with_state(load_or_default(repo.as_ref()).await),
            None => FilterStore::new(),
        };
        let persistence = repository.map(|repo| spawn_persistence(filter_store.watch(), repo));
        let filters = Arc::new(RwLock::new(filter_store));

        let sync = SyncStore::new(Arc::clone(&remote), Arc::clone(&fallback), config.sync)
            .with_events(events.clone());
        let categories = CategoryStore::new(remote, writer, config.categories)
            .with_fallback(fallback)
            .with_events(events.clone());

        let forwarder = {
            let mut rx = sync.watch();
            let filters = Arc::clone(&filters);
            tokio::spawn(async move {
                loop {
                    let items = Arc::clone(&rx.borrow_and_update().items);
                    filters.write().await.set_items(items);
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
                debug!(component = "catalog_session", "Sync store dropped, forwarding stopped");
            })
        };

        sync.start();
        categories.start();
        info!(component = "catalog_session", "Catalog session opened");

        Self {
            sync,
            categories,
            filters,
            events,
            forwarder,
            persistence,
        }
    }

    pub fn sync(&self) -> &SyncStore {
        &self.sync
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    /// The filter store, fed with the current dataset.
    pub fn filters(&self) -> Arc<RwLock<FilterStore>> {
        Arc::clone(&self.filters)
    }

    /// Lifecycle events of both stores.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Reconnect the item subscription.
    pub fn retry(&self) {
        self.sync.retry();
    }

    /// Release both subscriptions. Filters stay readable.
    pub fn shutdown(&self) {
        self.sync.shutdown();
        self.categories.shutdown();
        info!(component = "catalog_session", "Catalog session shut down");
    }

    /// Shut down and wait for the final filter state to be saved.
    ///
    /// The wait is skipped when another handle to the filter store is still
    /// alive, since persistence only ends once the store is dropped.
    pub async fn close(self) {
        let Self {
            sync,
            categories,
            filters,
            forwarder,
            persistence,
            ..
        } = self;
        drop(sync);
        drop(categories);
        if let Err(e) = forwarder.await {
            warn!(component = "catalog_session", error = %e, "Forwarding task ended abnormally");
        }

        let Some(persistence) = persistence else {
            return;
        };
        if Arc::strong_count(&filters) > 1 {
            debug!(component = "catalog_session", "Filter store still shared, not waiting for persistence");
            return;
        }
        drop(filters);
        if let Err(e) = persistence.await {
            warn!(component = "catalog_session", error = %e, "Persistence task ended abnormally");
        }
    }
}
