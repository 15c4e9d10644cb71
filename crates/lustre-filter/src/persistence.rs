//! Filter preference persistence.
//!
//! The reducer knows nothing about storage. A persistence task subscribes
//! to [`FilterStore::watch`](crate::FilterStore::watch) and writes each new
//! state through a [`FilterStateRepository`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use lustre_core::{defaults, Result};

use crate::state::FilterState;

/// Storage for the filter state between sessions.
#[async_trait]
pub trait FilterStateRepository: Send + Sync {
    /// The saved state, or `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<FilterState>>;

    async fn save(&self, state: &FilterState) -> Result<()>;
}

/// Stores the filter state as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Repository at `LUSTRE_FILTER_STATE_PATH`, or the default file name.
    pub fn from_env() -> Self {
        let path = std::env::var("LUSTRE_FILTER_STATE_PATH")
            .unwrap_or_else(|_| defaults::FILTER_STATE_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FilterStateRepository for JsonFileRepository {
    async fn load(&self) -> Result<Option<FilterState>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &FilterState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Load a saved state, falling back to the default on any failure.
pub async fn load_or_default(repo: &dyn FilterStateRepository) -> FilterState {
    match repo.load().await {
        Ok(Some(state)) => state,
        Ok(None) => FilterState::default(),
        Err(e) => {
            warn!(error = %e, "Saved filter state unreadable, starting fresh");
            FilterState::default()
        }
    }
}

/// Save every state change observed on `rx` until the store is dropped.
///
/// Intermediate states may be skipped when changes arrive faster than
/// writes complete; the latest state is always the one written.
pub fn spawn_persistence(
    mut rx: watch::Receiver<FilterState>,
    repo: Arc<dyn FilterStateRepository>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            match repo.save(&state).await {
                Ok(()) => debug!(component = "filter_persistence", "Filter state saved"),
                Err(e) => warn!(component = "filter_persistence", error = %e, "Failed to save filter state"),
            }
        }
        debug!(component = "filter_persistence", "Filter store dropped, persistence stopped");
    })
}
