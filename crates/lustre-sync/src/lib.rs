//! # lustre-sync
//!
//! Supervision of the remote catalog subscriptions.
//!
//! This crate provides:
//! - `SyncStore`: exactly one live item subscription with connect timeout,
//!   retry, and fallback to a bundled offline dataset
//! - `CategoryStore`: category subscription merged with built-ins, plus
//!   validated mutation pass-throughs
//! - `CatalogSession`: the per-session owner that wires item snapshots into
//!   a `FilterStore`
//! - In-memory doubles for tests (`mock`)
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use lustre_sync::mock::{MemoryRemote, StaticFallback};
//! use lustre_sync::{SyncConfig, SyncStatus, SyncStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let remote = MemoryRemote::new();
//! let store = SyncStore::new(
//!     Arc::new(remote.clone()),
//!     Arc::new(StaticFallback::default()),
//!     SyncConfig::default(),
//! );
//! store.start();
//! remote.emit("diamonds", vec![serde_json::json!({"id": 1, "carat": 1.0})]);
//! assert_eq!(store.status(), SyncStatus::Live);
//! # }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod category_store;
pub mod config;
pub mod fallback;
pub mod mock;
pub mod remote;
pub mod session;
pub mod sync_store;
pub mod writer;

pub use category_store::{CategorySnapshot, CategorySource, CategoryStore};
pub use config::{CategoryConfig, SyncConfig};
pub use fallback::{BundledFallback, FallbackSource};
pub use remote::{Listener, RemoteEvent, RemoteSource, SubscriptionHandle};
pub use session::{CatalogSession, SessionConfig};
pub use sync_store::{SyncSnapshot, SyncStatus, SyncStore};
pub use writer::CategoryWriter;

/// Lock store state, recovering the data if a listener panicked mid-update.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
