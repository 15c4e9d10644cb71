//! Write path for custom categories.

use async_trait::async_trait;

use lustre_core::{CategoryDraft, CategoryPatch, Result};

/// Persists category mutations on behalf of the [`CategoryStore`](crate::CategoryStore).
///
/// The store validates and rejects built-in targets before any call reaches
/// the writer. Successful writes become visible through the category
/// subscription, never by patching the store directly.
#[async_trait]
pub trait CategoryWriter: Send + Sync {
    /// Create a custom category, returning its id.
    async fn create(&self, draft: &CategoryDraft) -> Result<String>;

    async fn update(&self, id: &str, patch: &CategoryPatch) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}
