//! Store configuration.

use std::time::Duration;

use lustre_core::defaults;

/// Configuration for the item [`SyncStore`](crate::SyncStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote collection to subscribe to.
    pub collection: String,
    /// How long to wait for the first emission before falling back.
    pub connect_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection: defaults::ITEMS_COLLECTION.to_string(),
            connect_timeout_ms: defaults::SYNC_TIMEOUT_MS,
        }
    }
}

impl SyncConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LUSTRE_ITEMS_COLLECTION` | `diamonds` | Remote item collection |
    /// | `LUSTRE_SYNC_TIMEOUT_MS` | `10000` | Connect timeout before fallback |
    pub fn from_env() -> Self {
        let collection = std::env::var("LUSTRE_ITEMS_COLLECTION")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| defaults::ITEMS_COLLECTION.to_string());

        let connect_timeout_ms = std::env::var("LUSTRE_SYNC_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::SYNC_TIMEOUT_MS);

        Self {
            collection,
            connect_timeout_ms,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Configuration for the [`CategoryStore`](crate::CategoryStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    pub collection: String,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            collection: defaults::CATEGORIES_COLLECTION.to_string(),
        }
    }
}

impl CategoryConfig {
    /// Reads `LUSTRE_CATEGORIES_COLLECTION` (default `categories`).
    pub fn from_env() -> Self {
        let collection = std::env::var("LUSTRE_CATEGORIES_COLLECTION")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| defaults::CATEGORIES_COLLECTION.to_string());
        Self { collection }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.collection, "diamonds");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_sync_config_builders() {
        let config = SyncConfig::default()
            .with_collection("inventory")
            .with_connect_timeout_ms(250);
        assert_eq!(config.collection, "inventory");
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_category_config_defaults() {
        assert_eq!(CategoryConfig::default().collection, "categories");
        assert_eq!(
            CategoryConfig::default().with_collection("tags").collection,
            "tags"
        );
    }
}
