//! Offline datasets used when the remote collection is unavailable.

use serde_json::Value as JsonValue;

use lustre_core::{Error, Result};

const BUNDLED_ITEMS: &str = include_str!("../data/fallback_items.json");
const BUNDLED_CATEGORIES: &str = include_str!("../data/fallback_categories.json");

/// Local source of raw documents for offline operation.
///
/// Loading is synchronous and local. Stores call it with their state
/// locked, so implementations must not call back into a store.
pub trait FallbackSource: Send + Sync {
    fn load_items(&self) -> Result<Vec<JsonValue>>;

    /// Custom categories shown next to the built-ins while offline.
    fn load_categories(&self) -> Result<Vec<JsonValue>>;
}

/// The dataset compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledFallback;

fn parse_array(source: &str, what: &str) -> Result<Vec<JsonValue>> {
    match serde_json::from_str::<JsonValue>(source)? {
        JsonValue::Array(docs) => Ok(docs),
        _ => Err(Error::Serialization(format!(
            "bundled {} must be a JSON array",
            what
        ))),
    }
}

impl FallbackSource for BundledFallback {
    fn load_items(&self) -> Result<Vec<JsonValue>> {
        parse_array(BUNDLED_ITEMS, "items")
    }

    fn load_categories(&self) -> Result<Vec<JsonValue>> {
        parse_array(BUNDLED_CATEGORIES, "categories")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lustre_core::{normalize_categories, normalize_items};

    #[test]
    fn test_bundled_items_non_empty_and_normalize() {
        let docs = BundledFallback.load_items().unwrap();
        assert!(!docs.is_empty());
        let items = normalize_items(&docs);
        assert_eq!(items.len(), docs.len());
        assert!(items.iter().all(|i| i.carat > 0.0 && i.price_value() > 0.0));
    }

    #[test]
    fn test_bundled_ids_unique() {
        let items = normalize_items(&BundledFallback.load_items().unwrap());
        let mut ids: Vec<String> = items.iter().map(|i| i.id.to_string()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), items.len());
    }

    #[test]
    fn test_bundled_categories_are_custom() {
        let categories = normalize_categories(&BundledFallback.load_categories().unwrap());
        assert!(!categories.is_empty());
        assert!(categories.iter().all(|c| !c.built_in && c.created_at.is_some()));
    }

    #[test]
    fn test_non_array_rejected() {
        let err = parse_array(r#"{"items": []}"#, "items").unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }
}
