//! Structured logging schema and subscriber setup.
//!
//! Every crate uses these constants for structured `tracing` fields so log
//! output can be queried by the same names across stores.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | No dataset available at all (fallback failed) |
//! | WARN  | Recoverable issue, fallback dataset applied |
//! | INFO  | Lifecycle events (start, live, shutdown) |
//! | DEBUG | Decision points, option recomputation, dispatched actions |
//! | TRACE | Per-item normalization, stale callbacks dropped |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::defaults;

// ─── Identity fields ───────────────────────────────────────────────────────

/// Store or subsystem originating the log event.
/// Examples: "sync_store", "category_store", "filter_store"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "start", "fallback", "dispatch"
pub const OPERATION: &str = "op";

/// Remote collection name.
pub const COLLECTION: &str = "collection";

/// Connection attempt generation.
pub const ATTEMPT: &str = "attempt";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Catalog item identifier.
pub const ITEM_ID: &str = "item_id";

/// Category identifier.
pub const CATEGORY_ID: &str = "category_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of items in a snapshot.
pub const ITEM_COUNT: &str = "item_count";

/// Number of categories after merge.
pub const CATEGORY_COUNT: &str = "category_count";

/// Number of active filters.
pub const ACTIVE_FILTERS: &str = "active_filters";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Human-readable reason for a fallback.
pub const REASON: &str = "reason";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Output format for [`init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT` (`json` or anything else for text).
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG` and falls back to [`defaults::LOG_FILTER`]. Calling it
/// twice is harmless: the second install attempt is ignored.
pub fn init_tracing(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| defaults::LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value as JsonValue};

    use crate::models::{CategoryIcon, CategoryRecord};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured_fields(run: impl FnOnce()) -> Vec<JsonValue> {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, run);

        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str::<JsonValue>(line).unwrap()["fields"].clone())
            .collect()
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(LogFormat::Text);
        init_tracing(LogFormat::Json);
    }

    #[test]
    fn test_emitted_fields_follow_schema() {
        let fields = captured_fields(|| {
            crate::normalize::normalize_items(&[json!({"id": "k-1", "shape": "Kite", "carat": 1.0})]);
            crate::categories::merge_categories(vec![CategoryRecord {
                id: "builtin-natural".into(),
                value: "natural-diamonds".into(),
                label: "Shadow".into(),
                color: String::new(),
                icon: CategoryIcon::Gem,
                subcategories: vec![],
                built_in: false,
                created_at: None,
            }]);
        });

        assert!(fields.iter().any(|f| f[ITEM_ID] == "k-1"));
        assert!(fields.iter().any(|f| f[CATEGORY_ID] == "builtin-natural"));
    }
}
