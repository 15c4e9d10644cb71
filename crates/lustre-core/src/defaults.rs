//! Centralized default constants for the lustre catalog engine.
//!
//! **This module is the single source of truth** for shared default values.
//! Stores and configs reference these constants instead of defining their
//! own magic numbers.

// =============================================================================
// SYNC
// =============================================================================

/// How long the item store waits for the first remote emission before
/// falling back to the bundled dataset.
pub const SYNC_TIMEOUT_MS: u64 = 10_000;

/// Remote collection holding catalog items.
pub const ITEMS_COLLECTION: &str = "diamonds";

/// Remote collection holding custom categories.
pub const CATEGORIES_COLLECTION: &str = "categories";

// =============================================================================
// EVENTS
// =============================================================================

/// Broadcast buffer for the catalog event bus.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// MEDIA
// =============================================================================

/// Image shown for items without any media.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder-diamond.jpg";

// =============================================================================
// FILTERS
// =============================================================================

/// File used by the JSON filter preference repository.
pub const FILTER_STATE_PATH: &str = "lustre-filters.json";

/// Tolerance used when comparing range bounds.
///
/// Prices are parsed from formatted strings, so bounds computed twice over
/// the same dataset can differ in the last bits.
pub const RANGE_EPSILON: f64 = 1e-6;

// =============================================================================
// LOGGING
// =============================================================================

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub const LOG_FILTER: &str = "lustre=info";
