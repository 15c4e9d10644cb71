//! # lustre-filter
//!
//! Client-side filtering for the lustre catalog.
//!
//! This crate provides:
//! - `FilterState` and the pure `reduce` function over typed `FilterAction`s
//! - Dynamic filter options derived from whatever dataset is active
//! - Presentation grouping of options through fixed classification tables
//! - `FilterStore`, which memoizes derived options per dataset
//! - Preference persistence as an external watcher task
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use lustre_filter::{FilterAction, FilterField, FilterStore};
//!
//! let docs = serde_json::json!([
//!     {"id": 1, "shape": "Round", "carat": 1.1, "price": "$7,200"},
//!     {"id": 2, "shape": "Pear", "carat": 0.8, "price": "$3,900"}
//! ]);
//! let items = lustre_core::normalize_items(docs.as_array().unwrap());
//!
//! let mut store = FilterStore::new();
//! store.set_items(Arc::from(items));
//! store.dispatch(FilterAction::ToggleValue {
//!     field: FilterField::Shape,
//!     value: "Pear".into(),
//! });
//!
//! assert_eq!(store.filtered_items().len(), 1);
//! assert_eq!(store.active_filters_count(), 1);
//! store.reset_all_filters();
//! assert!(!store.has_active_filters());
//! ```

pub mod matching;
pub mod options;
pub mod persistence;
pub mod reducer;
pub mod state;
pub mod store;

pub use matching::{apply_filters, matches};
pub use options::{
    categorize, dataset_bounds, derive_options, group_values, CategorizedOptions, DynamicOptions,
    OptionGroup,
};
pub use persistence::{load_or_default, spawn_persistence, FilterStateRepository, JsonFileRepository};
pub use reducer::{reduce, FilterAction};
pub use state::{
    active_filters, ActiveFilter, DatasetBounds, FilterField, FilterState, NumericRange,
    OnboardingBundle, PriceBasis, RangeKind,
};
pub use store::FilterStore;
