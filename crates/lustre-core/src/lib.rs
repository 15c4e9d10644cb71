//! # lustre-core
//!
//! Core types and shared plumbing for the lustre diamond catalog engine.
//!
//! This crate provides the normalized record types, the normalization step
//! that produces them from loose upstream documents, grading vocabularies,
//! built-in categories, and the error/logging/event conventions the store
//! crates build on.

pub mod catalog;
pub mod categories;
pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod normalize;

// Re-export commonly used types at crate root
pub use catalog::{classify, Classification, GradedField, OTHER_BUCKET};
pub use categories::{built_in_categories, is_built_in_id, is_built_in_value, merge_categories};
pub use error::{Error, Result, SyncError};
pub use events::{CatalogEvent, EventBus, EventEnvelope};
pub use models::*;
pub use normalize::{
    compute_price_per_carat, normalize_categories, normalize_category, normalize_item,
    normalize_items, slugify,
};
