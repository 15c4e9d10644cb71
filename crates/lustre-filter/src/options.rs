//! Dynamic filter options derived from the active dataset.
//!
//! A static vocabulary would offer chips that match nothing. Deriving the
//! options from the items currently loaded guarantees every offered value
//! is carried by at least one record, and that range sliders span exactly
//! the observed data.

use std::collections::BTreeSet;

use serde::Serialize;

use lustre_core::catalog::{Classification, GradedField, OTHER_BUCKET};
use lustre_core::{classify, ItemRecord};

use crate::state::{DatasetBounds, FilterField, NumericRange};

/// Values and bounds actually present in a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DynamicOptions {
    pub shapes: Vec<String>,
    pub colors: Vec<String>,
    pub clarities: Vec<String>,
    pub cuts: Vec<String>,
    pub growth_types: Vec<String>,
    pub locations: Vec<String>,
    pub suppliers: Vec<String>,
    pub bounds: DatasetBounds,
}

impl DynamicOptions {
    pub fn values(&self, field: FilterField) -> &[String] {
        match field {
            FilterField::Shape => &self.shapes,
            FilterField::Color => &self.colors,
            FilterField::Clarity => &self.clarities,
            FilterField::Cut => &self.cuts,
            FilterField::GrowthType => &self.growth_types,
            FilterField::Location => &self.locations,
            FilterField::Supplier => &self.suppliers,
        }
    }
}

fn distinct(items: &[ItemRecord], field: FilterField) -> Vec<String> {
    items
        .iter()
        .map(|item| field.value_of(item))
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn observed(values: impl Iterator<Item = f64>) -> NumericRange {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min.is_finite() && max.is_finite() {
        NumericRange::new(min, max)
    } else {
        NumericRange::default()
    }
}

/// Observed min/max for carat, total price and price per carat.
///
/// Every record contributes, including zero weights and unpriced items, so
/// ranges at these bounds never exclude anything. An empty dataset yields
/// zero-width ranges at 0.
pub fn dataset_bounds(items: &[ItemRecord]) -> DatasetBounds {
    DatasetBounds {
        carat: observed(items.iter().map(|i| i.carat)),
        price_total: observed(items.iter().map(|i| i.price_value())),
        price_per_carat: observed(items.iter().map(|i| i.price_per_carat)),
    }
}

/// Compute the filter options offered for `items`.
///
/// Values are sorted lexicographically and deduplicated; empty values are
/// never offered.
pub fn derive_options(items: &[ItemRecord]) -> DynamicOptions {
    DynamicOptions {
        shapes: distinct(items, FilterField::Shape),
        colors: distinct(items, FilterField::Color),
        clarities: distinct(items, FilterField::Clarity),
        cuts: distinct(items, FilterField::Cut),
        growth_types: distinct(items, FilterField::GrowthType),
        locations: distinct(items, FilterField::Location),
        suppliers: distinct(items, FilterField::Supplier),
        bounds: dataset_bounds(items),
    }
}

// =============================================================================
// CATEGORIZED OPTIONS
// =============================================================================

/// One presentation bucket of option values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionGroup {
    pub bucket: String,
    pub values: Vec<String>,
}

/// Dynamic options grouped into presentation buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizedOptions {
    pub shapes: Vec<OptionGroup>,
    pub colors: Vec<OptionGroup>,
    pub clarities: Vec<OptionGroup>,
    pub cuts: Vec<OptionGroup>,
}

/// Group `values` by `table`, in table order, with unmatched values in a
/// trailing [`OTHER_BUCKET`] group. Empty groups are omitted.
pub fn group_values(table: &[Classification], values: &[String]) -> Vec<OptionGroup> {
    let mut groups: Vec<OptionGroup> = table
        .iter()
        .map(|c| OptionGroup {
            bucket: c.bucket.to_string(),
            values: Vec::new(),
        })
        .collect();
    let mut other = Vec::new();

    for value in values {
        let bucket = classify(table, value);
        match groups.iter_mut().find(|g| g.bucket == bucket) {
            Some(group) if bucket != OTHER_BUCKET => group.values.push(value.clone()),
            _ => other.push(value.clone()),
        }
    }

    if !other.is_empty() {
        groups.push(OptionGroup {
            bucket: OTHER_BUCKET.to_string(),
            values: other,
        });
    }
    groups.retain(|g| !g.values.is_empty());
    groups
}

fn grouped(field: GradedField, values: &[String]) -> Vec<OptionGroup> {
    match field.groups() {
        Some(table) => group_values(table, values),
        None => vec![OptionGroup {
            bucket: OTHER_BUCKET.to_string(),
            values: values.to_vec(),
        }],
    }
}

pub fn categorize(options: &DynamicOptions) -> CategorizedOptions {
    CategorizedOptions {
        shapes: grouped(GradedField::Shape, &options.shapes),
        colors: grouped(GradedField::Color, &options.colors),
        clarities: grouped(GradedField::Clarity, &options.clarities),
        cuts: grouped(GradedField::Cut, &options.cuts),
    }
}
