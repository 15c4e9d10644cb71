//! Filter state types.
//!
//! `FilterState` is the single aggregate the reducer transforms. Ranges are
//! constructor-normalized so `min <= max` holds for every value that can
//! exist, including deserialized ones.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use lustre_core::defaults::RANGE_EPSILON;
use lustre_core::ItemRecord;

// =============================================================================
// FIELDS
// =============================================================================

/// Set-valued filter dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Shape,
    Color,
    Clarity,
    Cut,
    GrowthType,
    Location,
    Supplier,
}

impl FilterField {
    pub const ALL: [FilterField; 7] = [
        FilterField::Shape,
        FilterField::Color,
        FilterField::Clarity,
        FilterField::Cut,
        FilterField::GrowthType,
        FilterField::Location,
        FilterField::Supplier,
    ];

    /// The record attribute this dimension filters on.
    pub fn value_of<'a>(&self, item: &'a ItemRecord) -> &'a str {
        match self {
            FilterField::Shape => &item.shape,
            FilterField::Color => &item.color,
            FilterField::Clarity => &item.clarity,
            FilterField::Cut => &item.cut,
            FilterField::GrowthType => &item.growth_type,
            FilterField::Location => &item.location,
            FilterField::Supplier => &item.supplier,
        }
    }
}

/// Numeric range dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    Carat,
    Price,
}

/// Whether the price range applies to the total price or the per-carat price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    #[default]
    Total,
    PerCarat,
}

impl PriceBasis {
    pub fn price_of(&self, item: &ItemRecord) -> f64 {
        match self {
            PriceBasis::Total => item.price_value(),
            PriceBasis::PerCarat => item.price_per_carat,
        }
    }
}

// =============================================================================
// NUMERIC RANGE
// =============================================================================

#[derive(Deserialize)]
struct RangeRepr {
    min: f64,
    max: f64,
}

impl From<RangeRepr> for NumericRange {
    fn from(r: RangeRepr) -> Self {
        NumericRange::new(r.min, r.max)
    }
}

/// Closed numeric interval with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RangeRepr")]
pub struct NumericRange {
    min: f64,
    max: f64,
}

impl Default for NumericRange {
    fn default() -> Self {
        Self { min: 0.0, max: 0.0 }
    }
}

impl NumericRange {
    /// Build a range, swapping reversed bounds and mapping non-finite values to 0.
    pub fn new(a: f64, b: f64) -> Self {
        let a = if a.is_finite() { a } else { 0.0 };
        let b = if b.is_finite() { b } else { 0.0 };
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min - RANGE_EPSILON && value <= self.max + RANGE_EPSILON
    }

    /// Equality within [`RANGE_EPSILON`].
    pub fn approx_eq(&self, other: &NumericRange) -> bool {
        (self.min - other.min).abs() <= RANGE_EPSILON && (self.max - other.max).abs() <= RANGE_EPSILON
    }

    /// Intersection with `bounds`, or `None` when they do not overlap.
    pub fn intersect(&self, bounds: &NumericRange) -> Option<NumericRange> {
        let min = self.min.max(bounds.min);
        let max = self.max.min(bounds.max);
        (min <= max + RANGE_EPSILON).then(|| NumericRange::new(min, max.max(min)))
    }

    /// Fit this range into `bounds`, snapping to `bounds` when nothing overlaps.
    pub fn fit_within(&self, bounds: &NumericRange) -> NumericRange {
        self.intersect(bounds).unwrap_or(*bounds)
    }
}

/// Observed numeric bounds of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetBounds {
    pub carat: NumericRange,
    pub price_total: NumericRange,
    pub price_per_carat: NumericRange,
}

impl DatasetBounds {
    pub fn price(&self, basis: PriceBasis) -> NumericRange {
        match basis {
            PriceBasis::Total => self.price_total,
            PriceBasis::PerCarat => self.price_per_carat,
        }
    }
}

// =============================================================================
// FILTER STATE
// =============================================================================

/// The complete filter and filter-panel state of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub shapes: BTreeSet<String>,
    pub colors: BTreeSet<String>,
    pub clarities: BTreeSet<String>,
    pub cuts: BTreeSet<String>,
    pub growth_types: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub suppliers: BTreeSet<String>,
    pub carat: NumericRange,
    pub price: NumericRange,
    pub price_basis: PriceBasis,
    /// Dataset bounds the ranges were last fitted to. Persisted with the
    /// ranges so a restored state rebases against the data it was saved with.
    pub anchor: DatasetBounds,
    pub query: String,
    pub panel_open: bool,
    pub onboarding_complete: bool,
    pub first_visit: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            shapes: BTreeSet::new(),
            colors: BTreeSet::new(),
            clarities: BTreeSet::new(),
            cuts: BTreeSet::new(),
            growth_types: BTreeSet::new(),
            locations: BTreeSet::new(),
            suppliers: BTreeSet::new(),
            carat: NumericRange::default(),
            price: NumericRange::default(),
            price_basis: PriceBasis::Total,
            anchor: DatasetBounds::default(),
            query: String::new(),
            panel_open: false,
            onboarding_complete: false,
            first_visit: true,
        }
    }
}

impl FilterState {
    pub fn values(&self, field: FilterField) -> &BTreeSet<String> {
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

    pub(crate) fn values_mut(&mut self, field: FilterField) -> &mut BTreeSet<String> {
        match field {
            FilterField::Shape => &mut self.shapes,
            FilterField::Color => &mut self.colors,
            FilterField::Clarity => &mut self.clarities,
            FilterField::Cut => &mut self.cuts,
            FilterField::GrowthType => &mut self.growth_types,
            FilterField::Location => &mut self.locations,
            FilterField::Supplier => &mut self.suppliers,
        }
    }

    pub fn range(&self, kind: RangeKind) -> NumericRange {
        match kind {
            RangeKind::Carat => self.carat,
            RangeKind::Price => self.price,
        }
    }

    /// Equality over the filtering dimensions only, ignoring panel and
    /// onboarding flags. Ranges compare within tolerance.
    pub fn filter_eq(&self, other: &FilterState) -> bool {
        FilterField::ALL
            .iter()
            .all(|f| self.values(*f) == other.values(*f))
            && self.carat.approx_eq(&other.carat)
            && self.price.approx_eq(&other.price)
            && self.price_basis == other.price_basis
            && self.query == other.query
    }
}

/// One constraint currently narrowing the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFilter {
    Values { field: FilterField, count: usize },
    Range(RangeKind),
    Query,
}

/// Every active constraint of `state` relative to the dataset `bounds`.
///
/// A range is active only when it differs from the dynamic bounds for the
/// current price basis. This is the one predicate behind both
/// `has_active_filters` and `active_filters_count`.
pub fn active_filters(state: &FilterState, bounds: &DatasetBounds) -> Vec<ActiveFilter> {
    let mut active: Vec<ActiveFilter> = FilterField::ALL
        .iter()
        .filter_map(|field| {
            let count = state.values(*field).len();
            (count > 0).then_some(ActiveFilter::Values {
                field: *field,
                count,
            })
        })
        .collect();
    if !state.carat.approx_eq(&bounds.carat) {
        active.push(ActiveFilter::Range(RangeKind::Carat));
    }
    if !state.price.approx_eq(&bounds.price(state.price_basis)) {
        active.push(ActiveFilter::Range(RangeKind::Price));
    }
    if !state.query.is_empty() {
        active.push(ActiveFilter::Query);
    }
    active
}

/// Bulk filter selection applied once when onboarding completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingBundle {
    pub shapes: Option<BTreeSet<String>>,
    pub colors: Option<BTreeSet<String>>,
    pub clarities: Option<BTreeSet<String>>,
    pub cuts: Option<BTreeSet<String>>,
    pub growth_types: Option<BTreeSet<String>>,
    pub carat: Option<NumericRange>,
    pub price: Option<NumericRange>,
    pub price_basis: Option<PriceBasis>,
}
