//! The pure filter reducer.
//!
//! Every change to [`FilterState`] is a [`FilterAction`] applied by
//! [`reduce`]. Actions that depend on the dataset carry the bounds they
//! need, so the reducer never reads anything but its arguments.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::state::{
    DatasetBounds, FilterField, FilterState, NumericRange, OnboardingBundle, PriceBasis, RangeKind,
};

/// Typed mutations of [`FilterState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum FilterAction {
    /// Replace the selection of one set-valued field.
    SetValues {
        field: FilterField,
        values: BTreeSet<String>,
    },
    /// Add `value` when absent, remove it when present.
    ToggleValue { field: FilterField, value: String },
    SetRange { kind: RangeKind, range: NumericRange },
    /// Switch price basis; the price range snaps to the new basis' bounds.
    SetPriceBasis {
        basis: PriceBasis,
        bounds: DatasetBounds,
    },
    SetQuery(String),
    TogglePanel,
    SetPanelOpen(bool),
    MarkVisited,
    /// Clear sets and query, snap both ranges to `bounds`.
    ResetAll(DatasetBounds),
    /// Apply several fields and complete onboarding in one transition.
    ApplyOnboarding {
        bundle: OnboardingBundle,
        bounds: DatasetBounds,
    },
    /// A dataset with these bounds became active. Ranges sitting on the
    /// state's anchor follow the new bounds.
    DatasetChanged(DatasetBounds),
}

impl FilterAction {
    pub fn name(&self) -> &'static str {
        match self {
            FilterAction::SetValues { .. } => "set_values",
            FilterAction::ToggleValue { .. } => "toggle_value",
            FilterAction::SetRange { .. } => "set_range",
            FilterAction::SetPriceBasis { .. } => "set_price_basis",
            FilterAction::SetQuery(_) => "set_query",
            FilterAction::TogglePanel => "toggle_panel",
            FilterAction::SetPanelOpen(_) => "set_panel_open",
            FilterAction::MarkVisited => "mark_visited",
            FilterAction::ResetAll(_) => "reset_all",
            FilterAction::ApplyOnboarding { .. } => "apply_onboarding",
            FilterAction::DatasetChanged(_) => "dataset_changed",
        }
    }
}

fn clean(values: BTreeSet<String>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Follow the new bounds when the range sat on the old ones, otherwise
/// keep the user's narrowing as far as the new data allows.
fn rebase(range: NumericRange, previous: NumericRange, current: NumericRange) -> NumericRange {
    if range.approx_eq(&previous) {
        current
    } else {
        range.fit_within(&current)
    }
}

/// Apply `action` to `state`, returning the next state.
pub fn reduce(mut state: FilterState, action: FilterAction) -> FilterState {
    match action {
        FilterAction::SetValues { field, values } => {
            *state.values_mut(field) = clean(values);
        }
        FilterAction::ToggleValue { field, value } => {
            let value = value.trim().to_string();
            if !value.is_empty() {
                let set = state.values_mut(field);
                if !set.remove(&value) {
                    set.insert(value);
                }
            }
        }
        FilterAction::SetRange { kind, range } => match kind {
            RangeKind::Carat => state.carat = range,
            RangeKind::Price => state.price = range,
        },
        FilterAction::SetPriceBasis { basis, bounds } => {
            if basis != state.price_basis {
                state.price_basis = basis;
                state.price = bounds.price(basis);
            }
        }
        FilterAction::SetQuery(query) => {
            state.query = query.trim().to_string();
        }
        FilterAction::TogglePanel => {
            state.panel_open = !state.panel_open;
        }
        FilterAction::SetPanelOpen(open) => {
            state.panel_open = open;
        }
        FilterAction::MarkVisited => {
            state.first_visit = false;
        }
        FilterAction::ResetAll(bounds) => {
            for field in FilterField::ALL {
                state.values_mut(field).clear();
            }
            state.query.clear();
            state.carat = bounds.carat;
            state.price = bounds.price(state.price_basis);
            state.anchor = bounds;
        }
        FilterAction::ApplyOnboarding { bundle, bounds } => {
            let OnboardingBundle {
                shapes,
                colors,
                clarities,
                cuts,
                growth_types,
                carat,
                price,
                price_basis,
            } = bundle;
            for (field, values) in [
                (FilterField::Shape, shapes),
                (FilterField::Color, colors),
                (FilterField::Clarity, clarities),
                (FilterField::Cut, cuts),
                (FilterField::GrowthType, growth_types),
            ] {
                if let Some(values) = values {
                    *state.values_mut(field) = clean(values);
                }
            }
            if let Some(basis) = price_basis {
                if basis != state.price_basis {
                    state.price_basis = basis;
                    state.price = bounds.price(basis);
                }
            }
            if let Some(carat) = carat {
                state.carat = carat.fit_within(&bounds.carat);
            }
            if let Some(price) = price {
                state.price = price.fit_within(&bounds.price(state.price_basis));
            }
            state.onboarding_complete = true;
            state.first_visit = false;
        }
        FilterAction::DatasetChanged(current) => {
            let previous = state.anchor;
            state.carat = rebase(state.carat, previous.carat, current.carat);
            state.price = rebase(
                state.price,
                previous.price(state.price_basis),
                current.price(state.price_basis),
            );
            state.anchor = current;
        }
    }
    state
}
