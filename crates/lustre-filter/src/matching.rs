//! Applying a [`FilterState`] to catalog items.

use lustre_core::ItemRecord;

use crate::state::{FilterField, FilterState};

fn matches_query(item: &ItemRecord, needle: &str) -> bool {
    let id = item.id.to_string();
    [
        id.as_str(),
        item.shape.as_str(),
        item.color.as_str(),
        item.clarity.as_str(),
        item.cut.as_str(),
        item.category.as_str(),
        item.growth_type.as_str(),
        item.location.as_str(),
        item.supplier.as_str(),
        item.certificate.as_str(),
        item.description.as_str(),
    ]
    .iter()
    .any(|haystack| haystack.to_lowercase().contains(needle))
}

/// Whether `item` satisfies every constraint in `state`.
///
/// Empty sets and an empty query constrain nothing. The price range is
/// checked against total price or price per carat depending on the basis.
pub fn matches(item: &ItemRecord, state: &FilterState) -> bool {
    let sets_ok = FilterField::ALL.iter().all(|field| {
        let selected = state.values(*field);
        selected.is_empty() || selected.contains(field.value_of(item))
    });
    if !sets_ok {
        return false;
    }
    if !state.carat.contains(item.carat) {
        return false;
    }
    if !state.price.contains(state.price_basis.price_of(item)) {
        return false;
    }
    state.query.is_empty() || matches_query(item, &state.query.to_lowercase())
}

/// Items passing `state`, in dataset order.
pub fn apply_filters<'a>(items: &'a [ItemRecord], state: &FilterState) -> Vec<&'a ItemRecord> {
    items.iter().filter(|item| matches(item, state)).collect()
}
