//! The filter store: reducer state plus memoized dataset-derived options.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use lustre_core::ItemRecord;

use crate::matching::apply_filters;
use crate::options::{categorize, derive_options, CategorizedOptions, DynamicOptions};
use crate::reducer::{reduce, FilterAction};
use crate::state::{active_filters, ActiveFilter, DatasetBounds, FilterState, OnboardingBundle};

/// Owns one session's [`FilterState`] and the options derived from the
/// dataset it filters.
///
/// State only changes through [`FilterStore::dispatch`]. Derived options
/// are recomputed when a different dataset is installed and reused
/// otherwise. Observers follow state changes through [`FilterStore::watch`].
pub struct FilterStore {
    state: FilterState,
    items: Arc<[ItemRecord]>,
    options: Arc<DynamicOptions>,
    categorized: Arc<CategorizedOptions>,
    tx: watch::Sender<FilterState>,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterStore {
    /// An empty store with default state and no dataset.
    pub fn new() -> Self {
        Self::with_state(FilterState::default())
    }

    /// A store seeded with a previously saved state.
    pub fn with_state(state: FilterState) -> Self {
        let (tx, _) = watch::channel(state.clone());
        Self {
            state,
            items: Arc::from(Vec::new()),
            options: Arc::new(DynamicOptions::default()),
            categorized: Arc::new(CategorizedOptions::default()),
            tx,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn items(&self) -> &Arc<[ItemRecord]> {
        &self.items
    }

    /// Receiver that observes every state change after subscription.
    pub fn watch(&self) -> watch::Receiver<FilterState> {
        self.tx.subscribe()
    }

    /// Apply one action; observers are notified only when state changed.
    pub fn dispatch(&mut self, action: FilterAction) {
        let name = action.name();
        let next = reduce(self.state.clone(), action);
        if next == self.state {
            debug!(component = "filter_store", action = name, "Action left state unchanged");
            return;
        }
        self.state = next;
        debug!(
            component = "filter_store",
            action = name,
            active_filters = self.active_filters_count(),
            "Filter state updated"
        );
        self.tx.send_replace(self.state.clone());
    }

    /// Install the dataset to filter.
    ///
    /// The same `Arc` again is a no-op. A new dataset recomputes the options
    /// and rebases the ranges through [`FilterAction::DatasetChanged`],
    /// measured against the bounds recorded in the state itself.
    pub fn set_items(&mut self, items: Arc<[ItemRecord]>) {
        if Arc::ptr_eq(&self.items, &items) {
            return;
        }
        let options = derive_options(&items);
        let current = options.bounds;
        debug!(
            component = "filter_store",
            item_count = items.len(),
            shapes = options.shapes.len(),
            "Recomputed dynamic options"
        );
        self.categorized = Arc::new(categorize(&options));
        self.options = Arc::new(options);
        self.items = items;
        self.dispatch(FilterAction::DatasetChanged(current));
    }

    pub fn dynamic_options(&self) -> Arc<DynamicOptions> {
        Arc::clone(&self.options)
    }

    pub fn categorized_options(&self) -> Arc<CategorizedOptions> {
        Arc::clone(&self.categorized)
    }

    pub fn dataset_bounds(&self) -> DatasetBounds {
        self.options.bounds
    }

    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        active_filters(&self.state, &self.options.bounds)
    }

    pub fn active_filters_count(&self) -> usize {
        self.active_filters().len()
    }

    pub fn has_active_filters(&self) -> bool {
        self.active_filters_count() > 0
    }

    /// Clear every filter and snap ranges to the current dataset bounds.
    pub fn reset_all_filters(&mut self) {
        self.dispatch(FilterAction::ResetAll(self.options.bounds));
    }

    /// Apply an onboarding selection in a single transition.
    pub fn apply_onboarding_filters(&mut self, bundle: OnboardingBundle) {
        self.dispatch(FilterAction::ApplyOnboarding {
            bundle,
            bounds: self.options.bounds,
        });
    }

    /// Items of the current dataset that pass the current filters.
    pub fn filtered_items(&self) -> Vec<&ItemRecord> {
        apply_filters(&self.items, &self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FilterField, NumericRange, RangeKind};
    use lustre_core::normalize_items;
    use serde_json::json;

    fn items(docs: serde_json::Value) -> Arc<[ItemRecord]> {
        Arc::from(normalize_items(docs.as_array().unwrap()))
    }

    fn sample() -> Arc<[ItemRecord]> {
        items(json!([
            {"id": 1, "shape": "Round", "carat": 1.0, "price": "$5,000"},
            {"id": 2, "shape": "Oval", "carat": 2.0, "price": "$8,000"},
            {"id": 3, "shape": "Pear", "carat": 0.7, "price": "$2,100"}
        ]))
    }

    #[test]
    fn test_fresh_dataset_has_no_active_filters() {
        let mut store = FilterStore::new();
        store.set_items(sample());
        assert!(!store.has_active_filters());
        assert_eq!(store.state().carat, NumericRange::new(0.7, 2.0));
        assert_eq!(store.filtered_items().len(), 3);
    }

    #[test]
    fn test_set_items_memoized_on_identity() {
        let mut store = FilterStore::new();
        let data = sample();
        store.set_items(Arc::clone(&data));
        let first = store.dynamic_options();
        store.set_items(Arc::clone(&data));
        assert!(Arc::ptr_eq(&first, &store.dynamic_options()));

        store.set_items(sample());
        assert!(!Arc::ptr_eq(&first, &store.dynamic_options()));
        assert_eq!(*first, *store.dynamic_options());
    }

    #[test]
    fn test_count_and_has_agree() {
        let mut store = FilterStore::new();
        store.set_items(sample());
        store.dispatch(FilterAction::ToggleValue {
            field: FilterField::Shape,
            value: "Oval".into(),
        });
        store.dispatch(FilterAction::SetRange {
            kind: RangeKind::Carat,
            range: NumericRange::new(1.0, 2.0),
        });
        assert_eq!(store.active_filters_count(), 2);
        assert!(store.has_active_filters());

        store.reset_all_filters();
        assert_eq!(store.active_filters_count(), 0);
        assert!(!store.has_active_filters());
    }

    #[test]
    fn test_reset_uses_current_dataset_bounds() {
        let mut store = FilterStore::new();
        store.set_items(sample());
        store.set_items(items(json!([
            {"carat": 3.0, "price": "$30,000"},
            {"carat": 4.0, "price": "$50,000"}
        ])));
        store.dispatch(FilterAction::SetRange {
            kind: RangeKind::Price,
            range: NumericRange::new(31_000.0, 40_000.0),
        });
        store.reset_all_filters();
        assert_eq!(store.state().carat, NumericRange::new(3.0, 4.0));
        assert_eq!(store.state().price, NumericRange::new(30_000.0, 50_000.0));
        assert_eq!(store.filtered_items().len(), 2);
    }

    #[test]
    fn test_restored_state_follows_grown_dataset() {
        let mut store = FilterStore::new();
        store.set_items(sample());
        let saved = store.state().clone();

        let mut restored = FilterStore::with_state(saved);
        restored.set_items(items(json!([
            {"id": 1, "shape": "Round", "carat": 1.0, "price": "$5,000"},
            {"id": 2, "shape": "Oval", "carat": 2.0, "price": "$8,000"},
            {"id": 3, "shape": "Pear", "carat": 0.7, "price": "$2,100"},
            {"id": 4, "shape": "Heart", "carat": 3.0, "price": "$15,000"}
        ])));
        assert_eq!(restored.state().carat, NumericRange::new(0.7, 3.0));
        assert!(!restored.has_active_filters());
        assert_eq!(restored.filtered_items().len(), 4);
    }

    #[test]
    fn test_restored_narrowing_is_kept() {
        let mut store = FilterStore::new();
        store.set_items(sample());
        store.dispatch(FilterAction::SetRange {
            kind: RangeKind::Carat,
            range: NumericRange::new(0.9, 1.5),
        });
        let saved = store.state().clone();

        let mut restored = FilterStore::with_state(saved);
        restored.set_items(sample());
        assert_eq!(restored.state().carat, NumericRange::new(0.9, 1.5));
        assert_eq!(restored.active_filters_count(), 1);
        assert_eq!(restored.filtered_items().len(), 1);
    }

    #[tokio::test]
    async fn test_watch_sees_changes_only() {
        let mut store = FilterStore::new();
        let mut rx = store.watch();

        store.dispatch(FilterAction::SetPanelOpen(false));
        assert!(!rx.has_changed().unwrap());

        store.dispatch(FilterAction::TogglePanel);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().panel_open);
    }

    #[test]
    fn test_onboarding_single_transition() {
        let mut store = FilterStore::new();
        store.set_items(sample());
        let mut rx = store.watch();
        store.apply_onboarding_filters(OnboardingBundle {
            shapes: Some(["Round".to_string()].into_iter().collect()),
            colors: Some(["D".to_string()].into_iter().collect()),
            ..OnboardingBundle::default()
        });
        let seen = rx.borrow_and_update().clone();
        assert!(seen.onboarding_complete);
        assert_eq!(seen.shapes.len(), 1);
        assert_eq!(seen.colors.len(), 1);
        assert!(!rx.has_changed().unwrap());
    }
}
