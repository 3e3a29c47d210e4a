//! Client-side application store.
//!
//! `AppStore` is an explicit container created once at startup and handed
//! to every consumer by cloning the handle. It holds the last-fetched
//! collection of each entity plus a little UI selection state. Collections
//! are only ever replaced wholesale through the `set_*` operations, so
//! concurrent writers resolve as last-writer-wins. The store performs no
//! network I/O; the collection queries in `queries.rs` write into it.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::{Execution, Location, Prediction, PredictionFilters, PriorityItem, PriorityTier};

#[derive(Debug, Clone, Default)]
struct StoreState {
    locations: Vec<Location>,
    predictions: Vec<Prediction>,
    priority_queue: Vec<PriorityItem>,
    executions: Vec<Execution>,
    selected_location_id: Option<String>,
    prediction_filters: PredictionFilters,
    priority_tier_filter: Option<PriorityTier>,
}

#[derive(Debug, Clone, Default)]
pub struct AppStore {
    state: Arc<RwLock<StoreState>>,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // --- locations ---

    pub fn locations(&self) -> Vec<Location> {
        self.read().locations.clone()
    }

    pub fn set_locations(&self, locations: Vec<Location>) {
        self.write().locations = locations;
    }

    pub fn location_by_id(&self, location_id: &str) -> Option<Location> {
        self.read()
            .locations
            .iter()
            .find(|l| l.location_id == location_id)
            .cloned()
    }

    // --- predictions ---

    pub fn predictions(&self) -> Vec<Prediction> {
        self.read().predictions.clone()
    }

    pub fn set_predictions(&self, predictions: Vec<Prediction>) {
        self.write().predictions = predictions;
    }

    pub fn predictions_by_location(&self, location_id: &str) -> Vec<Prediction> {
        self.read()
            .predictions
            .iter()
            .filter(|p| p.location_id == location_id)
            .cloned()
            .collect()
    }

    // --- priority queue ---

    pub fn priority_queue(&self) -> Vec<PriorityItem> {
        self.read().priority_queue.clone()
    }

    pub fn set_priority_queue(&self, queue: Vec<PriorityItem>) {
        self.write().priority_queue = queue;
    }

    pub fn priority_items_by_tier(&self, tier: PriorityTier) -> Vec<PriorityItem> {
        self.read()
            .priority_queue
            .iter()
            .filter(|item| item.tier == tier)
            .cloned()
            .collect()
    }

    // --- executions ---

    pub fn executions(&self) -> Vec<Execution> {
        self.read().executions.clone()
    }

    pub fn set_executions(&self, executions: Vec<Execution>) {
        self.write().executions = executions;
    }

    pub fn execution_by_id(&self, execution_id: &str) -> Option<Execution> {
        self.read()
            .executions
            .iter()
            .find(|e| e.execution_id == execution_id)
            .cloned()
    }

    /// Executions still in progress (no completion time).
    pub fn active_executions(&self) -> Vec<Execution> {
        self.executions_where(|e| !e.is_completed())
    }

    pub fn completed_executions(&self) -> Vec<Execution> {
        self.executions_where(Execution::is_completed)
    }

    fn executions_where(&self, pred: impl Fn(&Execution) -> bool) -> Vec<Execution> {
        self.read()
            .executions
            .iter()
            .filter(|e| pred(e))
            .cloned()
            .collect()
    }

    // --- UI selection state ---

    pub fn selected_location_id(&self) -> Option<String> {
        self.read().selected_location_id.clone()
    }

    pub fn set_selected_location_id(&self, location_id: Option<String>) {
        self.write().selected_location_id = location_id;
    }

    pub fn prediction_filters(&self) -> PredictionFilters {
        self.read().prediction_filters.clone()
    }

    /// Merge `filters` into the current prediction filters.
    pub fn update_prediction_filters(&self, filters: PredictionFilters) {
        self.write().prediction_filters.merge(filters);
    }

    pub fn clear_prediction_filters(&self) {
        self.write().prediction_filters = PredictionFilters::default();
    }

    pub fn priority_tier_filter(&self) -> Option<PriorityTier> {
        self.read().priority_tier_filter
    }

    pub fn set_priority_tier_filter(&self, tier: Option<PriorityTier>) {
        self.write().priority_tier_filter = tier;
    }

    /// Return every collection and selection to its initial state.
    pub fn reset(&self) {
        *self.write() = StoreState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location(id: &str) -> Location {
        serde_json::from_value(json!({
            "location_id": id,
            "ward_id": "ward-001",
            "geometry": { "type": "Point", "coordinates": [77.5946, 12.9716] },
            "area_weight": 2,
            "location_type": "market",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    fn execution(id: &str, completed: bool) -> Execution {
        let mut value = json!({
            "execution_id": id,
            "location_id": "loc-001",
            "dispatch_time": "2024-01-15T10:00:00Z",
            "before_image_id": "img-001",
            "before_score": 0.85,
            "notes": "",
            "created_at": "2024-01-15T10:00:00Z"
        });
        if completed {
            value["completion_time"] = json!("2024-01-15T12:00:00Z");
        }
        serde_json::from_value(value).unwrap()
    }

    fn priority_item(id: &str, tier: PriorityTier) -> PriorityItem {
        PriorityItem {
            location_id: id.to_string(),
            location: location(id),
            priority_score: 1.0,
            tier,
            overflow_probability: 0.5,
            area_weight: 2,
            failure_history_factor: 1.0,
            response_time_recommendation: "Regular schedule".to_string(),
            latest_prediction: None,
        }
    }

    #[test]
    fn set_locations_replaces_wholesale() {
        let store = AppStore::new();
        store.set_locations(vec![location("loc-001"), location("loc-002")]);
        store.set_locations(vec![location("loc-003")]);

        assert_eq!(store.locations().len(), 1);
        assert!(store.location_by_id("loc-001").is_none());
        assert_eq!(store.location_by_id("loc-003").unwrap().location_id, "loc-003");
    }

    #[test]
    fn clones_share_state() {
        let store = AppStore::new();
        let other = store.clone();
        other.set_locations(vec![location("loc-001")]);
        assert_eq!(store.locations().len(), 1);
    }

    #[test]
    fn priority_items_filter_by_tier() {
        let store = AppStore::new();
        store.set_priority_queue(vec![
            priority_item("loc-001", PriorityTier::Critical),
            priority_item("loc-002", PriorityTier::High),
            priority_item("loc-003", PriorityTier::Critical),
        ]);
        let critical = store.priority_items_by_tier(PriorityTier::Critical);
        assert_eq!(critical.len(), 2);
        assert!(store.priority_items_by_tier(PriorityTier::Low).is_empty());
    }

    #[test]
    fn executions_split_by_completion() {
        let store = AppStore::new();
        store.set_executions(vec![execution("exec-001", true), execution("exec-002", false)]);

        let ids = |executions: Vec<Execution>| -> Vec<String> {
            executions.into_iter().map(|e| e.execution_id).collect()
        };
        let active = ids(store.active_executions());
        let completed = ids(store.completed_executions());
        assert_eq!(active, vec!["exec-002"]);
        assert_eq!(completed, vec!["exec-001"]);
        assert!(store.execution_by_id("exec-002").is_some());
    }

    #[test]
    fn prediction_filters_merge_and_clear() {
        let store = AppStore::new();
        store.update_prediction_filters(PredictionFilters {
            horizon_hours: Some(6),
            ..Default::default()
        });
        store.update_prediction_filters(PredictionFilters {
            min_probability: Some(0.7),
            ..Default::default()
        });
        let filters = store.prediction_filters();
        assert_eq!(filters.horizon_hours, Some(6));
        assert_eq!(filters.min_probability, Some(0.7));

        store.clear_prediction_filters();
        assert_eq!(store.prediction_filters(), PredictionFilters::default());
    }

    #[test]
    fn reset_clears_everything() {
        let store = AppStore::new();
        store.set_locations(vec![location("loc-001")]);
        store.set_selected_location_id(Some("loc-001".to_string()));
        store.set_priority_tier_filter(Some(PriorityTier::High));

        store.reset();

        assert!(store.locations().is_empty());
        assert!(store.selected_location_id().is_none());
        assert!(store.priority_tier_filter().is_none());
    }
}
