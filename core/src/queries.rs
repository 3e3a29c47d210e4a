//! Query bindings for every read endpoint.
//!
//! `Queries` hands out one [`Query`] per dashboard view. The dependency key
//! of each query is the endpoint's parameter set, so `set_key` re-fetches
//! exactly when a filter changes. The four collection queries (locations,
//! predictions, priority queue, executions) also overwrite their collection
//! in the shared [`AppStore`] after every successful fetch.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::fetch::{fetcher, Query};
use crate::store::AppStore;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    AuditLogEntry, AuditLogFilters, Execution, Location, MapData, Prediction, PredictionFilters,
    PriorityItem, PriorityTier, Signals, SystemHealth,
};

pub const LOCATION_ID_REQUIRED: &str = "Location ID is required";
pub const EXECUTION_ID_REQUIRED: &str = "Execution ID is required";

/// An absent or empty identifier fails validation before any request.
fn required(id: Option<String>, message: &str) -> Result<String, ApiError> {
    id.filter(|s| !s.is_empty()).ok_or_else(|| ApiError::validation(message))
}

pub struct Queries<T = ReqwestTransport> {
    client: Arc<ApiClient<T>>,
    store: AppStore,
}

impl<T> Clone for Queries<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: self.store.clone(),
        }
    }
}

impl<T: Transport + 'static> Queries<T> {
    pub fn new(client: Arc<ApiClient<T>>, store: AppStore) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    pub fn locations(&self, ward_id: Option<String>) -> Query<Option<String>, Vec<Location>> {
        let client = self.client.clone();
        let store = self.store.clone();
        Query::with_on_success(
            "locations",
            ward_id,
            fetcher(move |ward_id: Option<String>| {
                let client = client.clone();
                async move { client.list_locations(ward_id.as_deref()).await }
            }),
            Arc::new(move |locations: &Vec<Location>| store.set_locations(locations.clone())),
        )
    }

    pub fn location(&self, location_id: Option<String>) -> Query<Option<String>, Location> {
        let client = self.client.clone();
        Query::new(
            "location",
            location_id,
            fetcher(move |location_id: Option<String>| {
                let client = client.clone();
                async move {
                    let id = required(location_id, LOCATION_ID_REQUIRED)?;
                    client.get_location(&id).await
                }
            }),
        )
    }

    pub fn predictions(
        &self,
        filters: Option<PredictionFilters>,
    ) -> Query<Option<PredictionFilters>, Vec<Prediction>> {
        let client = self.client.clone();
        let store = self.store.clone();
        Query::with_on_success(
            "predictions",
            filters,
            fetcher(move |filters: Option<PredictionFilters>| {
                let client = client.clone();
                async move { client.list_predictions(filters.as_ref()).await }
            }),
            Arc::new(move |predictions: &Vec<Prediction>| {
                store.set_predictions(predictions.clone())
            }),
        )
    }

    pub fn predictions_for_location(
        &self,
        location_id: Option<String>,
        horizons: Option<Vec<u32>>,
    ) -> Query<(Option<String>, Option<Vec<u32>>), Vec<Prediction>> {
        let client = self.client.clone();
        Query::new(
            "predictions_for_location",
            (location_id, horizons),
            fetcher(move |(location_id, horizons): (Option<String>, Option<Vec<u32>>)| {
                let client = client.clone();
                async move {
                    let id = required(location_id, LOCATION_ID_REQUIRED)?;
                    client.predictions_for_location(&id, horizons.as_deref()).await
                }
            }),
        )
    }

    pub fn priority_queue(
        &self,
        tier: Option<PriorityTier>,
    ) -> Query<Option<PriorityTier>, Vec<PriorityItem>> {
        let client = self.client.clone();
        let store = self.store.clone();
        Query::with_on_success(
            "priority_queue",
            tier,
            fetcher(move |tier: Option<PriorityTier>| {
                let client = client.clone();
                async move { client.priority_queue(tier).await }
            }),
            Arc::new(move |queue: &Vec<PriorityItem>| store.set_priority_queue(queue.clone())),
        )
    }

    pub fn executions(&self, status: Option<String>) -> Query<Option<String>, Vec<Execution>> {
        let client = self.client.clone();
        let store = self.store.clone();
        Query::with_on_success(
            "executions",
            status,
            fetcher(move |status: Option<String>| {
                let client = client.clone();
                async move { client.list_executions(status.as_deref()).await }
            }),
            Arc::new(move |executions: &Vec<Execution>| store.set_executions(executions.clone())),
        )
    }

    pub fn execution(&self, execution_id: Option<String>) -> Query<Option<String>, Execution> {
        let client = self.client.clone();
        Query::new(
            "execution",
            execution_id,
            fetcher(move |execution_id: Option<String>| {
                let client = client.clone();
                async move {
                    let id = required(execution_id, EXECUTION_ID_REQUIRED)?;
                    client.get_execution(&id).await
                }
            }),
        )
    }

    pub fn map_data(&self, ward_id: String) -> Query<String, MapData> {
        let client = self.client.clone();
        Query::new(
            "map_data",
            ward_id,
            fetcher(move |ward_id: String| {
                let client = client.clone();
                async move { client.map_data(&ward_id).await }
            }),
        )
    }

    pub fn signals(&self, location_id: Option<String>) -> Query<Option<String>, Signals> {
        let client = self.client.clone();
        Query::new(
            "signals",
            location_id,
            fetcher(move |location_id: Option<String>| {
                let client = client.clone();
                async move {
                    let id = required(location_id, LOCATION_ID_REQUIRED)?;
                    client.signals(&id).await
                }
            }),
        )
    }

    pub fn audit_logs(
        &self,
        filters: Option<AuditLogFilters>,
    ) -> Query<Option<AuditLogFilters>, Vec<AuditLogEntry>> {
        let client = self.client.clone();
        Query::new(
            "audit_logs",
            filters,
            fetcher(move |filters: Option<AuditLogFilters>| {
                let client = client.clone();
                async move { client.audit_logs(filters.as_ref()).await }
            }),
        )
    }

    pub fn system_health(&self) -> Query<(), SystemHealth> {
        let client = self.client.clone();
        Query::new(
            "system_health",
            (),
            fetcher(move |_: ()| {
                let client = client.clone();
                async move { client.system_health().await }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fetch::FetchStatus;
    use crate::testing::{Reply, ScriptedTransport};

    const BASE_URL: &str = "http://localhost:8000/api/v1";

    fn location_json(id: &str, name: &str) -> serde_json::Value {
        json!({
            "location_id": id,
            "ward_id": "ward-001",
            "geometry": { "type": "Point", "coordinates": [77.5946, 12.9716] },
            "area_weight": 3,
            "location_type": "street_corner",
            "metadata": { "name": name },
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    fn queries(replies: Vec<Reply>) -> (Queries<Arc<ScriptedTransport>>, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(replies));
        let client = ApiClient::with_transport(BASE_URL, transport.clone()).unwrap();
        (Queries::new(Arc::new(client), AppStore::new()), transport)
    }

    #[tokio::test]
    async fn locations_query_mirrors_into_store() {
        let (queries, _) = queries(vec![Reply::ok(json!([
            location_json("loc-001", "MG Road Junction"),
            location_json("loc-002", "Brigade Road Market"),
        ]))]);

        let query = queries.locations(None);
        query.activate().await;

        assert_eq!(query.status(), FetchStatus::Success);
        assert_eq!(query.data().unwrap().len(), 2);
        let stored = queries.store().location_by_id("loc-001").unwrap();
        assert_eq!(stored.name(), Some("MG Road Junction"));
    }

    #[tokio::test]
    async fn failed_collection_fetch_leaves_store_untouched() {
        let body = r#"{"message":"bad ward"}"#.to_string();
        let (queries, _) = queries(vec![Reply::Status(400, body)]);
        queries.store().set_executions(Vec::new());

        let query = queries.executions(Some("active".to_string()));
        query.activate().await;

        assert_eq!(query.error().as_deref(), Some("bad ward"));
        assert!(queries.store().executions().is_empty());
    }

    #[tokio::test]
    async fn missing_location_id_fails_without_request() {
        let (queries, transport) = queries(vec![Reply::status(200)]);

        let query = queries.location(None);
        query.activate().await;

        assert_eq!(query.status(), FetchStatus::Error);
        assert_eq!(query.error().as_deref(), Some(LOCATION_ID_REQUIRED));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_ids_fail_without_request() {
        let (queries, transport) = queries(vec![Reply::status(200)]);

        let location = queries.location(Some(String::new()));
        let signals = queries.signals(Some(String::new()));
        let forecast = queries.predictions_for_location(Some(String::new()), None);
        let execution = queries.execution(Some(String::new()));
        location.activate().await;
        signals.activate().await;
        forecast.activate().await;
        execution.activate().await;

        assert_eq!(location.error().as_deref(), Some(LOCATION_ID_REQUIRED));
        assert_eq!(signals.error().as_deref(), Some(LOCATION_ID_REQUIRED));
        assert_eq!(forecast.error().as_deref(), Some(LOCATION_ID_REQUIRED));
        assert_eq!(execution.error().as_deref(), Some(EXECUTION_ID_REQUIRED));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_execution_id_fails_without_request() {
        let (queries, transport) = queries(vec![Reply::status(200)]);

        let query = queries.execution(None);
        query.activate().await;

        assert_eq!(query.error().as_deref(), Some(EXECUTION_ID_REQUIRED));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn location_query_refetches_on_key_change() {
        let (queries, transport) = queries(vec![
            Reply::ok(location_json("loc-001", "MG Road Junction")),
            Reply::ok(location_json("loc-002", "Brigade Road Market")),
        ]);

        let query = queries.location(Some("loc-001".to_string()));
        query.activate().await;
        assert!(!query.set_key(Some("loc-001".to_string())).await);
        assert!(query.set_key(Some("loc-002".to_string())).await);

        assert_eq!(query.data().unwrap().location_id, "loc-002");
        let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "http://localhost:8000/api/v1/locations/loc-001",
                "http://localhost:8000/api/v1/locations/loc-002",
            ]
        );
    }

    #[tokio::test]
    async fn predictions_for_location_sends_horizons() {
        let (queries, transport) = queries(vec![Reply::ok(json!([]))]);

        let query =
            queries.predictions_for_location(Some("loc-001".to_string()), Some(vec![6, 12]));
        query.activate().await;

        assert_eq!(query.data(), Some(Vec::new()));
        let request = &transport.requests()[0];
        assert_eq!(request.query, vec![("horizons".to_string(), "6,12".to_string())]);
    }
}
