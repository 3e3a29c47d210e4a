//! Client, queries and mutations against the live mock server.
//!
//! Each test starts the mock server on a random port and talks to it over
//! real HTTP through `ReqwestTransport`, so request building, response
//! decoding and store mirroring are checked against the actual routes.

use std::sync::Arc;

use caas_core::types::{DispatchCleanup, PriorityTier};
use caas_core::{ApiClient, ApiError, AppStore, ClientConfig, FetchStatus, Mutations, Queries};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}{}", mock_server::API_PREFIX)
}

async fn client() -> Arc<ApiClient> {
    let config = ClientConfig {
        api_base_url: start_server().await,
        ..ClientConfig::default()
    };
    Arc::new(ApiClient::from_config(&config).unwrap())
}

#[tokio::test]
async fn location_name_comes_from_metadata() {
    let client = client().await;
    let location = client.get_location("loc-001").await.unwrap();
    assert_eq!(location.location_id, "loc-001");
    assert_eq!(location.name(), Some("MG Road Junction"));
    assert_eq!(location.area_weight, 3);
}

#[tokio::test]
async fn critical_tier_has_single_item() {
    let client = client().await;
    let critical = client.priority_queue(Some(PriorityTier::Critical)).await.unwrap();

    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].location_id, "loc-001");
    assert_eq!(critical[0].priority_score, 2.55);
    assert_eq!(PriorityTier::from_score(critical[0].priority_score), PriorityTier::Critical);
}

#[tokio::test]
async fn unknown_location_is_server_error_with_message() {
    let client = client().await;
    let err = client.get_location("loc-999").await.unwrap_err();

    assert!(matches!(err, ApiError::Server { status: 404, .. }));
    assert_eq!(err.message(), "Location loc-999 not found");
}

#[tokio::test]
async fn every_read_endpoint_decodes() {
    let client = client().await;

    assert_eq!(client.list_locations(Some("ward-001")).await.unwrap().len(), 3);
    assert_eq!(client.list_predictions(None).await.unwrap().len(), 3);
    assert_eq!(client.predictions_for_location("loc-001", Some(&[6][..])).await.unwrap().len(), 1);
    assert_eq!(client.signals("loc-001").await.unwrap().location_id, "loc-001");
    assert_eq!(client.list_executions(Some("completed")).await.unwrap().len(), 1);
    assert!(client.get_execution("exec-002").await.unwrap().completion_time.is_none());
    assert_eq!(client.map_data("ward-001").await.unwrap().locations.len(), 3);
    assert_eq!(client.audit_logs(None).await.unwrap().len(), 2);
    assert_eq!(client.system_health().await.unwrap().services.len(), 5);
}

#[tokio::test]
async fn queries_mirror_into_store() {
    let client = client().await;
    let queries = Queries::new(client, AppStore::new());

    let locations = queries.locations(Some("ward-001".to_string()));
    let priorities = queries.priority_queue(None);
    locations.activate().await;
    priorities.activate().await;

    assert_eq!(locations.status(), FetchStatus::Success);
    let store = queries.store();
    assert_eq!(store.locations().len(), 3);
    assert_eq!(store.priority_items_by_tier(PriorityTier::High).len(), 1);

    // narrowing the filter replaces the mirrored collection
    assert!(priorities.set_key(Some(PriorityTier::Critical)).await);
    assert_eq!(store.priority_queue().len(), 1);
}

#[tokio::test]
async fn dispatch_then_list_active() {
    let client = client().await;
    let mutations = Mutations::new(client.clone());
    let queries = Queries::new(client, AppStore::new());

    let dispatch = mutations.dispatch_cleanup();
    let execution = dispatch
        .mutate(DispatchCleanup {
            location_id: "loc-001".to_string(),
            priority_tier: PriorityTier::Critical,
            notes: Some("Test".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(execution.location_id, "loc-001");
    assert_eq!(execution.notes, "Test");
    assert!(execution.execution_id.starts_with("exec-"));

    let active = queries.executions(Some("active".to_string()));
    active.activate().await;
    assert!(queries.store().execution_by_id(&execution.execution_id).is_some());
}

#[tokio::test]
async fn missing_id_fails_before_network() {
    let client = client().await;
    let queries = Queries::new(client, AppStore::new());

    let execution = queries.execution(None);
    execution.activate().await;

    assert_eq!(execution.status(), FetchStatus::Error);
    assert_eq!(execution.error().as_deref(), Some("Execution ID is required"));
}
