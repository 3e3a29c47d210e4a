//! In-memory fake of the CaaS platform API, mounted under `/api/v1`.

pub mod fixtures;

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const API_PREFIX: &str = "/api/v1";

/// Error body shared by every failing endpoint: `{"message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(what: &str, id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{what} {id} not found"),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Executions are the only mutable collection: dispatch, verify and
/// payment decisions write back into it.
#[derive(Clone)]
pub struct AppState {
    executions: Arc<RwLock<Vec<Value>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            executions: Arc::new(RwLock::new(fixtures::executions())),
        }
    }
}

pub fn app() -> Router {
    let api = Router::new()
        .route("/locations", get(list_locations))
        .route("/locations/{id}", get(get_location))
        .route("/predictions", get(list_predictions))
        .route("/predict/{location_id}", get(predict_location))
        .route("/signals/{location_id}", get(get_signals))
        .route("/priorities", get(list_priorities))
        .route("/executions", get(list_executions))
        .route("/executions/{id}", get(get_execution))
        .route("/cleanup/dispatch", post(dispatch_cleanup))
        .route("/cleanup/verify", post(verify_cleanup))
        .route("/payment/approve", post(approve_payment))
        .route("/map/{ward_id}", get(get_map))
        .route("/audit-logs", get(list_audit_logs))
        .route("/health", get(health))
        .route("/ingest/image", post(ingest_image))
        .route("/ingest/weather", post(ingest_weather))
        .route("/ingest/pickup_schedule", post(ingest_pickup_schedule))
        .with_state(AppState::default());
    Router::new().nest(API_PREFIX, api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn find_location(id: &str) -> ApiResult<Value> {
    fixtures::locations()
        .into_iter()
        .find(|l| l["location_id"] == id)
        .ok_or_else(|| ApiError::not_found("Location", id))
}

// --- locations ---

#[derive(Debug, Default, Deserialize)]
pub struct WardQuery {
    pub ward_id: Option<String>,
}

async fn list_locations(Query(query): Query<WardQuery>) -> Json<Vec<Value>> {
    let locations = fixtures::locations()
        .into_iter()
        .filter(|l| query.ward_id.as_ref().is_none_or(|ward| l["ward_id"] == ward.as_str()))
        .collect();
    Json(locations)
}

async fn get_location(Path(id): Path<String>) -> ApiResult<Json<Value>> {
    find_location(&id).map(Json)
}

// --- predictions and signals ---

#[derive(Debug, Default, Deserialize)]
pub struct PredictionQuery {
    pub confidence_level: Option<String>,
    pub horizon_hours: Option<u32>,
    pub location_id: Option<String>,
    pub min_probability: Option<f64>,
}

impl PredictionQuery {
    fn matches(&self, prediction: &Value) -> bool {
        self.confidence_level
            .as_ref()
            .is_none_or(|c| prediction["confidence_level"] == c.as_str())
            && self.horizon_hours.is_none_or(|h| prediction["horizon_hours"] == h)
            && self.location_id.as_ref().is_none_or(|id| prediction["location_id"] == id.as_str())
            && self
                .min_probability
                .is_none_or(|p| prediction["overflow_probability"].as_f64().unwrap_or(0.0) >= p)
    }
}

async fn list_predictions(Query(query): Query<PredictionQuery>) -> Json<Vec<Value>> {
    Json(fixtures::predictions().into_iter().filter(|p| query.matches(p)).collect())
}

#[derive(Debug, Default, Deserialize)]
pub struct HorizonsQuery {
    pub horizons: Option<String>,
}

fn parse_horizons(raw: &str) -> ApiResult<Vec<u32>> {
    raw.split(',')
        .map(|h| {
            h.trim()
                .parse::<u32>()
                .map_err(|_| ApiError::bad_request(format!("Invalid horizon: {h}")))
        })
        .collect()
}

async fn predict_location(
    Path(location_id): Path<String>,
    Query(query): Query<HorizonsQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    find_location(&location_id)?;
    let horizons = query.horizons.as_deref().map(parse_horizons).transpose()?;
    let predictions = fixtures::predictions()
        .into_iter()
        .filter(|p| p["location_id"] == location_id.as_str())
        .filter(|p| {
            horizons.as_ref().is_none_or(|hs| {
                p["horizon_hours"]
                    .as_u64()
                    .is_some_and(|h| hs.iter().any(|&wanted| u64::from(wanted) == h))
            })
        })
        .collect();
    Ok(Json(predictions))
}

async fn get_signals(Path(location_id): Path<String>) -> ApiResult<Json<Value>> {
    find_location(&location_id)?;
    Ok(Json(fixtures::signals(&location_id)))
}

// --- priorities and executions ---

#[derive(Debug, Default, Deserialize)]
pub struct TierQuery {
    pub tier: Option<String>,
}

async fn list_priorities(Query(query): Query<TierQuery>) -> Json<Vec<Value>> {
    let queue = fixtures::priority_queue()
        .into_iter()
        .filter(|item| query.tier.as_ref().is_none_or(|tier| item["tier"] == tier.as_str()))
        .collect();
    Json(queue)
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// `active` and `completed` split on completion time; any other value is
/// matched against the payment status.
fn execution_matches(execution: &Value, status: &str) -> bool {
    let completed = !execution["completion_time"].is_null();
    match status {
        "active" => !completed,
        "completed" => completed,
        other => execution["payment_status"] == other,
    }
}

async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Json<Vec<Value>> {
    let executions = state.executions.read().await;
    let matching = executions
        .iter()
        .filter(|e| query.status.as_deref().is_none_or(|s| execution_matches(e, s)))
        .cloned()
        .collect();
    Json(matching)
}

async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let executions = state.executions.read().await;
    let found = executions.iter().find(|e| e["execution_id"] == id.as_str()).cloned();
    found.map(Json).ok_or_else(|| ApiError::not_found("Execution", &id))
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub location_id: String,
    pub priority_tier: String,
    #[serde(default)]
    pub notes: Option<String>,
}

async fn dispatch_cleanup(
    State(state): State<AppState>,
    Json(input): Json<DispatchRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    find_location(&input.location_id)?;
    let now = Utc::now().to_rfc3339();
    let execution_id = format!("exec-{}", Uuid::new_v4());
    info!(
        %execution_id,
        location_id = %input.location_id,
        tier = %input.priority_tier,
        "cleanup dispatched"
    );
    let execution = json!({
        "execution_id": execution_id,
        "location_id": input.location_id,
        "dispatch_time": now,
        "before_image_id": "img-001",
        "before_score": 0.85,
        "payment_status": "pending",
        "notes": input.notes.unwrap_or_default(),
        "created_at": now
    });
    state.executions.write().await.push(execution.clone());
    Ok((StatusCode::CREATED, Json(execution)))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub execution_id: String,
    pub after_image_id: String,
}

async fn verify_cleanup(
    State(state): State<AppState>,
    Json(input): Json<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    let mut executions = state.executions.write().await;
    let execution = executions
        .iter_mut()
        .find(|e| e["execution_id"] == input.execution_id.as_str())
        .ok_or_else(|| ApiError::not_found("Execution", &input.execution_id))?;

    let quality_score = 0.85;
    execution["completion_time"] = json!(Utc::now().to_rfc3339());
    execution["after_image_id"] = json!(input.after_image_id);
    execution["after_score"] = json!(0.15);
    execution["quality_score"] = json!(quality_score);
    execution["payment_recommendation"] = json!("release");
    info!(execution_id = %input.execution_id, "cleanup verified");

    Ok(Json(json!({
        "execution_id": input.execution_id,
        "after_image_id": input.after_image_id,
        "quality_score": quality_score,
        "verification_status": "completed"
    })))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub execution_id: String,
    pub decision: Decision,
    #[serde(default)]
    pub notes: Option<String>,
}

async fn approve_payment(
    State(state): State<AppState>,
    Json(input): Json<PaymentRequest>,
) -> ApiResult<Json<Value>> {
    let mut executions = state.executions.write().await;
    let execution = executions
        .iter_mut()
        .find(|e| e["execution_id"] == input.execution_id.as_str())
        .ok_or_else(|| ApiError::not_found("Execution", &input.execution_id))?;

    let payment_status = match input.decision {
        Decision::Approve => "approved",
        Decision::Reject => "rejected",
    };
    execution["payment_status"] = json!(payment_status);
    info!(execution_id = %input.execution_id, payment_status, "payment decided");

    Ok(Json(json!({
        "execution_id": input.execution_id,
        "payment_status": payment_status,
        "notes": input.notes
    })))
}

// --- dashboard ---

async fn get_map(Path(ward_id): Path<String>) -> Json<Value> {
    Json(fixtures::map_data(&ward_id))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub source: Option<String>,
    pub data_type: Option<String>,
}

fn parse_date(raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("Invalid date: {raw}")))
}

fn entry_date(entry: &Value) -> Option<NaiveDate> {
    let timestamp = entry["timestamp"].as_str()?;
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|t| t.with_timezone(&Utc).date_naive())
}

async fn list_audit_logs(Query(query): Query<AuditQuery>) -> ApiResult<Json<Vec<Value>>> {
    let start = query.start_date.as_deref().map(parse_date).transpose()?;
    let end = query.end_date.as_deref().map(parse_date).transpose()?;
    let entries = fixtures::audit_logs()
        .into_iter()
        .filter(|e| query.source.as_ref().is_none_or(|s| e["source"] == s.as_str()))
        .filter(|e| query.data_type.as_ref().is_none_or(|t| e["data_type"] == t.as_str()))
        .filter(|e| match entry_date(e) {
            Some(date) => start.is_none_or(|s| date >= s) && end.is_none_or(|end| date <= end),
            None => start.is_none() && end.is_none(),
        })
        .collect();
    Ok(Json(entries))
}

async fn health() -> Json<Value> {
    Json(fixtures::system_health())
}

// --- ingestion ---

fn malformed(err: MultipartError) -> ApiError {
    ApiError::bad_request(err.body_text())
}

async fn ingest_image(mut multipart: Multipart) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut location_id = None;
    let mut timestamp = None;
    let mut size = None;
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "location_id" => location_id = Some(field.text().await.map_err(malformed)?),
            "timestamp" => timestamp = Some(field.text().await.map_err(malformed)?),
            "file" => size = Some(field.bytes().await.map_err(malformed)?.len()),
            _ => {}
        }
    }

    let location_id = location_id.ok_or_else(|| ApiError::bad_request("location_id is required"))?;
    let size = size.ok_or_else(|| ApiError::bad_request("file is required"))?;
    find_location(&location_id)?;

    let now = Utc::now().to_rfc3339();
    let image_id = format!("img-{}", Uuid::new_v4());
    info!(%image_id, %location_id, size, "image ingested");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "image_id": image_id,
            "location_id": location_id,
            "timestamp": timestamp.unwrap_or_else(|| now.clone()),
            "image_url": format!("/mock-images/{image_id}.jpg"),
            "severity_score": 0.5,
            "confidence": 0.9,
            "quality_metrics": { "bytes": size },
            "created_at": now
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct WeatherRequest {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub rainfall_probability: f64,
    pub humidity: f64,
}

async fn ingest_weather(Json(input): Json<WeatherRequest>) -> (StatusCode, Json<Value>) {
    let weather_id = format!("weather-{}", Uuid::new_v4());
    info!(%weather_id, "weather ingested");
    (
        StatusCode::CREATED,
        Json(json!({
            "weather_id": weather_id,
            "timestamp": input.timestamp,
            "temperature": input.temperature,
            "rainfall_probability": input.rainfall_probability,
            "humidity": input.humidity,
            "source": "manual",
            "created_at": Utc::now()
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct PickupRequest {
    pub location_id: String,
    pub scheduled_time: DateTime<Utc>,
    pub service_type: String,
}

async fn ingest_pickup_schedule(
    Json(input): Json<PickupRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    find_location(&input.location_id)?;
    let pickup_id = format!("pickup-{}", Uuid::new_v4());
    info!(%pickup_id, location_id = %input.location_id, "pickup scheduled");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "pickup_id": pickup_id,
            "location_id": input.location_id,
            "scheduled_time": input.scheduled_time,
            "missed": false,
            "service_type": input.service_type,
            "created_at": Utc::now()
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_status_filter() {
        let executions = fixtures::executions();
        assert!(execution_matches(&executions[0], "completed"));
        assert!(!execution_matches(&executions[0], "active"));
        assert!(execution_matches(&executions[1], "active"));
        assert!(execution_matches(&executions[1], "pending"));
        assert!(!execution_matches(&executions[1], "approved"));
    }

    #[test]
    fn prediction_query_combines_filters() {
        let predictions = fixtures::predictions();
        let query = PredictionQuery {
            location_id: Some("loc-001".to_string()),
            min_probability: Some(0.9),
            ..Default::default()
        };
        let ids: Vec<&Value> = predictions
            .iter()
            .filter(|p| query.matches(p))
            .map(|p| &p["prediction_id"])
            .collect();
        assert_eq!(ids, vec!["pred-002"]);
    }

    #[test]
    fn horizons_parse_comma_separated() {
        assert_eq!(parse_horizons("6, 12,24").unwrap(), vec![6, 12, 24]);
        assert!(parse_horizons("6,soon").is_err());
    }

    #[test]
    fn payment_decision_rejects_unknown_values() {
        let result: Result<PaymentRequest, _> =
            serde_json::from_str(r#"{"execution_id":"exec-001","decision":"maybe"}"#);
        assert!(result.is_err());
    }
}
