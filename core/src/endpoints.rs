//! Domain endpoints of the CaaS backend.
//!
//! Each endpoint is a `build_*` method producing the request descriptor and
//! an async method executing it through [`ApiClient::send`]. Only the
//! `build_*` half is exercised by the unit tests below; the integration
//! tests drive the async half against the mock server.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::{query_pairs, HttpMethod, HttpRequest, MultipartField};
use crate::transport::Transport;
use crate::types::{
    ApprovePayment, AuditLogEntry, AuditLogFilters, DispatchCleanup, Execution, Image, ImageUpload,
    Location, MapData, PaymentDecisionResult, Pickup, PickupSchedule, Prediction, PredictionFilters,
    PriorityItem, PriorityTier, Signals, SystemHealth, VerificationResult, VerifyCleanup, Weather,
    WeatherReading,
};

impl<T: Transport> ApiClient<T> {
    // -----------------------------------------------------------------------
    // Locations
    // -----------------------------------------------------------------------

    pub fn build_list_locations(&self, ward_id: Option<&str>) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.endpoint(&["locations"]))
            .with_query(optional_param("ward_id", ward_id))
    }

    pub async fn list_locations(&self, ward_id: Option<&str>) -> Result<Vec<Location>, ApiError> {
        self.send(self.build_list_locations(ward_id)).await
    }

    pub fn build_get_location(&self, location_id: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.endpoint(&["locations", location_id]))
    }

    pub async fn get_location(&self, location_id: &str) -> Result<Location, ApiError> {
        self.send(self.build_get_location(location_id)).await
    }

    // -----------------------------------------------------------------------
    // Predictions and signals
    // -----------------------------------------------------------------------

    pub fn build_list_predictions(
        &self,
        filters: Option<&PredictionFilters>,
    ) -> Result<HttpRequest, ApiError> {
        let query = match filters {
            Some(filters) => query_pairs(filters)?,
            None => Vec::new(),
        };
        Ok(HttpRequest::new(HttpMethod::Get, self.endpoint(&["predictions"])).with_query(query))
    }

    pub async fn list_predictions(
        &self,
        filters: Option<&PredictionFilters>,
    ) -> Result<Vec<Prediction>, ApiError> {
        self.send(self.build_list_predictions(filters)?).await
    }

    /// `horizons` are sent comma-joined, e.g. `horizons=6,12,24`.
    pub fn build_predictions_for_location(
        &self,
        location_id: &str,
        horizons: Option<&[u32]>,
    ) -> HttpRequest {
        let joined = horizons.map(|h| h.iter().map(u32::to_string).collect::<Vec<_>>().join(","));
        HttpRequest::new(HttpMethod::Get, self.endpoint(&["predict", location_id]))
            .with_query(optional_param("horizons", joined.as_deref()))
    }

    pub async fn predictions_for_location(
        &self,
        location_id: &str,
        horizons: Option<&[u32]>,
    ) -> Result<Vec<Prediction>, ApiError> {
        self.send(self.build_predictions_for_location(location_id, horizons))
            .await
    }

    pub fn build_signals(&self, location_id: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.endpoint(&["signals", location_id]))
    }

    pub async fn signals(&self, location_id: &str) -> Result<Signals, ApiError> {
        self.send(self.build_signals(location_id)).await
    }

    // -----------------------------------------------------------------------
    // Priority queue and executions
    // -----------------------------------------------------------------------

    pub fn build_priority_queue(&self, tier: Option<PriorityTier>) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.endpoint(&["priorities"]))
            .with_query(optional_param("tier", tier.as_ref().map(PriorityTier::as_str)))
    }

    pub async fn priority_queue(
        &self,
        tier: Option<PriorityTier>,
    ) -> Result<Vec<PriorityItem>, ApiError> {
        self.send(self.build_priority_queue(tier)).await
    }

    pub fn build_list_executions(&self, status: Option<&str>) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.endpoint(&["executions"]))
            .with_query(optional_param("status", status))
    }

    pub async fn list_executions(&self, status: Option<&str>) -> Result<Vec<Execution>, ApiError> {
        self.send(self.build_list_executions(status)).await
    }

    pub fn build_get_execution(&self, execution_id: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.endpoint(&["executions", execution_id]))
    }

    pub async fn get_execution(&self, execution_id: &str) -> Result<Execution, ApiError> {
        self.send(self.build_get_execution(execution_id)).await
    }

    pub fn build_dispatch_cleanup(&self, input: &DispatchCleanup) -> Result<HttpRequest, ApiError> {
        HttpRequest::new(HttpMethod::Post, self.endpoint(&["cleanup", "dispatch"])).with_json(input)
    }

    pub async fn dispatch_cleanup(&self, input: &DispatchCleanup) -> Result<Execution, ApiError> {
        self.send(self.build_dispatch_cleanup(input)?).await
    }

    pub fn build_verify_cleanup(&self, input: &VerifyCleanup) -> Result<HttpRequest, ApiError> {
        HttpRequest::new(HttpMethod::Post, self.endpoint(&["cleanup", "verify"])).with_json(input)
    }

    pub async fn verify_cleanup(
        &self,
        input: &VerifyCleanup,
    ) -> Result<VerificationResult, ApiError> {
        self.send(self.build_verify_cleanup(input)?).await
    }

    // -----------------------------------------------------------------------
    // Payments
    // -----------------------------------------------------------------------

    pub fn build_approve_payment(&self, input: &ApprovePayment) -> Result<HttpRequest, ApiError> {
        HttpRequest::new(HttpMethod::Post, self.endpoint(&["payment", "approve"])).with_json(input)
    }

    pub async fn approve_payment(
        &self,
        input: &ApprovePayment,
    ) -> Result<PaymentDecisionResult, ApiError> {
        self.send(self.build_approve_payment(input)?).await
    }

    // -----------------------------------------------------------------------
    // Dashboard read models
    // -----------------------------------------------------------------------

    pub fn build_map_data(&self, ward_id: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.endpoint(&["map", ward_id]))
    }

    pub async fn map_data(&self, ward_id: &str) -> Result<MapData, ApiError> {
        self.send(self.build_map_data(ward_id)).await
    }

    pub fn build_audit_logs(
        &self,
        filters: Option<&AuditLogFilters>,
    ) -> Result<HttpRequest, ApiError> {
        let query = match filters {
            Some(filters) => query_pairs(filters)?,
            None => Vec::new(),
        };
        Ok(HttpRequest::new(HttpMethod::Get, self.endpoint(&["audit-logs"])).with_query(query))
    }

    pub async fn audit_logs(
        &self,
        filters: Option<&AuditLogFilters>,
    ) -> Result<Vec<AuditLogEntry>, ApiError> {
        self.send(self.build_audit_logs(filters)?).await
    }

    pub fn build_system_health(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.endpoint(&["health"]))
    }

    pub async fn system_health(&self) -> Result<SystemHealth, ApiError> {
        self.send(self.build_system_health()).await
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    pub fn build_ingest_image(&self, upload: &ImageUpload) -> HttpRequest {
        let mut fields = vec![MultipartField::Text {
            name: "location_id".to_string(),
            value: upload.location_id.clone(),
        }];
        if let Some(timestamp) = &upload.timestamp {
            fields.push(MultipartField::Text {
                name: "timestamp".to_string(),
                value: timestamp.clone(),
            });
        }
        fields.push(MultipartField::File {
            name: "file".to_string(),
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            bytes: upload.bytes.clone(),
        });
        HttpRequest::new(HttpMethod::Post, self.endpoint(&["ingest", "image"]))
            .with_multipart(fields)
    }

    pub async fn ingest_image(&self, upload: &ImageUpload) -> Result<Image, ApiError> {
        self.send(self.build_ingest_image(upload)).await
    }

    pub fn build_ingest_weather(&self, reading: &WeatherReading) -> Result<HttpRequest, ApiError> {
        HttpRequest::new(HttpMethod::Post, self.endpoint(&["ingest", "weather"])).with_json(reading)
    }

    pub async fn ingest_weather(&self, reading: &WeatherReading) -> Result<Weather, ApiError> {
        self.send(self.build_ingest_weather(reading)?).await
    }

    pub fn build_ingest_pickup_schedule(
        &self,
        schedule: &PickupSchedule,
    ) -> Result<HttpRequest, ApiError> {
        HttpRequest::new(HttpMethod::Post, self.endpoint(&["ingest", "pickup_schedule"]))
            .with_json(schedule)
    }

    pub async fn ingest_pickup_schedule(
        &self,
        schedule: &PickupSchedule,
    ) -> Result<Pickup, ApiError> {
        self.send(self.build_ingest_pickup_schedule(schedule)?).await
    }
}

fn optional_param(name: &str, value: Option<&str>) -> Vec<(String, String)> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| vec![(name.to_string(), v.to_string())])
        .unwrap_or_default()
}
