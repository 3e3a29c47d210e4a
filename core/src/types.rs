//! Domain DTOs for the CaaS backend API.
//!
//! # Design
//! These types mirror the backend's JSON schema but are defined independently
//! of the mock-server crate, which serves plain fixture JSON. Integration
//! tests against the mock server catch any schema drift between the two.
//!
//! Optional wire fields are `Option` and skipped when serializing so request
//! payloads only carry what the caller set.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// GeoJSON point; `coordinates` is `[longitude, latitude]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

/// A monitored street location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub location_id: String,
    pub ward_id: String,
    pub geometry: Geometry,
    /// 1 (low footfall) to 3 (high footfall).
    pub area_weight: u8,
    pub location_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// Human-readable name stored under `metadata.name`, if any.
    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("name")?.as_str()
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ManualLabel {
    Clean,
    Moderate,
    Overflow,
}

/// A street image with its model-assigned severity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    pub image_id: String,
    pub location_id: String,
    pub timestamp: DateTime<Utc>,
    pub image_url: String,
    pub severity_score: f64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_metrics: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_label: Option<ManualLabel>,
    pub created_at: DateTime<Utc>,
}

/// Multipart upload payload for `POST /ingest/image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub location_id: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub timestamp: Option<String>,
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// An overflow forecast for one location and horizon (6, 12 or 24 hours).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub prediction_id: String,
    pub location_id: String,
    pub prediction_timestamp: DateTime<Utc>,
    pub horizon_hours: u32,
    pub overflow_probability: f64,
    pub confidence_level: ConfidenceLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<serde_json::Value>,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}

/// Query filters for `GET /predictions`. Unset fields are not sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PredictionFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<ConfidenceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_probability: Option<f64>,
}

impl PredictionFilters {
    /// Overlay every field set in `other` onto `self`.
    pub fn merge(&mut self, other: PredictionFilters) {
        if other.confidence_level.is_some() {
            self.confidence_level = other.confidence_level;
        }
        if other.horizon_hours.is_some() {
            self.horizon_hours = other.horizon_hours;
        }
        if other.location_id.is_some() {
            self.location_id = other.location_id;
        }
        if other.min_probability.is_some() {
            self.min_probability = other.min_probability;
        }
    }
}

// ---------------------------------------------------------------------------
// Priority queue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PriorityTier {
    Critical,
    High,
    Medium,
    Low,
}

impl PriorityTier {
    /// Map a priority score onto its dispatch tier.
    pub fn from_score(score: f64) -> Self {
        if score >= 2.0 {
            PriorityTier::Critical
        } else if score >= 1.5 {
            PriorityTier::High
        } else if score >= 1.0 {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Critical => "Critical",
            PriorityTier::High => "High",
            PriorityTier::Medium => "Medium",
            PriorityTier::Low => "Low",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the ranked cleanup queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorityItem {
    pub location_id: String,
    pub location: Location,
    pub priority_score: f64,
    pub tier: PriorityTier,
    pub overflow_probability: f64,
    pub area_weight: u8,
    pub failure_history_factor: f64,
    pub response_time_recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_prediction: Option<Prediction>,
}

// ---------------------------------------------------------------------------
// Executions and payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRecommendation {
    Release,
    Partial,
    Hold,
}

impl PaymentRecommendation {
    /// Recommend a payment outcome from a cleanup quality score.
    pub fn from_quality(quality_score: f64) -> Self {
        if quality_score >= 0.80 {
            PaymentRecommendation::Release
        } else if quality_score >= 0.50 {
            PaymentRecommendation::Partial
        } else {
            PaymentRecommendation::Hold
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

/// A dispatched cleanup job. `completion_time` is unset while in progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Execution {
    pub execution_id: String,
    pub location_id: String,
    pub dispatch_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
    pub before_image_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_image_id: Option<String>,
    pub before_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_recommendation: Option<PaymentRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Execution {
    pub fn is_completed(&self) -> bool {
        self.completion_time.is_some()
    }
}

/// Request payload for `POST /cleanup/dispatch`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchCleanup {
    pub location_id: String,
    pub priority_tier: PriorityTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Request payload for `POST /cleanup/verify`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyCleanup {
    pub execution_id: String,
    pub after_image_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationResult {
    pub execution_id: String,
    pub after_image_id: String,
    #[serde(default)]
    pub quality_score: Option<f64>,
    pub verification_status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentDecision {
    Approve,
    Reject,
}

/// Request payload for `POST /payment/approve`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovePayment {
    pub execution_id: String,
    pub decision: PaymentDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentDecisionResult {
    pub execution_id: String,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Weather {
    pub weather_id: String,
    pub timestamp: DateTime<Utc>,
    /// Celsius.
    pub temperature: f64,
    pub rainfall_probability: f64,
    /// Percent, 0-100.
    pub humidity: f64,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Request payload for `POST /ingest/weather`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherReading {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub rainfall_probability: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pickup {
    pub pickup_id: String,
    pub location_id: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<DateTime<Utc>>,
    pub missed: bool,
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for `POST /ingest/pickup_schedule`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PickupSchedule {
    pub location_id: String,
    pub scheduled_time: DateTime<Utc>,
    pub service_type: String,
}

// ---------------------------------------------------------------------------
// Dashboard read models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTrend {
    Increasing,
    Stable,
    Decreasing,
}

/// A location enriched with its current severity for the map view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapLocation {
    #[serde(flatten)]
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_severity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_trend: Option<SeverityTrend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_image: Option<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapData {
    pub locations: Vec<MapLocation>,
}

/// Derived signal features for one location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signals {
    pub location_id: String,
    pub rolling_average_7d: f64,
    pub trend_slope: f64,
    pub accumulation_rate: f64,
    pub decay_pattern: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub audit_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub data_type: String,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_metrics: Option<serde_json::Value>,
    pub user_id: String,
}

/// Query filters for `GET /audit-logs`. Unset fields are not sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditLogFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceHealth {
    pub status: String,
    /// Milliseconds.
    pub response_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemHealth {
    pub status: String,
    pub services: BTreeMap<String, ServiceHealth>,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Severity bands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityBand {
    Low,
    Medium,
    High,
    Critical,
}

/// Bucket a 0-1 severity score for color coding.
pub fn severity_band(score: f64) -> SeverityBand {
    if score >= 0.75 {
        SeverityBand::Critical
    } else if score >= 0.50 {
        SeverityBand::High
    } else if score >= 0.25 {
        SeverityBand::Medium
    } else {
        SeverityBand::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_name_reads_metadata() {
        let location: Location = serde_json::from_value(serde_json::json!({
            "location_id": "loc-001",
            "ward_id": "ward-001",
            "geometry": { "type": "Point", "coordinates": [77.5946, 12.9716] },
            "area_weight": 3,
            "location_type": "street_corner",
            "metadata": { "name": "MG Road Junction" },
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(location.name(), Some("MG Road Junction"));
        assert_eq!(location.geometry.kind, "Point");
    }

    #[test]
    fn priority_tier_thresholds() {
        assert_eq!(PriorityTier::from_score(2.55), PriorityTier::Critical);
        assert_eq!(PriorityTier::from_score(2.0), PriorityTier::Critical);
        assert_eq!(PriorityTier::from_score(1.8), PriorityTier::High);
        assert_eq!(PriorityTier::from_score(1.0), PriorityTier::Medium);
        assert_eq!(PriorityTier::from_score(0.8), PriorityTier::Low);
    }

    #[test]
    fn payment_recommendation_thresholds() {
        assert_eq!(PaymentRecommendation::from_quality(0.82), PaymentRecommendation::Release);
        assert_eq!(PaymentRecommendation::from_quality(0.5), PaymentRecommendation::Partial);
        assert_eq!(PaymentRecommendation::from_quality(0.1), PaymentRecommendation::Hold);
    }

    #[test]
    fn severity_bands() {
        assert_eq!(severity_band(0.2), SeverityBand::Low);
        assert_eq!(severity_band(0.45), SeverityBand::Medium);
        assert_eq!(severity_band(0.5), SeverityBand::High);
        assert_eq!(severity_band(0.85), SeverityBand::Critical);
    }

    #[test]
    fn dispatch_cleanup_omits_missing_notes() {
        let body = serde_json::to_value(DispatchCleanup {
            location_id: "loc-001".to_string(),
            priority_tier: PriorityTier::Critical,
            notes: None,
        })
        .unwrap();
        assert_eq!(body["priority_tier"], "Critical");
        assert!(body.get("notes").is_none());
    }

    #[test]
    fn prediction_filters_merge_overlays_set_fields() {
        let mut filters = PredictionFilters {
            confidence_level: Some(ConfidenceLevel::High),
            horizon_hours: Some(6),
            ..Default::default()
        };
        filters.merge(PredictionFilters {
            horizon_hours: Some(12),
            min_probability: Some(0.5),
            ..Default::default()
        });
        assert_eq!(filters.confidence_level, Some(ConfidenceLevel::High));
        assert_eq!(filters.horizon_hours, Some(12));
        assert_eq!(filters.min_probability, Some(0.5));
    }

    #[test]
    fn execution_without_completion_is_active() {
        let execution: Execution = serde_json::from_value(serde_json::json!({
            "execution_id": "exec-002",
            "location_id": "loc-002",
            "dispatch_time": "2024-01-15T14:00:00Z",
            "before_image_id": "img-003",
            "before_score": 0.65,
            "payment_status": "pending",
            "notes": "In progress",
            "created_at": "2024-01-15T14:00:00Z"
        }))
        .unwrap();
        assert!(!execution.is_completed());
        assert_eq!(execution.payment_status, Some(PaymentStatus::Pending));
    }
}
