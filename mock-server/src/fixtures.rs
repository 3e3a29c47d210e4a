//! Canned platform data served by the mock backend.
//!
//! Three locations in one ward, each with a priority entry, plus a small
//! set of predictions, executions, images and ingestion records.

use chrono::Utc;
use serde_json::{json, Value};

pub const WARD_ID: &str = "ward-001";

pub fn locations() -> Vec<Value> {
    vec![
        location("loc-001", 77.5946, 12.9716, 3, "street_corner", "MG Road Junction"),
        location("loc-002", 77.6012, 12.9698, 2, "market", "Brigade Road Market"),
        location("loc-003", 77.5850, 12.9750, 1, "residential", "Indiranagar 12th Main"),
    ]
}

fn location(id: &str, lon: f64, lat: f64, area_weight: u8, kind: &str, name: &str) -> Value {
    json!({
        "location_id": id,
        "ward_id": WARD_ID,
        "geometry": { "type": "Point", "coordinates": [lon, lat] },
        "area_weight": area_weight,
        "location_type": kind,
        "metadata": { "name": name },
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

/// Predictions are stamped with the current time on every call.
pub fn predictions() -> Vec<Value> {
    let now = Utc::now().to_rfc3339();
    [
        ("pred-001", "loc-001", 6, 0.85, "high"),
        ("pred-002", "loc-001", 12, 0.92, "high"),
        ("pred-003", "loc-002", 6, 0.45, "medium"),
    ]
    .into_iter()
    .map(|(id, location_id, horizon, probability, confidence)| {
        json!({
            "prediction_id": id,
            "location_id": location_id,
            "prediction_timestamp": now,
            "horizon_hours": horizon,
            "overflow_probability": probability,
            "confidence_level": confidence,
            "features": {},
            "model_version": "v1.0.0",
            "created_at": now
        })
    })
    .collect()
}

pub fn priority_queue() -> Vec<Value> {
    let locations = locations();
    let predictions = predictions();
    vec![
        json!({
            "location_id": "loc-001",
            "location": locations[0],
            "priority_score": 2.55,
            "tier": "Critical",
            "overflow_probability": 0.85,
            "area_weight": 3,
            "failure_history_factor": 1.0,
            "response_time_recommendation": "Immediate dispatch - within 6 hours",
            "latest_prediction": predictions[0]
        }),
        json!({
            "location_id": "loc-002",
            "location": locations[1],
            "priority_score": 1.8,
            "tier": "High",
            "overflow_probability": 0.45,
            "area_weight": 2,
            "failure_history_factor": 2.0,
            "response_time_recommendation": "Schedule within 24 hours",
            "latest_prediction": predictions[2]
        }),
        json!({
            "location_id": "loc-003",
            "location": locations[2],
            "priority_score": 0.8,
            "tier": "Low",
            "overflow_probability": 0.2,
            "area_weight": 1,
            "failure_history_factor": 4.0,
            "response_time_recommendation": "Regular schedule"
        }),
    ]
}

pub fn executions() -> Vec<Value> {
    vec![
        json!({
            "execution_id": "exec-001",
            "location_id": "loc-001",
            "dispatch_time": "2024-01-15T10:00:00Z",
            "completion_time": "2024-01-15T12:00:00Z",
            "before_image_id": "img-001",
            "after_image_id": "img-002",
            "before_score": 0.85,
            "after_score": 0.15,
            "quality_score": 0.82,
            "payment_recommendation": "release",
            "payment_status": "pending",
            "notes": "Cleanup completed successfully",
            "created_at": "2024-01-15T10:00:00Z"
        }),
        json!({
            "execution_id": "exec-002",
            "location_id": "loc-002",
            "dispatch_time": "2024-01-15T14:00:00Z",
            "before_image_id": "img-003",
            "before_score": 0.65,
            "payment_status": "pending",
            "notes": "In progress",
            "created_at": "2024-01-15T14:00:00Z"
        }),
    ]
}

pub fn images() -> Vec<Value> {
    vec![
        json!({
            "image_id": "img-001",
            "location_id": "loc-001",
            "timestamp": "2024-01-15T09:00:00Z",
            "image_url": "/mock-images/before-001.jpg",
            "severity_score": 0.85,
            "confidence": 0.92,
            "quality_metrics": { "resolution": "1920x1080", "brightness": 0.7 },
            "manual_label": "overflow",
            "created_at": "2024-01-15T09:00:00Z"
        }),
        json!({
            "image_id": "img-002",
            "location_id": "loc-001",
            "timestamp": "2024-01-15T12:00:00Z",
            "image_url": "/mock-images/after-001.jpg",
            "severity_score": 0.15,
            "confidence": 0.95,
            "quality_metrics": { "resolution": "1920x1080", "brightness": 0.75 },
            "manual_label": "clean",
            "created_at": "2024-01-15T12:00:00Z"
        }),
    ]
}

pub fn map_data(ward_id: &str) -> Value {
    let images = images();
    let severities = [0.85, 0.45, 0.2];
    let trends = ["increasing", "stable", "decreasing"];
    let locations: Vec<Value> = locations()
        .into_iter()
        .filter(|l| l["ward_id"] == ward_id)
        .enumerate()
        .map(|(idx, mut location)| {
            location["current_severity"] = json!(severities[idx]);
            location["severity_trend"] = json!(trends[idx]);
            if let Some(image) = images.get(idx) {
                location["latest_image"] = image.clone();
            }
            location
        })
        .collect();
    json!({ "locations": locations })
}

pub fn signals(location_id: &str) -> Value {
    json!({
        "location_id": location_id,
        "rolling_average_7d": 0.65,
        "trend_slope": 0.05,
        "accumulation_rate": 0.08,
        "decay_pattern": -0.15
    })
}

pub fn audit_logs() -> Vec<Value> {
    let now = Utc::now().to_rfc3339();
    vec![
        json!({
            "audit_id": "audit-001",
            "timestamp": now,
            "source": "street_camera",
            "data_type": "image",
            "operation": "ingest",
            "quality_metrics": { "resolution": "1920x1080" },
            "user_id": "system"
        }),
        json!({
            "audit_id": "audit-002",
            "timestamp": now,
            "source": "weather_api",
            "data_type": "weather",
            "operation": "ingest",
            "quality_metrics": { "api_response_time": 150 },
            "user_id": "system"
        }),
    ]
}

pub fn system_health() -> Value {
    json!({
        "status": "healthy",
        "services": {
            "database": { "status": "up", "response_time": 5 },
            "redis": { "status": "up", "response_time": 2 },
            "minio": { "status": "up", "response_time": 8 },
            "signal_engine": { "status": "up", "response_time": 150 },
            "prediction_engine": { "status": "up", "response_time": 200 }
        },
        "timestamp": Utc::now().to_rfc3339()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_priority_item_references_a_known_location() {
        let ids: Vec<Value> = locations().into_iter().map(|l| l["location_id"].clone()).collect();
        for item in priority_queue() {
            assert!(ids.contains(&item["location_id"]));
            assert_eq!(item["location"]["location_id"], item["location_id"]);
        }
    }

    #[test]
    fn map_data_only_covers_requested_ward() {
        assert_eq!(map_data(WARD_ID)["locations"].as_array().unwrap().len(), 3);
        assert!(map_data("ward-999")["locations"].as_array().unwrap().is_empty());
    }
}
