use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use common::geocode;
use service::sensors::{self, ProximityStatus, RadiationHistory, RadiationReading, ALERT_ACTIONS, SAFETY_TIPS};

use crate::errors::JsonApiError;
use crate::state::AppState;

pub async fn current_radiation() -> Json<RadiationReading> {
    let reading = sensors::current_radiation(&mut rand::thread_rng(), Utc::now());
    info!(level = reading.radiation_level, status = ?reading.status, "radiation reading");
    Json(reading)
}

pub async fn radiation_history() -> Json<RadiationHistory> {
    Json(sensors::radiation_history(&mut rand::thread_rng(), Utc::now()))
}

pub async fn proximity_status() -> Json<ProximityStatus> {
    Json(sensors::proximity_status(&mut rand::thread_rng()))
}

pub async fn proximity_alert() -> Json<Value> {
    info!("proximity alert triggered");
    Json(json!({
        "success": true,
        "message": "Proximity safety alert activated",
        "alert_type": "manual_test",
        "actions": ALERT_ACTIONS,
        "safety_tips": SAFETY_TIPS,
        "timestamp": Utc::now(),
    }))
}

pub async fn system_status(State(state): State<AppState>) -> Json<Value> {
    let uptime = Utc::now() - state.started_at;
    let database = if state.store.is_degraded() { "degraded" } else { "connected" };
    Json(json!({
        "system": "Phone Safety Monitor",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "components": {
            "backend_api": { "status": "running" },
            "database": { "status": database, "type": "json-file", "location": state.store.location() },
            "radiation_sensor": { "status": "active", "mode": "simulation" },
            "proximity_sensor": { "status": "active", "mode": "simulation" },
        },
        "uptime_secs": uptime.num_seconds(),
        "last_updated": Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub location: Option<String>,
}

/// Geocode `location`, then attach a simulated radiation level for it.
pub async fn search_radiation(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, JsonApiError> {
    let location = params
        .location
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| JsonApiError::bad_request("Location parameter is required"))?;

    let coords = geocode::lookup(&state.http, &state.geocoder_url, &location)
        .await?
        .ok_or_else(|| JsonApiError::not_found("Location"))?;
    let radiation = sensors::location_radiation(coords.latitude, coords.longitude, Utc::now());

    Ok(Json(json!({
        "location": location,
        "coordinates": coords,
        "radiation": radiation,
    })))
}
