//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - Service status with per-camera gate state
//! - Alert listing and live detection submission
//! - Ops override for camera cooldowns

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let detector_ok = state.detector.health_check().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        detector_connected: detector_ok,
    })
}

#[derive(Debug, Serialize)]
pub struct CameraCooldownStatus {
    pub cooldown_active: bool,
    pub remaining_seconds: f64,
    pub last_alert: Option<DateTime<Utc>>,
    pub upload_remaining_seconds: f64,
    pub last_upload: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub message: String,
    pub status: String,
    pub active_cameras: usize,
    pub total_detections: u64,
    pub alert_cooldown_seconds: u64,
    pub upload_interval_seconds: u64,
    pub cooldown_status: BTreeMap<String, CameraCooldownStatus>,
}

/// Service status endpoint
pub async fn service_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    let policy = state.decider.policy();
    let camera_ids = state.config.camera_ids();
    let gates = state.decider.status(&camera_ids, Utc::now()).await;

    let cooldown_status = gates
        .into_iter()
        .map(|g| {
            (
                g.camera_id,
                CameraCooldownStatus {
                    cooldown_active: g.cooldown_active,
                    remaining_seconds: g.cooldown_remaining_secs,
                    last_alert: g.last_alert_at,
                    upload_remaining_seconds: g.upload_remaining_secs,
                    last_upload: g.last_upload_at,
                },
            )
        })
        .collect();

    Json(ServiceStatus {
        message: "Elephant Detection API".to_string(),
        status: "running".to_string(),
        active_cameras: camera_ids.len(),
        total_detections: state.alert_log.total().await,
        alert_cooldown_seconds: whole_secs(policy.alert_cooldown),
        upload_interval_seconds: whole_secs(policy.upload_interval),
        cooldown_status,
    })
}

fn whole_secs(d: chrono::Duration) -> u64 {
    u64::try_from(d.num_seconds()).unwrap_or(0)
}
