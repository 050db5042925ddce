//! API Routes

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::alert_decider::{CameraGateStatus, Delivery, Verdict};
use crate::error::{Error, Result};
use crate::frame_source::Frame;
use crate::models::ApiResponse;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/", get(super::service_status))
        .route("/healthz", get(super::health_check))
        // Alerts
        .route("/api/alerts", get(list_alerts))
        // Cameras
        .route("/api/cameras/:id/detections", post(submit_detections))
        .route("/api/cameras/:id/cooldown", get(get_cooldown))
        .route("/api/cameras/:id/cooldown/reset", post(reset_cooldown))
        .with_state(state)
}

// ========================================
// Alert Handlers
// ========================================

#[derive(Deserialize)]
struct AlertQuery {
    limit: Option<usize>,
    camera_id: Option<String>,
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(100);

    let alerts = if let Some(camera_id) = query.camera_id {
        state.alert_log.get_by_camera(&camera_id, limit).await
    } else {
        state.alert_log.get_latest(limit).await
    };

    Json(ApiResponse::success(alerts))
}

// ========================================
// Live Detection Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct SubmitDetectionsRequest {
    /// JPEG frame, plain base64 or a `data:` URL
    image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitDetectionsResponse {
    camera_id: String,
    /// Boxes the detector reported, any class
    detections: usize,
    /// False when nothing passed the target-class filter
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_seconds: Option<f64>,
}

fn decode_image(encoded: &str) -> Result<Vec<u8>> {
    let payload = match encoded.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Validation(format!("image_base64 is not valid base64: {}", e)))
}

async fn submit_detections(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
    Json(req): Json<SubmitDetectionsRequest>,
) -> Result<Json<ApiResponse<SubmitDetectionsResponse>>> {
    if state.config.camera(&camera_id).is_none() {
        return Err(Error::NotFound(format!("Camera {} not found", camera_id)));
    }

    let encoded = req
        .image_base64
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::Validation("image_base64 is required".to_string()))?;
    let jpeg = decode_image(encoded)?;
    if jpeg.is_empty() {
        return Err(Error::Validation("image_base64 decodes to no data".to_string()));
    }

    let frame = Frame {
        camera_id,
        jpeg,
        captured_at: Utc::now(),
    };
    let output = state.detector.infer(&frame).await?;

    let Frame {
        camera_id,
        jpeg,
        captured_at,
    } = frame;

    let outcome = state
        .pipeline
        .process(
            &camera_id,
            output.width,
            output.height,
            &output.detections,
            Some(jpeg),
            captured_at,
        )
        .await;

    let detections = output.detections.len();
    let response = match outcome {
        None => SubmitDetectionsResponse {
            camera_id,
            detections,
            matched: false,
            verdict: None,
            fingerprint: None,
            remaining_seconds: None,
        },
        Some(outcome) => {
            let remaining = match outcome.decision.verdict {
                Verdict::CooldownBlocked { remaining }
                | Verdict::Accepted(Delivery::Deferred { remaining }) => {
                    Some(remaining.as_secs_f64())
                }
                _ => None,
            };
            SubmitDetectionsResponse {
                camera_id,
                detections,
                matched: true,
                verdict: Some(outcome.decision.verdict.label()),
                fingerprint: Some(outcome.decision.fingerprint.to_string()),
                remaining_seconds: remaining,
            }
        }
    };

    Ok(Json(ApiResponse::success(response)))
}

// ========================================
// Ops Handlers
// ========================================

async fn get_cooldown(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<Json<ApiResponse<CameraGateStatus>>> {
    if state.config.camera(&camera_id).is_none() {
        return Err(Error::NotFound(format!("Camera {} not found", camera_id)));
    }

    state
        .decider
        .status(&[camera_id.clone()], Utc::now())
        .await
        .pop()
        .map(|status| Json(ApiResponse::success(status)))
        .ok_or_else(|| Error::NotFound(format!("Camera {} not found", camera_id)))
}

async fn reset_cooldown(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<impl IntoResponse> {
    if state.config.camera(&camera_id).is_none() {
        return Err(Error::NotFound(format!("Camera {} not found", camera_id)));
    }

    state.decider.reset_camera(&camera_id).await;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "camera_id": camera_id,
        "reset": true,
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert_decider::AlertDecider;
    use crate::alert_log::AlertLog;
    use crate::alert_pipeline::AlertPipeline;
    use crate::delivery_worker::{DeliveryConfig, DeliveryQueue};
    use crate::detector::{Detector, DetectorOutput, RawDetection, TargetFilter};
    use crate::snapshot_writer::SnapshotWriter;
    use crate::state::AppConfig;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Reports one elephant per call, shifted so fingerprints differ
    struct ElephantDetector {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Detector for ElephantDetector {
        async fn infer(&self, frame: &Frame) -> Result<DetectorOutput> {
            assert_eq!(frame.jpeg, vec![1, 2, 3]);
            let x1 = self.calls.fetch_add(1, Ordering::SeqCst) as f32 * 300.0;
            Ok(DetectorOutput {
                width: 1280,
                height: 720,
                detections: vec![
                    RawDetection {
                        x1,
                        y1: 10.0,
                        x2: x1 + 100.0,
                        y2: 200.0,
                        confidence: 0.88,
                        label: "elephant".to_string(),
                    },
                    RawDetection {
                        x1: 0.0,
                        y1: 0.0,
                        x2: 50.0,
                        y2: 50.0,
                        confidence: 0.95,
                        label: "person".to_string(),
                    },
                ],
            })
        }
    }

    struct OfflineDetector;

    #[async_trait]
    impl Detector for OfflineDetector {
        async fn infer(&self, _frame: &Frame) -> Result<DetectorOutput> {
            Err(Error::Detector("offline".to_string()))
        }

        async fn health_check(&self) -> bool {
            false
        }
    }

    struct NullWriter;

    #[async_trait]
    impl SnapshotWriter for NullWriter {
        async fn save(&self, _: &str, jpeg: &[u8], _: DateTime<Utc>) -> Result<String> {
            Ok(format!("/snapshots/{}.jpg", jpeg.len()))
        }
    }

    fn state_with(detector: Arc<dyn Detector>) -> AppState {
        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_POST_API_ROUTE" => Some("http://db/api".to_string()),
            _ => None,
        })
        .unwrap();
        let decider = Arc::new(AlertDecider::new(config.decider_policy()));
        let alert_log = Arc::new(AlertLog::default());
        let pipeline = Arc::new(AlertPipeline::new(
            decider.clone(),
            TargetFilter::new(config.target_class.clone(), config.confidence_threshold),
            Arc::new(NullWriter),
            alert_log.clone(),
            DeliveryQueue::start(Vec::new(), DeliveryConfig::default()),
            config.locations(),
        ));

        AppState {
            config,
            decider,
            pipeline,
            alert_log,
            detector,
            started_at: Instant::now(),
        }
    }

    fn state() -> (AppState, Arc<ElephantDetector>) {
        let detector = Arc::new(ElephantDetector {
            calls: AtomicUsize::new(0),
        });
        (state_with(detector.clone()), detector)
    }

    fn request(image_base64: Option<&str>) -> Json<SubmitDetectionsRequest> {
        Json(SubmitDetectionsRequest {
            image_base64: image_base64.map(str::to_string),
        })
    }

    #[test]
    fn test_decode_image_accepts_data_url() {
        assert_eq!(decode_image("AQID").unwrap(), vec![1, 2, 3]);
        assert_eq!(
            decode_image("data:image/jpeg;base64,AQID").unwrap(),
            vec![1, 2, 3]
        );
        assert!(matches!(decode_image("@@@"), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_submit_runs_detector_then_cooldown() {
        let (state, detector) = state();

        let Json(first) = submit_detections(
            State(state.clone()),
            Path("camera_1".to_string()),
            request(Some("data:image/jpeg;base64,AQID")),
        )
        .await
        .unwrap();
        let first = first.data.unwrap();
        assert_eq!(first.detections, 2);
        assert!(first.matched);
        assert_eq!(first.verdict, Some("DELIVERED"));

        let Json(second) = submit_detections(
            State(state.clone()),
            Path("camera_1".to_string()),
            request(Some("AQID")),
        )
        .await
        .unwrap();
        let second = second.data.unwrap();
        assert_eq!(second.verdict, Some("COOLDOWN_BLOCKED"));
        assert!(second.remaining_seconds.unwrap() > 0.0);

        assert_eq!(detector.calls.load(Ordering::SeqCst), 2);

        // Recording of the accepted alert runs in a spawned task
        tokio::time::timeout(Duration::from_secs(5), async {
            while state.alert_log.count().await < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        let logged = state.alert_log.get_latest(10).await;
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].record.image_reference.as_deref(), Some("/snapshots/3.jpg"));
    }

    #[tokio::test]
    async fn test_submit_requires_image() {
        let (state, detector) = state();

        for body in [None, Some(""), Some("  ")] {
            let err = submit_detections(
                State(state.clone()),
                Path("camera_1".to_string()),
                request(body),
            )
            .await
            .err()
            .unwrap();
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_detector_failure_is_bad_gateway() {
        let state = state_with(Arc::new(OfflineDetector));
        let err = submit_detections(
            State(state.clone()),
            Path("camera_1".to_string()),
            request(Some("AQID")),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let status = state.decider.status(&state.config.camera_ids(), Utc::now()).await;
        assert!(!status[0].cooldown_active);
    }

    #[tokio::test]
    async fn test_unknown_camera_is_not_found() {
        let (state, detector) = state();
        let result = submit_detections(
            State(state),
            Path("camera_9".to_string()),
            request(Some("AQID")),
        )
        .await;
        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_cooldown_reports_one_camera() {
        let (state, _) = state();

        let Json(idle) = get_cooldown(State(state.clone()), Path("camera_1".to_string()))
            .await
            .unwrap();
        let idle = idle.data.unwrap();
        assert_eq!(idle.camera_id, "camera_1");
        assert!(!idle.cooldown_active);

        submit_detections(
            State(state.clone()),
            Path("camera_1".to_string()),
            request(Some("AQID")),
        )
        .await
        .unwrap();

        let Json(active) = get_cooldown(State(state.clone()), Path("camera_1".to_string()))
            .await
            .unwrap();
        let active = active.data.unwrap();
        assert!(active.cooldown_active);
        assert!(active.cooldown_remaining_secs > 0.0);
        assert!(active.last_alert_at.is_some());

        let missing = get_cooldown(State(state), Path("camera_9".to_string())).await;
        assert_eq!(
            missing.err().unwrap().into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_service_status_reports_decider_policy() {
        let (state, _) = state();
        submit_detections(
            State(state.clone()),
            Path("camera_1".to_string()),
            request(Some("AQID")),
        )
        .await
        .unwrap();

        let Json(status) = super::super::service_status(State(state)).await;
        assert_eq!(status.active_cameras, 1);
        assert_eq!(status.alert_cooldown_seconds, 20);
        assert_eq!(status.upload_interval_seconds, 10);
        assert!(status.cooldown_status["camera_1"].cooldown_active);
    }

    #[tokio::test]
    async fn test_reset_cooldown_clears_gate() {
        let (state, _) = state();
        submit_detections(
            State(state.clone()),
            Path("camera_1".to_string()),
            request(Some("AQID")),
        )
        .await
        .unwrap();

        let reset = reset_cooldown(State(state.clone()), Path("camera_1".to_string())).await;
        assert!(reset.is_ok());

        let status = state.decider.status(&state.config.camera_ids(), Utc::now()).await;
        assert!(!status[0].cooldown_active);
        assert!(status[0].last_alert_at.is_none());
    }
}
