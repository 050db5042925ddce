//! Application state
//!
//! Configuration loading and the shared components handed to handlers

use crate::alert_decider::{AlertDecider, DeciderPolicy};
use crate::alert_log::AlertLog;
use crate::alert_pipeline::AlertPipeline;
use crate::capture_orchestrator::CaptureSettings;
use crate::delivery_worker::DeliveryConfig;
use crate::detector::Detector;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One monitored camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub id: String,
    pub location: String,
    /// Still-image URL polled by the capture loop; `None` means live route only
    #[serde(default)]
    pub snapshot_url: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            id: "camera_1".to_string(),
            location: "Main Entrance".to_string(),
            snapshot_url: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database ingestion route (required)
    pub database_post_url: String,
    /// Chat bot relay route
    pub chat_relay_url: Option<String>,
    /// Push notification relay route
    pub push_relay_url: Option<String>,
    /// Inference server URL
    pub detector_url: String,
    /// Alert snapshot directory (served under /snapshots)
    pub snapshot_dir: PathBuf,
    /// Image host API key; unset keeps local snapshot references
    pub imgbb_api_key: Option<String>,
    /// Image host upload endpoint
    pub image_host_url: String,
    pub target_class: String,
    pub confidence_threshold: f32,
    pub dedup_window_secs: u64,
    pub alert_cooldown_secs: u64,
    pub upload_interval_secs: u64,
    pub sink_timeout_secs: u64,
    /// Per-request timeout of camera snapshot fetches
    pub capture_timeout_secs: u64,
    pub process_every_n_frames: u32,
    pub frame_interval_ms: u64,
    pub delivery_workers: usize,
    pub delivery_queue_capacity: usize,
    pub alert_log_capacity: usize,
    pub cameras: Vec<CameraConfig>,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_post_url = get("DATABASE_POST_API_ROUTE").ok_or_else(|| {
            Error::Config("DATABASE_POST_API_ROUTE environment variable is not set".to_string())
        })?;

        let cameras = match get("CAMERAS") {
            Some(raw) => parse_cameras(&raw)?,
            None => vec![CameraConfig::default()],
        };

        let config = Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 8000)?,
            database_post_url,
            chat_relay_url: get("TELEGRAM_BOT_MESSAGE_API_ROUTE"),
            push_relay_url: get("NOTIFICATIONS_API_ROUTE"),
            detector_url: get("DETECTOR_URL")
                .unwrap_or_else(|| "http://localhost:9000".to_string()),
            snapshot_dir: get("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("snapshots")),
            imgbb_api_key: get("IMGBB_API_KEY"),
            image_host_url: get("IMAGE_HOST_URL")
                .unwrap_or_else(|| "https://api.imgbb.com/1/upload".to_string()),
            target_class: get("TARGET_CLASS").unwrap_or_else(|| "elephant".to_string()),
            confidence_threshold: parse_or(&get, "CONFIDENCE_THRESHOLD", 0.7)?,
            dedup_window_secs: parse_or(&get, "DEDUP_WINDOW_SECS", 10)?,
            alert_cooldown_secs: parse_or(&get, "ALERT_COOLDOWN_SECS", 20)?,
            upload_interval_secs: parse_or(&get, "UPLOAD_INTERVAL_SECS", 10)?,
            sink_timeout_secs: parse_or(&get, "SINK_TIMEOUT_SECS", 10)?,
            capture_timeout_secs: parse_or(&get, "CAPTURE_TIMEOUT_SECS", 5)?,
            process_every_n_frames: parse_or(&get, "PROCESS_EVERY_N_FRAMES", 5)?,
            frame_interval_ms: parse_or(&get, "FRAME_INTERVAL_MS", 100)?,
            delivery_workers: parse_or(&get, "DELIVERY_WORKERS", 2)?,
            delivery_queue_capacity: parse_or(&get, "DELIVERY_QUEUE_CAPACITY", 64)?,
            alert_log_capacity: parse_or(&get, "ALERT_LOG_CAPACITY", 1000)?,
            cameras,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config(format!(
                "CONFIDENCE_THRESHOLD must be within 0..=1, got {}",
                self.confidence_threshold
            )));
        }
        if self.process_every_n_frames == 0 {
            return Err(Error::Config(
                "PROCESS_EVERY_N_FRAMES must be at least 1".to_string(),
            ));
        }
        if self.delivery_workers == 0 || self.delivery_queue_capacity == 0 {
            return Err(Error::Config(
                "DELIVERY_WORKERS and DELIVERY_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.cameras.is_empty() {
            return Err(Error::Config("CAMERAS must list at least one camera".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for camera in &self.cameras {
            if !seen.insert(camera.id.as_str()) {
                return Err(Error::Config(format!("duplicate camera id: {}", camera.id)));
            }
        }
        Ok(())
    }

    pub fn decider_policy(&self) -> DeciderPolicy {
        DeciderPolicy {
            dedup_window: secs(self.dedup_window_secs),
            alert_cooldown: secs(self.alert_cooldown_secs),
            upload_interval: secs(self.upload_interval_secs),
        }
    }

    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            workers: self.delivery_workers,
            queue_capacity: self.delivery_queue_capacity,
            sink_timeout: Duration::from_secs(self.sink_timeout_secs),
        }
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            process_every_n_frames: self.process_every_n_frames,
            frame_interval: Duration::from_millis(self.frame_interval_ms),
        }
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }

    pub fn camera_ids(&self) -> Vec<String> {
        self.cameras.iter().map(|c| c.id.clone()).collect()
    }

    /// camera id -> location
    pub fn locations(&self) -> HashMap<String, String> {
        self.cameras
            .iter()
            .map(|c| (c.id.clone(), c.location.clone()))
            .collect()
    }

    pub fn camera(&self, camera_id: &str) -> Option<&CameraConfig> {
        self.cameras.iter().find(|c| c.id == camera_id)
    }
}

fn secs(value: u64) -> chrono::Duration {
    // Clamped to one year
    const MAX_SECS: i64 = 365 * 24 * 3600;
    chrono::Duration::seconds(i64::try_from(value).unwrap_or(MAX_SECS).min(MAX_SECS))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{} has invalid value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_cameras(raw: &str) -> Result<Vec<CameraConfig>> {
    serde_json::from_str(raw).map_err(|e| Error::Config(format!("CAMERAS is not valid JSON: {}", e)))
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// AlertDecider (dedup / cooldown / upload gates)
    pub decider: Arc<AlertDecider>,
    /// AlertPipeline (shared with capture loops)
    pub pipeline: Arc<AlertPipeline>,
    /// AlertLog (in-memory ring buffer)
    pub alert_log: Arc<AlertLog>,
    /// Detector (inference server adapter)
    pub detector: Arc<dyn Detector>,
    /// Process start, for uptime
    pub started_at: Instant,
}
