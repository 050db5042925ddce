//! Detector - Object Detection Port and Target Filter
//!
//! ## Responsibilities
//!
//! - Define the detector port (frame in, scored boxes out)
//! - HTTP inference-server adapter
//! - Keep only target-class boxes above the confidence threshold

mod http_detector;

pub use http_detector::HttpDetector;

use crate::error::Result;
use crate::frame_source::Frame;
use crate::models::{DetectionBox, DetectionEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One box as reported by the model (any class)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub label: String,
}

/// Detector result for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorOutput {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// Object detection port
#[async_trait]
pub trait Detector: Send + Sync {
    async fn infer(&self, frame: &Frame) -> Result<DetectorOutput>;

    /// Whether the backing model is reachable
    async fn health_check(&self) -> bool {
        true
    }
}

/// Target-class and confidence filter
#[derive(Debug, Clone)]
pub struct TargetFilter {
    target_class: String,
    threshold: f32,
}

impl TargetFilter {
    pub fn new(target_class: impl Into<String>, threshold: f32) -> Self {
        Self {
            target_class: target_class.into(),
            threshold,
        }
    }

    /// Case-insensitive class match, strictly above threshold
    pub fn matches(&self, detection: &RawDetection) -> bool {
        detection.label.eq_ignore_ascii_case(&self.target_class)
            && detection.confidence > self.threshold
    }

    /// Build a DetectionEvent from the matching boxes, or `None` if none match
    pub fn to_event(
        &self,
        camera_id: &str,
        timestamp: DateTime<Utc>,
        frame_width: u32,
        frame_height: u32,
        detections: &[RawDetection],
    ) -> Option<DetectionEvent> {
        let boxes: Vec<DetectionBox> = detections
            .iter()
            .filter(|d| self.matches(d))
            .map(|d| DetectionBox {
                x1: d.x1,
                y1: d.y1,
                x2: d.x2,
                y2: d.y2,
                confidence: d.confidence,
                class_label: d.label.clone(),
            })
            .collect();

        DetectionEvent::new(camera_id, timestamp, frame_width, frame_height, boxes).ok()
    }
}
