//! Shared data models

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert type tag carried by every alert payload
pub const ALERT_TYPE: &str = "elephant_detection";

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub detector_connected: bool,
}

/// One scored, axis-aligned box of the target class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_label: String,
}

/// Target-class boxes found in one processed frame
///
/// Always holds at least one box; use [`DetectionEvent::new`].
#[derive(Debug, Clone, Serialize)]
pub struct DetectionEvent {
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    pub frame_width: u32,
    pub frame_height: u32,
    boxes: Vec<DetectionBox>,
}

impl DetectionEvent {
    /// Create new DetectionEvent, rejecting an empty box list
    pub fn new(
        camera_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        frame_width: u32,
        frame_height: u32,
        boxes: Vec<DetectionBox>,
    ) -> Result<Self> {
        if boxes.is_empty() {
            return Err(Error::Validation(
                "detection event requires at least one box".to_string(),
            ));
        }

        Ok(Self {
            camera_id: camera_id.into(),
            timestamp,
            frame_width,
            frame_height,
            boxes,
        })
    }

    /// Boxes in detector order
    pub fn boxes(&self) -> &[DetectionBox] {
        &self.boxes
    }

    /// Highest confidence across all boxes
    pub fn max_confidence(&self) -> f32 {
        self.boxes
            .iter()
            .map(|b| b.confidence)
            .fold(0.0_f32, f32::max)
    }

    /// Class label of the event (boxes are pre-filtered to one class)
    pub fn detected_class(&self) -> &str {
        &self.boxes[0].class_label
    }
}

/// Alert payload handed to delivery sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub camera_id: String,
    pub location: String,
    pub detected_class: String,
    pub message: String,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
    pub image_reference: Option<String>,
}

impl AlertRecord {
    /// Build the alert payload for an accepted detection event
    pub fn from_event(
        event: &DetectionEvent,
        location: &str,
        image_reference: Option<String>,
    ) -> Self {
        let confidence = event.max_confidence();
        let detected_class = event.detected_class().to_lowercase();

        Self {
            alert_type: ALERT_TYPE.to_string(),
            camera_id: event.camera_id.clone(),
            location: location.to_string(),
            message: format!(
                "{} detected with {:.1}% confidence!",
                capitalize(&detected_class),
                confidence * 100.0
            ),
            detected_class,
            confidence,
            timestamp: event.timestamp,
            image_reference,
        }
    }
}

/// Uppercase the first character ("elephant" -> "Elephant")
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
