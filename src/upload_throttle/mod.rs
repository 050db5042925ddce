//! UploadThrottle - Per-camera Delivery Spacing
//!
//! Same shape as CooldownGate, separate state and interval. Consulted only
//! for the delivery step: an accepted alert is always logged locally, the
//! throttle only decides whether external sinks are called this time.

use crate::cooldown_gate::CooldownGate;
use chrono::{DateTime, Duration, Utc};

/// Per-camera upload state
pub struct UploadThrottle {
    gate: CooldownGate,
}

impl UploadThrottle {
    /// Create new UploadThrottle
    pub fn new(interval: Duration) -> Self {
        Self {
            gate: CooldownGate::new(interval),
        }
    }

    /// True if the camera never uploaded or the interval has elapsed
    pub fn can_alert(&self, camera_id: &str, now: DateTime<Utc>) -> bool {
        self.gate.can_alert(camera_id, now)
    }

    /// Record a delivery for the camera at `now`
    pub fn record_alert(&mut self, camera_id: &str, now: DateTime<Utc>) {
        self.gate.record_alert(camera_id, now);
    }

    /// Time left until the next delivery is allowed
    pub fn remaining(&self, camera_id: &str, now: DateTime<Utc>) -> std::time::Duration {
        self.gate.remaining(camera_id, now)
    }

    /// Forget the camera's last upload
    pub fn reset(&mut self, camera_id: &str) {
        self.gate.reset(camera_id);
    }

    /// Last delivery time for the camera
    pub fn last_upload_at(&self, camera_id: &str) -> Option<DateTime<Utc>> {
        self.gate.last_alert_at(camera_id)
    }
}
