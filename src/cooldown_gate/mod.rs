//! CooldownGate - Per-camera Alert Spacing
//!
//! ## Responsibilities
//!
//! - Track the last accepted alert per camera
//! - Answer "may this camera alert now" by comparing stored timestamps
//! - Report remaining cooldown for status display
//!
//! No timers: re-arming is a pure time comparison in `can_alert`.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Per-camera cooldown state
pub struct CooldownGate {
    /// camera_id -> last_alert_at
    last_alert: HashMap<String, DateTime<Utc>>,
    cooldown: Duration,
}

impl CooldownGate {
    /// Create new CooldownGate
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_alert: HashMap::new(),
            cooldown,
        }
    }

    /// True if the camera never alerted or its cooldown has fully elapsed
    pub fn can_alert(&self, camera_id: &str, now: DateTime<Utc>) -> bool {
        match self.last_alert.get(camera_id) {
            Some(last) => now.signed_duration_since(*last) >= self.cooldown,
            None => true,
        }
    }

    /// Record an alert for the camera at `now`
    pub fn record_alert(&mut self, camera_id: &str, now: DateTime<Utc>) {
        self.last_alert.insert(camera_id.to_string(), now);
    }

    /// Time left until the camera may alert again (zero if it may alert now)
    pub fn remaining(&self, camera_id: &str, now: DateTime<Utc>) -> std::time::Duration {
        match self.last_alert.get(camera_id) {
            Some(last) => {
                let left = self.cooldown - now.signed_duration_since(*last);
                // Negative deltas fail to_std
                left.to_std().unwrap_or(std::time::Duration::ZERO)
            }
            None => std::time::Duration::ZERO,
        }
    }

    /// Forget the camera's last alert
    pub fn reset(&mut self, camera_id: &str) {
        if self.last_alert.remove(camera_id).is_some() {
            tracing::info!(camera_id = %camera_id, "Cooldown reset");
        }
    }

    /// Last recorded alert time for the camera
    pub fn last_alert_at(&self, camera_id: &str) -> Option<DateTime<Utc>> {
        self.last_alert.get(camera_id).copied()
    }
}
