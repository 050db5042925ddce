//! AlertDecider types

use crate::fingerprint_store::Fingerprint;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Windows and intervals driving the decision
#[derive(Debug, Clone, Copy)]
pub struct DeciderPolicy {
    /// How long a fingerprint suppresses an identical sighting
    pub dedup_window: Duration,
    /// Minimum spacing between accepted alerts per camera
    pub alert_cooldown: Duration,
    /// Minimum spacing between external deliveries per camera
    pub upload_interval: Duration,
}

impl Default for DeciderPolicy {
    fn default() -> Self {
        Self {
            dedup_window: Duration::seconds(10),
            alert_cooldown: Duration::seconds(20),
            upload_interval: Duration::seconds(10),
        }
    }
}

/// Delivery outcome of an accepted alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Upload slot taken; sinks are called
    Delivered,
    /// Upload throttled; local record only
    Deferred { remaining: std::time::Duration },
}

/// Terminal state of one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Duplicate,
    CooldownBlocked { remaining: std::time::Duration },
    Accepted(Delivery),
}

impl Verdict {
    /// Wire label for logs and API responses
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Duplicate => "DUPLICATE",
            Verdict::CooldownBlocked { .. } => "COOLDOWN_BLOCKED",
            Verdict::Accepted(Delivery::Delivered) => "DELIVERED",
            Verdict::Accepted(Delivery::Deferred { .. }) => "DEFERRED",
        }
    }
}

/// Decision for one detection event
#[derive(Debug, Clone)]
pub struct AlertDecision {
    pub camera_id: String,
    pub fingerprint: Fingerprint,
    pub decided_at: DateTime<Utc>,
    pub verdict: Verdict,
}

impl AlertDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted(_))
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted(Delivery::Delivered))
    }
}

/// Per-camera gate state for status endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraGateStatus {
    pub camera_id: String,
    pub cooldown_active: bool,
    pub cooldown_remaining_secs: f64,
    pub last_alert_at: Option<DateTime<Utc>>,
    pub upload_remaining_secs: f64,
    pub last_upload_at: Option<DateTime<Utc>>,
}
