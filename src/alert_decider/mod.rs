//! AlertDecider - Dedup / Cooldown / Upload Decision
//!
//! ## Responsibilities
//!
//! - Turn a detection event into DUPLICATE, COOLDOWN_BLOCKED or ACCEPTED
//! - Split ACCEPTED into DELIVERED or DEFERRED by the upload throttle
//! - Keep the three gate components consistent under concurrent producers
//!
//! ## Design
//!
//! - Evaluation order: fingerprint dedup, then cooldown, then upload throttle
//! - One mutex guards FingerprintStore, CooldownGate and UploadThrottle, so
//!   every check-and-record sequence is atomic
//! - No I/O and no errors on the decision path

mod types;

pub use types::*;

use crate::cooldown_gate::CooldownGate;
use crate::fingerprint_store::{Fingerprint, FingerprintStore};
use crate::models::DetectionEvent;
use crate::upload_throttle::UploadThrottle;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

/// Gate components guarded together
struct DeciderState {
    fingerprints: FingerprintStore,
    cooldown: CooldownGate,
    upload: UploadThrottle,
}

impl DeciderState {
    fn new(policy: &DeciderPolicy) -> Self {
        Self {
            fingerprints: FingerprintStore::new(policy.dedup_window),
            cooldown: CooldownGate::new(policy.alert_cooldown),
            upload: UploadThrottle::new(policy.upload_interval),
        }
    }

    fn evaluate(
        &mut self,
        camera_id: &str,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Verdict {
        // 1. Same sighting seen recently
        if self.fingerprints.is_duplicate(fingerprint, now) {
            return Verdict::Duplicate;
        }

        // 2. Camera still cooling down
        if !self.cooldown.can_alert(camera_id, now) {
            return Verdict::CooldownBlocked {
                remaining: self.cooldown.remaining(camera_id, now),
            };
        }

        // 3. Accept
        self.fingerprints.record(fingerprint.clone(), now);
        self.cooldown.record_alert(camera_id, now);

        // 4. Deliver or defer
        if self.upload.can_alert(camera_id, now) {
            self.upload.record_alert(camera_id, now);
            Verdict::Accepted(Delivery::Delivered)
        } else {
            Verdict::Accepted(Delivery::Deferred {
                remaining: self.upload.remaining(camera_id, now),
            })
        }
    }
}

/// AlertDecider instance (shared by capture loops and HTTP producers)
pub struct AlertDecider {
    policy: DeciderPolicy,
    state: Mutex<DeciderState>,
}

impl AlertDecider {
    /// Create new AlertDecider
    pub fn new(policy: DeciderPolicy) -> Self {
        Self {
            state: Mutex::new(DeciderState::new(&policy)),
            policy,
        }
    }

    pub fn policy(&self) -> &DeciderPolicy {
        &self.policy
    }

    /// Decide what happens to a detection event observed at `now`
    pub async fn decide(&self, event: &DetectionEvent, now: DateTime<Utc>) -> AlertDecision {
        let fingerprint = Fingerprint::from_event(event);

        let verdict = {
            let mut state = self.state.lock().await;
            state.evaluate(&event.camera_id, &fingerprint, now)
        };

        match verdict {
            Verdict::Duplicate => {
                tracing::debug!(
                    camera_id = %event.camera_id,
                    fingerprint = %fingerprint,
                    "Duplicate sighting suppressed"
                );
            }
            Verdict::CooldownBlocked { remaining } => {
                tracing::info!(
                    camera_id = %event.camera_id,
                    remaining_secs = remaining.as_secs_f64(),
                    "Detection observed but alert cooldown active"
                );
            }
            Verdict::Accepted(delivery) => {
                tracing::info!(
                    camera_id = %event.camera_id,
                    fingerprint = %fingerprint,
                    confidence = event.max_confidence(),
                    boxes = event.boxes().len(),
                    delivered = matches!(delivery, Delivery::Delivered),
                    "Alert accepted"
                );
            }
        }

        AlertDecision {
            camera_id: event.camera_id.clone(),
            fingerprint,
            decided_at: now,
            verdict,
        }
    }

    /// Gate state for each camera
    pub async fn status(&self, camera_ids: &[String], now: DateTime<Utc>) -> Vec<CameraGateStatus> {
        let state = self.state.lock().await;

        camera_ids
            .iter()
            .map(|camera_id| {
                let cooldown_remaining = state.cooldown.remaining(camera_id, now);
                CameraGateStatus {
                    camera_id: camera_id.clone(),
                    cooldown_active: !cooldown_remaining.is_zero(),
                    cooldown_remaining_secs: cooldown_remaining.as_secs_f64(),
                    last_alert_at: state.cooldown.last_alert_at(camera_id),
                    upload_remaining_secs: state.upload.remaining(camera_id, now).as_secs_f64(),
                    last_upload_at: state.upload.last_upload_at(camera_id),
                }
            })
            .collect()
    }

    /// Clear cooldown and upload state for a camera (ops override)
    pub async fn reset_camera(&self, camera_id: &str) {
        let mut state = self.state.lock().await;
        state.cooldown.reset(camera_id);
        state.upload.reset(camera_id);
        tracing::info!(camera_id = %camera_id, "Alert gates reset");
    }

    /// Number of fingerprints currently held
    pub async fn fingerprint_count(&self) -> usize {
        self.state.lock().await.fingerprints.len()
    }
}

impl Default for AlertDecider {
    fn default() -> Self {
        Self::new(DeciderPolicy::default())
    }
}
