//! FingerprintStore - Time-windowed Detection Dedup
//!
//! ## Responsibilities
//!
//! - Derive a fingerprint ("same physical sighting") from a detection event
//! - Remember recorded fingerprints for the dedup window
//! - Lazy eviction before every duplicate check (no timer task)
//!
//! Not synchronized on its own: the AlertDecider owns it behind the shared
//! decision lock.

use crate::models::DetectionEvent;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fmt::{self, Write};

/// Digest of frame size, rounded box coordinates and minute bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a detection event
    ///
    /// Material: `{w}x{h}_{x1},{y1},{x2},{y2};..._{YYYYMMDDHHMM}`, boxes in
    /// detector order, time bucket taken from the event timestamp.
    pub fn from_event(event: &DetectionEvent) -> Self {
        let mut material = format!("{}x{}_", event.frame_width, event.frame_height);
        for b in event.boxes() {
            let _ = write!(
                material,
                "{},{},{},{};",
                b.x1.round() as i64,
                b.y1.round() as i64,
                b.x2.round() as i64,
                b.y2.round() as i64
            );
        }
        let _ = write!(material, "_{}", event.timestamp.format("%Y%m%d%H%M"));

        let mut hasher = Sha1::new();
        hasher.update(material.as_bytes());
        let digest = hasher.finalize();

        Self(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recently accepted fingerprints with their record time
pub struct FingerprintStore {
    entries: HashMap<Fingerprint, DateTime<Utc>>,
    window: Duration,
}

impl FingerprintStore {
    /// Create new FingerprintStore with the given dedup window
    pub fn new(window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            window,
        }
    }

    /// Record a fingerprint as seen at `now`
    pub fn record(&mut self, fingerprint: Fingerprint, now: DateTime<Utc>) {
        self.entries.insert(fingerprint, now);
    }

    /// True iff an equal fingerprint was recorded less than one window ago
    pub fn is_duplicate(&mut self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        self.evict_expired(now);

        match self.entries.get(fingerprint) {
            Some(recorded_at) => now.signed_duration_since(*recorded_at) < self.window,
            None => false,
        }
    }

    /// Drop entries older than the window
    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        let before = self.entries.len();
        let window = self.window;
        self.entries
            .retain(|_, recorded_at| now.signed_duration_since(*recorded_at) <= window);

        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::trace!(evicted = evicted, live = self.entries.len(), "Evicted fingerprints");
        }
    }

    /// Number of live entries (including any not yet lazily evicted)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
