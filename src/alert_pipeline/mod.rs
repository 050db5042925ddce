//! AlertPipeline - Detections to Alerts
//!
//! ## Responsibilities
//!
//! - Filter raw detections down to a target-class DetectionEvent
//! - Ask the AlertDecider for a verdict
//! - For ACCEPTED alerts: save the snapshot, enqueue delivery when the
//!   verdict is DELIVERED, then append to the AlertLog with the handoff result
//!
//! The decision is returned immediately; recording runs in a spawned task.

use crate::alert_decider::{AlertDecider, AlertDecision};
use crate::alert_log::AlertLog;
use crate::delivery_worker::DeliveryQueue;
use crate::detector::{RawDetection, TargetFilter};
use crate::models::{AlertRecord, DetectionEvent};
use crate::snapshot_writer::SnapshotWriter;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Location used for cameras missing from the configuration
const UNKNOWN_LOCATION: &str = "Unknown";

/// Result of processing one frame's detections
#[derive(Debug)]
pub struct ProcessOutcome {
    pub decision: AlertDecision,
    /// Snapshot/log/delivery task for accepted alerts (yields the alert id)
    pub recording: Option<JoinHandle<u64>>,
}

/// AlertPipeline instance
pub struct AlertPipeline {
    decider: Arc<AlertDecider>,
    filter: TargetFilter,
    snapshot_writer: Arc<dyn SnapshotWriter>,
    alert_log: Arc<AlertLog>,
    delivery: DeliveryQueue,
    locations: HashMap<String, String>,
}

impl AlertPipeline {
    /// Create new AlertPipeline
    pub fn new(
        decider: Arc<AlertDecider>,
        filter: TargetFilter,
        snapshot_writer: Arc<dyn SnapshotWriter>,
        alert_log: Arc<AlertLog>,
        delivery: DeliveryQueue,
        locations: HashMap<String, String>,
    ) -> Self {
        Self {
            decider,
            filter,
            snapshot_writer,
            alert_log,
            delivery,
            locations,
        }
    }

    pub fn location(&self, camera_id: &str) -> &str {
        self.locations
            .get(camera_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LOCATION)
    }

    /// Run one frame's detections through filter and decider
    ///
    /// `captured_at` is the frame capture time: it is the event timestamp
    /// and the decision clock. Returns `None` when no detection passes the
    /// target filter.
    pub async fn process(
        self: &Arc<Self>,
        camera_id: &str,
        frame_width: u32,
        frame_height: u32,
        detections: &[RawDetection],
        jpeg: Option<Vec<u8>>,
        captured_at: DateTime<Utc>,
    ) -> Option<ProcessOutcome> {
        let event = self
            .filter
            .to_event(camera_id, captured_at, frame_width, frame_height, detections)?;

        let decision = self.decider.decide(&event, captured_at).await;

        let recording = if decision.is_accepted() {
            let pipeline = Arc::clone(self);
            let delivered = decision.is_delivered();
            Some(tokio::spawn(async move {
                pipeline.record_accepted(event, jpeg, delivered).await
            }))
        } else {
            None
        };

        Some(ProcessOutcome {
            decision,
            recording,
        })
    }

    /// Snapshot, enqueue (if delivered) and log an accepted alert
    ///
    /// The log's `delivered` flag is true only if the job reached the
    /// delivery queue.
    async fn record_accepted(
        &self,
        event: DetectionEvent,
        jpeg: Option<Vec<u8>>,
        delivered: bool,
    ) -> u64 {
        let image_reference = match jpeg {
            Some(jpeg) => match self
                .snapshot_writer
                .save(&event.camera_id, &jpeg, event.timestamp)
                .await
            {
                Ok(reference) => Some(reference),
                Err(e) => {
                    tracing::error!(
                        camera_id = %event.camera_id,
                        error = %e,
                        "Failed to save alert snapshot"
                    );
                    None
                }
            },
            None => {
                tracing::warn!(camera_id = %event.camera_id, "Accepted alert has no frame image");
                None
            }
        };

        let record = AlertRecord::from_event(&event, self.location(&event.camera_id), image_reference);
        let handed_off = delivered && self.delivery.enqueue(record.clone());
        let alert_id = self.alert_log.add(record, handed_off).await;

        if !delivered {
            tracing::info!(
                camera_id = %event.camera_id,
                alert_id,
                "Alert recorded locally, upload deferred"
            );
        } else if !handed_off {
            tracing::warn!(
                camera_id = %event.camera_id,
                alert_id,
                "Alert recorded locally, delivery dropped"
            );
        }

        alert_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert_decider::{DeciderPolicy, Verdict};
    use crate::alert_sink::AlertSink;
    use crate::delivery_worker::DeliveryConfig;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use tokio::sync::mpsc;

    struct ChannelSink {
        tx: mpsc::UnboundedSender<AlertRecord>,
    }

    #[async_trait]
    impl AlertSink for ChannelSink {
        fn name(&self) -> &str {
            "channel"
        }

        async fn send(&self, record: &AlertRecord) -> Result<()> {
            let _ = self.tx.send(record.clone());
            Ok(())
        }
    }

    struct MemorySnapshotWriter {
        fail: bool,
    }

    #[async_trait]
    impl SnapshotWriter for MemorySnapshotWriter {
        async fn save(
            &self,
            camera_id: &str,
            _jpeg: &[u8],
            captured_at: DateTime<Utc>,
        ) -> Result<String> {
            if self.fail {
                return Err(Error::Snapshot("disk full".to_string()));
            }
            Ok(format!(
                "/snapshots/elephant_{}_{}.jpg",
                camera_id,
                captured_at.timestamp_micros()
            ))
        }
    }

    struct Harness {
        pipeline: Arc<AlertPipeline>,
        alert_log: Arc<AlertLog>,
        sent: mpsc::UnboundedReceiver<AlertRecord>,
    }

    /// Signals when a call starts, then never finishes
    struct HangingSink {
        started: mpsc::UnboundedSender<()>,
    }

    #[async_trait]
    impl AlertSink for HangingSink {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn send(&self, _record: &AlertRecord) -> Result<()> {
            let _ = self.started.send(());
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn harness(fail_snapshots: bool) -> Harness {
        let (tx, sent) = mpsc::unbounded_channel();
        let delivery = DeliveryQueue::start(
            vec![Arc::new(ChannelSink { tx }) as Arc<dyn AlertSink>],
            DeliveryConfig::default(),
        );
        harness_with(delivery, sent, fail_snapshots)
    }

    fn harness_with(
        delivery: DeliveryQueue,
        sent: mpsc::UnboundedReceiver<AlertRecord>,
        fail_snapshots: bool,
    ) -> Harness {
        let alert_log = Arc::new(AlertLog::default());
        let decider = Arc::new(AlertDecider::new(DeciderPolicy {
            dedup_window: Duration::seconds(10),
            alert_cooldown: Duration::seconds(5),
            upload_interval: Duration::seconds(10),
        }));
        let locations = HashMap::from([("cam1".to_string(), "Main Entrance".to_string())]);

        let pipeline = Arc::new(AlertPipeline::new(
            decider,
            TargetFilter::new("elephant", 0.7),
            Arc::new(MemorySnapshotWriter {
                fail: fail_snapshots,
            }),
            alert_log.clone(),
            delivery,
            locations,
        ));

        Harness {
            pipeline,
            alert_log,
            sent,
        }
    }

    fn elephant(x1: f32, confidence: f32) -> RawDetection {
        RawDetection {
            x1,
            y1: 50.0,
            x2: x1 + 200.0,
            y2: 400.0,
            confidence,
            label: "elephant".to_string(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 6, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_no_target_detection_returns_none() {
        let h = harness(false);
        let person = RawDetection {
            label: "person".to_string(),
            ..elephant(0.0, 0.99)
        };
        let outcome = h
            .pipeline
            .process("cam1", 640, 480, &[person, elephant(0.0, 0.5)], None, t0())
            .await;
        assert!(outcome.is_none());
        assert_eq!(h.alert_log.count().await, 0);
    }

    #[tokio::test]
    async fn test_delivered_alert_logged_and_sent() {
        let mut h = harness(false);
        let outcome = h
            .pipeline
            .process("cam1", 640, 480, &[elephant(10.0, 0.9)], Some(vec![1, 2, 3]), t0())
            .await
            .unwrap();
        assert!(outcome.decision.is_delivered());
        let alert_id = outcome.recording.unwrap().await.unwrap();
        assert_eq!(alert_id, 1);

        let sent = tokio::time::timeout(std::time::Duration::from_secs(2), h.sent.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sent.location, "Main Entrance");
        assert_eq!(sent.message, "Elephant detected with 90.0% confidence!");
        assert!(sent.image_reference.unwrap().starts_with("/snapshots/elephant_cam1_"));

        let logged = h.alert_log.get_latest(1).await;
        assert!(logged[0].delivered);
    }

    #[tokio::test]
    async fn test_deferred_alert_logged_but_not_sent() {
        let mut h = harness(false);
        let first = h
            .pipeline
            .process("cam1", 640, 480, &[elephant(10.0, 0.9)], Some(vec![1]), t0())
            .await
            .unwrap();
        first.recording.unwrap().await.unwrap();
        h.sent.recv().await.unwrap();

        let t6 = t0() + Duration::seconds(6);
        let second = h
            .pipeline
            .process("cam1", 640, 480, &[elephant(300.0, 0.8)], Some(vec![1]), t6)
            .await
            .unwrap();
        assert_eq!(second.decision.verdict.label(), "DEFERRED");
        second.recording.unwrap().await.unwrap();

        assert_eq!(h.alert_log.count().await, 2);
        assert!(!h.alert_log.get_latest(1).await[0].delivered);

        let nothing =
            tokio::time::timeout(std::time::Duration::from_millis(100), h.sent.recv()).await;
        assert!(nothing.is_err(), "deferred alert must not reach a sink");
    }

    #[tokio::test]
    async fn test_suppressed_verdicts_record_nothing() {
        let h = harness(false);
        let first = h
            .pipeline
            .process("cam1", 640, 480, &[elephant(10.0, 0.9)], None, t0())
            .await
            .unwrap();
        first.recording.unwrap().await.unwrap();

        let t1 = t0() + Duration::seconds(1);
        let dup = h
            .pipeline
            .process("cam1", 640, 480, &[elephant(10.0, 0.9)], None, t1)
            .await
            .unwrap();
        assert_eq!(dup.decision.verdict, Verdict::Duplicate);
        assert!(dup.recording.is_none());

        let blocked = h
            .pipeline
            .process("cam1", 640, 480, &[elephant(500.0, 0.9)], None, t1)
            .await
            .unwrap();
        assert!(matches!(blocked.decision.verdict, Verdict::CooldownBlocked { .. }));
        assert!(blocked.recording.is_none());

        assert_eq!(h.alert_log.count().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_failure_keeps_alert() {
        let mut h = harness(true);
        let outcome = h
            .pipeline
            .process("cam1", 640, 480, &[elephant(10.0, 0.9)], Some(vec![1]), t0())
            .await
            .unwrap();
        outcome.recording.unwrap().await.unwrap();

        let logged = h.alert_log.get_latest(1).await;
        assert!(logged[0].record.image_reference.is_none());
        let sent = h.sent.recv().await.unwrap();
        assert!(sent.image_reference.is_none());
    }

    #[tokio::test]
    async fn test_dropped_delivery_logged_as_not_delivered() {
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let delivery = DeliveryQueue::start(
            vec![Arc::new(HangingSink { started: started_tx }) as Arc<dyn AlertSink>],
            DeliveryConfig {
                workers: 1,
                queue_capacity: 1,
                sink_timeout: std::time::Duration::from_secs(60),
            },
        );
        let (_unused_tx, sent) = mpsc::unbounded_channel();
        let h = harness_with(delivery, sent, false);

        for (i, camera_id) in ["cam1", "cam2", "cam3", "cam4"].iter().enumerate() {
            let x1 = 10.0 + 100.0 * i as f32;
            let outcome = h
                .pipeline
                .process(camera_id, 640, 480, &[elephant(x1, 0.9)], None, t0())
                .await
                .unwrap();
            assert!(outcome.decision.is_delivered());
            outcome.recording.unwrap().await.unwrap();

            if i == 0 {
                // Worker now holds the first job; the queue has one free slot
                tokio::time::timeout(std::time::Duration::from_secs(2), started_rx.recv())
                    .await
                    .unwrap();
            }
        }

        let logged = h.alert_log.get_latest(10).await;
        assert_eq!(logged.len(), 4);
        let delivered: Vec<&str> = logged
            .iter()
            .filter(|a| a.delivered)
            .map(|a| a.record.camera_id.as_str())
            .collect();
        assert_eq!(delivered, vec!["cam2", "cam1"]);
    }
}
