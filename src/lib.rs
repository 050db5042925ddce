//! Elephant Camserver Library
//!
//! Camera monitoring with elephant detection alerts
//!
//! ## Architecture
//!
//! 1. FingerprintStore - Time-windowed sighting dedup
//! 2. CooldownGate - Per-camera alert cooldown
//! 3. UploadThrottle - Per-camera delivery rate limit
//! 4. AlertDecider - Dedup / cooldown / upload decision under one lock
//! 5. Detector - Inference port and target-class filter
//! 6. FrameSource - Camera frame acquisition
//! 7. SnapshotWriter - Alert image persistence and image host upload
//! 8. AlertSink - Database webhook, chat and push relays
//! 9. DeliveryWorker - Bounded queue and worker pool for sinks
//! 10. AlertLog - Accepted alerts (ring buffer)
//! 11. AlertPipeline - Detections to recorded and delivered alerts
//! 12. CaptureOrchestrator - Per-camera capture loops
//! 13. WebAPI - REST API endpoints
//!
//! ## Design Principles
//!
//! - The decision path does no I/O and never fails
//! - All external collaborators sit behind traits

pub mod alert_decider;
pub mod alert_log;
pub mod alert_pipeline;
pub mod alert_sink;
pub mod capture_orchestrator;
pub mod cooldown_gate;
pub mod delivery_worker;
pub mod detector;
pub mod fingerprint_store;
pub mod frame_source;
pub mod snapshot_writer;
pub mod upload_throttle;
pub mod web_api;

pub mod error;
pub mod models;
pub mod state;
