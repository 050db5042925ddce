//! CaptureOrchestrator - Per-Camera Capture Loops
//!
//! ## Responsibilities
//!
//! - One long-running loop per camera with a frame source
//! - Run the detector on every Nth frame
//! - Feed detections into the AlertPipeline
//!
//! Errors inside a loop are logged and the loop keeps going; a source
//! returning `None` ends that camera's loop.

use crate::alert_pipeline::AlertPipeline;
use crate::detector::Detector;
use crate::frame_source::{Frame, FrameSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Capture loop timing
#[derive(Debug, Clone, Copy)]
pub struct CaptureSettings {
    pub process_every_n_frames: u32,
    pub frame_interval: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            process_every_n_frames: 5,
            frame_interval: Duration::from_millis(100),
        }
    }
}

/// One camera with its frame source
#[derive(Clone)]
pub struct CaptureTarget {
    pub camera_id: String,
    pub source: Arc<dyn FrameSource>,
}

/// CaptureOrchestrator instance
pub struct CaptureOrchestrator {
    detector: Arc<dyn Detector>,
    pipeline: Arc<AlertPipeline>,
    settings: CaptureSettings,
    running: Arc<RwLock<bool>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CaptureOrchestrator {
    /// Create new CaptureOrchestrator
    pub fn new(
        detector: Arc<dyn Detector>,
        pipeline: Arc<AlertPipeline>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            detector,
            pipeline,
            settings,
            running: Arc::new(RwLock::new(false)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start one capture loop per target
    pub async fn start(&self, targets: Vec<CaptureTarget>) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Capture already running");
                return;
            }
            *running = true;
        }

        tracing::info!(cameras = targets.len(), "Starting capture orchestrator");

        let mut tasks = self.tasks.lock().await;
        for target in targets {
            let detector = self.detector.clone();
            let pipeline = self.pipeline.clone();
            let running = self.running.clone();
            let settings = self.settings;

            tasks.push(tokio::spawn(async move {
                Self::capture_loop(target, detector, pipeline, settings, running).await;
            }));
        }
    }

    /// Stop all capture loops after their current frame
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping capture orchestrator");
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Wait for every capture loop to exit
    pub async fn join(&self) {
        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Capture task panicked");
            }
        }
    }

    async fn capture_loop(
        target: CaptureTarget,
        detector: Arc<dyn Detector>,
        pipeline: Arc<AlertPipeline>,
        settings: CaptureSettings,
        running: Arc<RwLock<bool>>,
    ) {
        let camera_id = target.camera_id.clone();
        let every_n = u64::from(settings.process_every_n_frames.max(1));
        let mut frame_count: u64 = 0;

        tracing::info!(camera_id = %camera_id, every_n, "Capture loop started");

        loop {
            {
                let is_running = running.read().await;
                if !*is_running {
                    break;
                }
            }

            match target.source.next_frame().await {
                Ok(Some(frame)) => {
                    frame_count += 1;
                    if frame_count % every_n == 0 {
                        Self::process_frame(frame, detector.as_ref(), &pipeline).await;
                    }
                }
                Ok(None) => {
                    tracing::info!(camera_id = %camera_id, "Frame source exhausted");
                    break;
                }
                Err(e) => {
                    tracing::warn!(camera_id = %camera_id, error = %e, "Frame read failed");
                }
            }

            tokio::time::sleep(settings.frame_interval).await;
        }

        tracing::info!(camera_id = %camera_id, frames = frame_count, "Capture loop stopped");
    }

    async fn process_frame(frame: Frame, detector: &dyn Detector, pipeline: &Arc<AlertPipeline>) {
        let output = match detector.infer(&frame).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(camera_id = %frame.camera_id, error = %e, "Inference failed");
                return;
            }
        };

        let Frame {
            camera_id,
            jpeg,
            captured_at,
        } = frame;

        if let Some(outcome) = pipeline
            .process(
                &camera_id,
                output.width,
                output.height,
                &output.detections,
                Some(jpeg),
                captured_at,
            )
            .await
        {
            tracing::debug!(
                camera_id = %camera_id,
                verdict = outcome.decision.verdict.label(),
                "Frame processed"
            );
        }
    }
}
