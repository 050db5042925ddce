//! DeliveryWorker - Background Alert Delivery
//!
//! ## Responsibilities
//!
//! - Bounded job queue between the alert pipeline and the sinks
//! - Worker pool calling every sink for each job
//! - Per-sink timeout; failures logged, never retried
//!
//! A full queue drops the job with a warning so producers never block.

use crate::alert_sink::AlertSink;
use crate::models::AlertRecord;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use uuid::Uuid;

/// One delivery job
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub job_id: Uuid,
    pub record: AlertRecord,
}

/// Worker pool settings
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub sink_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
            sink_timeout: Duration::from_secs(10),
        }
    }
}

/// Producer handle to the delivery workers
#[derive(Clone)]
pub struct DeliveryQueue {
    tx: mpsc::Sender<DeliveryJob>,
}

impl DeliveryQueue {
    /// Spawn the worker pool and return the queue handle
    pub fn start(sinks: Vec<Arc<dyn AlertSink>>, config: DeliveryConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let sinks = Arc::new(sinks);
        let workers = config.workers.max(1);

        for worker_id in 0..workers {
            let rx = rx.clone();
            let sinks = sinks.clone();
            let sink_timeout = config.sink_timeout;

            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };

                    match job {
                        Some(job) => deliver(&sinks, &job, sink_timeout).await,
                        None => break,
                    }
                }
                tracing::debug!(worker_id, "Delivery worker stopped");
            });
        }

        tracing::info!(
            workers,
            queue_capacity = config.queue_capacity,
            sinks = sinks.len(),
            "Delivery workers started"
        );

        Self { tx }
    }

    /// Hand an alert to the workers; returns false if it was dropped
    pub fn enqueue(&self, record: AlertRecord) -> bool {
        let job = DeliveryJob {
            job_id: Uuid::new_v4(),
            record,
        };
        let job_id = job.job_id;
        let camera_id = job.record.camera_id.clone();

        match self.tx.try_send(job) {
            Ok(()) => {
                tracing::debug!(job_id = %job_id, camera_id = %camera_id, "Delivery queued");
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    job_id = %job_id,
                    camera_id = %camera_id,
                    "Delivery queue full, alert dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::error!(
                    job_id = %job_id,
                    camera_id = %camera_id,
                    "Delivery workers gone, alert dropped"
                );
                false
            }
        }
    }

    /// Jobs waiting for a worker
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Call every sink concurrently for one job
async fn deliver(sinks: &[Arc<dyn AlertSink>], job: &DeliveryJob, sink_timeout: Duration) {
    let calls = sinks.iter().map(|sink| async move {
        match tokio::time::timeout(sink_timeout, sink.send(&job.record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(
                    job_id = %job.job_id,
                    camera_id = %job.record.camera_id,
                    sink = sink.name(),
                    error = %e,
                    "Alert delivery failed"
                );
            }
            Err(_) => {
                tracing::error!(
                    job_id = %job.job_id,
                    camera_id = %job.record.camera_id,
                    sink = sink.name(),
                    timeout_secs = sink_timeout.as_secs_f64(),
                    "Alert delivery timed out"
                );
            }
        }
    });

    join_all(calls).await;
}
