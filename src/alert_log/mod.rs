//! AlertLog - Accepted Alert Records (Ring Buffer)
//!
//! ## Responsibilities
//!
//! - Keep every accepted alert (delivered or deferred) in memory
//! - Provide latest / per-camera queries for the API

use crate::models::AlertRecord;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Alert record plus local bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedAlert {
    pub alert_id: u64,
    pub delivered: bool,
    #[serde(flatten)]
    pub record: AlertRecord,
}

struct AlertRingBuffer {
    alerts: VecDeque<LoggedAlert>,
    capacity: usize,
    next_id: u64,
}

impl AlertRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    fn push(&mut self, record: AlertRecord, delivered: bool) -> u64 {
        let alert_id = self.next_id;
        self.next_id += 1;

        if self.alerts.len() >= self.capacity {
            self.alerts.pop_front();
        }
        self.alerts.push_back(LoggedAlert {
            alert_id,
            delivered,
            record,
        });
        alert_id
    }

    fn latest(&self, count: usize) -> Vec<LoggedAlert> {
        self.alerts.iter().rev().take(count).cloned().collect()
    }

    fn by_camera(&self, camera_id: &str, count: usize) -> Vec<LoggedAlert> {
        self.alerts
            .iter()
            .rev()
            .filter(|a| a.record.camera_id == camera_id)
            .take(count)
            .cloned()
            .collect()
    }
}

/// AlertLog instance
pub struct AlertLog {
    buffer: RwLock<AlertRingBuffer>,
}

impl AlertLog {
    /// Create new AlertLog
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(AlertRingBuffer::new(capacity.max(1))),
        }
    }

    /// Append an accepted alert, returning its id
    pub async fn add(&self, record: AlertRecord, delivered: bool) -> u64 {
        let mut buffer = self.buffer.write().await;
        let id = buffer.push(record, delivered);
        tracing::debug!(alert_id = id, delivered, "Alert added to log");
        id
    }

    /// Newest first
    pub async fn get_latest(&self, count: usize) -> Vec<LoggedAlert> {
        self.buffer.read().await.latest(count)
    }

    pub async fn get_by_camera(&self, camera_id: &str, count: usize) -> Vec<LoggedAlert> {
        self.buffer.read().await.by_camera(camera_id, count)
    }

    /// Records currently held
    pub async fn count(&self) -> usize {
        self.buffer.read().await.alerts.len()
    }

    /// Records added since start, including evicted ones
    pub async fn total(&self) -> u64 {
        self.buffer.read().await.next_id - 1
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(1000)
    }
}
