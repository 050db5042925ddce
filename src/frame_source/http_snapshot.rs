//! HTTP snapshot-URL frame source

use super::{Frame, FrameSource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

/// Fetches a still JPEG from a camera snapshot URL on every call
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    camera_id: String,
    snapshot_url: String,
}

impl HttpSnapshotSource {
    /// Create new HttpSnapshotSource
    pub fn new(camera_id: String, snapshot_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            camera_id,
            snapshot_url,
        })
    }
}

#[async_trait]
impl FrameSource for HttpSnapshotSource {
    async fn next_frame(&self) -> Result<Option<Frame>> {
        let resp = self
            .client
            .get(&self.snapshot_url)
            .send()
            .await
            .map_err(|e| Error::FrameSource(format!("{}: {}", self.camera_id, e)))?;

        if !resp.status().is_success() {
            return Err(Error::FrameSource(format!(
                "{}: snapshot request failed: {}",
                self.camera_id,
                resp.status()
            )));
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::FrameSource(format!(
                "{}: empty snapshot body",
                self.camera_id
            )));
        }

        Ok(Some(Frame {
            camera_id: self.camera_id.clone(),
            jpeg: bytes.to_vec(),
            captured_at: Utc::now(),
        }))
    }
}
