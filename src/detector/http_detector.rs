//! HTTP inference-server adapter

use super::{Detector, DetectorOutput};
use crate::error::{Error, Result};
use crate::frame_source::Frame;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Detector backed by a remote inference server
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetector {
    /// Create new HttpDetector with the default timeout
    pub fn new(base_url: String) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn infer(&self, frame: &Frame) -> Result<DetectorOutput> {
        let url = format!("{}/v1/detect", self.base_url);

        let form = Form::new()
            .part(
                "infer_image",
                Part::bytes(frame.jpeg.clone())
                    .file_name("snapshot.jpg")
                    .mime_str("image/jpeg")?,
            )
            .text("camera_id", frame.camera_id.clone())
            .text("captured_at", frame.captured_at.to_rfc3339());

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Detector(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Detector(format!(
                "inference failed: {}",
                resp.status()
            )));
        }

        let output: DetectorOutput = resp
            .json()
            .await
            .map_err(|e| Error::Detector(format!("invalid response: {}", e)))?;

        tracing::trace!(
            camera_id = %frame.camera_id,
            detections = output.detections.len(),
            "Inference complete"
        );

        Ok(output)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
