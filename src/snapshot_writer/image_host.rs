//! Image host upload on top of a local snapshot writer

use super::SnapshotWriter;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(default)]
    url: String,
}

/// Hosted URL from an upload response body
fn hosted_url(body: &str) -> Result<String> {
    let parsed: UploadResponse = serde_json::from_str(body)?;
    parsed
        .data
        .map(|d| d.url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| Error::Snapshot("image host response has no data.url".to_string()))
}

/// Saves locally, then publishes the frame to an image host
///
/// The hosted URL becomes the image reference. Without an API key, or when
/// the upload fails, the local reference is returned instead.
pub struct ImageHostSnapshotWriter {
    inner: Arc<dyn SnapshotWriter>,
    client: reqwest::Client,
    upload_url: String,
    api_key: Option<String>,
}

impl ImageHostSnapshotWriter {
    /// Create new ImageHostSnapshotWriter
    pub fn new(
        inner: Arc<dyn SnapshotWriter>,
        upload_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            inner,
            client,
            upload_url,
            api_key,
        })
    }

    async fn upload(&self, api_key: &str, camera_id: &str, jpeg: &[u8]) -> Result<String> {
        let form = Form::new().part(
            "image",
            Part::bytes(jpeg.to_vec())
                .file_name(format!("{}.jpg", camera_id))
                .mime_str("image/jpeg")?,
        );

        let resp = self
            .client
            .post(&self.upload_url)
            .query(&[("key", api_key)])
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Snapshot(format!(
                "image host upload failed: {}",
                resp.status()
            )));
        }

        hosted_url(&resp.text().await?)
    }
}

#[async_trait]
impl SnapshotWriter for ImageHostSnapshotWriter {
    async fn save(
        &self,
        camera_id: &str,
        jpeg: &[u8],
        captured_at: DateTime<Utc>,
    ) -> Result<String> {
        let local = self.inner.save(camera_id, jpeg, captured_at).await?;

        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(local);
        };

        match self.upload(api_key, camera_id, jpeg).await {
            Ok(url) => {
                tracing::debug!(camera_id = %camera_id, url = %url, "Snapshot uploaded to image host");
                Ok(url)
            }
            Err(e) => {
                tracing::warn!(
                    camera_id = %camera_id,
                    error = %e,
                    fallback = %local,
                    "Image host upload failed, using local snapshot"
                );
                Ok(local)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LocalWriter;

    #[async_trait]
    impl SnapshotWriter for LocalWriter {
        async fn save(&self, camera_id: &str, _: &[u8], _: DateTime<Utc>) -> Result<String> {
            Ok(format!("/snapshots/elephant_{}.jpg", camera_id))
        }
    }

    fn writer(upload_url: &str, api_key: Option<&str>) -> ImageHostSnapshotWriter {
        ImageHostSnapshotWriter::new(
            Arc::new(LocalWriter),
            upload_url.to_string(),
            api_key.map(str::to_string),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn test_hosted_url_parsing() {
        assert_eq!(
            hosted_url(r#"{"data":{"url":"https://i.ibb.co/abc/cam.jpg"},"success":true}"#)
                .unwrap(),
            "https://i.ibb.co/abc/cam.jpg"
        );
        assert!(matches!(hosted_url(r#"{"data":{}}"#), Err(Error::Snapshot(_))));
        assert!(matches!(hosted_url(r#"{"success":false}"#), Err(Error::Snapshot(_))));
        assert!(matches!(hosted_url("<html>"), Err(Error::Serialization(_))));
    }

    #[tokio::test]
    async fn test_without_key_returns_local_reference() {
        let writer = writer("http://127.0.0.1:9/upload", None);
        let reference = writer.save("camera_1", b"\xff\xd8", Utc::now()).await.unwrap();
        assert_eq!(reference, "/snapshots/elephant_camera_1.jpg");
    }

    #[tokio::test]
    async fn test_upload_failure_falls_back_to_local_reference() {
        // Nothing listens on the discard port
        let writer = writer("http://127.0.0.1:9/upload", Some("key"));
        let reference = writer.save("camera_1", b"\xff\xd8", Utc::now()).await.unwrap();
        assert_eq!(reference, "/snapshots/elephant_camera_1.jpg");
    }

    #[tokio::test]
    async fn test_local_failure_is_reported() {
        struct BrokenWriter;

        #[async_trait]
        impl SnapshotWriter for BrokenWriter {
            async fn save(&self, _: &str, _: &[u8], _: DateTime<Utc>) -> Result<String> {
                Err(Error::Snapshot("disk full".to_string()))
            }
        }

        let writer = ImageHostSnapshotWriter::new(
            Arc::new(BrokenWriter),
            "http://127.0.0.1:9/upload".to_string(),
            Some("key".to_string()),
            Duration::from_secs(2),
        )
        .unwrap();
        let result = writer.save("camera_1", b"\xff\xd8", Utc::now()).await;
        assert!(matches!(result, Err(Error::Snapshot(_))));
    }
}
