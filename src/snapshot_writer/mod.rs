//! SnapshotWriter - Alert Image Persistence
//!
//! ## Responsibilities
//!
//! - Persist the (already annotated) JPEG of an accepted alert
//! - Return the public image reference served under `/snapshots`
//! - Optionally publish the frame to an image host and return its URL
//!
//! Failures are reported to the caller, which logs them and keeps the alert
//! without an image reference.

mod image_host;

pub use image_host::ImageHostSnapshotWriter;

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;

/// URL prefix the snapshot directory is served under
pub const SNAPSHOT_URL_PREFIX: &str = "/snapshots";

/// Snapshot persistence port
#[async_trait]
pub trait SnapshotWriter: Send + Sync {
    /// Save the frame and return its image reference
    async fn save(&self, camera_id: &str, jpeg: &[u8], captured_at: DateTime<Utc>)
        -> Result<String>;
}

/// Filesystem snapshot writer
pub struct FsSnapshotWriter {
    snapshot_dir: PathBuf,
}

impl FsSnapshotWriter {
    /// Create new FsSnapshotWriter, creating the directory if missing
    pub async fn new(snapshot_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&snapshot_dir).await?;
        Ok(Self { snapshot_dir })
    }

    /// `elephant_{camera}_{unix micros}.jpg`
    pub fn file_name(camera_id: &str, captured_at: DateTime<Utc>) -> String {
        let safe_camera: String = camera_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!(
            "elephant_{}_{}.jpg",
            safe_camera,
            captured_at.timestamp_micros()
        )
    }
}

#[async_trait]
impl SnapshotWriter for FsSnapshotWriter {
    async fn save(
        &self,
        camera_id: &str,
        jpeg: &[u8],
        captured_at: DateTime<Utc>,
    ) -> Result<String> {
        if jpeg.is_empty() {
            return Err(Error::Snapshot(format!(
                "empty frame for camera {}",
                camera_id
            )));
        }

        let file_name = Self::file_name(camera_id, captured_at);
        let path = self.snapshot_dir.join(&file_name);

        fs::write(&path, jpeg)
            .await
            .map_err(|e| Error::Snapshot(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(
            camera_id = %camera_id,
            path = %path.display(),
            size = jpeg.len(),
            "Snapshot saved"
        );

        Ok(format!("{}/{}", SNAPSHOT_URL_PREFIX, file_name))
    }
}
