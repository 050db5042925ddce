//! FrameSource - Camera Frame Acquisition
//!
//! ## Responsibilities
//!
//! - Define the frame acquisition port used by capture loops
//! - HTTP snapshot-URL adapter (one JPEG per call)

mod http_snapshot;

pub use http_snapshot::HttpSnapshotSource;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One encoded camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub camera_id: String,
    pub jpeg: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// Frame acquisition port
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Next frame, or `None` when the source is exhausted
    async fn next_frame(&self) -> Result<Option<Frame>>;
}
