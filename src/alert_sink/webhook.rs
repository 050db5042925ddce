//! Database webhook sink

use super::{post_json, AlertSink};
use crate::error::Result;
use crate::models::AlertRecord;
use async_trait::async_trait;

/// Posts the full alert record to the database ingestion route
pub struct DatabaseWebhookSink {
    client: reqwest::Client,
    url: String,
}

impl DatabaseWebhookSink {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl AlertSink for DatabaseWebhookSink {
    fn name(&self) -> &str {
        "database"
    }

    async fn send(&self, record: &AlertRecord) -> Result<()> {
        post_json(&self.client, self.name(), &self.url, record).await?;
        tracing::info!(
            camera_id = %record.camera_id,
            url = %self.url,
            "Alert uploaded to database"
        );
        Ok(())
    }
}
