//! Notification sinks (chat relay, push relay)

use super::{post_json, AlertSink};
use crate::error::Result;
use crate::models::{capitalize, AlertRecord};
use async_trait::async_trait;
use serde::Serialize;

/// Page the push notification opens
const PUSH_REDIRECT_URL: &str = "/mobile";

/// "Elephant detected at Main Entrance with 91.2% confidence."
pub fn alert_text(record: &AlertRecord) -> String {
    format!(
        "{} detected at {} with {:.1}% confidence.",
        capitalize(&record.detected_class),
        record.location,
        record.confidence * 100.0
    )
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushMessage {
    title: String,
    body: String,
    redirect_url: String,
}

/// Posts `{message}` to a chat bot relay route
pub struct ChatRelaySink {
    client: reqwest::Client,
    url: String,
}

impl ChatRelaySink {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl AlertSink for ChatRelaySink {
    fn name(&self) -> &str {
        "chat"
    }

    async fn send(&self, record: &AlertRecord) -> Result<()> {
        let body = ChatMessage {
            message: alert_text(record),
        };
        post_json(&self.client, self.name(), &self.url, &body).await?;
        tracing::info!(camera_id = %record.camera_id, "Chat notification sent");
        Ok(())
    }
}

/// Posts `{title, body, redirectUrl}` to a push notification relay route
pub struct PushNotificationSink {
    client: reqwest::Client,
    url: String,
}

impl PushNotificationSink {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl AlertSink for PushNotificationSink {
    fn name(&self) -> &str {
        "push"
    }

    async fn send(&self, record: &AlertRecord) -> Result<()> {
        let body = PushMessage {
            title: format!("{} Detected!", capitalize(&record.detected_class)),
            body: alert_text(record),
            redirect_url: PUSH_REDIRECT_URL.to_string(),
        };
        post_json(&self.client, self.name(), &self.url, &body).await?;
        tracing::info!(camera_id = %record.camera_id, "Push notification sent");
        Ok(())
    }
}
