//! AlertSink - External Alert Delivery Adapters
//!
//! ## Responsibilities
//!
//! - Database webhook: POST the alert record as JSON
//! - Chat relay: POST a one-line alert message
//! - Push notification relay: POST title/body/redirect
//!
//! Sinks are called only for DELIVERED alerts, from the delivery workers.
//! Errors are returned to the worker, which logs them; nothing retries.

mod notification;
mod webhook;

pub use notification::{ChatRelaySink, PushNotificationSink};
pub use webhook::DatabaseWebhookSink;

use crate::error::{Error, Result};
use crate::models::AlertRecord;
use async_trait::async_trait;
use std::time::Duration;

/// Delivery port
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Deliver one alert
    async fn send(&self, record: &AlertRecord) -> Result<()>;
}

/// Build the HTTP client shared by the sink adapters
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// POST JSON and map non-2xx to a sink error
async fn post_json<T: serde::Serialize + ?Sized>(
    client: &reqwest::Client,
    sink: &str,
    url: &str,
    body: &T,
) -> Result<()> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::Sink {
            sink: sink.to_string(),
            message: e.to_string(),
        })?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(Error::Sink {
            sink: sink.to_string(),
            message: format!("HTTP {}: {}", status, text),
        });
    }

    Ok(())
}
