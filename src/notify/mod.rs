//! Fire-and-forget unlock notifications.

use crate::common::{FaceLockError, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct UnlockEvent {
    pub identity: String,
    pub timestamp: DateTime<Local>,
}

impl UnlockEvent {
    pub fn now(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            timestamp: Local::now(),
        }
    }

    /// e.g. "Alice opened the safe door. Time: 05:50:20 PM"
    pub fn message(&self) -> String {
        format!(
            "{} opened the safe door. Time: {}",
            self.identity,
            self.timestamp.format("%I:%M:%S %p")
        )
    }
}

pub trait Notifier {
    fn notify(&self, event: &UnlockEvent) -> Result<()>;
}

/// Records unlock events in the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &UnlockEvent) -> Result<()> {
        tracing::info!("{}", event.message());
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    identity: &'a str,
    timestamp: String,
    message: String,
}

/// POSTs unlock events as JSON to an HTTP endpoint (mail/SMS gateway, chat hook, ...).
pub struct WebhookNotifier {
    url: String,
    http_client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FaceLockError::Notification(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            http_client,
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: &UnlockEvent) -> Result<()> {
        let payload = WebhookPayload {
            identity: &event.identity,
            timestamp: event.timestamp.to_rfc3339(),
            message: event.message(),
        };

        let response = self
            .http_client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    FaceLockError::Notification(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    FaceLockError::Notification(format!("connection failed: {e}"))
                } else {
                    FaceLockError::Notification(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(FaceLockError::Notification(format!(
                "webhook returned status {}",
                response.status()
            )));
        }

        tracing::info!("Sent unlock notification for {}", event.identity);
        Ok(())
    }
}
