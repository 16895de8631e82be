//! Webhook notification for completed intakes
//!
//! POSTs the four patient fields as JSON to the configured URL. With no URL
//! configured every notification is a no-op.

use crate::db::PatientRecord;
use crate::triage::Ward;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// JSON body sent to the webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub patient_name: String,
    pub patient_age: u8,
    pub patient_query: String,
    pub ward: Ward,
}

impl From<&PatientRecord> for WebhookPayload {
    fn from(record: &PatientRecord) -> Self {
        Self {
            patient_name: record.patient_name.clone(),
            patient_age: record.patient_age,
            patient_query: record.patient_query.clone(),
            ward: record.ward,
        }
    }
}

/// What happened to a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered { status: u16 },
    /// No webhook configured
    Skipped,
}

/// Notification error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct NotifyError {
    pub kind: NotifyErrorKind,
    pub message: String,
}

impl NotifyError {
    pub fn new(kind: NotifyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(NotifyErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(NotifyErrorKind::Connect, message)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self::new(
            NotifyErrorKind::Status(status),
            format!("Webhook returned {status}: {body}"),
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(NotifyErrorKind::Unknown, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyErrorKind {
    Timeout,
    Connect,
    /// Non-2xx response
    Status(u16),
    Unknown,
}

/// HTTP webhook client
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::unknown(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
        })
    }

    /// A notifier that never sends anything
    #[allow(dead_code)] // Used in tests
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            url: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    pub async fn send(&self, payload: &WebhookPayload) -> Result<NotifyOutcome, NotifyError> {
        let Some(url) = &self.url else {
            tracing::debug!("WEBHOOK_URL not set, skipping webhook");
            return Ok(NotifyOutcome::Skipped);
        };

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::timeout(format!("Webhook timeout: {e}"))
                } else if e.is_connect() {
                    NotifyError::connect(format!("Webhook connection failed: {e}"))
                } else {
                    NotifyError::unknown(format!("Webhook request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::status(status.as_u16(), &body));
        }

        Ok(NotifyOutcome::Delivered {
            status: status.as_u16(),
        })
    }
}
