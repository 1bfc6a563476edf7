//! Job queue publication
//!
//! Messages are written to the outbox inside the job transaction and handed
//! to a [`JobPublisher`] afterwards, either right after commit or by the
//! [`OutboxRelay`]. Delivery is at-least-once; consumers key on `job_id`.

mod relay;

pub use relay::{OutboxRelay, RelayStats};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Payload a translation worker receives for a new job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationJobMessage {
    pub job_id: String,
    pub target_lang: String,
    pub source_lang: String,
    pub target_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_code_filter: Option<bool>,
}

/// Trait for queue publish operations
#[async_trait]
pub trait JobPublisher: Send + Sync {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()>;
}

/// Publishes through a NATS connection
pub struct NatsJobPublisher {
    client: async_nats::Client,
}

impl NatsJobPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to connect to {}: {}", url, e)))?;
        tracing::info!("Connected to NATS at {}", url);
        Ok(Self::new(client))
    }
}

#[async_trait]
impl JobPublisher for NatsJobPublisher {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        // Make sure the message left the client buffer before the outbox row is marked
        self.client
            .flush()
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(())
    }
}

/// A published message
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// Publisher that keeps messages in memory for inspection.
///
/// It can be switched into a failing mode to exercise retry paths.
#[derive(Default)]
pub struct RecordingPublisher {
    published: RwLock<Vec<PublishedMessage>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn messages_for_subject(&self, subject: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    pub fn publish_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl JobPublisher for RecordingPublisher {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Queue("publisher unavailable".to_string()));
        }
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage {
                subject: subject.to_string(),
                payload,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_omits_unset_code_filter() {
        let message = TranslationJobMessage {
            job_id: "job-1".to_string(),
            target_lang: "fr".to_string(),
            source_lang: "en".to_string(),
            target_fields: vec!["title".to_string()],
            enable_code_filter: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["job_id"], "job-1");
        assert!(json.get("enable_code_filter").is_none());

        let with_filter = TranslationJobMessage {
            enable_code_filter: Some(true),
            ..message
        };
        let json = serde_json::to_value(&with_filter).unwrap();
        assert_eq!(json["enable_code_filter"], true);
    }

    #[tokio::test]
    async fn test_recording_publisher() {
        let publisher = RecordingPublisher::new();
        publisher
            .publish("translation_jobs", Bytes::from_static(b"{}"))
            .await
            .unwrap();
        assert_eq!(publisher.messages_for_subject("translation_jobs").len(), 1);

        publisher.set_failing(true);
        assert!(publisher
            .publish("translation_jobs", Bytes::from_static(b"{}"))
            .await
            .is_err());
        assert_eq!(publisher.publish_count(), 1);
    }
}
