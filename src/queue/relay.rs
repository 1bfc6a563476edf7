//! Outbox relay: delivers pending queue messages

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use sqlx::SqlitePool;

use super::JobPublisher;
use crate::config::RelayConfig;
use crate::db::{OutboxMessage, OutboxRepository, OUTBOX_DELIVERED};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub delivered: usize,
    pub failed: usize,
}

/// Polls `job_outbox` and publishes what is still pending
#[derive(Clone)]
pub struct OutboxRelay {
    pool: SqlitePool,
    publisher: Arc<dyn JobPublisher>,
    config: RelayConfig,
}

impl OutboxRelay {
    pub fn new(pool: SqlitePool, publisher: Arc<dyn JobPublisher>, config: RelayConfig) -> Self {
        Self {
            pool,
            publisher,
            config,
        }
    }

    /// Publish one message and record the outcome. Returns whether it went out.
    pub async fn deliver(&self, message: &OutboxMessage) -> Result<bool> {
        let outcome = self
            .publisher
            .publish(&message.subject, Bytes::from(message.payload.clone()))
            .await;

        let mut conn = self.pool.acquire().await?;
        let mut outbox = OutboxRepository::new(&mut conn);

        match outcome {
            Ok(()) => {
                outbox.mark_delivered(&message.id).await?;
                tracing::info!(job_id = %message.job_id, subject = %message.subject, "Published translation job");
                Ok(true)
            }
            Err(e) => {
                outbox.mark_failed(&message.id, &e.to_string()).await?;
                tracing::warn!(
                    job_id = %message.job_id,
                    attempts = message.attempts + 1,
                    error = %e,
                    "Failed to publish translation job, will retry"
                );
                Ok(false)
            }
        }
    }

    /// Deliver a single outbox row if it is still pending
    pub async fn deliver_by_id(&self, id: &str) -> Result<bool> {
        let message = {
            let mut conn = self.pool.acquire().await?;
            OutboxRepository::new(&mut conn).get(id).await?
        };

        match message {
            Some(message) if message.status != OUTBOX_DELIVERED => self.deliver(&message).await,
            _ => Ok(false),
        }
    }

    /// One polling pass over the pending messages
    pub async fn run_once(&self) -> Result<RelayStats> {
        let pending = {
            let mut conn = self.pool.acquire().await?;
            OutboxRepository::new(&mut conn)
                .fetch_pending(self.config.batch_size, self.config.max_attempts)
                .await?
        };

        let mut stats = RelayStats::default();
        for message in &pending {
            if self.deliver(message).await? {
                stats.delivered += 1;
            } else {
                stats.failed += 1;
            }
        }

        if !pending.is_empty() {
            tracing::debug!(delivered = stats.delivered, failed = stats.failed, "Outbox pass finished");
        }
        Ok(stats)
    }

    /// Poll until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        tracing::info!(
            interval_ms = self.config.poll_interval_ms,
            "Outbox relay started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "Outbox pass failed");
                    }
                }
            }
        }

        tracing::info!("Outbox relay stopped");
    }
}
