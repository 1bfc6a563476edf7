//! Transactional outbox for queue messages

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::Result;

pub const OUTBOX_PENDING: &str = "pending";
pub const OUTBOX_DELIVERED: &str = "delivered";

/// Message waiting to be (or already) published
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OutboxMessage {
    pub id: String,
    pub job_id: String,
    pub subject: String,
    pub payload: String,
    pub status: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: String,
    pub delivered_at: Option<String>,
}

/// Outbox repository
pub struct OutboxRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> OutboxRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn enqueue(&mut self, job_id: &str, subject: &str, payload: &str) -> Result<OutboxMessage> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO job_outbox (id, job_id, subject, payload, status, attempts, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(job_id)
        .bind(subject)
        .bind(payload)
        .bind(OUTBOX_PENDING)
        .bind(&now)
        .execute(&mut *self.conn)
        .await?;

        Ok(OutboxMessage {
            id,
            job_id: job_id.to_string(),
            subject: subject.to_string(),
            payload: payload.to_string(),
            status: OUTBOX_PENDING.to_string(),
            attempts: 0,
            last_error: None,
            created_at: now,
            delivered_at: None,
        })
    }

    pub async fn get(&mut self, id: &str) -> Result<Option<OutboxMessage>> {
        let message = sqlx::query_as::<_, OutboxMessage>(
            r#"
            SELECT id, job_id, subject, payload, status, attempts, last_error, created_at, delivered_at
            FROM job_outbox
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(message)
    }

    /// Oldest undelivered messages that still have attempts left
    pub async fn fetch_pending(&mut self, limit: i64, max_attempts: i64) -> Result<Vec<OutboxMessage>> {
        let messages = sqlx::query_as::<_, OutboxMessage>(
            r#"
            SELECT id, job_id, subject, payload, status, attempts, last_error, created_at, delivered_at
            FROM job_outbox
            WHERE status = ? AND attempts < ?
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?
            "#,
        )
        .bind(OUTBOX_PENDING)
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(messages)
    }

    pub async fn mark_delivered(&mut self, id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE job_outbox SET status = ?, attempts = attempts + 1, delivered_at = ? WHERE id = ?",
        )
        .bind(OUTBOX_DELIVERED)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(&mut self, id: &str, error: &str) -> Result<()> {
        sqlx::query("UPDATE job_outbox SET attempts = attempts + 1, last_error = ? WHERE id = ?")
            .bind(error)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    pub async fn count_pending(&mut self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM job_outbox WHERE status = ?")
            .bind(OUTBOX_PENDING)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }
}
