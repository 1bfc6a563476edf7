//! Uploaded media records

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::Result;

/// Media record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Media {
    pub id: String,
    pub url: String,
    pub media_type: String,
    pub mime_type: String,
    pub file_size: i64,
    pub uploaded_by: String,
    pub uploaded_at: String,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub url: String,
    pub media_type: String,
    pub mime_type: String,
    pub file_size: i64,
    pub uploaded_by: String,
}

/// Media repository
pub struct MediaRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> MediaRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, media: &NewMedia) -> Result<Media> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO medias (id, url, media_type, mime_type, file_size, uploaded_by, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&media.url)
        .bind(&media.media_type)
        .bind(&media.mime_type)
        .bind(media.file_size)
        .bind(&media.uploaded_by)
        .bind(&now)
        .execute(&mut *self.conn)
        .await?;

        Ok(Media {
            id,
            url: media.url.clone(),
            media_type: media.media_type.clone(),
            mime_type: media.mime_type.clone(),
            file_size: media.file_size,
            uploaded_by: media.uploaded_by.clone(),
            uploaded_at: now,
        })
    }

    pub async fn get(&mut self, id: &str) -> Result<Option<Media>> {
        let media = sqlx::query_as::<_, Media>(
            r#"
            SELECT id, url, media_type, mime_type, file_size, uploaded_by, uploaded_at
            FROM medias
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(media)
    }
}
