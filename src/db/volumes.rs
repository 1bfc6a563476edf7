//! Volume records

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::Result;

/// Volume record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Volume {
    pub id: String,
    pub novel_id: String,
    pub number: i64,
    pub original_language: String,
    pub is_virtual: bool,
    pub cover_media_id: Option<String>,
    pub created_at: String,
}

/// Volume repository
pub struct VolumeRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> VolumeRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &mut self,
        novel_id: &str,
        number: i64,
        original_language: &str,
        is_virtual: bool,
    ) -> Result<Volume> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO volumes (id, novel_id, number, original_language, is_virtual, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(novel_id)
        .bind(number)
        .bind(original_language)
        .bind(is_virtual)
        .bind(&now)
        .bind(&now)
        .execute(&mut *self.conn)
        .await?;

        Ok(Volume {
            id,
            novel_id: novel_id.to_string(),
            number,
            original_language: original_language.to_string(),
            is_virtual,
            cover_media_id: None,
            created_at: now,
        })
    }

    pub async fn create_translation(&mut self, volume_id: &str, lang: &str, title: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO volume_translations (id, volume_id, lang, title, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(volume_id)
        .bind(lang)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Volumes of a novel in reading order
    pub async fn list_by_novel(&mut self, novel_id: &str) -> Result<Vec<Volume>> {
        let volumes = sqlx::query_as::<_, Volume>(
            r#"
            SELECT id, novel_id, number, original_language, is_virtual, cover_media_id, created_at
            FROM volumes
            WHERE novel_id = ?
            ORDER BY number ASC, rowid ASC
            "#,
        )
        .bind(novel_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(volumes)
    }

    pub async fn title(&mut self, volume_id: &str, lang: &str) -> Result<Option<String>> {
        let title: Option<(String,)> = sqlx::query_as(
            "SELECT title FROM volume_translations WHERE volume_id = ? AND lang = ?",
        )
        .bind(volume_id)
        .bind(lang)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(title.map(|(t,)| t))
    }
}
