//! Chapter records

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::Result;

/// Chapter record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Chapter {
    pub id: String,
    pub volume_id: String,
    pub number: i64,
    pub word_count: i64,
    pub created_at: String,
}

/// Language-specific chapter text
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChapterTranslation {
    pub id: String,
    pub chapter_id: String,
    pub lang: String,
    pub title: String,
    pub content: String,
    pub plain_text: String,
}

/// Chapter repository
pub struct ChapterRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ChapterRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, volume_id: &str, number: i64, word_count: i64) -> Result<Chapter> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO chapters (id, volume_id, number, word_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(volume_id)
        .bind(number)
        .bind(word_count)
        .bind(&now)
        .bind(&now)
        .execute(&mut *self.conn)
        .await?;

        Ok(Chapter {
            id,
            volume_id: volume_id.to_string(),
            number,
            word_count,
            created_at: now,
        })
    }

    pub async fn create_translation(
        &mut self,
        chapter_id: &str,
        lang: &str,
        title: &str,
        content: &str,
        plain_text: &str,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO chapter_translations (id, chapter_id, lang, title, content, plain_text, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(chapter_id)
        .bind(lang)
        .bind(title)
        .bind(content)
        .bind(plain_text)
        .bind(&now)
        .bind(&now)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Chapters of a volume in reading order
    pub async fn list_by_volume(&mut self, volume_id: &str) -> Result<Vec<Chapter>> {
        let chapters = sqlx::query_as::<_, Chapter>(
            r#"
            SELECT id, volume_id, number, word_count, created_at
            FROM chapters
            WHERE volume_id = ?
            ORDER BY number ASC, rowid ASC
            "#,
        )
        .bind(volume_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(chapters)
    }

    pub async fn get_translation(&mut self, chapter_id: &str, lang: &str) -> Result<Option<ChapterTranslation>> {
        let translation = sqlx::query_as::<_, ChapterTranslation>(
            r#"
            SELECT id, chapter_id, lang, title, content, plain_text
            FROM chapter_translations
            WHERE chapter_id = ? AND lang = ?
            "#,
        )
        .bind(chapter_id)
        .bind(lang)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(translation)
    }

    pub async fn count_by_novel(&mut self, novel_id: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM chapters c
            JOIN volumes v ON v.id = c.volume_id
            WHERE v.novel_id = ?
            "#,
        )
        .bind(novel_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(count)
    }
}
