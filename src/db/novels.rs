//! Novel and novel translation records

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::Tag;
use crate::error::Result;

/// Novel record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Novel {
    pub id: String,
    pub created_by: String,
    pub original_language: String,
    pub original_author: Option<String>,
    pub publisher: Option<String>,
    pub source_type: Option<String>,
    pub cover_media_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewNovel {
    pub created_by: String,
    pub original_language: String,
    pub original_author: Option<String>,
    pub publisher: Option<String>,
    pub source_type: Option<String>,
    pub cover_media_id: Option<String>,
}

/// Language-specific novel text
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NovelTranslation {
    pub id: String,
    pub novel_id: String,
    pub lang: String,
    pub title: String,
    pub description: Option<String>,
    pub synopsis: Option<String>,
}

/// Novel repository
pub struct NovelRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> NovelRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, novel: &NewNovel) -> Result<Novel> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO novels (id, created_by, original_language, original_author, publisher,
                                source_type, cover_media_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&novel.created_by)
        .bind(&novel.original_language)
        .bind(&novel.original_author)
        .bind(&novel.publisher)
        .bind(&novel.source_type)
        .bind(&novel.cover_media_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *self.conn)
        .await?;

        Ok(Novel {
            id,
            created_by: novel.created_by.clone(),
            original_language: novel.original_language.clone(),
            original_author: novel.original_author.clone(),
            publisher: novel.publisher.clone(),
            source_type: novel.source_type.clone(),
            cover_media_id: novel.cover_media_id.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn get(&mut self, id: &str) -> Result<Option<Novel>> {
        let novel = sqlx::query_as::<_, Novel>(
            r#"
            SELECT id, created_by, original_language, original_author, publisher,
                   source_type, cover_media_id, created_at, updated_at
            FROM novels
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(novel)
    }

    pub async fn create_translation(
        &mut self,
        novel_id: &str,
        lang: &str,
        title: &str,
        description: Option<&str>,
        synopsis: Option<&str>,
    ) -> Result<NovelTranslation> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO novel_translations (id, novel_id, lang, title, description, synopsis, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(novel_id)
        .bind(lang)
        .bind(title)
        .bind(description)
        .bind(synopsis)
        .bind(&now)
        .bind(&now)
        .execute(&mut *self.conn)
        .await?;

        Ok(NovelTranslation {
            id,
            novel_id: novel_id.to_string(),
            lang: lang.to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            synopsis: synopsis.map(str::to_string),
        })
    }

    pub async fn get_translation(&mut self, novel_id: &str, lang: &str) -> Result<Option<NovelTranslation>> {
        let translation = sqlx::query_as::<_, NovelTranslation>(
            r#"
            SELECT id, novel_id, lang, title, description, synopsis
            FROM novel_translations
            WHERE novel_id = ? AND lang = ?
            "#,
        )
        .bind(novel_id)
        .bind(lang)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(translation)
    }

    /// Link a tag; linking twice is a no-op
    pub async fn add_tag(&mut self, novel_id: &str, tag_id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO novel_tags (novel_id, tag_id) VALUES (?, ?)")
            .bind(novel_id)
            .bind(tag_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    pub async fn tags(&mut self, novel_id: &str) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at
            FROM tags t
            JOIN novel_tags nt ON nt.tag_id = t.id
            WHERE nt.novel_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(novel_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(tags)
    }
}
