//! Tag records

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::Result;

/// Tag record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

/// URL-friendly slug: lowercase, spaces and underscores become hyphens and
/// anything outside `[a-z0-9-]` is dropped.
///
/// Names with nothing left (e.g. entirely non-Latin) get a short digest of
/// the lowercased name so distinct tags never share the empty slug.
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .replace([' ', '_'], "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();

    if slug.is_empty() {
        let digest = Sha256::digest(name.trim().to_lowercase().as_bytes());
        return format!("tag-{}", &hex::encode(digest)[..12]);
    }
    slug
}

/// Trim, drop empties and dedupe ignoring case, keeping first spelling
fn normalize_names(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Tag repository
pub struct TagRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TagRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Existing tag with the same name (any case) or the same slug
    pub async fn find(&mut self, name: &str, slug: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, name, slug, created_at
            FROM tags
            WHERE LOWER(name) = LOWER(?) OR slug = ?
            ORDER BY CASE WHEN LOWER(name) = LOWER(?) THEN 0 ELSE 1 END
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(name)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(tag)
    }

    pub async fn create(&mut self, name: &str, slug: &str) -> Result<Tag> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO tags (id, name, slug, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(slug)
            .bind(&now)
            .execute(&mut *self.conn)
            .await?;

        Ok(Tag {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: now,
        })
    }

    /// Resolve names to tags, creating the ones that do not exist yet
    pub async fn find_or_create(&mut self, names: &[String]) -> Result<Vec<Tag>> {
        let mut tags = Vec::new();

        for name in normalize_names(names) {
            let slug = slugify(&name);
            let tag = match self.find(&name, &slug).await? {
                Some(tag) => tag,
                None => self.create(&name, &slug).await?,
            };
            if !tags.iter().any(|t: &Tag| t.id == tag.id) {
                tags.push(tag);
            }
        }

        Ok(tags)
    }
}
