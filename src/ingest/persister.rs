//! Transactional write of an ingested novel tree

use std::collections::HashMap;
use std::sync::Arc;

use super::EpubProcessResult;
use crate::db::{NewMedia, NewNovel, UnitOfWork};
use crate::epub::{html, CoverImage, VolumeData};
use crate::error::{persistence, Result};
use crate::media::{MediaUploader, UploadedMedia};

const COVER_MEDIA_TYPE: &str = "image";

/// Ids of everything one ingestion created
#[derive(Debug, Clone, Default)]
pub struct PersistedNovel {
    pub novel_id: String,
    pub volume_ids: Vec<String>,
    pub chapter_ids: Vec<String>,
    pub tag_ids: Vec<String>,
    pub cover_media_id: Option<String>,
}

pub struct IngestionPersister {
    uow: UnitOfWork,
    uploader: Option<Arc<dyn MediaUploader>>,
}

impl IngestionPersister {
    pub fn new(uow: UnitOfWork, uploader: Option<Arc<dyn MediaUploader>>) -> Self {
        Self { uow, uploader }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn MediaUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Store the novel, its tags, volumes and chapters.
    ///
    /// The cover is uploaded first and outside the transaction; losing it is
    /// logged and the novel is stored without one. Everything else commits
    /// or rolls back together.
    pub async fn persist(&self, result: &EpubProcessResult, created_by: &str) -> Result<PersistedNovel> {
        let novel = &result.novel;
        let uploaded = match &novel.cover {
            Some(cover) => self.upload_cover(cover).await,
            None => None,
        };

        let lang = if novel.original_language.trim().is_empty() {
            "en"
        } else {
            novel.original_language.trim()
        };

        let mut repos = self.uow.begin().await?;
        let mut stored = PersistedNovel::default();

        if let Some(media) = uploaded {
            let row = repos
                .media()
                .create(&NewMedia {
                    url: media.url,
                    media_type: COVER_MEDIA_TYPE.to_string(),
                    mime_type: media.mime_type,
                    file_size: media.size,
                    uploaded_by: created_by.to_string(),
                })
                .await
                .map_err(|e| persistence("unable to create media", e))?;
            stored.cover_media_id = Some(row.id);
        }

        let created = repos
            .novels()
            .create(&NewNovel {
                created_by: created_by.to_string(),
                original_language: lang.to_string(),
                original_author: non_empty(&novel.original_author),
                publisher: non_empty(&novel.publisher),
                source_type: Some(result.source_type.as_str().to_string()),
                cover_media_id: stored.cover_media_id.clone(),
            })
            .await
            .map_err(|e| persistence("unable to create novel", e))?;
        stored.novel_id = created.id;

        repos
            .novels()
            .create_translation(
                &stored.novel_id,
                lang,
                &novel.title,
                non_empty(&novel.description).as_deref(),
                non_empty(&novel.synopsis).as_deref(),
            )
            .await
            .map_err(|e| persistence("unable to create novel translation", e))?;

        let tags = repos
            .tags()
            .find_or_create(&novel.tags)
            .await
            .map_err(|e| persistence("unable to create tags", e))?;
        for tag in tags {
            repos
                .novels()
                .add_tag(&stored.novel_id, &tag.id)
                .await
                .map_err(|e| persistence("unable to tag novel", e))?;
            stored.tag_ids.push(tag.id);
        }

        let fallback = [VolumeData::virtual_default()];
        let volumes = if result.volumes.is_empty() {
            &fallback[..]
        } else {
            &result.volumes[..]
        };
        for (i, volume) in volumes.iter().enumerate() {
            let number = if volume.number > 0 {
                volume.number
            } else {
                i as i64 + 1
            };
            let row = repos
                .volumes()
                .create(&stored.novel_id, number, lang, volume.is_virtual)
                .await
                .map_err(|e| persistence("unable to create volume", e))?;

            let title = if volume.title.trim().is_empty() {
                format!("Volume {}", number)
            } else {
                volume.title.clone()
            };
            repos
                .volumes()
                .create_translation(&row.id, lang, &title)
                .await
                .map_err(|e| persistence("unable to create volume translation", e))?;
            stored.volume_ids.push(row.id);
        }

        // Highest chapter number per volume among correctly placed chapters
        let mut last_number: HashMap<usize, i64> = HashMap::new();
        for chapter in &result.chapters {
            if chapter.volume_index < stored.volume_ids.len() {
                let last = last_number.entry(chapter.volume_index).or_insert(0);
                *last = (*last).max(chapter.order_num);
            }
        }

        for chapter in &result.chapters {
            let (index, number) = if chapter.volume_index < stored.volume_ids.len() {
                (chapter.volume_index, chapter.order_num)
            } else {
                let last = last_number.entry(0).or_insert(0);
                *last += 1;
                tracing::warn!(
                    volume_index = chapter.volume_index,
                    number = *last,
                    path = %chapter.source_path,
                    "Chapter points past the last volume, appending it to the first"
                );
                (0, *last)
            };

            let row = repos
                .chapters()
                .create(
                    &stored.volume_ids[index],
                    number,
                    html::word_count(&chapter.plain_text),
                )
                .await
                .map_err(|e| persistence("unable to create chapter", e))?;
            repos
                .chapters()
                .create_translation(&row.id, lang, &chapter.title, &chapter.content, &chapter.plain_text)
                .await
                .map_err(|e| persistence("unable to create chapter translation", e))?;
            stored.chapter_ids.push(row.id);
        }

        repos.commit().await?;

        tracing::info!(
            novel_id = %stored.novel_id,
            source_type = %result.source_type,
            volumes = stored.volume_ids.len(),
            chapters = stored.chapter_ids.len(),
            tags = stored.tag_ids.len(),
            "Stored novel"
        );

        Ok(stored)
    }

    async fn upload_cover(&self, cover: &CoverImage) -> Option<UploadedMedia> {
        let Some(uploader) = &self.uploader else {
            tracing::debug!(path = %cover.file_name, "No media storage configured, skipping cover");
            return None;
        };

        match uploader.upload(&cover.file_name, &cover.bytes).await {
            Ok(media) => {
                tracing::info!(url = %media.url, size = media.size, "Uploaded cover image");
                Some(media)
            }
            Err(e) => {
                tracing::warn!(path = %cover.file_name, error = %e, "Cover upload failed, storing novel without cover");
                None
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, ChapterRepository, MediaRepository, NovelRepository, VolumeRepository};
    use crate::epub::container::test_support::{zip_bytes, CONTAINER};
    use crate::epub::container::CONTAINER_XML;
    use crate::epub::{ChapterData, NovelData, RawContainer};
    use crate::error::AppError;
    use crate::media::InMemoryMediaUploader;
    use crate::transform::SourceType;
    use sqlx::SqlitePool;

    fn chapter(volume_index: usize, order_num: i64, title: &str) -> ChapterData {
        ChapterData {
            volume_index,
            order_num,
            title: title.to_string(),
            content: format!("<h1>{}</h1><p>one two three</p>", title),
            plain_text: format!("{} one two three", title),
            source_path: format!("OEBPS/{}.xhtml", order_num),
        }
    }

    fn result(volumes: Vec<VolumeData>, chapters: Vec<ChapterData>) -> EpubProcessResult {
        let raw = RawContainer::from_bytes(&zip_bytes(&[(CONTAINER_XML, CONTAINER)])).unwrap();
        EpubProcessResult {
            raw,
            source_type: SourceType::LightnovelCrawler,
            novel: NovelData {
                title: "Overgeared".to_string(),
                original_author: "Park Saenal".to_string(),
                description: "A blacksmith.".to_string(),
                synopsis: "".to_string(),
                publisher: "".to_string(),
                original_language: "ko".to_string(),
                tags: vec!["Action".to_string(), " action ".to_string(), "Game".to_string()],
                cover: Some(CoverImage {
                    file_name: "OEBPS/Images/cover.jpg".to_string(),
                    bytes: vec![0xff, 0xd8, 0xff],
                }),
            },
            total_volumes: volumes.len(),
            total_chapters: chapters.len(),
            volumes,
            chapters,
        }
    }

    fn volume(number: i64, title: &str) -> VolumeData {
        VolumeData {
            number,
            title: title.to_string(),
            is_virtual: false,
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap();
        n
    }

    #[tokio::test]
    async fn test_persists_whole_tree() {
        let pool = test_pool().await;
        let persister = IngestionPersister::new(UnitOfWork::new(pool.clone()), None);
        let input = result(
            vec![volume(1, "Beginnings"), volume(0, "")],
            vec![chapter(0, 1, "A"), chapter(0, 2, "B"), chapter(1, 1, "C")],
        );

        let stored = persister.persist(&input, "user-1").await.unwrap();
        assert_eq!(stored.volume_ids.len(), 2);
        assert_eq!(stored.chapter_ids.len(), 3);
        assert_eq!(stored.tag_ids.len(), 2);
        assert!(stored.cover_media_id.is_none());

        let mut conn = pool.acquire().await.unwrap();
        let mut novels = NovelRepository::new(&mut conn);
        let novel = novels.get(&stored.novel_id).await.unwrap().unwrap();
        assert_eq!(novel.original_language, "ko");
        assert_eq!(novel.source_type.as_deref(), Some("lightnovel_crawler"));
        assert!(novel.publisher.is_none());
        let translation = novels.get_translation(&stored.novel_id, "ko").await.unwrap().unwrap();
        assert_eq!(translation.title, "Overgeared");
        assert_eq!(translation.description.as_deref(), Some("A blacksmith."));
        assert!(translation.synopsis.is_none());

        let mut volumes = VolumeRepository::new(&mut conn);
        let rows = volumes.list_by_novel(&stored.novel_id).await.unwrap();
        let numbers: Vec<i64> = rows.iter().map(|v| v.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(volumes.title(&rows[1].id, "ko").await.unwrap().as_deref(), Some("Volume 2"));

        let mut chapters = ChapterRepository::new(&mut conn);
        let first_volume = chapters.list_by_volume(&rows[0].id).await.unwrap();
        assert_eq!(first_volume.len(), 2);
        assert_eq!(first_volume[0].word_count, 4);
        let text = chapters.get_translation(&first_volume[1].id, "ko").await.unwrap().unwrap();
        assert_eq!(text.title, "B");
    }

    #[tokio::test]
    async fn test_out_of_range_chapter_goes_to_first_volume() {
        let pool = test_pool().await;
        let persister = IngestionPersister::new(UnitOfWork::new(pool.clone()), None);
        let input = result(
            vec![volume(1, "Only")],
            vec![
                chapter(0, 1, "One"),
                chapter(5, 1, "Lost"),
                chapter(0, 2, "Two"),
                chapter(7, 2, "Also lost"),
            ],
        );

        let stored = persister.persist(&input, "user-1").await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let chapters = ChapterRepository::new(&mut conn)
            .list_by_volume(&stored.volume_ids[0])
            .await
            .unwrap();
        let numbers: Vec<i64> = chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_empty_volume_list_gets_virtual_volume() {
        let pool = test_pool().await;
        let persister = IngestionPersister::new(UnitOfWork::new(pool.clone()), None);
        let input = result(vec![], vec![chapter(0, 1, "Solo")]);

        let stored = persister.persist(&input, "user-1").await.unwrap();
        assert_eq!(stored.volume_ids.len(), 1);

        let mut conn = pool.acquire().await.unwrap();
        let volumes = VolumeRepository::new(&mut conn)
            .list_by_novel(&stored.novel_id)
            .await
            .unwrap();
        assert!(volumes[0].is_virtual);
    }

    #[tokio::test]
    async fn test_cover_is_uploaded_and_linked() {
        let pool = test_pool().await;
        let uploader = Arc::new(InMemoryMediaUploader::new());
        let persister = IngestionPersister::new(UnitOfWork::new(pool.clone()), Some(uploader.clone()));

        let stored = persister
            .persist(&result(vec![volume(1, "V")], vec![chapter(0, 1, "A")]), "user-1")
            .await
            .unwrap();
        let media_id = stored.cover_media_id.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let media = MediaRepository::new(&mut conn).get(&media_id).await.unwrap().unwrap();
        assert_eq!(media.media_type, "image");
        assert_eq!(media.mime_type, "image/jpeg");
        assert_eq!(media.file_size, 3);
        assert_eq!(media.uploaded_by, "user-1");

        let novel = NovelRepository::new(&mut conn).get(&stored.novel_id).await.unwrap().unwrap();
        assert_eq!(novel.cover_media_id.as_deref(), Some(media_id.as_str()));
    }

    #[tokio::test]
    async fn test_cover_failure_is_not_fatal() {
        let pool = test_pool().await;
        let persister = IngestionPersister::new(
            UnitOfWork::new(pool.clone()),
            Some(Arc::new(InMemoryMediaUploader::failing())),
        );

        let stored = persister
            .persist(&result(vec![volume(1, "V")], vec![chapter(0, 1, "A")]), "user-1")
            .await
            .unwrap();
        assert!(stored.cover_media_id.is_none());
        assert_eq!(count(&pool, "medias").await, 0);
        assert_eq!(count(&pool, "novels").await, 1);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_everything() {
        let pool = test_pool().await;
        sqlx::query("DROP TABLE chapter_translations")
            .execute(&pool)
            .await
            .unwrap();
        let persister = IngestionPersister::new(UnitOfWork::new(pool.clone()), None);

        let err = persister
            .persist(&result(vec![volume(1, "V")], vec![chapter(0, 1, "A")]), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Persistence("unable to create chapter translation")));

        for table in ["novels", "volumes", "chapters", "tags", "novel_tags"] {
            assert_eq!(count(&pool, table).await, 0, "{} should be empty", table);
        }
    }
}
