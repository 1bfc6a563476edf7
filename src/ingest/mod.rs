//! EPUB ingestion
//!
//! Bytes in, novel tree out: the container is opened, its producer detected,
//! the vendor transformer builds novel, volume and chapter data, and the
//! persister writes the tree in one transaction.

mod persister;

pub use persister::{IngestionPersister, PersistedNovel};

use std::sync::Arc;

use serde::Serialize;

use crate::db::UnitOfWork;
use crate::epub::{ChapterData, NovelData, RawContainer, VolumeData};
use crate::error::{EpubError, Result};
use crate::media::MediaUploader;
use crate::transform::{SourceType, TransformerRegistry};

/// Everything read out of one EPUB, before anything is stored
#[derive(Debug, Clone)]
pub struct EpubProcessResult {
    pub raw: RawContainer,
    pub source_type: SourceType,
    pub novel: NovelData,
    pub volumes: Vec<VolumeData>,
    pub chapters: Vec<ChapterData>,
    pub total_volumes: usize,
    pub total_chapters: usize,
}

/// Outcome of a stored ingestion
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub novel_id: String,
    pub title: String,
    pub source_type: SourceType,
    pub total_volumes: usize,
    pub total_chapters: usize,
    pub total_tags: usize,
    pub cover_media_id: Option<String>,
}

pub struct IngestService {
    registry: TransformerRegistry,
    persister: IngestionPersister,
}

impl IngestService {
    pub fn new(uow: UnitOfWork) -> Self {
        Self {
            registry: TransformerRegistry::default(),
            persister: IngestionPersister::new(uow, None),
        }
    }

    /// Upload covers through `uploader`; without one covers are skipped
    pub fn with_uploader(mut self, uploader: Arc<dyn MediaUploader>) -> Self {
        self.persister = self.persister.with_uploader(uploader);
        self
    }

    pub fn with_registry(mut self, registry: TransformerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Parse and transform an EPUB without storing anything
    pub fn process_epub(&self, data: &[u8]) -> std::result::Result<EpubProcessResult, EpubError> {
        let raw = RawContainer::from_bytes(data)?;
        let source_type = self.registry.detect_and_get(&raw)?;

        let novel = source_type.transform_novel(&raw)?;
        let mut volumes = source_type.transform_volumes(&raw)?;
        if volumes.is_empty() {
            volumes.push(VolumeData::virtual_default());
        }
        let chapters = source_type.transform_chapters(&raw)?;

        tracing::info!(
            source_type = %source_type,
            title = %novel.title,
            volumes = volumes.len(),
            chapters = chapters.len(),
            "Processed EPUB"
        );

        Ok(EpubProcessResult {
            total_volumes: volumes.len(),
            total_chapters: chapters.len(),
            raw,
            source_type,
            novel,
            volumes,
            chapters,
        })
    }

    /// Process an EPUB and store the resulting novel
    pub async fn ingest(&self, data: &[u8], created_by: &str) -> Result<IngestSummary> {
        let result = self.process_epub(data)?;
        let stored = self.persister.persist(&result, created_by).await?;

        Ok(IngestSummary {
            novel_id: stored.novel_id,
            title: result.novel.title,
            source_type: result.source_type,
            total_volumes: stored.volume_ids.len(),
            total_chapters: stored.chapter_ids.len(),
            total_tags: stored.tag_ids.len(),
            cover_media_id: stored.cover_media_id,
        })
    }
}
