//! Normalized output of a vendor transformer

use serde::Serialize;

/// Cover image found inside the container
#[derive(Debug, Clone, Serialize)]
pub struct CoverImage {
    /// Path inside the container; its extension drives the MIME type
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Novel-level metadata
#[derive(Debug, Clone, Default, Serialize)]
pub struct NovelData {
    pub title: String,
    pub original_author: String,
    pub description: String,
    pub synopsis: String,
    pub publisher: String,
    pub original_language: String,
    pub tags: Vec<String>,
    pub cover: Option<CoverImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeData {
    pub number: i64,
    pub title: String,
    pub is_virtual: bool,
}

impl VolumeData {
    /// The single volume used when a book declares none
    pub fn virtual_default() -> Self {
        Self {
            number: 1,
            title: "Volume 1".to_string(),
            is_virtual: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterData {
    /// Index into the volume list this chapter belongs to
    pub volume_index: usize,
    /// 1-based position inside its volume
    pub order_num: i64,
    pub title: String,
    pub content: String,
    pub plain_text: String,
    pub source_path: String,
}
