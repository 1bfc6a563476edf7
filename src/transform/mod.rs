//! Vendor-specific interpretation of EPUB exports
//!
//! Each scraping tool lays out its EPUBs differently. A [`SourceType`] names
//! one of those layouts and dispatches detection and transformation to the
//! module that understands it.

mod common;
mod generic;
mod lightnovel_crawler;
mod novel_downloader;
pub mod registry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::epub::{ChapterData, NovelData, RawContainer, VolumeData};
use crate::error::EpubError;

pub use registry::TransformerRegistry;

/// Source family an EPUB was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    NovelDownloader,
    LightnovelCrawler,
    Generic,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::NovelDownloader => "novel_downloader",
            SourceType::LightnovelCrawler => "lightnovel_crawler",
            SourceType::Generic => "generic",
        }
    }

    /// Whether this source produced the container
    pub fn detect(&self, raw: &RawContainer) -> bool {
        match self {
            SourceType::NovelDownloader => novel_downloader::detect(raw),
            SourceType::LightnovelCrawler => lightnovel_crawler::detect(raw),
            SourceType::Generic => generic::detect(raw),
        }
    }

    pub fn transform_novel(&self, raw: &RawContainer) -> Result<NovelData, EpubError> {
        match self {
            SourceType::NovelDownloader => novel_downloader::transform_novel(raw),
            SourceType::LightnovelCrawler => lightnovel_crawler::transform_novel(raw),
            SourceType::Generic => generic::transform_novel(raw),
        }
    }

    /// Volume list in spine order; never empty
    pub fn transform_volumes(&self, raw: &RawContainer) -> Result<Vec<VolumeData>, EpubError> {
        match self {
            SourceType::NovelDownloader => novel_downloader::transform_volumes(raw),
            SourceType::LightnovelCrawler => lightnovel_crawler::transform_volumes(raw),
            SourceType::Generic => generic::transform_volumes(raw),
        }
    }

    /// Chapters indexing into the list [`Self::transform_volumes`] returns
    pub fn transform_chapters(&self, raw: &RawContainer) -> Result<Vec<ChapterData>, EpubError> {
        match self {
            SourceType::NovelDownloader => novel_downloader::transform_chapters(raw),
            SourceType::LightnovelCrawler => lightnovel_crawler::transform_chapters(raw),
            SourceType::Generic => generic::transform_chapters(raw),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = EpubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "novel_downloader" => Ok(SourceType::NovelDownloader),
            "lightnovel_crawler" => Ok(SourceType::LightnovelCrawler),
            "generic" => Ok(SourceType::Generic),
            _ => Err(EpubError::UnsupportedSourceFormat),
        }
    }
}
