//! Exports of novel-downloader (404-novel-project)
//!
//! Marked by `OEBPS/info.txt` carrying the project URL. Volumes open with
//! `sectionNNNN` pages; a `synopsis.xhtml` page holds the blurb.

use std::sync::LazyLock;

use regex::Regex;

use super::common::{self, SpineRules};
use crate::epub::html;
use crate::epub::{ChapterData, NovelData, RawContainer, VolumeData};
use crate::error::EpubError;

const MARKER_PATH: &str = "oebps/info.txt";
const MARKER: &str = "https://github.com/404-novel-project/novel-downloader";

static SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^section(\d+)$").expect("valid regex"));

fn rules() -> SpineRules {
    SpineRules {
        boundary: Some(&*SECTION),
        chapter_volume: None,
    }
}

pub(crate) fn detect(raw: &RawContainer) -> bool {
    match raw.get_ignore_case(MARKER_PATH) {
        Some(bytes) => {
            let found = String::from_utf8_lossy(bytes).contains(MARKER);
            if !found {
                tracing::debug!("Found info.txt without the novel-downloader marker");
            }
            found
        }
        None => false,
    }
}

pub(crate) fn transform_novel(raw: &RawContainer) -> Result<NovelData, EpubError> {
    let opf = common::parse_opf(raw)?;
    let mut novel = common::base_novel(&opf);

    let synopsis = raw
        .files()
        .find(|(path, _)| path.to_lowercase().contains("synopsis.xhtml"))
        .map(|(_, bytes)| html::extract_text(&String::from_utf8_lossy(bytes)));
    match synopsis {
        Some(text) if !text.is_empty() => novel.synopsis = text,
        _ => tracing::debug!("No synopsis page, using description"),
    }

    Ok(novel)
}

pub(crate) fn transform_volumes(raw: &RawContainer) -> Result<Vec<VolumeData>, EpubError> {
    let opf = common::parse_opf(raw)?;
    let (volumes, _) = common::layout(common::spine_documents(raw, &opf), rules());
    Ok(volumes)
}

pub(crate) fn transform_chapters(raw: &RawContainer) -> Result<Vec<ChapterData>, EpubError> {
    let opf = common::parse_opf(raw)?;
    let (_, slots) = common::layout(common::spine_documents(raw, &opf), rules());
    Ok(common::into_chapters(slots))
}
