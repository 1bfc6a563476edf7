//! Exports of lightnovel-crawler (dipu-bd)
//!
//! Marked by `EPUB/intro.xhtml` carrying the project URL. Volume pages are
//! named `volume_N`/`vol-N`; chapter files carry their volume as
//! `chapter_V_N`.

use std::sync::LazyLock;

use regex::Regex;

use super::common::{self, SpineRules};
use crate::epub::{ChapterData, NovelData, RawContainer, VolumeData};
use crate::error::EpubError;

const MARKER_PATH: &str = "EPUB/intro.xhtml";
const MARKER: &str = "https://github.com/dipu-bd/lightnovel-crawler";

static VOLUME_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^vol(?:ume)?[_-]?(\d+)$").expect("valid regex"));
static CHAPTER_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^chapter[_-]?(\d+)[_-](\d+)$").expect("valid regex"));

fn rules() -> SpineRules {
    SpineRules {
        boundary: Some(&*VOLUME_PAGE),
        chapter_volume: Some(&*CHAPTER_FILE),
    }
}

pub(crate) fn detect(raw: &RawContainer) -> bool {
    raw.get_ignore_case(MARKER_PATH)
        .map(|bytes| String::from_utf8_lossy(bytes).contains(MARKER))
        .unwrap_or(false)
}

pub(crate) fn transform_novel(raw: &RawContainer) -> Result<NovelData, EpubError> {
    let opf = common::parse_opf(raw)?;
    let mut novel = common::base_novel(&opf);
    novel.cover = common::find_cover(raw, &opf);
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
