//! Any well-formed EPUB whose spine reaches real content documents
//!
//! No vendor conventions: one virtual volume, chapters in spine order.

use super::common::{self, SpineRules};
use crate::epub::{ChapterData, NovelData, RawContainer, VolumeData};
use crate::error::EpubError;

/// The OPF parses and its spine resolves to at least one HTML document
/// present in the container.
pub(crate) fn detect(raw: &RawContainer) -> bool {
    match common::parse_opf(raw) {
        Ok(opf) => common::has_content_documents(raw, &opf),
        Err(e) => {
            tracing::debug!(error = %e, "Generic detection failed to read OPF");
            false
        }
    }
}

pub(crate) fn transform_novel(raw: &RawContainer) -> Result<NovelData, EpubError> {
    let opf = common::parse_opf(raw)?;
    let mut novel = common::base_novel(&opf);
    novel.cover = common::find_cover(raw, &opf);
    Ok(novel)
}

pub(crate) fn transform_volumes(raw: &RawContainer) -> Result<Vec<VolumeData>, EpubError> {
    let opf = common::parse_opf(raw)?;
    let (volumes, _) = common::layout(common::spine_documents(raw, &opf), SpineRules::default());
    Ok(volumes)
}

pub(crate) fn transform_chapters(raw: &RawContainer) -> Result<Vec<ChapterData>, EpubError> {
    let opf = common::parse_opf(raw)?;
    let (_, slots) = common::layout(common::spine_documents(raw, &opf), SpineRules::default());
    Ok(common::into_chapters(slots))
}
