//! Spine scanning shared by every source variant

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::epub::html;
use crate::epub::opf::{file_stem, resolve_href};
use crate::epub::{ChapterData, CoverImage, ManifestItem, NovelData, OpfPackage, RawContainer, VolumeData};
use crate::error::EpubError;

pub(crate) const DEFAULT_LANGUAGE: &str = "en";

static NON_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:cover|synopsis|intro|info|nav|toc|titlepage)(?:[_-].*|\d*)$").expect("valid regex")
});

/// Filename conventions a source uses to mark volumes
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SpineRules {
    /// Stem of a page that opens a volume; group 1 is the ordinal
    pub boundary: Option<&'static Regex>,
    /// Stem of a chapter file that names its own volume; group 1 is the ordinal
    pub chapter_volume: Option<&'static Regex>,
}

/// A spine entry resolved to an HTML document inside the container
#[derive(Debug, Clone)]
pub(crate) struct SpineDoc<'a> {
    pub item: &'a ManifestItem,
    pub path: String,
    pub stem: String,
    pub html: String,
}

/// A chapter's place in the volume tree before its text is extracted
#[derive(Debug, Clone)]
pub(crate) struct ChapterSlot<'a> {
    pub volume_index: usize,
    pub order_num: i64,
    pub doc: SpineDoc<'a>,
}

pub(crate) fn parse_opf(raw: &RawContainer) -> Result<OpfPackage, EpubError> {
    OpfPackage::parse(raw.opf_bytes()?)
}

/// Metadata every source reads the same way
pub(crate) fn base_novel(opf: &OpfPackage) -> NovelData {
    let meta = &opf.metadata;
    let description = meta.description.join(" ");

    NovelData {
        title: meta.title.first().cloned().unwrap_or_default(),
        original_author: meta.creator.join(", "),
        synopsis: description.clone(),
        description,
        publisher: meta.publisher.first().cloned().unwrap_or_default(),
        original_language: meta
            .language
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        tags: meta.subject.clone(),
        cover: None,
    }
}

/// Standalone cover image: a `cover.{jpg,jpeg,png}` file, else a manifest
/// image whose id mentions "cover".
pub(crate) fn find_cover(raw: &RawContainer, opf: &OpfPackage) -> Option<CoverImage> {
    let by_name = raw.files().find(|(path, _)| {
        let lower = path.to_lowercase();
        ["cover.jpg", "cover.jpeg", "cover.png"]
            .iter()
            .any(|name| lower.ends_with(name))
    });
    if let Some((path, bytes)) = by_name {
        tracing::info!(path = %path, "Found cover image");
        return Some(CoverImage {
            file_name: path.to_string(),
            bytes: bytes.to_vec(),
        });
    }

    opf.manifest
        .iter()
        .filter(|item| item.is_image() && item.id.to_lowercase().contains("cover"))
        .find_map(|item| {
            let path = resolve_href(raw.opf_dir(), &item.href);
            let bytes = raw.get(&path)?;
            tracing::info!(path = %path, "Found cover image in manifest");
            Some(CoverImage {
                file_name: path,
                bytes: bytes.to_vec(),
            })
        })
}

/// Resolve the spine to HTML documents, in reading order.
///
/// Dangling refs, non-HTML items and files missing from the container are
/// skipped with a log line.
pub(crate) fn spine_documents<'a>(raw: &RawContainer, opf: &'a OpfPackage) -> Vec<SpineDoc<'a>> {
    let mut docs = Vec::new();

    for itemref in &opf.spine.itemrefs {
        let Some(item) = opf.manifest_item(&itemref.idref) else {
            tracing::warn!(idref = %itemref.idref, "Manifest item not found for spine ref");
            continue;
        };
        if !item.is_html() {
            continue;
        }

        let path = resolve_href(raw.opf_dir(), &item.href);
        let Some(bytes) = raw.get(&path) else {
            tracing::warn!(path = %path, "Content file not found");
            continue;
        };

        docs.push(SpineDoc {
            item,
            stem: file_stem(&path),
            html: String::from_utf8_lossy(bytes).into_owned(),
            path,
        });
    }

    docs
}

/// Whether the spine reaches at least one HTML document in the container
pub(crate) fn has_content_documents(raw: &RawContainer, opf: &OpfPackage) -> bool {
    opf.spine_items().any(|item| {
        item.is_html() && raw.contains(&resolve_href(raw.opf_dir(), &item.href))
    })
}

fn is_non_chapter(doc: &SpineDoc) -> bool {
    doc.item.is_nav() || NON_CHAPTER.is_match(&doc.stem)
}

fn ordinal(re: Option<&Regex>, stem: &str) -> Option<i64> {
    re?.captures(stem)?.get(1)?.as_str().parse().ok()
}

/// Walk the spine once, building the volume list and placing chapters in it.
///
/// A boundary page opens (or names) the volume with its ordinal. A chapter
/// goes to the volume its own filename names, else the most recent boundary,
/// else the first volume. With no volumes found the result is one virtual
/// volume.
pub(crate) fn layout<'a>(
    docs: Vec<SpineDoc<'a>>,
    rules: SpineRules,
) -> (Vec<VolumeData>, Vec<ChapterSlot<'a>>) {
    let mut volumes: Vec<VolumeData> = Vec::new();
    let mut by_ordinal: HashMap<i64, usize> = HashMap::new();
    let mut counters: HashMap<usize, i64> = HashMap::new();
    let mut slots = Vec::new();
    let mut current: Option<usize> = None;

    let mut volume_index = |volumes: &mut Vec<VolumeData>, number: i64| -> usize {
        *by_ordinal.entry(number).or_insert_with(|| {
            volumes.push(VolumeData {
                number,
                title: format!("Volume {}", number),
                is_virtual: false,
            });
            volumes.len() - 1
        })
    };

    for doc in docs {
        if let Some(number) = ordinal(rules.boundary, &doc.stem) {
            let index = volume_index(&mut volumes, number);
            if let Some(title) = html::heading_title(&doc.html) {
                volumes[index].title = title;
            }
            current = Some(index);
            continue;
        }

        if is_non_chapter(&doc) {
            tracing::debug!(path = %doc.path, "Skipping non-chapter document");
            continue;
        }

        let index = match ordinal(rules.chapter_volume, &doc.stem) {
            Some(number) => volume_index(&mut volumes, number),
            None => current.unwrap_or(0),
        };
        let counter = counters.entry(index).or_insert(0);
        *counter += 1;

        slots.push(ChapterSlot {
            volume_index: index,
            order_num: *counter,
            doc,
        });
    }

    if volumes.is_empty() {
        volumes.push(VolumeData::virtual_default());
    }

    (volumes, slots)
}

/// Extract title and text for each placed chapter
pub(crate) fn into_chapters(slots: Vec<ChapterSlot>) -> Vec<ChapterData> {
    slots
        .into_iter()
        .map(|slot| ChapterData {
            volume_index: slot.volume_index,
            order_num: slot.order_num,
            title: html::heading_title(&slot.doc.html)
                .unwrap_or_else(|| format!("Chapter {}", slot.order_num)),
            plain_text: html::extract_text(&slot.doc.html),
            content: slot.doc.html,
            source_path: slot.doc.path,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    static SECTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^section(\d+)$").unwrap());

    fn item(id: &str) -> ManifestItem {
        ManifestItem {
            id: id.to_string(),
            href: format!("{}.xhtml", id),
            media_type: "application/xhtml+xml".to_string(),
            properties: None,
        }
    }

    fn doc<'a>(item: &'a ManifestItem, html: &str) -> SpineDoc<'a> {
        SpineDoc {
            item,
            path: item.href.clone(),
            stem: file_stem(&item.href),
            html: html.to_string(),
        }
    }

    #[test]
    fn test_layout_without_boundaries_is_virtual() {
        let a = item("a");
        let b = item("b");
        let (volumes, slots) = layout(
            vec![doc(&a, "<p>a</p>"), doc(&b, "<p>b</p>")],
            SpineRules::default(),
        );
        assert_eq!(volumes, vec![VolumeData::virtual_default()]);
        let orders: Vec<i64> = slots.iter().map(|s| s.order_num).collect();
        assert_eq!(orders, vec![1, 2]);
        assert!(slots.iter().all(|s| s.volume_index == 0));
    }

    #[test]
    fn test_layout_counts_per_volume() {
        let (s1, c1, c2, s2, c3) = (
            item("section1"),
            item("c1"),
            item("c2"),
            item("section2"),
            item("c3"),
        );
        let rules = SpineRules {
            boundary: Some(&*SECTION),
            chapter_volume: None,
        };
        let (volumes, slots) = layout(
            vec![
                doc(&s1, "<h1>Book One</h1>"),
                doc(&c1, ""),
                doc(&c2, ""),
                doc(&s2, "<p>no heading</p>"),
                doc(&c3, ""),
            ],
            rules,
        );

        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].title, "Book One");
        assert_eq!(volumes[1].title, "Volume 2");
        assert!(volumes.iter().all(|v| !v.is_virtual));

        let placed: Vec<(usize, i64)> = slots.iter().map(|s| (s.volume_index, s.order_num)).collect();
        assert_eq!(placed, vec![(0, 1), (0, 2), (1, 1)]);
    }

    #[test]
    fn test_layout_skips_non_chapters() {
        let (cover, synopsis, ch) = (item("cover"), item("synopsis"), item("chapter1"));
        let (_, slots) = layout(
            vec![doc(&cover, ""), doc(&synopsis, ""), doc(&ch, "")],
            SpineRules::default(),
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].doc.stem, "chapter1");
    }

    #[test]
    fn test_non_chapter_pattern_is_anchored() {
        assert!(NON_CHAPTER.is_match("cover"));
        assert!(NON_CHAPTER.is_match("toc"));
        assert!(NON_CHAPTER.is_match("intro_page"));
        assert!(!NON_CHAPTER.is_match("coverage"));
        assert!(!NON_CHAPTER.is_match("discover"));
    }

    #[test]
    fn test_chapter_title_fallback() {
        let c = item("c1");
        let chapters = into_chapters(vec![ChapterSlot {
            volume_index: 0,
            order_num: 7,
            doc: doc(&c, "<p>Just text</p>"),
        }]);
        assert_eq!(chapters[0].title, "Chapter 7");
        assert_eq!(chapters[0].plain_text, "Just text");
    }
}
