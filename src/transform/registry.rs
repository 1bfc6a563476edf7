//! Ordered source detection

use super::SourceType;
use crate::epub::RawContainer;
use crate::error::EpubError;

/// Sources tried in order; the first whose predicate holds wins
#[derive(Debug, Clone)]
pub struct TransformerRegistry {
    sources: Vec<SourceType>,
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceType::NovelDownloader,
                SourceType::LightnovelCrawler,
                SourceType::Generic,
            ],
        }
    }
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry trying exactly `sources`, in that order
    pub fn with_sources(sources: Vec<SourceType>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[SourceType] {
        &self.sources
    }

    /// Add a source ahead of the generic entry so it cannot be shadowed by it
    pub fn register(&mut self, source: SourceType) {
        if self.sources.contains(&source) {
            return;
        }
        match self.sources.iter().position(|s| *s == SourceType::Generic) {
            Some(pos) => self.sources.insert(pos, source),
            None => self.sources.push(source),
        }
        tracing::info!(source_type = %source, "Registered source transformer");
    }

    pub fn detect_and_get(&self, raw: &RawContainer) -> Result<SourceType, EpubError> {
        let source = self
            .sources
            .iter()
            .copied()
            .find(|source| source.detect(raw))
            .ok_or(EpubError::UnsupportedSourceFormat)?;

        tracing::info!(source_type = %source, "Detected EPUB source");
        Ok(source)
    }

    /// Forced lookup, skipping detection
    pub fn by_source(&self, source: SourceType) -> Result<SourceType, EpubError> {
        self.sources
            .iter()
            .copied()
            .find(|s| *s == source)
            .ok_or(EpubError::UnsupportedSourceFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::container::test_support::{zip_bytes, CONTAINER};
    use crate::epub::container::CONTAINER_XML;

    const OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>T</dc:title></metadata>
  <manifest>
    <item id="c1" href="Text/chapter1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="c1"/></spine>
</package>"#;

    fn raw(extra: &[(&str, &str)]) -> RawContainer {
        let mut entries = vec![
            (CONTAINER_XML, CONTAINER),
            ("OEBPS/content.opf", OPF),
            ("OEBPS/Text/chapter1.xhtml", "<h1>One</h1>"),
        ];
        entries.extend_from_slice(extra);
        RawContainer::from_bytes(&zip_bytes(&entries)).unwrap()
    }

    #[test]
    fn test_detects_novel_downloader_marker() {
        let raw = raw(&[(
            "OEBPS/info.txt",
            "made with https://github.com/404-novel-project/novel-downloader",
        )]);
        assert_eq!(
            TransformerRegistry::new().detect_and_get(&raw).unwrap(),
            SourceType::NovelDownloader
        );
    }

    #[test]
    fn test_detects_lightnovel_crawler_marker() {
        let raw = raw(&[(
            "epub/INTRO.xhtml",
            r#"<a href="https://github.com/dipu-bd/lightnovel-crawler">lncrawl</a>"#,
        )]);
        assert_eq!(
            TransformerRegistry::new().detect_and_get(&raw).unwrap(),
            SourceType::LightnovelCrawler
        );
    }

    #[test]
    fn test_marker_file_without_marker_text_is_not_vendor() {
        let raw = raw(&[("OEBPS/info.txt", "just some notes")]);
        assert_eq!(
            TransformerRegistry::new().detect_and_get(&raw).unwrap(),
            SourceType::Generic
        );
    }

    #[test]
    fn test_no_content_documents_is_unsupported() {
        let entries = [
            (CONTAINER_XML, CONTAINER),
            ("OEBPS/content.opf", OPF),
        ];
        let raw = RawContainer::from_bytes(&zip_bytes(&entries)).unwrap();
        assert!(matches!(
            TransformerRegistry::new().detect_and_get(&raw),
            Err(EpubError::UnsupportedSourceFormat)
        ));
    }

    #[test]
    fn test_without_generic_nothing_falls_through() {
        let registry = TransformerRegistry::with_sources(vec![SourceType::NovelDownloader]);
        assert!(matches!(
            registry.detect_and_get(&raw(&[])),
            Err(EpubError::UnsupportedSourceFormat)
        ));
    }

    #[test]
    fn test_detection_is_deterministic() {
        let raw = raw(&[]);
        let registry = TransformerRegistry::new();
        let first = registry.detect_and_get(&raw).unwrap();
        for _ in 0..5 {
            assert_eq!(registry.detect_and_get(&raw).unwrap(), first);
        }
    }

    #[test]
    fn test_register_inserts_before_generic() {
        let mut registry =
            TransformerRegistry::with_sources(vec![SourceType::NovelDownloader, SourceType::Generic]);
        registry.register(SourceType::LightnovelCrawler);
        registry.register(SourceType::LightnovelCrawler);
        assert_eq!(
            registry.sources(),
            &[
                SourceType::NovelDownloader,
                SourceType::LightnovelCrawler,
                SourceType::Generic
            ]
        );
        assert!(registry.by_source(SourceType::Generic).is_ok());
    }
}
