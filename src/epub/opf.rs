//! OPF (Open Packaging Format) parser
//!
//! Elements are matched by local name, so `dc:` prefixes and default
//! namespaces make no difference.

use serde::Serialize;

use crate::error::EpubError;

/// Dublin Core metadata; every field keeps all occurrences, first is canonical
#[derive(Debug, Clone, Default, Serialize)]
pub struct OpfMetadata {
    pub title: Vec<String>,
    pub creator: Vec<String>,
    pub language: Vec<String>,
    pub publisher: Vec<String>,
    pub description: Vec<String>,
    pub subject: Vec<String>,
    pub date: Vec<String>,
    pub identifier: Vec<String>,
    pub rights: Vec<String>,
}

/// Manifest item from OPF
#[derive(Debug, Clone, Serialize)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn is_html(&self) -> bool {
        self.media_type.contains("html")
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// EPUB 3 navigation document
    pub fn is_nav(&self) -> bool {
        self.properties
            .as_deref()
            .map(|p| p.split_whitespace().any(|p| p == "nav"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemRef {
    pub idref: String,
    pub linear: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Spine {
    pub toc: Option<String>,
    pub itemrefs: Vec<ItemRef>,
}

/// Parsed OPF structure
#[derive(Debug, Clone, Default, Serialize)]
pub struct OpfPackage {
    pub metadata: OpfMetadata,
    pub manifest: Vec<ManifestItem>,
    pub spine: Spine,
}

impl OpfPackage {
    /// Parse an OPF document
    pub fn parse(content: &[u8]) -> Result<Self, EpubError> {
        let text = std::str::from_utf8(content)
            .map_err(|e| EpubError::InvalidOpf(format!("not UTF-8: {}", e)))?;
        let doc = roxmltree::Document::parse(text)
            .map_err(|e| EpubError::InvalidOpf(e.to_string()))?;

        let root = doc.root_element();
        if root.tag_name().name() != "package" {
            return Err(EpubError::InvalidOpf(format!(
                "expected <package>, found <{}>",
                root.tag_name().name()
            )));
        }

        Ok(Self {
            metadata: parse_metadata(&root),
            manifest: parse_manifest(&root),
            spine: parse_spine(&root),
        })
    }

    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// Spine entries resolved against the manifest, in reading order.
    ///
    /// Refs that point at no manifest item are dropped.
    pub fn spine_items(&self) -> impl Iterator<Item = &ManifestItem> {
        self.spine
            .itemrefs
            .iter()
            .filter_map(move |itemref| self.manifest_item(&itemref.idref))
    }
}

fn child<'a, 'input>(
    node: &roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn parse_metadata(root: &roxmltree::Node) -> OpfMetadata {
    let mut metadata = OpfMetadata::default();
    let Some(node) = child(root, "metadata") else {
        return metadata;
    };

    // EPUB 2 exports sometimes nest everything in <dc-metadata>
    for el in node.descendants().filter(|n| n.is_element()) {
        let field = match el.tag_name().name() {
            "title" => &mut metadata.title,
            "creator" => &mut metadata.creator,
            "language" => &mut metadata.language,
            "publisher" => &mut metadata.publisher,
            "description" => &mut metadata.description,
            "subject" => &mut metadata.subject,
            "date" => &mut metadata.date,
            "identifier" => &mut metadata.identifier,
            "rights" => &mut metadata.rights,
            _ => continue,
        };

        let text: String = el
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        let text = text.trim();
        if !text.is_empty() {
            field.push(text.to_string());
        }
    }

    metadata
}

fn parse_manifest(root: &roxmltree::Node) -> Vec<ManifestItem> {
    let Some(node) = child(root, "manifest") else {
        return Vec::new();
    };

    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "item")
        .filter_map(|n| {
            let id = n.attribute("id")?;
            let href = n.attribute("href")?;
            Some(ManifestItem {
                id: id.to_string(),
                href: href.to_string(),
                media_type: n.attribute("media-type").unwrap_or_default().to_string(),
                properties: n.attribute("properties").map(|s| s.to_string()),
            })
        })
        .collect()
}

fn parse_spine(root: &roxmltree::Node) -> Spine {
    let Some(node) = child(root, "spine") else {
        return Spine::default();
    };

    let itemrefs = node
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "itemref")
        .filter_map(|n| {
            let idref = n.attribute("idref")?;
            Some(ItemRef {
                idref: idref.to_string(),
                linear: n.attribute("linear").map(|s| s != "no").unwrap_or(true),
            })
        })
        .collect();

    Spine {
        toc: node.attribute("toc").map(|s| s.to_string()),
        itemrefs,
    }
}

/// Resolve a manifest href against the OPF directory into a container path.
///
/// `opf_dir` is empty or ends with `/`. Percent escapes are decoded, any
/// fragment is dropped and `.`/`..` segments are collapsed.
pub fn resolve_href(opf_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let href = urlencoding::decode(href)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string());

    let joined = if href.starts_with('/') {
        href.trim_start_matches('/').to_string()
    } else {
        format!("{}{}", opf_dir, href)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Last path segment without its extension, lowercased
pub fn file_stem(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    };
    stem.to_lowercase()
}
