//! ZIP container extraction
//!
//! Reads every file of an EPUB into memory and locates the OPF package
//! through `META-INF/container.xml`. Nothing here looks at content.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::EpubError;

pub const CONTAINER_XML: &str = "META-INF/container.xml";

/// All files of an EPUB, keyed by their path inside the archive
#[derive(Debug, Clone)]
pub struct RawContainer {
    files: BTreeMap<String, Vec<u8>>,
    opf_path: String,
}

impl RawContainer {
    /// Open an EPUB from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, EpubError> {
        if data.is_empty() {
            return Err(EpubError::EmptyContainer);
        }

        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| EpubError::ContainerCorrupt(e.to_string()))?;

        let mut files = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = match archive.by_index(i) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(index = i, error = %e, "Skipping unreadable ZIP entry");
                    continue;
                }
            };
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            let mut content = Vec::new();
            if let Err(e) = file.read_to_end(&mut content) {
                tracing::warn!(path = %name, error = %e, "Skipping unreadable ZIP entry");
                continue;
            }
            files.insert(name, content);
        }

        if files.is_empty() {
            return Err(EpubError::EmptyContainer);
        }

        let opf_path = find_opf_path(&files)?;
        tracing::debug!(files = files.len(), opf_path = %opf_path, "Extracted EPUB container");

        Ok(Self { files, opf_path })
    }

    pub fn opf_path(&self) -> &str {
        &self.opf_path
    }

    /// Directory the OPF lives in, with a trailing slash (empty at the root)
    pub fn opf_dir(&self) -> &str {
        match self.opf_path.rfind('/') {
            Some(pos) => &self.opf_path[..=pos],
            None => "",
        }
    }

    /// Bytes of the OPF package document
    pub fn opf_bytes(&self) -> Result<&[u8], EpubError> {
        self.get(&self.opf_path).ok_or_else(|| {
            EpubError::InvalidOpf(format!("OPF file not found at {}", self.opf_path))
        })
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Look up a file whose path matches ignoring ASCII case
    pub fn get_ignore_case(&self, path: &str) -> Option<&[u8]> {
        self.get(path).or_else(|| {
            self.files
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(path))
                .map(|(_, content)| content.as_slice())
        })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Find the path to the OPF file from container.xml
fn find_opf_path(files: &BTreeMap<String, Vec<u8>>) -> Result<String, EpubError> {
    let bytes = files
        .get(CONTAINER_XML)
        .ok_or_else(|| EpubError::MissingRootfile(format!("{} not found", CONTAINER_XML)))?;

    let content = String::from_utf8_lossy(bytes);
    let doc = roxmltree::Document::parse(&content)
        .map_err(|e| EpubError::MissingRootfile(format!("invalid container.xml: {}", e)))?;

    doc.descendants()
        .filter(|n| n.tag_name().name() == "rootfile")
        .filter_map(|n| n.attribute("full-path"))
        .map(str::trim)
        .find(|path| !path.is_empty())
        .map(str::to_string)
        .ok_or_else(|| EpubError::MissingRootfile("no rootfile full-path in container.xml".to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    /// Build an in-memory ZIP from (path, content) pairs
    pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}
