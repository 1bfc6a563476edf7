//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::io::{Cursor, Write};

use sqlx::SqlitePool;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use novel_ingest::config::DatabaseConfig;
use novel_ingest::db;

pub const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub async fn memory_pool() -> SqlitePool {
    db::create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .unwrap()
}

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// An OPF whose manifest and spine list `docs` (id, href) in order
pub fn opf(title: &str, subjects: &[&str], docs: &[(&str, &str)]) -> String {
    let subjects: String = subjects
        .iter()
        .map(|s| format!("    <dc:subject>{}</dc:subject>\n", s))
        .collect();
    let manifest: String = docs
        .iter()
        .map(|(id, href)| {
            format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                id, href
            )
        })
        .collect();
    let spine: String = docs
        .iter()
        .map(|(id, _)| format!("    <itemref idref=\"{}\"/>\n", id))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{}</dc:title>
    <dc:creator>Unknown</dc:creator>
    <dc:language>en</dc:language>
{}  </metadata>
  <manifest>
{}  </manifest>
  <spine>
{}  </spine>
</package>"#,
        title, subjects, manifest, spine
    )
}

/// novel-downloader export: marker, one section page, two chapters
pub fn novel_downloader_epub() -> Vec<u8> {
    let opf = opf(
        "Lord of the Mysteries",
        &["Mystery"],
        &[
            ("s1", "Text/section0001.xhtml"),
            ("c1", "Text/chapter0001.xhtml"),
            ("c2", "Text/chapter0002.xhtml"),
        ],
    );
    zip_bytes(&[
        ("META-INF/container.xml", CONTAINER_XML),
        (
            "OEBPS/info.txt",
            "Downloaded with https://github.com/404-novel-project/novel-downloader",
        ),
        ("OEBPS/content.opf", &opf),
        ("OEBPS/Text/section0001.xhtml", "<html><body><h1>Volume One: Clown</h1></body></html>"),
        (
            "OEBPS/Text/chapter0001.xhtml",
            "<html><body><h1>Crimson</h1><p>Pain woke him.</p></body></html>",
        ),
        (
            "OEBPS/Text/chapter0002.xhtml",
            "<html><body><h1>Situation</h1><p>He looked around the room.</p></body></html>",
        ),
    ])
}

/// EPUB with no vendor marker and nothing special in its file names
pub fn plain_epub(title: &str, subjects: &[&str]) -> Vec<u8> {
    let opf = opf(
        title,
        subjects,
        &[
            ("p3", "Text/part-c.xhtml"),
            ("p1", "Text/part-a.xhtml"),
            ("p2", "Text/part-b.xhtml"),
        ],
    );
    zip_bytes(&[
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", &opf),
        ("OEBPS/Text/part-a.xhtml", "<h1>Second</h1><p>b b</p>"),
        ("OEBPS/Text/part-b.xhtml", "<h1>Third</h1><p>c c c</p>"),
        ("OEBPS/Text/part-c.xhtml", "<h1>First</h1><p>a</p>"),
    ])
}
