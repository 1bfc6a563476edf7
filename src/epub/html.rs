//! Plain-text extraction from chapter markup

use std::cell::RefCell;
use std::sync::LazyLock;

use lol_html::{doc_text, element, rewrite_str, RewriteStrSettings};
use regex::Regex;

static H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1(?:\s[^>]*)?>(.*?)</h1\s*>").expect("valid regex"));
static H2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2(?:\s[^>]*)?>(.*?)</h2\s*>").expect("valid regex"));
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ([,.:;!?])").expect("valid regex"));

/// Extract the visible text of an HTML document.
///
/// Each text node is entity-decoded and trimmed; non-empty nodes are joined
/// with a single space. The document head and script and style bodies are dropped. Markup the
/// rewriter rejects yields an empty string.
pub fn extract_text(html: &str) -> String {
    let Ok(stripped) = strip_non_content(html) else {
        return String::new();
    };

    let parts = RefCell::new(Vec::<String>::new());
    let current = RefCell::new(String::new());

    let result = rewrite_str(
        &stripped,
        RewriteStrSettings {
            document_content_handlers: vec![doc_text!(|t| {
                current.borrow_mut().push_str(t.as_str());
                if t.last_in_text_node() {
                    let raw = std::mem::take(&mut *current.borrow_mut());
                    let decoded = html_escape::decode_html_entities(&raw);
                    let text = decoded.trim();
                    if !text.is_empty() {
                        parts.borrow_mut().push(text.to_string());
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    );

    match result {
        Ok(_) => parts.into_inner().join(" "),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to extract text from HTML");
            String::new()
        }
    }
}

fn strip_non_content(html: &str) -> Result<String, lol_html::errors::RewritingError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("head", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
}

/// Title from the first `<h1>`, else the first `<h2>`, with markup stripped.
///
/// Tags become spaces so `<br>` still separates words; a space left in front
/// of punctuation by an inline tag is removed.
pub fn heading_title(html: &str) -> Option<String> {
    [&*H1, &*H2].into_iter().find_map(|re| {
        let inner = re.captures(html)?.get(1)?.as_str();
        let text = TAGS.replace_all(inner, " ");
        let decoded = html_escape::decode_html_entities(&text);
        let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
        let title = SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1").into_owned();
        (!title.is_empty()).then_some(title)
    })
}

pub fn word_count(text: &str) -> i64 {
    text.split_whitespace().count() as i64
}
