//! PDF text extraction and cleanup.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::path::Path;
use std::sync::OnceLock;

static WHITESPACE: OnceLock<Regex> = OnceLock::new();

fn whitespace_runs() -> &'static Regex {
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern should compile"))
}

/// Extract the text of every page of a PDF as one cleaned string.
///
/// Pages without extractable text contribute nothing. An empty result means
/// the document has no text layer (e.g. scanned images).
pub fn extract_text(path: &Path, watermark: &str) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .with_context(|| format!("Failed to open PDF: {}", path.display()))?;

    if doc.is_encrypted() {
        log::warn!("{} is encrypted; no text can be extracted", path.display());
        return Ok(String::new());
    }

    let pages = doc.get_pages();
    log::debug!("{} has {} page(s)", path.display(), pages.len());

    let texts = pages.keys().map(|&number| match doc.extract_text(&[number]) {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("Page {} yielded no text: {}", number, e);
            None
        }
    });

    Ok(join_pages(texts, watermark))
}

/// Join per-page text in page order, strip the watermark and collapse whitespace.
pub fn join_pages<I>(pages: I, watermark: &str) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut text = String::new();
    for page in pages.into_iter().flatten() {
        if page.trim().is_empty() {
            continue;
        }
        text.push_str(&page);
        text.push('\n');
    }

    let text = strip_watermark(&text, watermark);
    whitespace_runs().replace_all(&text, " ").trim().to_string()
}

/// Remove every case-insensitive occurrence of `watermark`.
fn strip_watermark(text: &str, watermark: &str) -> String {
    if watermark.is_empty() {
        return text.to_string();
    }

    match RegexBuilder::new(&regex::escape(watermark))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.replace_all(text, "").into_owned(),
        Err(e) => {
            log::warn!("Invalid watermark pattern {:?}: {}", watermark, e);
            text.to_string()
        }
    }
}
