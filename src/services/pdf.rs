// src/services/pdf.rs
//! Resume text extraction from uploaded PDF bytes

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use super::prompt::{abbreviate, clean_text};

/// Resume text is truncated before prompting to bound request size
const MAX_RESUME_LENGTH: usize = 3500;

/// Extract and clean the text of an uploaded resume PDF.
///
/// Trailing references/declaration sections carry no signal for matching
/// and are cut before truncation.
pub fn extract_resume_text(bytes: &[u8], filename: &str) -> Result<String> {
    info!(filename = %filename, size = bytes.len(), "Parsing resume PDF");

    let raw = pdf_extract::extract_text_from_mem(bytes)
        .with_context(|| format!("failed to extract text from PDF '{}'", filename))?;

    let cleaned = clean_text(&raw);
    let cut = cut_trailing_sections(&cleaned);
    let truncated = abbreviate(cut, MAX_RESUME_LENGTH);

    info!(
        filename = %filename,
        raw_chars = raw.len(),
        cleaned_chars = truncated.len(),
        "Resume text extracted"
    );

    Ok(truncated)
}

/// Drop everything from the first references/declaration heading onward
fn cut_trailing_sections(text: &str) -> &str {
    match Regex::new(r"(?i)\b(references|declaration)\b") {
        Ok(re) => match re.find(text) {
            Some(m) => text[..m.start()].trim_end(),
            None => text,
        },
        Err(_) => text,
    }
}
