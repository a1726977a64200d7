//! Document-to-text extraction for uploaded study material.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::debug;

use crate::error::ExtractionError;

const MIME_PLAIN_TEXT: &str = "text/plain";
const MIME_PDF: &str = "application/pdf";

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    /// Maximum content length in characters. Bounds downstream model
    /// calls; anything longer is cut and flagged.
    pub max_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig { max_chars: 20_000 }
    }
}

/// Normalized topic content. Truncation is reported, never silent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub truncated: bool,
}

/// Extract normalized text from an uploaded document.
///
/// Only `text/plain` and `application/pdf` are supported. Encrypted or
/// corrupt PDFs fail with `ExtractionFailed` rather than taking the
/// caller down with them.
pub fn extract(
    raw: &[u8],
    mime: &str,
    config: &ExtractorConfig,
) -> Result<Extracted, ExtractionError> {
    let text = match mime_essence(mime).as_str() {
        MIME_PLAIN_TEXT => std::str::from_utf8(raw)
            .map_err(|err| ExtractionError::ExtractionFailed(format!("invalid UTF-8: {err}")))?
            .to_string(),
        MIME_PDF => pdf_text(raw)?,
        other => return Err(ExtractionError::UnsupportedFormat(other.to_string())),
    };

    let normalized = collapse_whitespace(&text);
    if normalized.is_empty() {
        return Err(ExtractionError::ExtractionFailed(
            "document contains no text".to_string(),
        ));
    }

    let extracted = truncate_chars(normalized, config.max_chars);
    debug!(
        chars = extracted.text.len(),
        truncated = extracted.truncated,
        "extracted document"
    );
    Ok(extracted)
}

// "text/plain; charset=utf-8" -> "text/plain"
fn mime_essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_lowercase()
}

fn pdf_text(raw: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs; contain those along
    // with its ordinary errors.
    let outcome = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(raw)));
    match outcome {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => Err(ExtractionError::ExtractionFailed(format!(
            "pdf extraction failed: {err}"
        ))),
        Err(_) => Err(ExtractionError::ExtractionFailed(
            "pdf extraction panicked on malformed input".to_string(),
        )),
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }

    while out.ends_with(' ') {
        out.pop();
    }
    out
}

fn truncate_chars(text: String, max_chars: usize) -> Extracted {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => Extracted {
            text: text[..byte_idx].trim_end().to_string(),
            truncated: true,
        },
        None => Extracted {
            text,
            truncated: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_normalized() {
        let config = ExtractorConfig::default();
        let raw = b"  The mitochondria\n\n  is the   powerhouse\tof the cell  ";
        let extracted = extract(raw, "text/plain", &config).unwrap();
        assert_eq!(
            extracted.text,
            "The mitochondria is the powerhouse of the cell"
        );
        assert!(!extracted.truncated);
    }

    #[test]
    fn mime_parameters_are_ignored() {
        let config = ExtractorConfig::default();
        let extracted = extract(b"hello", "Text/Plain; charset=utf-8", &config).unwrap();
        assert_eq!(extracted.text, "hello");
    }

    #[test]
    fn unsupported_mime_is_rejected() {
        let config = ExtractorConfig::default();
        let err = extract(b"...", "image/png", &config).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(m) if m == "image/png"));
    }

    #[test]
    fn invalid_utf8_fails() {
        let config = ExtractorConfig::default();
        let err = extract(&[0xff, 0xfe, 0x00], "text/plain", &config).unwrap_err();
        assert!(matches!(err, ExtractionError::ExtractionFailed(_)));
    }

    #[test]
    fn one_char_over_the_limit_truncates_with_flag() {
        let config = ExtractorConfig { max_chars: 64 };
        let raw: Vec<u8> = std::iter::repeat_n(b'a', config.max_chars + 1).collect();
        let extracted = extract(&raw, "text/plain", &config).unwrap();
        assert!(extracted.truncated);
        assert_eq!(extracted.text.chars().count(), config.max_chars);
    }

    #[test]
    fn exactly_at_the_limit_is_not_truncated() {
        let config = ExtractorConfig { max_chars: 64 };
        let raw: Vec<u8> = std::iter::repeat_n(b'a', config.max_chars).collect();
        let extracted = extract(&raw, "text/plain", &config).unwrap();
        assert!(!extracted.truncated);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let config = ExtractorConfig { max_chars: 2 };
        let extracted = extract("héllo".as_bytes(), "text/plain", &config).unwrap();
        assert_eq!(extracted.text, "hé");
        assert!(extracted.truncated);
    }

    #[test]
    fn whitespace_only_document_fails() {
        let config = ExtractorConfig::default();
        let err = extract(b" \n\t  ", "text/plain", &config).unwrap_err();
        assert!(matches!(err, ExtractionError::ExtractionFailed(_)));
    }

    #[test]
    fn garbage_pdf_fails_without_panicking() {
        let config = ExtractorConfig::default();
        let err = extract(b"%PDF-1.7 not actually a pdf", "application/pdf", &config).unwrap_err();
        assert!(matches!(err, ExtractionError::ExtractionFailed(_)));
    }
}
