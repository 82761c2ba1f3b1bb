//! Document extraction: uploaded bytes to normalized resume text.
//!
//! Extraction failures are terminal for the request and never retried.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::DocumentSettings;
use crate::error::{InputErrorKind, MatchError};
use crate::models::{Resume, ResumeFormat};

static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0E-\x1F\x7F]").expect("valid control-char pattern"));
static HORIZONTAL_WS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").expect("valid whitespace pattern"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-line pattern"));

/// Output of the document extractor
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub resume: Resume,
    pub byte_count: usize,
    pub char_count: usize,
    /// Only known for PDF input
    pub page_count: Option<usize>,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    limits: DocumentSettings,
}

impl DocumentExtractor {
    pub fn new(limits: DocumentSettings) -> Self {
        Self { limits }
    }

    /// Extract normalized text from an uploaded file
    pub async fn extract(
        &self,
        filename: &str,
        format: ResumeFormat,
        bytes: &[u8],
    ) -> Result<ExtractedDocument, MatchError> {
        if bytes.is_empty() {
            return Err(MatchError::input(InputErrorKind::EmptyDocument, "File is empty"));
        }

        if bytes.len() > self.limits.max_file_bytes {
            return Err(MatchError::input(
                InputErrorKind::DocumentTooLarge,
                format!(
                    "File too large ({:.1}MB). Maximum file size is {:.1}MB.",
                    bytes.len() as f64 / (1024.0 * 1024.0),
                    self.limits.max_file_bytes as f64 / (1024.0 * 1024.0)
                ),
            ));
        }

        let (raw, page_count) = match format {
            ResumeFormat::Pdf => {
                let pages = extract_pdf_pages(bytes.to_vec()).await?;
                if pages.len() > self.limits.max_pages {
                    return Err(MatchError::input(
                        InputErrorKind::DocumentTooLarge,
                        format!(
                            "PDF has {} pages. Maximum is {} pages.",
                            pages.len(),
                            self.limits.max_pages
                        ),
                    ));
                }
                let count = pages.len();
                (pages.join("\n\n"), Some(count))
            }
            ResumeFormat::Txt => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    MatchError::input(
                        InputErrorKind::InvalidEncoding,
                        format!("TXT file must be UTF-8 encoded (invalid byte at offset {})", e.valid_up_to()),
                    )
                })?;
                (text.to_string(), None)
            }
        };

        let mut document = self.finish(filename, format, &raw)?;
        document.byte_count = bytes.len();
        document.page_count = page_count;
        Ok(document)
    }

    /// Normalize text that was already extracted upstream
    pub fn from_text(
        &self,
        filename: &str,
        format: ResumeFormat,
        text: &str,
    ) -> Result<ExtractedDocument, MatchError> {
        self.finish(filename, format, text)
    }

    fn finish(&self, filename: &str, format: ResumeFormat, raw: &str) -> Result<ExtractedDocument, MatchError> {
        let normalized = normalize_text(raw);
        if normalized.is_empty() {
            return Err(MatchError::input(
                InputErrorKind::EmptyDocument,
                "Could not extract any text from file. Please ensure the file contains readable text.",
            ));
        }

        let (content, truncated) = truncate_chars(normalized, self.limits.max_text_chars);
        let char_count = content.chars().count();

        debug!(
            "Extracted {} chars from {} ({}, truncated: {})",
            char_count, filename, format, truncated
        );

        Ok(ExtractedDocument {
            byte_count: raw.len(),
            char_count,
            page_count: None,
            truncated,
            resume: Resume {
                content,
                filename: filename.to_string(),
                format,
            },
        })
    }
}

/// Parse PDF pages on the blocking pool; parser panics become input errors
async fn extract_pdf_pages(bytes: Vec<u8>) -> Result<Vec<String>, MatchError> {
    let parsed = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes)).await;

    match parsed {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(MatchError::input(
            InputErrorKind::MalformedDocument,
            format!("Could not read PDF: {}", e),
        )),
        Err(e) => Err(MatchError::input(
            InputErrorKind::MalformedDocument,
            format!("PDF parser aborted: {}", e),
        )),
    }
}

/// Canonical whitespace: LF line endings, no control characters, single
/// spaces within lines, trimmed lines, at most one blank line in a row.
pub fn normalize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace(['\r', '\x0C'], "\n");
    let without_controls = CONTROL_CHARS.replace_all(&unified, "");

    let lines: Vec<String> = without_controls
        .lines()
        .map(|line| HORIZONTAL_WS.replace_all(line, " ").trim().to_string())
        .collect();

    BLANK_RUNS.replace_all(&lines.join("\n"), "\n\n").trim().to_string()
}

/// Keep the first `max_chars` characters, cutting on a char boundary
pub fn truncate_chars(text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => (text, false),
    }
}
