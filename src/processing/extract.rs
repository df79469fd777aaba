//! PDF text extraction.
//!
//! Uploads are written to a scratch file only for the duration of extraction. The file is a
//! [`tempfile::NamedTempFile`], so it is removed when dropped on every return path, including
//! parse failures and panics inside the blocking task.

use std::io::Write;
use std::path::PathBuf;

use lopdf::Document;

use super::types::{ExtractionError, PageText};

/// Reads per-page text from PDF bytes using `lopdf`.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    scratch_dir: PathBuf,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::with_scratch_dir(std::env::temp_dir())
    }
}

impl PdfExtractor {
    /// Stage uploads under `scratch_dir` instead of the system temp directory.
    pub fn with_scratch_dir(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Extract text for every page, in page order.
    ///
    /// Pages whose text cannot be decoded are logged and returned empty; a document that is not
    /// a PDF at all is an error.
    pub async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<PageText>, ExtractionError> {
        let scratch_dir = self.scratch_dir.clone();
        tokio::task::spawn_blocking(move || extract_pages_blocking(&scratch_dir, &bytes)).await?
    }
}

fn extract_pages_blocking(
    scratch_dir: &std::path::Path,
    bytes: &[u8],
) -> Result<Vec<PageText>, ExtractionError> {
    let mut scratch = tempfile::Builder::new()
        .prefix("askpdf-upload-")
        .suffix(".pdf")
        .tempfile_in(scratch_dir)?;
    scratch.write_all(bytes)?;
    scratch.flush()?;

    let document =
        Document::load(scratch.path()).map_err(|error| ExtractionError::Pdf(error.to_string()))?;
    read_pages(&document)
}

fn read_pages(document: &Document) -> Result<Vec<PageText>, ExtractionError> {
    let page_numbers: Vec<u32> = document.get_pages().into_keys().collect();
    if page_numbers.is_empty() {
        return Err(ExtractionError::Pdf("document has no pages".into()));
    }

    let pages = page_numbers
        .into_iter()
        .map(|number| {
            let text = document.extract_text(&[number]).unwrap_or_else(|error| {
                tracing::warn!(page = number, error = %error, "Failed to extract page text");
                String::new()
            });
            PageText { number, text }
        })
        .collect();

    Ok(pages)
}
