//! Text extraction: PDF bytes → one string per document via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and does CPU-heavy parsing. Running it on the blocking pool keeps
//! the Tokio workers free.
//!
//! Extraction is a seam ([`TextExtractor`]) so the orchestrator can be driven
//! by a fake in tests without a pdfium shared library on the machine.

use crate::document::{DocumentSource, DocumentText};
use crate::error::CompareError;
use crate::pipeline::input;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Environment variable naming a directory that contains libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Produces the full text of one document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, source: &DocumentSource) -> Result<DocumentText, CompareError>;
}

/// The default extractor: load bytes, then read every page with pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumExtractor {
    download_timeout_secs: u64,
}

impl PdfiumExtractor {
    pub fn new(download_timeout_secs: u64) -> Self {
        Self {
            download_timeout_secs,
        }
    }
}

impl Default for PdfiumExtractor {
    fn default() -> Self {
        Self::new(120)
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract(&self, source: &DocumentSource) -> Result<DocumentText, CompareError> {
        let bytes = input::load_source(source, self.download_timeout_secs).await?;
        let content = extract_text_from_bytes(&source.name, bytes).await?;
        info!("Extracted {} chars from '{}'", content.len(), source.name);
        Ok(DocumentText::new(source.name.clone(), content))
    }
}

/// Extract the text of an in-memory PDF.
pub async fn extract_text_from_bytes(name: &str, bytes: Vec<u8>) -> Result<String, CompareError> {
    let name = name.to_string();
    tokio::task::spawn_blocking(move || extract_text_blocking(&name, &bytes))
        .await
        .map_err(|e| CompareError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of text extraction.
fn extract_text_blocking(name: &str, bytes: &[u8]) -> Result<String, CompareError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| CompareError::CorruptPdf {
            name: name.to_string(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    debug!("'{}': {} pages", name, pages.len());

    let page_texts = pages.iter().enumerate().map(|(idx, page)| match page.text() {
        Ok(text) => text.all(),
        Err(e) => {
            debug!("'{}' page {}: no text layer ({:?})", name, idx + 1, e);
            String::new()
        }
    });

    Ok(join_page_texts(page_texts))
}

/// Join page texts, one trailing newline per page, then trim the whole.
///
/// A page with no text still contributes its newline, so the output is empty
/// only when every page is empty.
pub fn join_page_texts<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for page in pages {
        text.push_str(page.as_ref());
        text.push('\n');
    }
    text.trim().to_string()
}

/// Bind pdfium: `PDFIUM_LIB_PATH`, then the working directory, then the system.
pub fn bind_pdfium() -> Result<Pdfium, CompareError> {
    let from_env = std::env::var(PDFIUM_LIB_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty());

    let bindings = match from_env {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
            dir.as_str(),
        ))
        .map_err(|e| {
            CompareError::PdfiumBindingFailed(format!("{PDFIUM_LIB_PATH_ENV}={dir}: {e:?}"))
        })?,
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| CompareError::PdfiumBindingFailed(format!("{e:?}")))?,
    };

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_trims_and_keeps_blank_pages() {
        assert_eq!(join_page_texts(["  first", "", "third  "]), "first\n\nthird");
        assert_eq!(join_page_texts(["", "", ""]), "");
        assert_eq!(join_page_texts(Vec::<String>::new()), "");
    }

    #[test]
    fn more_pages_never_shorter() {
        let pages = ["alpha", "", "beta", "gamma"];
        let mut last = 0;
        for n in 1..=pages.len() {
            let len = join_page_texts(&pages[..n]).len();
            assert!(len >= last, "{n} pages gave {len} < {last}");
            last = len;
        }
    }

    #[tokio::test]
    async fn extractor_rejects_non_pdf_before_pdfium() {
        let extractor = PdfiumExtractor::default();
        let source = DocumentSource::from_bytes("fake.pdf", b"plain text".to_vec());
        let err = extractor.extract(&source).await.unwrap_err();
        assert!(matches!(err, CompareError::NotAPdf { .. }));
    }
}
