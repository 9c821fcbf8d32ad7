//! Error types for the edgequake-pdfcompare library.
//!
//! Every failure that stops a comparison run is a [`CompareError`]. A run is
//! all-or-nothing: the extractor, the three LLM stages and the report writer
//! either all succeed or the caller gets an `Err` and no report file exists.
//!
//! Malformed model output is *not* an error. Stage payloads are
//! stored verbatim and parsed leniently later; see
//! [`crate::pipeline::parse::ParsedPayload`].

use crate::output::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfcompare library.
#[derive(Debug, Error)]
pub enum CompareError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The source was read, but it is not a PDF.
    #[error("Document '{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { name: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium.\n\
  • Place libpdfium next to the binary's working directory.\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Run preconditions ─────────────────────────────────────────────────
    /// Fewer than two documents were supplied.
    #[error("At least two PDF documents are required to compare, got {found}")]
    NotEnoughDocuments { found: usize },

    /// Two sources normalise to the same document name.
    #[error("Duplicate document name '{name}'\nRename one of the files so every document has a unique name.")]
    DuplicateDocument { name: String },

    /// The API credential for the configured provider is absent.
    #[error("API key for provider '{provider}' is missing.\nSet {env_var} in your environment or .env file.")]
    MissingCredential { provider: String, env_var: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A model call failed at the transport level (network, auth, quota).
    #[error("LLM call failed during the {stage} stage: {detail}")]
    LlmCallFailed { stage: Stage, detail: String },

    // ── Report errors ─────────────────────────────────────────────────────
    /// No usable TrueType font family was found for the report.
    #[error(
        "No font family '{family}' found for the report (searched: {searched})\n\
Install Liberation Sans or pass --font-dir / --font-family."
    )]
    FontsUnavailable { family: String, searched: String },

    /// The layout engine rejected the report.
    #[error("Failed to render report: {0}")]
    ReportRenderFailed(String),

    /// Could not create or write the output report.
    #[error("Failed to write report '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompareError {
    /// True for errors raised before any extraction or model call happens.
    ///
    /// The CLI prints these as plain user messages without a stack of
    /// context lines.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CompareError::NotEnoughDocuments { .. }
                | CompareError::DuplicateDocument { .. }
                | CompareError::MissingCredential { .. }
                | CompareError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_enough_documents_display() {
        let e = CompareError::NotEnoughDocuments { found: 1 };
        let msg = e.to_string();
        assert!(msg.contains("two"), "got: {msg}");
        assert!(msg.contains('1'), "got: {msg}");
    }

    #[test]
    fn missing_credential_names_env_var() {
        let e = CompareError::MissingCredential {
            provider: "openai".into(),
            env_var: "OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("OPENAI_API_KEY"));
        assert!(e.is_precondition());
    }

    #[test]
    fn llm_failure_names_stage() {
        let e = CompareError::LlmCallFailed {
            stage: Stage::Compare,
            detail: "401 unauthorized".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("compare"), "got: {msg}");
        assert!(msg.contains("401"));
        assert!(!e.is_precondition());
    }

    #[test]
    fn not_a_pdf_shows_magic() {
        let e = CompareError::NotAPdf {
            name: "notes.pdf".into(),
            magic: b"PK\x03\x04".to_vec(),
        };
        assert!(e.to_string().contains("notes.pdf"));
    }
}
