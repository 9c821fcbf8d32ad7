//! # edgequake-pdfcompare
//!
//! Compare two or more PDF documents with a Large Language Model and render
//! the result as a PDF report.
//!
//! ## Why this crate?
//!
//! Reading several long documents side by side to find where they agree,
//! where they differ and which one fits a purpose is slow. This crate
//! extracts each document's text, asks a model for a structured summary of
//! each, a structured comparison across all of them and a short list of
//! actionable insights, then lays the result out as a one-table PDF report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF × N
//!  │
//!  ├─ 1. Input      local path, URL or in-memory bytes; %PDF check
//!  ├─ 2. Extract    page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Summarize  one model call per document → JSON summary
//!  ├─ 4. Compare    one model call over all summaries → JSON comparison
//!  ├─ 5. Insights   one model call over the comparison → bullet points
//!  └─ 6. Report     title, document list, results table, insights → PDF
//! ```
//!
//! Model payloads are stored verbatim. JSON is parsed leniently only when a
//! view needs structure; a malformed payload degrades the report (empty
//! table) instead of failing the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfcompare::{compare_to_report, CompareConfig, Credential, DocumentSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CompareConfig::builder()
//!         .maybe_credential(Credential::from_env("openai"))
//!         .build()?;
//!     let sources = vec![
//!         DocumentSource::from_path("input_pdfs/offer_a.pdf"),
//!         DocumentSource::from_path("input_pdfs/offer_b.pdf"),
//!     ];
//!     let output = compare_to_report(&sources, "output_reports/a_vs_b.pdf", &config).await?;
//!     println!("{}", output.run.insights.insights);
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.total_input_tokens,
//!         output.stats.total_output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfcompare` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfcompare = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! - the pdfium shared library (`PDFIUM_LIB_PATH`, the working directory, or
//!   the system library path)
//! - a TrueType font family for the report (Liberation Sans by default)
//! - an API key for the chosen provider (`OPENAI_API_KEY`, ...)

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compare;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compare::{
    compare, compare_texts, compare_to_report, compare_to_report_sync, default_report_path,
    extract_texts, write_run_report,
};
pub use config::{CompareConfig, CompareConfigBuilder, Credential, FontSettings};
pub use document::{DocumentSource, DocumentText, SourceData};
pub use error::CompareError;
pub use output::{
    ComparisonOutput, ComparisonResult, ComparisonRun, InsightsResult, RunStats, Stage,
    SummaryRecord,
};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::llm::{ChatModel, ModelError, ModelReply, Sampling, ScriptedModel};
pub use pipeline::parse::{ComparisonView, DifferenceView, ParsedPayload};
pub use progress::{ComparisonProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::ReportDocument;
