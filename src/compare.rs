//! Comparison-run entry points.
//!
//! A run is all-or-nothing:
//!
//! ```text
//! preconditions ──▶ extract × N ──▶ summarize → compare → insights ──▶ report
//! (count, names,    (in order)      (pipeline::stages)                 (optional)
//!  credential)
//! ```
//!
//! Every precondition is checked before any document is read or any model
//! is called, so a rejected run costs nothing.

use crate::config::CompareConfig;
use crate::document::{self, DocumentSource, DocumentText};
use crate::error::CompareError;
use crate::output::{ComparisonOutput, ComparisonRun, RunStats};
use crate::pipeline::extract::{PdfiumExtractor, TextExtractor};
use crate::pipeline::llm::{self, ChatModel};
use crate::pipeline::stages::Comparator;
use crate::report::{self, ReportDocument};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Compare two or more PDF sources.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `sources`: named PDF sources, in the order they should appear
///   everywhere (prompts, run, report)
/// * `config`: comparison configuration; must carry a credential
///
/// # Errors
/// - `NotEnoughDocuments`, `DuplicateDocument`, `MissingCredential` before
///   any work happens
/// - extraction errors (`NotAPdf`, `CorruptPdf`, `FileNotFound`, ...)
/// - `LlmCallFailed` from any stage
pub async fn compare(
    sources: &[DocumentSource],
    config: &CompareConfig,
) -> Result<ComparisonOutput, CompareError> {
    let total_start = Instant::now();
    let model = preflight(sources.iter().map(|s| s.name.as_str()), config)?;
    info!("Starting comparison of {} documents", sources.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(sources.len());
    }

    // ── Step 1: Extract text, in input order ─────────────────────────────
    let extraction_start = Instant::now();
    let documents = extract_all(sources, config).await?;
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

    // ── Step 2: Run the three stages ─────────────────────────────────────
    let mut output = run_stages(model, &documents, config).await?;
    output.stats.extraction_duration_ms = extraction_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Compare documents whose text is already extracted.
///
/// Same preconditions as [`compare`]; no PDF is read.
pub async fn compare_texts(
    documents: &[DocumentText],
    config: &CompareConfig,
) -> Result<ComparisonOutput, CompareError> {
    let total_start = Instant::now();
    let model = preflight(documents.iter().map(|d| d.name.as_str()), config)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(documents.len());
    }

    let mut output = run_stages(model, documents, config).await?;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Compare PDF sources and write the report to `output_path`.
///
/// The report is rendered in memory and written atomically; when any stage
/// fails no file is created.
pub async fn compare_to_report(
    sources: &[DocumentSource],
    output_path: impl AsRef<Path>,
    config: &CompareConfig,
) -> Result<ComparisonOutput, CompareError> {
    let output = compare(sources, config).await?;
    write_run_report(&output.run, output_path.as_ref(), config).await?;
    Ok(output)
}

/// Lay out and write the report for a finished run.
pub async fn write_run_report(
    run: &ComparisonRun,
    output_path: &Path,
    config: &CompareConfig,
) -> Result<(), CompareError> {
    let layout = ReportDocument::from_run(run);
    report::write_report(layout, output_path, config.fonts.clone()).await?;
    Ok(())
}

/// Synchronous wrapper around [`compare_to_report`].
///
/// Creates a temporary tokio runtime internally.
pub fn compare_to_report_sync(
    sources: &[DocumentSource],
    output_path: impl AsRef<Path>,
    config: &CompareConfig,
) -> Result<ComparisonOutput, CompareError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CompareError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(compare_to_report(sources, output_path, config))
}

/// Extract the text of every source without calling a model.
///
/// Does not require a credential.
pub async fn extract_texts(
    sources: &[DocumentSource],
    config: &CompareConfig,
) -> Result<Vec<DocumentText>, CompareError> {
    extract_all(sources, config).await
}

/// Report path inside `output_dir` for a run over `names`.
///
/// `timestamp` is the caller's formatted time (the CLI uses
/// `%Y%m%d_%H%M%S`).
pub fn default_report_path<S: AsRef<str>>(
    output_dir: impl AsRef<Path>,
    names: &[S],
    timestamp: &str,
) -> PathBuf {
    output_dir
        .as_ref()
        .join(document::report_file_name(names, timestamp))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Check everything that can reject a run, then resolve the model.
///
/// Order matters only for which error the caller sees first: count, names,
/// credential, provider.
fn preflight<'a>(
    names: impl ExactSizeIterator<Item = &'a str>,
    config: &CompareConfig,
) -> Result<Arc<dyn ChatModel>, CompareError> {
    if names.len() < 2 {
        return Err(CompareError::NotEnoughDocuments { found: names.len() });
    }
    document::ensure_unique_names(names)?;
    let credential = config.require_credential()?;
    llm::resolve_model(config, credential)
}

async fn extract_all(
    sources: &[DocumentSource],
    config: &CompareConfig,
) -> Result<Vec<DocumentText>, CompareError> {
    let extractor: Arc<dyn TextExtractor> = match config.extractor {
        Some(ref custom) => Arc::clone(custom),
        None => Arc::new(PdfiumExtractor::new(config.download_timeout_secs)),
    };

    let total = sources.len();
    let mut documents = Vec::with_capacity(total);
    for (idx, source) in sources.iter().enumerate() {
        let text = extractor.extract(source).await?;
        debug!("'{}': {} chars extracted", text.name, text.content.len());
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_extracted(idx + 1, total, &text.name, text.content.chars().count());
        }
        documents.push(text);
    }
    Ok(documents)
}

async fn run_stages(
    model: Arc<dyn ChatModel>,
    documents: &[DocumentText],
    config: &CompareConfig,
) -> Result<ComparisonOutput, CompareError> {
    let llm_start = Instant::now();
    let (run, usage) = Comparator::new(model, config).compare(documents).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let stats = RunStats {
        documents: documents.len(),
        model_calls: usage.calls,
        total_input_tokens: usage.prompt_tokens,
        total_output_tokens: usage.completion_tokens,
        extracted_chars: documents.iter().map(|d| d.content.chars().count()).sum(),
        extraction_duration_ms: 0,
        llm_duration_ms,
        total_duration_ms: llm_duration_ms,
    };

    info!(
        "Comparison complete: {} documents, {} model calls, {}ms",
        stats.documents, stats.model_calls, stats.llm_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(documents.len());
    }

    Ok(ComparisonOutput { run, stats })
}
