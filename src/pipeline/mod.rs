//! Pipeline stages for PDF comparison.
//!
//! Each submodule implements exactly one step. Keeping them separate makes
//! each independently testable and lets the orchestrator swap the extractor
//! or the model without touching the other steps.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ stages ──────────────────────────▶ parse
//! (bytes)   (pdfium)    summarize → compare → insights     (lenient JSON,
//!                       (llm: one call per step)            report/CLI only)
//! ```
//!
//! 1. [`input`]: load a path, URL or in-memory upload as bytes and check
//!    the `%PDF` header
//! 2. [`extract`]: pull every page's text through pdfium; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`stages`]: the three model stages, strictly sequential
//! 4. [`llm`]: the single-prompt model seam; the only step with
//!    network I/O besides URL downloads
//! 5. [`parse`]: turn raw payloads into structured views on demand

pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
pub mod stages;
