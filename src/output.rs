//! Result types produced by a comparison run.
//!
//! [`ComparisonRun`] is the aggregate that flows into the report renderer. It
//! holds only data derived from the inputs and the model responses, so two
//! runs over the same documents with the same responses compare equal and
//! serialise to identical JSON. Timings and token counts live separately in
//! [`RunStats`].

use crate::pipeline::parse::{parse_json_object, ComparisonView, JsonObject, ParsedPayload};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the comparison pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Stage 1: one summary call per document.
    Summarize,
    /// Stage 2: one cross-document comparison call.
    Compare,
    /// Stage 3: one free-text insights call.
    Insights,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Summarize, Stage::Compare, Stage::Insights];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Summarize => "summarize",
            Stage::Compare => "compare",
            Stage::Insights => "insights",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw stage-1 payload for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Document name the summary belongs to.
    pub document: String,
    /// Model response, trimmed. Expected to be a JSON object, not guaranteed.
    pub raw: String,
}

impl SummaryRecord {
    /// Parse the payload leniently for display.
    pub fn parsed(&self) -> ParsedPayload<JsonObject> {
        parse_json_object(&self.raw)
    }
}

/// Raw stage-2 payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub raw_comparison: String,
}

impl ComparisonResult {
    /// Parse the payload into the view the report table is built from.
    pub fn view(&self) -> ParsedPayload<ComparisonView> {
        parse_json_object(&self.raw_comparison).map(|obj| ComparisonView::from_object(&obj))
    }
}

/// Raw stage-3 payload: plain text, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightsResult {
    pub insights: String,
}

/// Everything one comparison run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRun {
    /// Document names in input order.
    pub pdf_names: Vec<String>,
    /// One record per document, same order as `pdf_names`.
    pub summaries: Vec<SummaryRecord>,
    pub comparison: ComparisonResult,
    pub insights: InsightsResult,
}

impl ComparisonRun {
    /// Look up the summary for a document by name.
    pub fn summary(&self, name: &str) -> Option<&SummaryRecord> {
        self.summaries.iter().find(|s| s.document == name)
    }
}

/// Timings and token accounting for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of documents compared.
    pub documents: usize,
    /// Total model calls issued (documents + 2 on success).
    pub model_calls: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Total characters of extracted text across all documents.
    pub extracted_chars: usize,
    pub extraction_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A run plus its statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutput {
    pub run: ComparisonRun,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> ComparisonRun {
        ComparisonRun {
            pdf_names: vec!["b.pdf".into(), "a.pdf".into()],
            summaries: vec![
                SummaryRecord {
                    document: "b.pdf".into(),
                    raw: r#"{"title":"B"}"#.into(),
                },
                SummaryRecord {
                    document: "a.pdf".into(),
                    raw: "not json".into(),
                },
            ],
            comparison: ComparisonResult {
                raw_comparison: r#"{"overall_similarity_score":"10"}"#.into(),
            },
            insights: InsightsResult {
                insights: "- none".into(),
            },
        }
    }

    #[test]
    fn stage_display_is_snake_case() {
        assert_eq!(Stage::Summarize.to_string(), "summarize");
        assert_eq!(
            serde_json::to_string(&Stage::Insights).unwrap(),
            "\"insights\""
        );
    }

    #[test]
    fn summary_lookup_by_name() {
        let r = run();
        assert!(r.summary("a.pdf").is_some());
        assert!(r.summary("c.pdf").is_none());
        assert!(r.summary("b.pdf").unwrap().parsed().is_parsed());
        assert!(!r.summary("a.pdf").unwrap().parsed().is_parsed());
    }

    #[test]
    fn serialised_run_keeps_name_order() {
        let json = serde_json::to_string(&run()).unwrap();
        let b = json.find("b.pdf").unwrap();
        let a = json.find("a.pdf").unwrap();
        assert!(b < a);
    }
}
