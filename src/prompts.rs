//! Prompt templates for the three comparison stages.
//!
//! Every prompt the pipeline sends is built here, so wording changes happen
//! in one place and tests can inspect prompts without a model.
//!
//! Stages 1 and 2 ask for JSON because their output feeds the report table.
//! Stage 3 asks for plain bullet points because its output is read by people
//! and rendered as-is.

use crate::document::DocumentText;
use crate::output::SummaryRecord;

/// First `budget` characters of `content` (Unicode scalar values, not bytes).
pub fn truncate_chars(content: &str, budget: usize) -> &str {
    match content.char_indices().nth(budget) {
        Some((byte_idx, _)) => &content[..byte_idx],
        None => content,
    }
}

/// Stage 1: per-document structured summary.
pub fn summary_prompt(doc: &DocumentText, char_budget: usize) -> String {
    format!(
        r#"
You are an analyst. Read this PDF content and output a structured JSON summary.

PDF name: {name}

Content (truncated):
"""{content}"""

Return ONLY valid JSON, no extra text, with this structure:
{{
  "title": "Detected or inferred title",
  "key_points": ["bullet 1", "bullet 2"],
  "sections": {{"section name": "short summary"}},
  "word_count": <integer total words in content>
}}
"#,
        name = doc.name,
        content = truncate_chars(&doc.content, char_budget),
    )
}

/// Stage 2: one comparison over every document's raw summary.
pub fn comparison_prompt(summaries: &[SummaryRecord]) -> String {
    let docs_block = summaries
        .iter()
        .map(|s| format!("Document: {}\nSummary JSON: {}", s.document, s.raw))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"
You are comparing multiple documents.

Here are their summaries (JSON-like):
{docs_block}

Create a JSON object describing the comparison. Return ONLY valid JSON with:
{{
  "similarities": ["common aspect 1", "common aspect 2"],
  "differences": [
    {{
      "category": "what differs",
      "documents": {{
        "doc_name_1": "detail",
        "doc_name_2": "detail"
      }}
    }}
  ],
  "strengths_by_document": {{
    "doc_name_1": ["strength 1", "strength 2"],
    "doc_name_2": ["strength 1", "strength 2"]
  }},
  "overall_similarity_score": "0-100"
}}
"#
    )
}

/// Stage 3: plain-text insights from the raw comparison.
pub fn insights_prompt<S: AsRef<str>>(raw_comparison: &str, names: &[S]) -> String {
    let names = names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
You are a consultant. Based on this comparison JSON:

{raw_comparison}

Generate concise, actionable bullet-point insights for these documents:
{names}

Focus on:
- Key differences that matter
- When to use which document
- Any risks or gaps

Return plain text bullet points, no JSON.
"#
    )
}
