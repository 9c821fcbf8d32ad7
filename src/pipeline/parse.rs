//! Lenient parsing of model payloads.
//!
//! Stages 1 and 2 ask the model for JSON, but nothing guarantees the model
//! complies. Raw payloads are stored verbatim in the run; this module turns
//! them into structured data on demand and reports the outcome as a
//! [`ParsedPayload`] so callers can tell validated data from opaque text.
//!
//! Parsing is forgiving about *shape* once the payload is a JSON
//! object: missing fields take defaults, and non-string values are rendered
//! as their JSON text instead of failing the whole payload.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// A JSON object with key order preserved (`serde_json/preserve_order`).
pub type JsonObject = serde_json::Map<String, Value>;

/// Score shown when the comparison payload has no usable score.
pub const SCORE_PLACEHOLDER: &str = "N/A";

/// Category shown for a difference entry without one.
pub const DEFAULT_DIFFERENCE_CATEGORY: &str = "Difference";

/// Outcome of lenient parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ParsedPayload<T> {
    /// The payload was a JSON object and was converted.
    Parsed(T),
    /// The payload could not be used; the raw text is kept for display.
    Unparsed(String),
}

impl<T> ParsedPayload<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParsedPayload::Parsed(_))
    }

    pub fn parsed(&self) -> Option<&T> {
        match self {
            ParsedPayload::Parsed(v) => Some(v),
            ParsedPayload::Unparsed(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParsedPayload<U> {
        match self {
            ParsedPayload::Parsed(v) => ParsedPayload::Parsed(f(v)),
            ParsedPayload::Unparsed(raw) => ParsedPayload::Unparsed(raw),
        }
    }
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

/// Remove one outer Markdown code fence (```` ```json ... ``` ````) if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    match RE_OUTER_FENCES.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Parse a payload that should be a single JSON object.
///
/// Anything else (invalid JSON, an array, a bare string) is `Unparsed`, and a
/// warning with a short preview of the payload is logged.
pub fn parse_json_object(raw: &str) -> ParsedPayload<JsonObject> {
    let body = strip_code_fences(raw);
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => ParsedPayload::Parsed(obj),
        Ok(other) => {
            warn!(
                "Model payload is JSON but not an object ({}); showing raw text: {:?}",
                json_kind(&other),
                preview(raw)
            );
            ParsedPayload::Unparsed(raw.to_string())
        }
        Err(e) => {
            warn!(
                "Model payload is not valid JSON ({}); showing raw text: {:?}",
                e,
                preview(raw)
            );
            ParsedPayload::Unparsed(raw.to_string())
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn preview(raw: &str) -> String {
    const MAX: usize = 120;
    let mut chars = raw.chars();
    let head: String = chars.by_ref().take(MAX).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Render a JSON value as display text: strings verbatim, everything else as JSON.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One entry of the comparison's `differences` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifferenceView {
    pub category: String,
    /// `(document name, detail)` pairs in payload order.
    pub documents: Vec<(String, String)>,
}

impl DifferenceView {
    /// `"<category> -> <doc>: <detail>; <doc>: <detail>"`
    pub fn line(&self) -> String {
        let docs = self
            .documents
            .iter()
            .map(|(name, detail)| format!("{name}: {detail}"))
            .collect::<Vec<_>>()
            .join("; ");
        format!("{} -> {}", self.category, docs)
    }
}

/// Structured view over a stage-2 comparison object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonView {
    pub similarities: Vec<String>,
    pub differences: Vec<DifferenceView>,
    pub strengths_by_document: Vec<(String, Vec<String>)>,
    pub overall_similarity_score: String,
}

impl Default for ComparisonView {
    fn default() -> Self {
        Self {
            similarities: Vec::new(),
            differences: Vec::new(),
            strengths_by_document: Vec::new(),
            overall_similarity_score: SCORE_PLACEHOLDER.to_string(),
        }
    }
}

impl ComparisonView {
    /// Build the view from a parsed object, defaulting every missing field.
    pub fn from_object(obj: &JsonObject) -> Self {
        let similarities = obj
            .get("similarities")
            .map(string_list)
            .unwrap_or_default();

        let differences = obj
            .get("differences")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(difference).collect())
            .unwrap_or_default();

        let strengths_by_document = obj
            .get("strengths_by_document")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .map(|(name, v)| (name.clone(), string_list(v)))
                    .collect()
            })
            .unwrap_or_default();

        let overall_similarity_score = match obj.get("overall_similarity_score") {
            None | Some(Value::Null) => SCORE_PLACEHOLDER.to_string(),
            Some(v) => value_text(v),
        };

        Self {
            similarities,
            differences,
            strengths_by_document,
            overall_similarity_score,
        }
    }
}

fn string_list(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => items.iter().map(value_text).collect(),
        Value::Null => Vec::new(),
        other => vec![value_text(other)],
    }
}

fn difference(v: &Value) -> Option<DifferenceView> {
    let obj = v.as_object()?;
    let category = match obj.get("category") {
        None | Some(Value::Null) => DEFAULT_DIFFERENCE_CATEGORY.to_string(),
        Some(c) => value_text(c),
    };
    let documents = obj
        .get("documents")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), value_text(v))).collect())
        .unwrap_or_default();
    Some(DifferenceView {
        category,
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "similarities": ["scope", "audience"],
        "differences": [
            {"category": "pricing", "documents": {"b.pdf": "monthly", "a.pdf": "yearly"}},
            {"documents": {"a.pdf": "x"}}
        ],
        "strengths_by_document": {"a.pdf": ["clear"], "b.pdf": ["short", "cheap"]},
        "overall_similarity_score": "42"
    }"#;

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn fence_without_closing_is_left_alone() {
        assert_eq!(strip_code_fences("```json\n{}"), "```json\n{}");
    }

    #[test]
    fn object_parses() {
        let p = parse_json_object(FULL);
        assert!(p.is_parsed());
    }

    #[test]
    fn garbage_is_unparsed_with_raw_text() {
        let p = parse_json_object("Sure! Here is the JSON: {");
        assert_eq!(
            p,
            ParsedPayload::Unparsed("Sure! Here is the JSON: {".to_string())
        );
    }

    #[test]
    fn array_is_unparsed() {
        assert!(!parse_json_object("[1,2]").is_parsed());
        assert!(!parse_json_object("\"text\"").is_parsed());
    }

    #[test]
    fn view_from_full_object() {
        let obj = parse_json_object(FULL).parsed().cloned().unwrap();
        let view = ComparisonView::from_object(&obj);
        assert_eq!(view.similarities, vec!["scope", "audience"]);
        assert_eq!(view.overall_similarity_score, "42");
        assert_eq!(view.differences.len(), 2);
        assert_eq!(
            view.differences[0].line(),
            "pricing -> b.pdf: monthly; a.pdf: yearly"
        );
        assert_eq!(view.differences[1].category, DEFAULT_DIFFERENCE_CATEGORY);
        assert_eq!(view.strengths_by_document[1].0, "b.pdf");
        assert_eq!(view.strengths_by_document[1].1.len(), 2);
    }

    #[test]
    fn view_defaults_missing_fields() {
        let obj = parse_json_object("{}").parsed().cloned().unwrap();
        assert_eq!(ComparisonView::from_object(&obj), ComparisonView::default());
    }

    #[test]
    fn numeric_score_and_items_render_as_text() {
        let obj = parse_json_object(
            r#"{"overall_similarity_score": 73, "similarities": ["a", 2, {"k": "v"}],
                "differences": ["not an object", {"category": "tone", "documents": {"a": 1}}]}"#,
        )
        .parsed()
        .cloned()
        .unwrap();
        let view = ComparisonView::from_object(&obj);
        assert_eq!(view.overall_similarity_score, "73");
        assert_eq!(view.similarities, vec!["a", "2", r#"{"k":"v"}"#]);
        assert_eq!(view.differences.len(), 1);
        assert_eq!(view.differences[0].line(), "tone -> a: 1");
    }

    #[test]
    fn null_score_uses_placeholder() {
        let obj = parse_json_object(r#"{"overall_similarity_score": null}"#)
            .parsed()
            .cloned()
            .unwrap();
        assert_eq!(
            ComparisonView::from_object(&obj).overall_similarity_score,
            SCORE_PLACEHOLDER
        );
    }

    #[test]
    fn map_keeps_unparsed_text() {
        let p: ParsedPayload<JsonObject> = ParsedPayload::Unparsed("raw".into());
        assert_eq!(p.map(|o| o.len()), ParsedPayload::Unparsed("raw".into()));
    }

    #[test]
    fn preview_truncates_long_payloads() {
        let long = "x".repeat(500);
        assert!(preview(&long).chars().count() <= 121);
        assert_eq!(preview("short"), "short");
    }
}
