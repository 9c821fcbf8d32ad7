//! Report layout: a [`ComparisonRun`] → ordered blocks → PDF.
//!
//! ```text
//! ComparisonRun ──▶ ReportDocument ──▶ genpdf ──▶ <name>.pdf
//!                   (plain data)       (pdf.rs)
//! ```
//!
//! The layout is decided here as plain data so it can be inspected and
//! tested without fonts or a PDF backend. [`pdf`] only maps blocks onto
//! genpdf elements.
//!
//! Block order is fixed: title, compared-documents list, results table,
//! insights heading, insights text.

pub mod pdf;

pub use pdf::{load_font_family, render_pdf, write_report};

use crate::output::ComparisonRun;
use crate::pipeline::parse::{ComparisonView, ParsedPayload};
use serde::Serialize;

pub const REPORT_TITLE: &str = "PDF Comparison Report";
pub const DOCUMENT_LIST_LABEL: &str = "Compared Documents:";
pub const INSIGHTS_HEADING: &str = "Key Insights & Recommendations";

pub const HEADER_ASPECT: &str = "Aspect";
pub const HEADER_DETAILS: &str = "Details";
pub const ROW_SCORE: &str = "Overall Similarity Score";
pub const ROW_SIMILARITIES: &str = "Similarities";
pub const ROW_DIFFERENCES: &str = "Differences (top)";

/// Relative widths of the aspect and details columns.
pub const COLUMN_WEIGHTS: [usize; 2] = [120, 380];

/// One row of the results table. `details` holds one entry per rendered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub aspect: String,
    pub details: Vec<String>,
}

impl TableRow {
    fn new(aspect: &str, details: Vec<String>) -> Self {
        Self {
            aspect: aspect.to_string(),
            details,
        }
    }

    /// Details lines joined with newlines.
    pub fn details_text(&self) -> String {
        self.details.join("\n")
    }
}

/// The two-column results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub header: TableRow,
    pub rows: Vec<TableRow>,
    pub column_weights: [usize; 2],
}

impl ReportTable {
    /// Build the table from a (possibly unparsed) comparison payload.
    ///
    /// The score row is always present. Similarities and differences rows
    /// appear only when non-empty, so an unparsed payload yields the header
    /// and an `N/A` score row.
    pub fn from_comparison(view: &ParsedPayload<ComparisonView>) -> Self {
        let fallback = ComparisonView::default();
        let view = view.parsed().unwrap_or(&fallback);

        let mut rows = vec![TableRow::new(
            ROW_SCORE,
            vec![view.overall_similarity_score.clone()],
        )];
        if !view.similarities.is_empty() {
            rows.push(TableRow::new(
                ROW_SIMILARITIES,
                vec![view.similarities.join("; ")],
            ));
        }
        if !view.differences.is_empty() {
            rows.push(TableRow::new(
                ROW_DIFFERENCES,
                view.differences.iter().map(|d| d.line()).collect(),
            ));
        }

        Self {
            header: TableRow::new(HEADER_ASPECT, vec![HEADER_DETAILS.to_string()]),
            rows,
            column_weights: COLUMN_WEIGHTS,
        }
    }

    pub fn row(&self, aspect: &str) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.aspect == aspect)
    }
}

/// A layout block, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Block {
    Title(String),
    Heading(String),
    /// Text with explicit line breaks; blank entries are empty lines.
    Lines(Vec<String>),
    Table(ReportTable),
}

/// The whole report as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    /// Lay out a finished run. Never fails: unparsable payloads degrade to
    /// an empty-bodied table.
    pub fn from_run(run: &ComparisonRun) -> Self {
        let mut document_list = Vec::with_capacity(run.pdf_names.len() + 1);
        document_list.push(DOCUMENT_LIST_LABEL.to_string());
        document_list.extend(run.pdf_names.iter().map(|name| format!("- {name}")));

        let table = ReportTable::from_comparison(&run.comparison.view());

        let insights = run
            .insights
            .insights
            .split('\n')
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();

        Self {
            title: REPORT_TITLE.to_string(),
            blocks: vec![
                Block::Title(REPORT_TITLE.to_string()),
                Block::Lines(document_list),
                Block::Table(table),
                Block::Heading(INSIGHTS_HEADING.to_string()),
                Block::Lines(insights),
            ],
        }
    }

    /// The results table, if the layout has one.
    pub fn table(&self) -> Option<&ReportTable> {
        self.blocks.iter().find_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Text of the block following the insights heading.
    pub fn insights_text(&self) -> Option<String> {
        let heading = self
            .blocks
            .iter()
            .position(|b| matches!(b, Block::Heading(h) if h == INSIGHTS_HEADING))?;
        match self.blocks.get(heading + 1) {
            Some(Block::Lines(lines)) => Some(lines.join("\n")),
            _ => None,
        }
    }

    /// Plain-text rendering; table rows appear as `aspect | details`.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Title(t) | Block::Heading(t) => {
                    out.push_str(t);
                    out.push('\n');
                }
                Block::Lines(lines) => {
                    for line in lines {
                        out.push_str(line);
                        out.push('\n');
                    }
                }
                Block::Table(table) => {
                    for row in std::iter::once(&table.header).chain(&table.rows) {
                        out.push_str(&format!("{} | {}\n", row.aspect, row.details_text()));
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ComparisonResult, InsightsResult, SummaryRecord};

    fn run_with(raw_comparison: &str, insights: &str) -> ComparisonRun {
        ComparisonRun {
            pdf_names: vec!["A.pdf".into(), "B.pdf".into()],
            summaries: vec![
                SummaryRecord {
                    document: "A.pdf".into(),
                    raw: "{}".into(),
                },
                SummaryRecord {
                    document: "B.pdf".into(),
                    raw: "{}".into(),
                },
            ],
            comparison: ComparisonResult {
                raw_comparison: raw_comparison.into(),
            },
            insights: InsightsResult {
                insights: insights.into(),
            },
        }
    }

    #[test]
    fn block_order_is_fixed() {
        let doc = ReportDocument::from_run(&run_with("{}", "x"));
        assert!(matches!(&doc.blocks[0], Block::Title(t) if t == REPORT_TITLE));
        assert!(matches!(&doc.blocks[1], Block::Lines(l) if l[0] == DOCUMENT_LIST_LABEL));
        assert!(matches!(&doc.blocks[2], Block::Table(_)));
        assert!(matches!(&doc.blocks[3], Block::Heading(h) if h == INSIGHTS_HEADING));
        assert!(matches!(&doc.blocks[4], Block::Lines(_)));
    }

    #[test]
    fn document_list_keeps_input_order() {
        let doc = ReportDocument::from_run(&run_with("{}", ""));
        assert_eq!(
            doc.blocks[1],
            Block::Lines(vec![
                "Compared Documents:".into(),
                "- A.pdf".into(),
                "- B.pdf".into()
            ])
        );
    }

    #[test]
    fn full_comparison_fills_all_rows() {
        let raw = r#"{
            "similarities": ["scope", "tone"],
            "differences": [{"category": "price", "documents": {"A.pdf": "low", "B.pdf": "high"}}],
            "overall_similarity_score": "42"
        }"#;
        let doc = ReportDocument::from_run(&run_with(raw, "- pick A"));
        let table = doc.table().unwrap();

        assert_eq!(table.header.aspect, "Aspect");
        assert_eq!(table.header.details, vec!["Details"]);
        assert_eq!(table.column_weights, [120, 380]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.row(ROW_SCORE).unwrap().details, vec!["42"]);
        assert_eq!(
            table.row(ROW_SIMILARITIES).unwrap().details,
            vec!["scope; tone"]
        );
        assert_eq!(
            table.row(ROW_DIFFERENCES).unwrap().details,
            vec!["price -> A.pdf: low; B.pdf: high"]
        );
        assert!(doc
            .to_plain_text()
            .contains("Overall Similarity Score | 42\n"));
    }

    #[test]
    fn empty_lists_omit_their_rows() {
        let raw = r#"{"similarities": [], "differences": [], "overall_similarity_score": 77}"#;
        let table = ReportDocument::from_run(&run_with(raw, ""))
            .table()
            .cloned()
            .unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].details, vec!["77"]);
    }

    #[test]
    fn unparsable_comparison_keeps_header_and_placeholder_score() {
        for raw in ["not json at all", "[1,2,3]", "{\"similarities\": [", ""] {
            let doc = ReportDocument::from_run(&run_with(raw, "still here"));
            let table = doc.table().unwrap();
            assert_eq!(table.rows.len(), 1, "payload {raw:?}");
            assert_eq!(table.rows[0].aspect, ROW_SCORE);
            assert_eq!(table.rows[0].details, vec!["N/A"]);
            assert_eq!(doc.insights_text().as_deref(), Some("still here"));
            assert_eq!(doc.title, REPORT_TITLE);
        }
    }

    #[test]
    fn fenced_comparison_is_parsed() {
        let raw = "```json\n{\"overall_similarity_score\": \"88\"}\n```";
        let doc = ReportDocument::from_run(&run_with(raw, ""));
        assert_eq!(doc.table().unwrap().rows[0].details, vec!["88"]);
    }

    #[test]
    fn insights_newlines_become_lines() {
        let doc = ReportDocument::from_run(&run_with("{}", "- one\r\n\n- two"));
        assert_eq!(
            doc.blocks[4],
            Block::Lines(vec!["- one".into(), "".into(), "- two".into()])
        );
        assert_eq!(doc.insights_text().as_deref(), Some("- one\n\n- two"));
    }
}
