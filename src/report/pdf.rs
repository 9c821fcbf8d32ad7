//! genpdf backend for [`ReportDocument`].
//!
//! ## Why render into memory first?
//!
//! genpdf writes the whole document in one pass at the end. Rendering into a
//! `Vec<u8>` and then writing `<path>.tmp` + rename means a font or layout
//! failure never leaves a truncated report on disk.
//!
//! Layout and font loading are CPU and file-system bound, so the async entry
//! point runs them in `spawn_blocking`.

use super::{Block, ReportDocument, ReportTable};
use crate::config::FontSettings;
use crate::error::CompareError;
use genpdf::elements::{Break, FrameCellDecorator, LinearLayout, Paragraph, TableLayout};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Element, PaperSize, SimplePageDecorator};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Page margins in millimetres.
const PAGE_MARGINS_MM: i32 = 20;

const BODY_FONT_SIZE: u8 = 10;
const CELL_FONT_SIZE: u8 = 9;
const HEADER_FONT_SIZE: u8 = 11;
const HEADING_FONT_SIZE: u8 = 14;
const TITLE_FONT_SIZE: u8 = 18;

/// Load the configured font family from the first directory that has it.
pub fn load_font_family(settings: &FontSettings) -> Result<FontFamily<FontData>, CompareError> {
    let candidates = settings.candidate_dirs();
    let regular = format!("{}-Regular.ttf", settings.family);

    for dir in &candidates {
        if !dir.join(&regular).is_file() {
            continue;
        }
        match genpdf::fonts::from_files(dir, &settings.family, None) {
            Ok(family) => {
                debug!("Using font '{}' from {}", settings.family, dir.display());
                return Ok(family);
            }
            Err(e) => debug!(
                "Font '{}' in {} unusable: {}",
                settings.family,
                dir.display(),
                e
            ),
        }
    }

    Err(CompareError::FontsUnavailable {
        family: settings.family.clone(),
        searched: candidates
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Render the report to PDF bytes (blocking).
pub fn render_pdf(report: &ReportDocument, fonts: &FontSettings) -> Result<Vec<u8>, CompareError> {
    let family = load_font_family(fonts)?;

    let mut doc = genpdf::Document::new(family);
    doc.set_title(report.title.clone());
    doc.set_paper_size(PaperSize::A4);
    doc.set_font_size(BODY_FONT_SIZE);

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(PAGE_MARGINS_MM);
    doc.set_page_decorator(decorator);

    for block in &report.blocks {
        match block {
            Block::Title(text) => {
                doc.push(styled_paragraph(text, Style::new().bold().with_font_size(TITLE_FONT_SIZE)));
                doc.push(Break::new(1.5));
            }
            Block::Heading(text) => {
                doc.push(styled_paragraph(
                    text,
                    Style::new().bold().with_font_size(HEADING_FONT_SIZE),
                ));
                doc.push(Break::new(0.5));
            }
            Block::Lines(lines) => {
                doc.push(lines_layout(lines, Style::new()));
                doc.push(Break::new(1.0));
            }
            Block::Table(table) => {
                doc.push(table_layout(table)?);
                doc.push(Break::new(1.5));
            }
        }
    }

    let mut bytes = Vec::new();
    doc.render(&mut bytes)
        .map_err(|e| CompareError::ReportRenderFailed(e.to_string()))?;
    Ok(bytes)
}

/// Render `report` and write it atomically to `path`.
///
/// Returns the number of bytes written.
pub async fn write_report(
    report: ReportDocument,
    path: &Path,
    fonts: FontSettings,
) -> Result<usize, CompareError> {
    let bytes = tokio::task::spawn_blocking(move || render_pdf(&report, &fonts))
        .await
        .map_err(|e| CompareError::Internal(format!("Report task panicked: {}", e)))??;

    let write_err = |source: std::io::Error| CompareError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = tmp_path_for(path);
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Report written: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes.len())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn styled_paragraph(text: &str, style: Style) -> Paragraph {
    Paragraph::new(StyledString::new(text.to_string(), style))
}

/// One paragraph per line; blank lines become a one-line gap.
fn lines_layout(lines: &[String], style: Style) -> LinearLayout {
    let mut layout = LinearLayout::vertical();
    for line in lines {
        if line.trim().is_empty() {
            layout.push(Break::new(1.0));
        } else {
            layout.push(styled_paragraph(line, style));
        }
    }
    layout
}

fn table_layout(table: &ReportTable) -> Result<TableLayout, CompareError> {
    let mut layout = TableLayout::new(table.column_weights.to_vec());
    layout.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let header = Style::new().bold().with_font_size(HEADER_FONT_SIZE);
    let cell = Style::new().with_font_size(CELL_FONT_SIZE);

    for (row, style) in std::iter::once((&table.header, header))
        .chain(table.rows.iter().map(|r| (r, cell)))
    {
        layout
            .row()
            .element(lines_layout(std::slice::from_ref(&row.aspect), style).padded(1))
            .element(lines_layout(&row.details, style).padded(1))
            .push()
            .map_err(|e| CompareError::ReportRenderFailed(e.to_string()))?;
    }
    Ok(layout)
}
