//! Documents and their names.
//!
//! A document is identified by a display name derived from its file name.
//! Names are the keys used in every prompt and in the report, so they must be
//! unique within a run and their order is the order the caller supplied.

use crate::error::CompareError;
use crate::pipeline::input;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Maximum length (in characters) of the joined base names in a report file name.
pub const REPORT_BASE_NAME_MAX_CHARS: usize = 120;

/// Separator placed between document base names in a report file name.
pub const REPORT_NAME_SEPARATOR: &str = "_VS_";

/// Extracted text of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentText {
    pub name: String,
    pub content: String,
}

impl DocumentText {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Where a document's bytes come from.
#[derive(Debug, Clone)]
pub enum SourceData {
    /// A PDF on the local file system.
    Path(PathBuf),
    /// A PDF behind an HTTP/HTTPS URL.
    Url(String),
    /// A PDF already in memory (e.g. an upload).
    Bytes(Vec<u8>),
}

/// A named PDF source handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub name: String,
    pub data: SourceData,
}

impl DocumentSource {
    /// Source from a local path; the name is the sanitised file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| sanitize_name(&n.to_string_lossy()))
            .unwrap_or_else(|| sanitize_name(&path.to_string_lossy()));
        Self {
            name,
            data: SourceData::Path(path),
        }
    }

    /// Source from a URL; the name is the last path segment, sanitised.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let name = sanitize_name(&input::filename_from_url(&url));
        Self {
            name,
            data: SourceData::Url(url),
        }
    }

    /// In-memory source with an explicit display name (sanitised).
    pub fn from_bytes(name: impl AsRef<str>, bytes: Vec<u8>) -> Self {
        Self {
            name: sanitize_name(name.as_ref()),
            data: SourceData::Bytes(bytes),
        }
    }

    /// Interpret a CLI argument: URLs become [`SourceData::Url`], anything else a path.
    pub fn parse(arg: &str) -> Self {
        if input::is_url(arg) {
            Self::from_url(arg)
        } else {
            Self::from_path(arg)
        }
    }
}

/// File-system style name normalisation: spaces become underscores.
pub fn sanitize_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// Fail with [`CompareError::DuplicateDocument`] on the first repeated name.
pub fn ensure_unique_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), CompareError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(CompareError::DuplicateDocument {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Document name without its last extension (`"a.b.pdf"` → `"a.b"`).
pub fn base_name(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Report file name for a run: base names joined by `_VS_`, capped at
/// [`REPORT_BASE_NAME_MAX_CHARS`], then `_<timestamp>.pdf`.
pub fn report_file_name<S: AsRef<str>>(names: &[S], timestamp: &str) -> String {
    let joined = names
        .iter()
        .map(|n| base_name(n.as_ref()))
        .collect::<Vec<_>>()
        .join(REPORT_NAME_SEPARATOR);
    let base: String = joined.chars().take(REPORT_BASE_NAME_MAX_CHARS).collect();
    format!("{base}_{timestamp}.pdf")
}

/// List every `*.pdf` (case-insensitive) directly inside `dir`, sorted by file name.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, CompareError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => CompareError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => CompareError::FileNotFound {
            path: dir.to_path_buf(),
        },
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(pdfs)
}
