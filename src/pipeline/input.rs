//! Input resolution: turn a [`DocumentSource`] into PDF bytes.
//!
//! pdfium can open a PDF straight from a byte slice, so every source kind
//! (local path, URL, in-memory upload) is normalised to a `Vec<u8>`. The
//! `%PDF` magic is checked here so callers get [`CompareError::NotAPdf`]
//! rather than an opaque pdfium failure.

use crate::document::{DocumentSource, SourceData};
use crate::error::CompareError;
use std::path::Path;
use tracing::{debug, info};

/// How far into the file the `%PDF` header may appear.
///
/// Readers accept a header within the first kilobyte; some generators emit
/// junk (BOMs, HTTP leftovers) before it.
const MAGIC_SEARCH_WINDOW: usize = 1024;

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read the bytes behind a source and validate the PDF header.
pub async fn load_source(
    source: &DocumentSource,
    download_timeout_secs: u64,
) -> Result<Vec<u8>, CompareError> {
    let bytes = match &source.data {
        SourceData::Path(path) => read_local(path).await?,
        SourceData::Url(url) => download_url(url, download_timeout_secs).await?,
        SourceData::Bytes(bytes) => bytes.clone(),
    };
    check_pdf_magic(&source.name, &bytes)?;
    debug!("Loaded '{}' ({} bytes)", source.name, bytes.len());
    Ok(bytes)
}

/// Fail with [`CompareError::NotAPdf`] unless `%PDF` appears near the start.
pub fn check_pdf_magic(name: &str, bytes: &[u8]) -> Result<(), CompareError> {
    let window = &bytes[..bytes.len().min(MAGIC_SEARCH_WINDOW)];
    if window.windows(4).any(|w| w == b"%PDF") {
        Ok(())
    } else {
        Err(CompareError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>, CompareError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CompareError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => CompareError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => CompareError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, CompareError> {
    if reqwest::Url::parse(url).is_err() {
        return Err(CompareError::InvalidInput {
            input: url.to_string(),
        });
    }

    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CompareError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CompareError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CompareError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(CompareError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CompareError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

/// Extract a reasonable file name from a URL's last path segment.
pub fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://arxiv.org/pdf/paper.pdf"),
            "paper.pdf"
        );
        assert_eq!(
            filename_from_url("https://arxiv.org/pdf/1706.03762"),
            "1706.03762"
        );
        assert_eq!(filename_from_url("https://example.com/"), "downloaded.pdf");
        assert_eq!(filename_from_url("not a url"), "downloaded.pdf");
    }

    #[test]
    fn magic_accepts_pdf_header() {
        assert!(check_pdf_magic("a.pdf", b"%PDF-1.7\n...").is_ok());
        assert!(check_pdf_magic("a.pdf", b"\xEF\xBB\xBF%PDF-1.4").is_ok());
    }

    #[test]
    fn magic_rejects_other_content() {
        let err = check_pdf_magic("a.zip", b"PK\x03\x04rest").unwrap_err();
        match err {
            CompareError::NotAPdf { name, magic } => {
                assert_eq!(name, "a.zip");
                assert_eq!(magic, b"PK\x03\x04".to_vec());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(check_pdf_magic("empty.pdf", b"").is_err());
    }

    #[tokio::test]
    async fn load_missing_file() {
        let source = DocumentSource::from_path("/definitely/not/a/real/file.pdf");
        let err = load_source(&source, 5).await.unwrap_err();
        assert!(matches!(err, CompareError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn load_local_file_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();

        let bytes = load_source(&DocumentSource::from_path(&path), 5)
            .await
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.4 body");

        let err = load_source(&DocumentSource::from_bytes("x.pdf", b"hello".to_vec()), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::NotAPdf { .. }));
    }
}
