//! Staged artifacts: naming, content-type dispatch and preservation rules

use serde::Serialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Subdirectory of the staging directory holding preserved originals
pub const ORIG_DOCS_DIR: &str = "orig_docs";

/// Extensions treated as text-like; artifacts with any other extension are
/// preserved in [`ORIG_DOCS_DIR`] when fetched
pub const TEXT_LIKE_EXTENSIONS: &[&str] = &["json", "html", "yaml", "sh", "ps1", "py"];

/// Name used when a URL path ends in `/`
const INDEX_BASENAME: &str = "index";

/// Content-type classes that drive how a response is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentKind {
    /// `text/html` or `application/xhtml+xml`
    Html,
    /// Everything else; `extension` is derived from the content-type
    Binary { extension: Option<String> },
}

impl ContentKind {
    /// Classify a `Content-Type` header value
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(media_type) = content_type.map(media_type) else {
            return ContentKind::Binary { extension: None };
        };
        if media_type == "text/html" || media_type == "application/xhtml+xml" {
            return ContentKind::Html;
        }
        ContentKind::Binary {
            extension: extension_for_media_type(&media_type),
        }
    }

    pub fn is_html(&self) -> bool {
        matches!(self, ContentKind::Html)
    }

    /// File name an artifact of this kind is stored under
    pub fn file_name(&self, url: &Url) -> String {
        let base = basename_for_url(url);
        match self {
            ContentKind::Html => format!("{}.html", base),
            ContentKind::Binary { extension } => match extension {
                Some(ext) if !base.contains('.') => format!("{}.{}", base, ext),
                _ => base,
            },
        }
    }
}

/// Lowercased media type without parameters
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

fn extension_for_media_type(media_type: &str) -> Option<String> {
    let preferred = match media_type {
        "application/json" => Some("json"),
        "application/yaml" | "application/x-yaml" | "text/yaml" => Some("yaml"),
        "text/plain" => Some("txt"),
        "text/markdown" => Some("md"),
        "application/pdf" => Some("pdf"),
        "application/x-ipynb+json" => Some("ipynb"),
        _ => None,
    };
    preferred
        .map(str::to_string)
        .or_else(|| {
            mime_guess::get_mime_extensions_str(media_type)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
}

/// Deterministic file stem for a URL: its final path segment
///
/// Characters outside `[A-Za-z0-9._-]` become `_`; an empty final segment
/// maps to `index`.
pub fn basename_for_url(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let sanitized: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        INDEX_BASENAME.to_string()
    } else {
        sanitized
    }
}

/// True when the file's extension is in [`TEXT_LIKE_EXTENSIONS`]
pub fn is_text_like(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            TEXT_LIKE_EXTENSIONS
                .iter()
                .any(|t| t.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// One resource written to the staging directory
#[derive(Debug, Clone, Serialize)]
pub struct StagedArtifact {
    /// Normalized source URL
    pub url: String,
    /// Where the raw bytes were written
    pub path: PathBuf,
    /// Content class the file was stored as
    pub content: ContentKind,
    /// Bytes written
    pub size: u64,
    /// Copy kept in `orig_docs`, for non-text-like binaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserved: Option<PathBuf>,
}

/// Result of a successful fetch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Downloaded and written
    Stored(StagedArtifact),
    /// A recent copy exists; no request was made
    Fresh { url: String, path: PathBuf },
}

impl FetchOutcome {
    /// Path of an HTML artifact links can be extracted from, if any
    pub fn html_path(&self) -> Option<&Path> {
        match self {
            FetchOutcome::Stored(artifact) if artifact.content.is_html() => {
                Some(artifact.path.as_path())
            }
            FetchOutcome::Stored(_) => None,
            FetchOutcome::Fresh { path, .. } => Some(path.as_path()),
        }
    }
}
