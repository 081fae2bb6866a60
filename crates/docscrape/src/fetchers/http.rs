//! HTTP fetcher
//!
//! Issues one rate-limited GET per URL and streams the body straight into
//! the staging directory. The response's content-type decides the file name
//! and whether a preserved copy goes to `orig_docs`.

use crate::artifact::{
    is_text_like, ContentKind, FetchOutcome, StagedArtifact, ORIG_DOCS_DIR,
};
use crate::error::FetchError;
use crate::fetchers::{FetchOptions, Fetcher, FRESHNESS_WINDOW};
use crate::rate_limit::RateLimiter;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Write buffer size for streamed bodies
const CHUNK_SIZE: usize = 8 * 1024;

/// HTTP fetcher writing into a staging directory
///
/// Handles:
/// - one shared rate limit across all hosts
/// - content-type dispatch into [`ContentKind`]
/// - streamed writes with bounded memory
/// - the optional 24h freshness skip, which only trusts files left by an
///   earlier run
pub struct HttpFetcher {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    docs_dir: PathBuf,
    freshness_check: bool,
    /// Files written by this fetcher; never treated as fresh
    written: Mutex<HashSet<PathBuf>>,
}

impl HttpFetcher {
    /// Create a fetcher writing into `docs_dir`
    ///
    /// The directory must already exist.
    pub fn new(
        docs_dir: impl Into<PathBuf>,
        limiter: Arc<RateLimiter>,
        options: &FetchOptions,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&options.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(crate::DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(options.timeout)
            .timeout(options.timeout)
            .build()
            .map_err(FetchError::ClientBuildError)?;

        Ok(Self {
            client,
            limiter,
            docs_dir: docs_dir.into(),
            freshness_check: options.freshness_check,
            written: Mutex::new(HashSet::new()),
        })
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Copy a stored artifact into `orig_docs`, creating it on demand
    async fn preserve(&self, path: &Path, file_name: &str) -> Result<PathBuf, FetchError> {
        let orig_dir = self.docs_dir.join(ORIG_DOCS_DIR);
        tokio::fs::create_dir_all(&orig_dir)
            .await
            .map_err(|e| FetchError::persist(&orig_dir, e))?;
        let target = orig_dir.join(file_name);
        tokio::fs::copy(path, &target)
            .await
            .map_err(|e| FetchError::persist(&target, e))?;
        Ok(target)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &Url) -> Result<FetchOutcome, FetchError> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FetchError::InvalidUrlScheme);
        }

        if self.freshness_check {
            let cached = self.docs_dir.join(ContentKind::Html.file_name(url));
            let written_this_run = self.written.lock().await.contains(&cached);
            if !written_this_run && is_fresh(&cached).await {
                info!(url = %url, file = %cached.display(), "skipped, fresh");
                return Ok(FetchOutcome::Fresh {
                    url: url.to_string(),
                    path: cached,
                });
            }
        }

        self.limiter.acquire().await;
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content = ContentKind::from_content_type(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );
        let file_name = content.file_name(url);
        let path = self.docs_dir.join(&file_name);

        self.written.lock().await.insert(path.clone());
        let size = stream_body_to_file(response, &path).await?;

        let preserved = match &content {
            ContentKind::Html => {
                info!(url = %url, file = %path.display(), "HTML file saved");
                None
            }
            ContentKind::Binary { .. } => {
                info!(url = %url, file = %path.display(), "file saved");
                if is_text_like(&file_name) {
                    None
                } else {
                    Some(self.preserve(&path, &file_name).await?)
                }
            }
        };

        Ok(FetchOutcome::Stored(StagedArtifact {
            url: url.to_string(),
            path,
            content,
            size,
            preserved,
        }))
    }
}

/// True if the file exists and was modified within [`FRESHNESS_WINDOW`]
async fn is_fresh(path: &Path) -> bool {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age < FRESHNESS_WINDOW,
        // Modified in the future: treat as fresh
        Err(_) => true,
    }
}

/// Stream a response body into `path`, returning the number of bytes written
///
/// A failed transfer removes the partial file.
async fn stream_body_to_file(response: reqwest::Response, path: &Path) -> Result<u64, FetchError> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| FetchError::persist(path, e))?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    let result = async {
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(FetchError::from_reqwest)?;
            writer
                .write_all(&bytes)
                .await
                .map_err(|e| FetchError::persist(path, e))?;
            written += bytes.len() as u64;
        }
        writer
            .flush()
            .await
            .map_err(|e| FetchError::persist(path, e))
    }
    .await;

    if let Err(err) = result {
        warn!(file = %path.display(), error = %err, "removing partial artifact");
        let _ = tokio::fs::remove_file(path).await;
        return Err(err);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_is_fresh_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_fresh(&dir.path().join("missing.html")).await);
    }

    #[tokio::test]
    async fn test_is_fresh_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html></html>").unwrap();
        assert!(is_fresh(&path).await);
    }

    #[tokio::test]
    async fn test_is_fresh_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html></html>").unwrap();
        let old = SystemTime::now() - FRESHNESS_WINDOW - std::time::Duration::from_secs(60);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();
        assert!(!is_fresh(&path).await);
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(
            dir.path(),
            Arc::new(RateLimiter::disabled()),
            &FetchOptions::default(),
        )
        .unwrap();
        let url = Url::parse("ftp://example.com/file").unwrap();
        assert!(matches!(
            fetcher.fetch(&url).await,
            Err(FetchError::InvalidUrlScheme)
        ));
        assert_eq!(fetcher.name(), "http");
    }
}
