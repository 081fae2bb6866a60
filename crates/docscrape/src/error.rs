//! Error types for docscrape

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a run configuration
///
/// All of these are fatal: they abort the run before any crawling starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the expected shape
    #[error("Invalid config file: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Start URL is missing or unparseable
    #[error("Invalid start URL '{0}': must be an absolute http:// or https:// URL")]
    InvalidStartUrl(String),

    /// Allow list has no rules
    #[error("Missing required parameter: allowed_domains")]
    EmptyAllowList,

    /// Allow list rule is malformed
    #[error("Invalid allowed domain rule '{0}'")]
    InvalidAllowRule(String),

    /// Start URL is outside the allow list
    #[error("Start URL '{0}' is not covered by allowed_domains")]
    StartUrlNotAllowed(String),

    /// Fetch timeout is zero
    #[error("Invalid timeout_secs: must be greater than zero")]
    InvalidTimeout,

    /// Staging directory is unusable
    #[error("Invalid docs_dir {path}")]
    DocsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pattern file could not be read
    #[error("Failed to read pattern file {path}")]
    ReadPatterns {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cleaning pattern does not compile
    #[error("Invalid cleaning pattern")]
    InvalidPattern(#[from] regex::Error),
}

/// Errors that can occur while fetching a single URL
///
/// These never abort a crawl; the controller logs them and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request exceeded the fetch timeout
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Server answered with something other than 200
    #[error("Non-success status code {0}")]
    Status(u16),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Artifact could not be written to the staging directory
    #[error("Failed to write artifact {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::ConnectError(err)
        } else {
            FetchError::RequestError(err.to_string())
        }
    }

    pub(crate) fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Persist {
            path: path.into(),
            source,
        }
    }
}

/// Errors that stop a pipeline run
///
/// Per-URL and per-file failures never surface here; they are recorded in
/// the stage reports instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP client could not be built
    #[error(transparent)]
    Client(#[from] FetchError),

    /// A batch stage could not list or prepare its directory
    #[error("{stage} pass failed on {path}")]
    Stage {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn stage(
        stage: &'static str,
        path: &std::path::Path,
        source: std::io::Error,
    ) -> Self {
        PipelineError::Stage {
            stage,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_messages() {
        assert_eq!(
            FetchError::InvalidUrlScheme.to_string(),
            "Invalid URL: must start with http:// or https://"
        );
        assert_eq!(FetchError::Status(404).to_string(), "Non-success status code 404");
        assert_eq!(FetchError::Timeout.to_string(), "Request timed out");
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::EmptyAllowList.to_string(),
            "Missing required parameter: allowed_domains"
        );
        assert_eq!(
            ConfigError::StartUrlNotAllowed("https://a.com/".to_string()).to_string(),
            "Start URL 'https://a.com/' is not covered by allowed_domains"
        );
    }

    #[test]
    fn test_persist_error_keeps_path() {
        let err = FetchError::persist(
            "/tmp/x.html",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(err.to_string().contains("/tmp/x.html"));
    }

    #[test]
    fn test_pipeline_error_names_stage() {
        let err = PipelineError::stage(
            "dedup",
            std::path::Path::new("/tmp/docs"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "dedup pass failed on /tmp/docs");

        let err: PipelineError = ConfigError::EmptyAllowList.into();
        assert_eq!(err.to_string(), "Missing required parameter: allowed_domains");
    }
}
