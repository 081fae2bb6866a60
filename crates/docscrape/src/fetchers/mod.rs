//! Fetcher system for staging crawled resources
//!
//! Design: a [`Fetcher`] turns one normalized URL into one staged artifact.
//! The crawl controller only talks to the trait, so the HTTP implementation
//! can be swapped for an in-memory one in tests.

mod http;

pub use http::HttpFetcher;

use crate::artifact::FetchOutcome;
use crate::error::FetchError;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Artifacts modified more recently than this are not re-fetched
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Trait for components that stage a URL into the docs directory
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Fetch and persist one URL
    ///
    /// The URL is already normalized and admitted by the allow list.
    /// Errors are per-URL; callers log them and continue.
    async fn fetch(&self, url: &Url) -> Result<FetchOutcome, FetchError>;
}

/// Options for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// User-Agent header
    pub user_agent: String,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Skip URLs whose HTML artifact is younger than [`FRESHNESS_WINDOW`]
    pub freshness_check: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            freshness_check: true,
        }
    }
}
