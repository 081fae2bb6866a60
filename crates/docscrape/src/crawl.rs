//! Crawl frontier and controller
//!
//! A [`CrawlSession`] owns everything one crawl run mutates: the visited
//! set, the pending frontier and the allow list. Nothing is global; a
//! session is created per run and passed to whatever drives it.
//!
//! Duplicate suppression happens when a URL is popped: enqueue skips URLs
//! already visited, but the same URL may sit in the frontier more than once
//! until the first copy is visited.

use crate::artifact::{FetchOutcome, StagedArtifact};
use crate::fetchers::Fetcher;
use crate::links::extract_links;
use crate::urls::{normalize_url, AllowList};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};
use url::Url;

/// Order in which pending URLs are visited
///
/// Both orders visit the same set of URLs; they differ only in the order
/// artifacts are discovered and written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontierOrder {
    /// FIFO
    #[default]
    BreadthFirst,
    /// LIFO
    DepthFirst,
}

/// A URL that could not be fetched
#[derive(Debug, Clone, Serialize)]
pub struct CrawlFailure {
    pub url: String,
    pub error: String,
}

/// Summary of one crawl run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    /// Every URL marked visited, in visit order
    pub visited: Vec<String>,
    /// Artifacts written this run
    pub stored: Vec<StagedArtifact>,
    /// URLs skipped because a fresh artifact already existed
    pub fresh: Vec<String>,
    /// URLs whose fetch failed
    pub failed: Vec<CrawlFailure>,
}

/// Visited set, frontier and allow list for one crawl
#[derive(Debug)]
pub struct CrawlSession {
    allow: AllowList,
    order: FrontierOrder,
    visited: HashSet<String>,
    frontier: VecDeque<Url>,
}

impl CrawlSession {
    pub fn new(allow: AllowList, order: FrontierOrder) -> Self {
        Self {
            allow,
            order,
            visited: HashSet::new(),
            frontier: VecDeque::new(),
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    /// Number of URLs waiting in the frontier
    pub fn pending(&self) -> usize {
        self.frontier.len()
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Add a URL to the frontier
    ///
    /// Returns false when the URL is unparseable, outside the allow list or
    /// already visited.
    pub fn enqueue(&mut self, raw: &str) -> bool {
        let Some(url) = normalize_url(raw) else {
            debug!(url = raw, "not enqueued: invalid URL");
            return false;
        };
        if !self.allow.allows(&url) {
            debug!(url = %url, "not enqueued: outside allowed domains");
            return false;
        }
        if self.is_visited(&url) {
            return false;
        }
        self.frontier.push_back(url);
        true
    }

    fn pop(&mut self) -> Option<Url> {
        match self.order {
            FrontierOrder::BreadthFirst => self.frontier.pop_front(),
            FrontierOrder::DepthFirst => self.frontier.pop_back(),
        }
    }

    /// Pop the next URL that still needs fetching and mark it visited
    fn next_unvisited(&mut self) -> Option<Url> {
        while let Some(url) = self.pop() {
            let Some(url) = normalize_url(url.as_str()) else {
                continue;
            };
            if !self.allow.allows(&url) {
                continue;
            }
            if !self.visited.insert(url.to_string()) {
                continue;
            }
            return Some(url);
        }
        None
    }

    /// Drive the crawl until the frontier is exhausted
    ///
    /// Fetch failures are logged and recorded; they never stop the run.
    pub async fn run(&mut self, fetcher: &dyn Fetcher) -> CrawlReport {
        let mut report = CrawlReport::default();

        while let Some(url) = self.next_unvisited() {
            info!(url = %url, pending = self.pending(), "scraping");
            report.visited.push(url.to_string());

            let outcome = match fetcher.fetch(&url).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(
                        url = %url,
                        error = %err,
                        fetcher = fetcher.name(),
                        "fetch failed, skipping"
                    );
                    report.failed.push(CrawlFailure {
                        url: url.to_string(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            if let Some(path) = outcome.html_path() {
                let links = extract_links(path, &url, &self.allow).await;
                for link in links {
                    self.enqueue(link.as_str());
                }
            }

            match outcome {
                FetchOutcome::Stored(artifact) => report.stored.push(artifact),
                FetchOutcome::Fresh { url, .. } => report.fresh.push(url),
            }
        }

        info!(
            visited = report.visited.len(),
            stored = report.stored.len(),
            fresh = report.fresh.len(),
            failed = report.failed.len(),
            "crawl complete"
        );
        report
    }
}
