//! End-to-end run: crawl, dedup, normalize, clean
//!
//! Stages run strictly in sequence and each one finishes before the next
//! begins. Only configuration and directory-level failures abort a run.

use crate::clean::{CleanReport, Cleaner};
use crate::config::ValidatedConfig;
use crate::crawl::{CrawlReport, CrawlSession};
use crate::dedup::{deduplicate, DedupReport};
use crate::error::PipelineError;
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::normalize::{NormalizeReport, Normalizer};
use crate::rate_limit::RateLimiter;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Reports from every stage of a full run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub crawl: CrawlReport,
    pub dedup: DedupReport,
    pub normalize: NormalizeReport,
    /// Absent when no pattern set is configured
    pub clean: Option<CleanReport>,
}

/// Build the HTTP fetcher described by a config
pub fn http_fetcher(config: &ValidatedConfig) -> Result<HttpFetcher, PipelineError> {
    let limiter = Arc::new(RateLimiter::per_second(config.requests_per_second));
    Ok(HttpFetcher::new(&config.docs_dir, limiter, &config.fetch)?)
}

/// Crawl from the configured start URL with the given fetcher
pub async fn crawl_with(config: &ValidatedConfig, fetcher: &dyn Fetcher) -> CrawlReport {
    let mut session = CrawlSession::new(config.allow.clone(), config.frontier_order);
    session.enqueue(config.start_url.as_str());
    info!(
        start_url = %config.start_url,
        docs_dir = %config.docs_dir.display(),
        fetcher = fetcher.name(),
        "starting crawl"
    );
    session.run(fetcher).await
}

/// Crawl only, over HTTP
pub async fn crawl(config: &ValidatedConfig) -> Result<CrawlReport, PipelineError> {
    let fetcher = http_fetcher(config)?;
    Ok(crawl_with(config, &fetcher).await)
}

/// Full run over HTTP
pub async fn run(config: &ValidatedConfig) -> Result<PipelineReport, PipelineError> {
    let fetcher = http_fetcher(config)?;
    run_with(config, &fetcher).await
}

/// Full run with the given fetcher
pub async fn run_with(
    config: &ValidatedConfig,
    fetcher: &dyn Fetcher,
) -> Result<PipelineReport, PipelineError> {
    let crawl = crawl_with(config, fetcher).await;
    let dir = config.docs_dir.as_path();

    let dedup = deduplicate(dir).map_err(|e| PipelineError::stage("dedup", dir, e))?;

    let normalize = Normalizer::new(config.output_format, config.convert)
        .with_consolidation(config.consolidate)
        .normalize_dir(dir)
        .map_err(|e| PipelineError::stage("normalize", dir, e))?;

    let cleaner = Cleaner::new(
        config.text_patterns.clone(),
        config.markdown_patterns.clone(),
    );
    let clean = if cleaner.has_patterns() {
        Some(
            cleaner
                .clean_dir(dir)
                .map_err(|e| PipelineError::stage("clean", dir, e))?,
        )
    } else {
        info!("no cleaning patterns configured, skipping clean pass");
        None
    };

    Ok(PipelineReport {
        crawl,
        dedup,
        normalize,
        clean,
    })
}
