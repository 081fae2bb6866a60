//! docscrape - documentation-site crawler and content normalizer
//!
//! Starting from a seed URL, docscrape discovers pages within an allow
//! list, fetches them through a shared rate limiter into a staging
//! directory, then runs three batch passes over that directory:
//!
//! 1. [`dedup`] removes byte-identical artifacts, keeping the oldest
//! 2. [`normalize`] converts HTML to Markdown or plain text, and notebooks
//!    to Markdown
//! 3. [`clean`] regex-strips boilerplate and archives the originals
//!
//! ## Fetcher System
//!
//! The crawl controller talks to the [`Fetcher`] trait. [`HttpFetcher`]
//! is the production implementation; tests substitute their own.

pub mod artifact;
pub mod clean;
pub mod config;
pub mod convert;
pub mod crawl;
pub mod dedup;
mod error;
pub mod fetchers;
pub mod links;
pub mod normalize;
pub mod notebook;
pub mod pipeline;
pub mod rate_limit;
pub mod urls;

pub use artifact::{ContentKind, FetchOutcome, StagedArtifact, ORIG_DOCS_DIR};
pub use clean::{CleanReport, Cleaner, PatternSet, DEFAULT_MARKDOWN_PATTERNS};
pub use config::{Config, PatternSource, ValidatedConfig};
pub use convert::{html_to_markdown, html_to_text, ConvertOptions, OutputFormat};
pub use crawl::{CrawlReport, CrawlSession, FrontierOrder};
pub use dedup::{deduplicate, DedupReport};
pub use error::{ConfigError, FetchError, PipelineError};
pub use fetchers::{FetchOptions, Fetcher, HttpFetcher};
pub use normalize::{NormalizeReport, Normalizer};
pub use notebook::notebook_to_markdown;
pub use pipeline::PipelineReport;
pub use rate_limit::{Clock, RateLimiter};
pub use urls::{normalize_url, AllowList, AllowRule};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = concat!("docscrape/", env!("CARGO_PKG_VERSION"));
