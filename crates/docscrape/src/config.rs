//! Run configuration
//!
//! A JSON file is deserialized into [`Config`], then [`Config::validate`]
//! turns it into a [`ValidatedConfig`] with everything parsed, compiled and
//! created up front. Nothing touches the network until validation passes.

use crate::clean::{load_pattern_file, PatternSet};
use crate::convert::{ConvertOptions, OutputFormat};
use crate::crawl::FrontierOrder;
use crate::error::ConfigError;
use crate::fetchers::{FetchOptions, DEFAULT_TIMEOUT};
use crate::urls::{normalize_url, AllowList};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Where a pattern list comes from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PatternSource {
    /// Patterns listed directly in the config
    Inline(Vec<String>),
    /// One pattern per line in a separate file
    File { file: PathBuf },
}

impl PatternSource {
    /// Load the raw pattern strings
    ///
    /// Relative file paths resolve against `base`.
    pub fn load(&self, base: Option<&Path>) -> Result<Vec<String>, ConfigError> {
        match self {
            PatternSource::Inline(patterns) => Ok(patterns.clone()),
            PatternSource::File { file } => {
                let path = match base {
                    Some(base) if file.is_relative() => base.join(file),
                    _ => file.clone(),
                };
                load_pattern_file(&path)
            }
        }
    }
}

fn default_requests_per_second() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    crate::DEFAULT_USER_AGENT.to_string()
}

fn default_true() -> bool {
    true
}

/// Raw configuration as read from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub start_url: String,
    pub allowed_domains: Vec<String>,
    pub docs_dir: PathBuf,
    /// 0 disables rate limiting
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_true")]
    pub freshness_check: bool,
    #[serde(default)]
    pub frontier_order: FrontierOrder,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_true")]
    pub strip_boilerplate: bool,
    /// Also combine all converted output into one file
    #[serde(default)]
    pub consolidate: bool,
    #[serde(default)]
    pub text_patterns: Option<PatternSource>,
    #[serde(default)]
    pub markdown_patterns: Option<PatternSource>,

    /// Directory the config was loaded from, for relative pattern files
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Config {
    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        debug!(config = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse a JSON config string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check and prepare everything a run needs
    ///
    /// Creates `docs_dir` if missing.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let start_url = normalize_url(&self.start_url)
            .ok_or_else(|| ConfigError::InvalidStartUrl(self.start_url.clone()))?;

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let allow = AllowList::parse(&self.allowed_domains)?;
        if !allow.allows(&start_url) {
            return Err(ConfigError::StartUrlNotAllowed(start_url.to_string()));
        }

        let text_patterns = self.compile_patterns(self.text_patterns.as_ref())?;
        let markdown_patterns = self.compile_patterns(self.markdown_patterns.as_ref())?;

        prepare_docs_dir(&self.docs_dir)?;

        Ok(ValidatedConfig {
            start_url,
            allow,
            docs_dir: self.docs_dir.clone(),
            requests_per_second: self.requests_per_second,
            fetch: FetchOptions {
                user_agent: self.user_agent.clone(),
                timeout: Duration::from_secs(self.timeout_secs),
                freshness_check: self.freshness_check,
            },
            frontier_order: self.frontier_order,
            output_format: self.output_format,
            convert: ConvertOptions {
                strip_boilerplate: self.strip_boilerplate,
            },
            consolidate: self.consolidate,
            text_patterns,
            markdown_patterns,
        })
    }

    fn compile_patterns(
        &self,
        source: Option<&PatternSource>,
    ) -> Result<Option<PatternSet>, ConfigError> {
        match source {
            Some(source) => PatternSet::compile(source.load(self.base_dir.as_deref())?),
            None => Ok(None),
        }
    }
}

fn prepare_docs_dir(dir: &Path) -> Result<(), ConfigError> {
    fs::create_dir_all(dir).map_err(|source| ConfigError::DocsDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// A configuration that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub start_url: Url,
    pub allow: AllowList,
    pub docs_dir: PathBuf,
    pub requests_per_second: u32,
    pub fetch: FetchOptions,
    pub frontier_order: FrontierOrder,
    pub output_format: OutputFormat,
    pub convert: ConvertOptions,
    pub consolidate: bool,
    pub text_patterns: Option<PatternSet>,
    pub markdown_patterns: Option<PatternSet>,
}
