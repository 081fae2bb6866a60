//! docscrape CLI - crawl a documentation site and normalize it to Markdown

use clap::{Args, Parser, Subcommand};
use docscrape::clean::load_pattern_file;
use docscrape::{
    deduplicate, pipeline, Cleaner, Config, ConfigError, ConvertOptions, Normalizer, OutputFormat,
    PatternSet, ValidatedConfig,
};
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// docscrape - documentation crawler and content normalizer
#[derive(Parser, Debug)]
#[command(name = "docscrape")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

/// Overrides applied on top of a config file
#[derive(Args, Debug, Default)]
struct ConfigOverrides {
    /// Staging directory, replacing `docs_dir` from the config
    #[arg(long)]
    docs_dir: Option<PathBuf>,

    /// Re-fetch pages even if a fresh copy exists
    #[arg(long)]
    no_freshness_check: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl, deduplicate, convert and clean
    Run {
        /// Path to a JSON config file
        config: PathBuf,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Crawl only
    Crawl {
        /// Path to a JSON config file
        config: PathBuf,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Remove byte-identical files from a directory
    Dedup {
        /// Directory to scan
        dir: PathBuf,
    },
    /// Convert every HTML and notebook file in a directory
    Convert {
        /// Directory to convert
        dir: PathBuf,

        /// Also combine all output into one consolidated file
        #[arg(long)]
        consolidate: bool,

        /// Write plain text instead of Markdown
        #[arg(long)]
        text: bool,

        /// Keep nav, header, footer and aside content
        #[arg(long)]
        keep_boilerplate: bool,
    },
    /// Strip boilerplate patterns from .md and .txt files
    Clean {
        /// Directory to clean
        dir: PathBuf,

        /// File with one markdown pattern per line (default: built-in set)
        #[arg(long)]
        markdown_patterns: Option<PathBuf>,

        /// File with one plain-text pattern per line
        #[arg(long)]
        text_patterns: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(log_level(cli.verbose, cli.quiet));

    match cli.command {
        Commands::Run { config, overrides } => {
            let config = load_config(&config, &overrides).unwrap_or_else(|e| fail(e));
            let report = pipeline::run(&config).await.unwrap_or_else(|e| fail(e));
            print_json(&report);
        }
        Commands::Crawl { config, overrides } => {
            let config = load_config(&config, &overrides).unwrap_or_else(|e| fail(e));
            let report = pipeline::crawl(&config).await.unwrap_or_else(|e| fail(e));
            print_json(&report);
        }
        Commands::Dedup { dir } => {
            let report = deduplicate(&dir).unwrap_or_else(|e| fail(dir_error(&dir, e)));
            print_json(&report);
        }
        Commands::Convert {
            dir,
            text,
            keep_boilerplate,
            consolidate,
        } => {
            let normalizer = converter(text, keep_boilerplate).with_consolidation(consolidate);
            let report = normalizer
                .normalize_dir(&dir)
                .unwrap_or_else(|e| fail(dir_error(&dir, e)));
            print_json(&report);
        }
        Commands::Clean {
            dir,
            markdown_patterns,
            text_patterns,
        } => {
            let cleaner = cleaner(markdown_patterns.as_deref(), text_patterns.as_deref())
                .unwrap_or_else(|e| fail(e));
            let report = cleaner
                .clean_dir(&dir)
                .unwrap_or_else(|e| fail(dir_error(&dir, e)));
            print_json(&report);
        }
    }
}

/// Default filter directive for the verbosity flags; `RUST_LOG` wins
fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<ValidatedConfig, ConfigError> {
    let mut config = Config::from_file(path)?;
    if let Some(dir) = &overrides.docs_dir {
        config.docs_dir = dir.clone();
    }
    if overrides.no_freshness_check {
        config.freshness_check = false;
    }
    config.validate()
}

fn converter(text: bool, keep_boilerplate: bool) -> Normalizer {
    let format = if text {
        OutputFormat::Text
    } else {
        OutputFormat::Markdown
    };
    Normalizer::new(
        format,
        ConvertOptions {
            strip_boilerplate: !keep_boilerplate,
        },
    )
}

fn cleaner(markdown: Option<&Path>, text: Option<&Path>) -> Result<Cleaner, ConfigError> {
    let markdown = match markdown {
        Some(path) => PatternSet::compile(load_pattern_file(path)?)?,
        None => PatternSet::default_markdown()?,
    };
    let text = match text {
        Some(path) => PatternSet::compile(load_pattern_file(path)?)?,
        None => None,
    };
    Ok(Cleaner::new(text, markdown))
}

fn dir_error(dir: &Path, e: io::Error) -> String {
    format!("{}: {}", dir.display(), e)
}

/// Report a fatal error and exit non-zero
fn fail<E: Display>(e: E) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

fn print_json<T: Serialize>(report: &T) {
    let json = serde_json::to_string_pretty(report).unwrap_or_else(|e| {
        eprintln!("Error serializing report: {}", e);
        std::process::exit(1);
    });
    writeln_safe(&json);
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, false), "info");
        assert_eq!(log_level(1, false), "debug");
        assert_eq!(log_level(3, false), "trace");
        assert_eq!(log_level(0, true), "error");
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "docscrape",
            "-v",
            "run",
            "site.json",
            "--docs-dir",
            "out",
            "--no-freshness-check",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run { config, overrides } => {
                assert_eq!(config, PathBuf::from("site.json"));
                assert_eq!(overrides.docs_dir, Some(PathBuf::from("out")));
                assert!(overrides.no_freshness_check);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_convert_flags() {
        let cli = Cli::try_parse_from(["docscrape", "convert", "docs", "--text", "--consolidate"])
            .unwrap();
        match cli.command {
            Commands::Convert {
                text,
                keep_boilerplate,
                consolidate,
                ..
            } => {
                assert!(text);
                assert!(!keep_boilerplate);
                assert!(consolidate);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["docscrape", "-q", "-v", "dedup", "d"]).is_err());
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.json");
        std::fs::write(
            &path,
            concat!(
                r#"{"start_url": "https://example.com/", "allowed_domains": ["example.com"],"#,
                r#" "docs_dir": "/nonexistent/ignored"}"#
            ),
        )
        .unwrap();

        let overrides = ConfigOverrides {
            docs_dir: Some(dir.path().join("docs")),
            no_freshness_check: true,
        };
        let config = load_config(&path, &overrides).unwrap();

        assert_eq!(config.docs_dir, dir.path().join("docs"));
        assert!(!config.fetch.freshness_check);
        assert!(dir.path().join("docs").is_dir());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/no/such/config.json"), &ConfigOverrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("/no/such/config.json"));
    }

    #[test]
    fn test_converter_modes() {
        assert_eq!(converter(true, false).format(), OutputFormat::Text);
        assert_eq!(converter(false, true).format(), OutputFormat::Markdown);
    }

    #[test]
    fn test_cleaner_defaults_to_builtin_markdown_patterns() {
        let cleaner = cleaner(None, None).unwrap();
        assert!(cleaner.has_patterns());

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "[ Next Page ](/n)\nbody").unwrap();
        let report = cleaner.clean_dir(dir.path()).unwrap();
        assert_eq!(report.cleaned.len(), 1);
        let out = std::fs::read_to_string(dir.path().join("clean_a.md")).unwrap();
        assert!(!out.contains("Next Page"));
    }

    #[test]
    fn test_cleaner_rejects_missing_pattern_file() {
        let err = cleaner(Some(Path::new("/no/such/patterns")), None).unwrap_err();
        assert!(matches!(err, ConfigError::ReadPatterns { .. }));
    }
}
