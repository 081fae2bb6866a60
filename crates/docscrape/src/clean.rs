//! Regex redaction of boilerplate from converted documents
//!
//! Each suffix (`.txt`, `.md`) gets its own [`PatternSet`], compiled once
//! into a single alternation. The cleaner writes `clean_<name>` beside the
//! input and moves the original into `orig_docs/`, so a second pass finds
//! nothing left to do.

use crate::artifact::ORIG_DOCS_DIR;
use crate::error::ConfigError;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Prefix given to cleaned output files
pub const CLEAN_PREFIX: &str = "clean_";

/// Markdown boilerplate typical of generated documentation sites
pub const DEFAULT_MARKDOWN_PATTERNS: &[&str] = &[
    r"\[ Edit this page.*?\]\(.*?\)",
    r"\[ Previous .*?\]\(.*?\)",
    r"\[ Next .*?\]\(.*?\)",
    r"\[.*?\]\(https://discord.gg/.*?\)",
    r"\[.*?\]\(https://twitter.com/.*?\)",
    r"\[ Privacy and Cookies.*?\]\(.*?\)",
];

/// A list of patterns compiled into one alternation
#[derive(Debug, Clone)]
pub struct PatternSet {
    regex: Regex,
    count: usize,
}

impl PatternSet {
    /// Compile patterns; an empty list yields `None`
    pub fn compile<I, S>(patterns: I) -> Result<Option<Self>, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wrapped: Vec<String> = patterns
            .into_iter()
            .map(|p| format!("(?:{})", p.as_ref()))
            .collect();
        if wrapped.is_empty() {
            return Ok(None);
        }
        let regex = Regex::new(&wrapped.join("|"))?;
        Ok(Some(Self {
            regex,
            count: wrapped.len(),
        }))
    }

    /// Compile the shipped markdown defaults
    pub fn default_markdown() -> Result<Option<Self>, ConfigError> {
        Self::compile(DEFAULT_MARKDOWN_PATTERNS.iter().copied())
    }

    /// Number of source patterns
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Remove every match
    pub fn apply(&self, text: &str) -> String {
        self.regex.replace_all(text, "").into_owned()
    }
}

/// Read one pattern per line, skipping blank lines
pub fn load_pattern_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadPatterns {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect())
}

/// A file that was cleaned and archived
#[derive(Debug, Clone, Serialize)]
pub struct CleanedFile {
    pub output: PathBuf,
    pub archived: PathBuf,
}

/// Summary of one cleaning pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub cleaned: Vec<CleanedFile>,
    /// Files left as-is: no pattern set for their suffix, or already archived
    pub untouched: Vec<PathBuf>,
    /// Files that failed to read, write or move
    pub failed: Vec<PathBuf>,
}

/// Cleans `.txt` and `.md` files in one directory
#[derive(Debug, Clone)]
pub struct Cleaner {
    text: Option<PatternSet>,
    markdown: Option<PatternSet>,
}

enum Suffix {
    Text,
    Markdown,
}

impl Cleaner {
    pub fn new(text: Option<PatternSet>, markdown: Option<PatternSet>) -> Self {
        Self { text, markdown }
    }

    /// True when there is at least one pattern set to apply
    pub fn has_patterns(&self) -> bool {
        self.text.is_some() || self.markdown.is_some()
    }

    fn patterns_for(&self, suffix: &Suffix) -> Option<&PatternSet> {
        match suffix {
            Suffix::Text => self.text.as_ref(),
            Suffix::Markdown => self.markdown.as_ref(),
        }
    }

    /// Run one cleaning pass over `dir`
    ///
    /// Only failing to create `orig_docs` or list `dir` is an error;
    /// everything per-file is logged and recorded in the report.
    pub fn clean_dir(&self, dir: &Path) -> io::Result<CleanReport> {
        let mut report = CleanReport::default();
        let archive = dir.join(ORIG_DOCS_DIR);
        fs::create_dir_all(&archive)?;

        let mut inputs: Vec<(PathBuf, Suffix)> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                if name.starts_with(CLEAN_PREFIX) {
                    return None;
                }
                let suffix = match path.extension()?.to_str()? {
                    "txt" => Suffix::Text,
                    "md" => Suffix::Markdown,
                    _ => return None,
                };
                Some((path, suffix))
            })
            .collect();
        inputs.sort_by(|a, b| a.0.cmp(&b.0));

        for (path, suffix) in inputs {
            let Some(patterns) = self.patterns_for(&suffix) else {
                warn!(
                    file = %path.display(),
                    "no patterns configured for this file type, leaving untouched"
                );
                report.untouched.push(path);
                continue;
            };

            let Some(name) = path.file_name().map(|n| n.to_owned()) else {
                continue;
            };
            let archived = archive.join(&name);
            if archived.exists() && !is_preserved_copy(&path, &archived) {
                warn!(file = %path.display(), "original already archived, leaving untouched");
                report.untouched.push(path);
                continue;
            }

            let mut clean_name = std::ffi::OsString::from(CLEAN_PREFIX);
            clean_name.push(&name);
            let output = dir.join(clean_name);

            match clean_file(&path, &output, &archived, patterns) {
                Ok(()) => {
                    debug!(file = %path.display(), output = %output.display(), "cleaned");
                    report.cleaned.push(CleanedFile { output, archived });
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "cleaning failed, skipping");
                    report.failed.push(path);
                }
            }
        }

        info!(
            dir = %dir.display(),
            cleaned = report.cleaned.len(),
            untouched = report.untouched.len(),
            failed = report.failed.len(),
            "clean pass complete"
        );
        Ok(report)
    }
}

/// Archive the original, then write the cleaned copy from the bytes read
///
/// If the archive step fails nothing is written, so the file stays in scope
/// for the next pass.
fn clean_file(
    path: &Path,
    output: &Path,
    archived: &Path,
    patterns: &PatternSet,
) -> io::Result<()> {
    let bytes = fs::read(path)?;
    fs::rename(path, archived)?;
    let contents = String::from_utf8_lossy(&bytes);
    fs::write(output, patterns.apply(&contents))
}

/// True when `archived` holds the same bytes as `path`
///
/// The fetcher copies downloaded documents into `orig_docs`; such a copy is
/// the file's own original, not an earlier archive of a different one.
fn is_preserved_copy(path: &Path, archived: &Path) -> bool {
    match (fs::read(path), fs::read(archived)) {
        (Ok(current), Ok(preserved)) => current == preserved,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit_page() -> Option<PatternSet> {
        PatternSet::compile([r"\[ Edit this page.*?\]\(.*?\)"]).unwrap()
    }

    #[test]
    fn test_pattern_set_removes_matches() {
        let set = edit_page().unwrap();
        let out = set.apply("before [ Edit this page ](http://x) after");
        assert!(!out.contains("Edit this page"));
        assert_eq!(out, "before  after");
    }

    #[test]
    fn test_pattern_set_alternation_is_grouped() {
        let set = PatternSet::compile(["^a", "b$"]).unwrap().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.apply("xab"), "xa");
    }

    #[test]
    fn test_empty_pattern_list_is_none() {
        let set = PatternSet::compile(Vec::<String>::new()).unwrap();
        assert!(set.is_none());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = PatternSet::compile(["("]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern(_)));
    }

    #[test]
    fn test_default_markdown_patterns() {
        let set = PatternSet::default_markdown().unwrap().unwrap();
        assert_eq!(set.len(), DEFAULT_MARKDOWN_PATTERNS.len());
        let md = "Intro\n[ Next Page ](/next)\n[Join](https://discord.gg/abc)\nBody";
        let out = set.apply(md);
        assert!(out.contains("Intro"));
        assert!(out.contains("Body"));
        assert!(!out.contains("Next Page"));
        assert!(!out.contains("discord"));
    }

    #[test]
    fn test_load_pattern_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.txt");
        fs::write(&path, "foo\n\n  \nbar.*\n").unwrap();
        assert_eq!(load_pattern_file(&path).unwrap(), vec!["foo", "bar.*"]);

        let err = load_pattern_file(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadPatterns { .. }));
    }

    #[test]
    fn test_clean_writes_output_and_archives_original() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.md"), "[ Edit this page ](http://x)\nContent").unwrap();

        let cleaner = Cleaner::new(None, edit_page());
        let report = cleaner.clean_dir(dir.path()).unwrap();

        assert_eq!(report.cleaned.len(), 1);
        let cleaned = fs::read_to_string(dir.path().join("clean_page.md")).unwrap();
        assert!(!cleaned.contains("Edit this page"));
        assert!(cleaned.contains("Content"));
        assert!(!dir.path().join("page.md").exists());
        assert!(dir.path().join("orig_docs").join("page.md").exists());
    }

    #[test]
    fn test_rerun_leaves_output_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.md"), "[ Edit this page ](http://x)\nContent").unwrap();
        let cleaner = Cleaner::new(None, edit_page());

        cleaner.clean_dir(dir.path()).unwrap();
        let first = fs::read_to_string(dir.path().join("clean_page.md")).unwrap();
        let report = cleaner.clean_dir(dir.path()).unwrap();
        let second = fs::read_to_string(dir.path().join("clean_page.md")).unwrap();

        assert!(report.cleaned.is_empty());
        assert_eq!(first, second);
        assert!(!dir.path().join("clean_clean_page.md").exists());
    }

    #[test]
    fn test_suffix_without_patterns_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        fs::write(dir.path().join("data.json"), "{}").unwrap();

        let report = Cleaner::new(None, edit_page()).clean_dir(dir.path()).unwrap();

        assert_eq!(report.untouched, vec![dir.path().join("notes.txt")]);
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("data.json").exists());
    }

    #[test]
    fn test_preserved_copy_is_cleaned_and_archived() {
        let dir = tempfile::tempdir().unwrap();
        let body = "[ Edit this page ](http://x)\nBody";
        fs::create_dir(dir.path().join("orig_docs")).unwrap();
        fs::write(dir.path().join("orig_docs").join("notes.md"), body).unwrap();
        fs::write(dir.path().join("notes.md"), body).unwrap();

        let report = Cleaner::new(None, edit_page()).clean_dir(dir.path()).unwrap();

        assert_eq!(report.cleaned.len(), 1);
        assert!(report.untouched.is_empty());
        let cleaned = fs::read_to_string(dir.path().join("clean_notes.md")).unwrap();
        assert_eq!(cleaned, "\nBody");
        assert!(!dir.path().join("notes.md").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("orig_docs").join("notes.md")).unwrap(),
            body
        );
    }

    #[test]
    fn test_failed_archive_writes_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        fs::write(&path, "x").unwrap();
        let output = dir.path().join("clean_a.md");
        let archived = dir.path().join("missing_dir").join("a.md");

        let set = edit_page().unwrap();
        assert!(clean_file(&path, &output, &archived, &set).is_err());
        assert!(path.exists());
        assert!(!output.exists());
    }

    #[test]
    fn test_already_archived_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("orig_docs")).unwrap();
        fs::write(dir.path().join("orig_docs").join("a.txt"), "original").unwrap();
        fs::write(dir.path().join("a.txt"), "newer").unwrap();

        let text = PatternSet::compile(["x"]).unwrap();
        let report = Cleaner::new(text, None).clean_dir(dir.path()).unwrap();

        assert_eq!(report.untouched.len(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("orig_docs").join("a.txt")).unwrap(),
            "original"
        );
        assert!(dir.path().join("a.txt").exists());
    }
}
