//! Post-crawl removal of byte-identical artifacts
//!
//! The staging directory is scanned flat (subdirectories such as
//! `orig_docs` are ignored), every regular file is hashed with SHA-256 and
//! files sharing a hash are collapsed to the earliest-modified one.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::{info, warn};

/// Hex-encoded SHA-256 of a file's bytes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash a file's full contents
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Files that shared one hash, and what happened to them
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub hash: ContentHash,
    /// Surviving file
    pub kept: String,
    /// Files deleted in favour of `kept`
    pub removed: Vec<String>,
}

/// Summary of one dedup pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    /// Regular files hashed
    pub scanned: usize,
    pub groups: Vec<DuplicateGroup>,
    /// Files skipped because they could not be read or removed
    pub skipped: Vec<String>,
}

impl DedupReport {
    pub fn removed_count(&self) -> usize {
        self.groups.iter().map(|g| g.removed.len()).sum()
    }
}

struct Candidate {
    name: String,
    modified: SystemTime,
}

/// Remove byte-identical duplicates from `dir`
///
/// In each group the file with the earliest modification time survives;
/// ties go to the lexicographically smallest name. Files that disappear or
/// cannot be read mid-scan are skipped with a warning. Only failure to list
/// `dir` itself is an error.
pub fn deduplicate(dir: &Path) -> io::Result<DedupReport> {
    let mut report = DedupReport::default();
    let mut by_hash: BTreeMap<ContentHash, Vec<Candidate>> = BTreeMap::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "unreadable directory entry");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not stat file, skipping");
                report.skipped.push(name);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let hash = match hash_file(&path) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not hash file, skipping");
                report.skipped.push(name);
                continue;
            }
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        report.scanned += 1;
        by_hash
            .entry(hash)
            .or_default()
            .push(Candidate { name, modified });
    }

    for (hash, mut files) in by_hash {
        if files.len() < 2 {
            continue;
        }
        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));

        let mut files = files.into_iter();
        let Some(kept) = files.next() else {
            continue;
        };
        let mut removed = Vec::new();
        for duplicate in files {
            let path = dir.join(&duplicate.name);
            match fs::remove_file(&path) {
                Ok(()) => removed.push(duplicate.name),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "could not remove duplicate");
                    report.skipped.push(duplicate.name);
                }
            }
        }

        warn!(hash = %hash, kept = %kept.name, removed = ?removed, "duplicate files found");
        report.groups.push(DuplicateGroup {
            hash,
            kept: kept.name,
            removed,
        });
    }

    info!(
        dir = %dir.display(),
        scanned = report.scanned,
        removed = report.removed_count(),
        "dedup pass complete"
    );
    Ok(report)
}
