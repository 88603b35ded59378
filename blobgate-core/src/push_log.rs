//! Append-only push log.
//!
//! Every processed ref update leaves one JSON entry under
//! `<git-dir>/blobgate/push-log/`, capturing the same accounting as the
//! on-screen summary plus timing and error detail. The log is never rewritten
//! by this tool; entries accumulate across pushes.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::RunSummary;

/// One processed ref update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushLogEntry {
    /// Remote ref the update targeted.
    pub remote_ref: String,
    /// Revision the ref was pushed to.
    pub local_rev: String,
    /// Timestamp when the ref was processed (Unix seconds).
    pub timestamp: i64,
    /// Outcome counters for the ref.
    pub summary: RunSummary,
    /// Duration of the check/upload pass in milliseconds.
    pub duration_ms: u64,
    /// Whether the ref update was allowed to proceed.
    pub passed: bool,
    /// Error message when processing aborted before a verdict.
    pub error: Option<String>,
}

impl PushLogEntry {
    /// Build an entry for a just-processed ref, stamped with the current time.
    pub fn new(
        remote_ref: String,
        local_rev: String,
        summary: RunSummary,
        duration_ms: u64,
        error: Option<String>,
    ) -> Self {
        let passed = error.is_none() && summary.passed();
        Self {
            remote_ref,
            local_rev,
            timestamp: chrono::Utc::now().timestamp(),
            summary,
            duration_ms,
            passed,
            error,
        }
    }
}

/// Manages the push log directory for a repository.
pub struct PushLog {
    log_dir: PathBuf,
}

impl PushLog {
    /// Create a PushLog rooted at the repository's git directory.
    pub fn new(git_dir: &Path) -> Self {
        Self {
            log_dir: git_dir.join("blobgate").join("push-log"),
        }
    }

    /// Ensure the log directory exists.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }

    /// Append a log entry. An existing entry is never overwritten, so a ref
    /// processed twice within one second still yields two files.
    pub fn append(&self, entry: &PushLogEntry) -> Result<()> {
        self.ensure_dir()?;
        let safe_ref = entry.remote_ref.replace('/', "_");
        let base = format!("{}_{}", entry.timestamp, safe_ref);
        let mut path = self.log_dir.join(format!("{}.json", base));
        let mut seq = 1u32;
        while path.exists() {
            path = self.log_dir.join(format!("{}-{}.json", base, seq));
            seq += 1;
        }
        let data = serde_json::to_string_pretty(entry)?;
        fs::write(&path, data)?;
        Ok(())
    }

    /// All entries, oldest first. Unreadable files are skipped.
    pub fn all(&self) -> Result<Vec<PushLogEntry>> {
        if !self.log_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.log_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Ok(data) = fs::read_to_string(&path) {
                    if let Ok(log_entry) = serde_json::from_str::<PushLogEntry>(&data) {
                        entries.push(log_entry);
                    }
                }
            }
        }
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }

    /// Entries for one ref, oldest first.
    pub fn for_ref(&self, remote_ref: &str) -> Result<Vec<PushLogEntry>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|e| e.remote_ref == remote_ref)
            .collect())
    }

    /// The most recent entry.
    pub fn latest(&self) -> Result<Option<PushLogEntry>> {
        let entries = self.all()?;
        Ok(entries.into_iter().last())
    }
}
