//! Per-ref synchronization engine.
//!
//! For one ref update: resolve the commit range, classify changed paths into
//! candidate files, then for each candidate compute its content identity,
//! probe the remote store, and upload from the local cache when absent. The
//! fold over candidates produces a `RunSummary` that decides whether the push
//! may proceed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cache::LocalCache;
use crate::content_id::{ContentId, RemoteKey};
use crate::git::{AttrOracle, ChangeLister};
use crate::refspec::{CommitRange, RefUpdate};
use crate::remote::RemoteStore;

/// Outcome of synchronizing one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote store already holds this path+identity.
    AlreadyRemote,
    /// Uploaded from the local cache during this run.
    Uploaded,
    /// The upload was attempted and failed; retryable by re-pushing.
    UploadFailed,
    /// The blob is in neither the remote store nor the local cache;
    /// unrecoverable without re-caching the original bytes.
    MissingLocally,
}

impl SyncOutcome {
    /// Short status suffix for the per-file progress line.
    pub fn status_label(&self) -> &'static str {
        match self {
            SyncOutcome::AlreadyRemote => "already stored",
            SyncOutcome::Uploaded => "uploaded",
            SyncOutcome::UploadFailed => "UPLOAD FAILED",
            SyncOutcome::MissingLocally => "NOT IN CACHE",
        }
    }
}

/// Counts of each outcome across one ref update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub already_remote: u64,
    pub uploaded: u64,
    pub upload_failed: u64,
    pub missing_locally: u64,
}

impl RunSummary {
    /// Record one outcome.
    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::AlreadyRemote => self.already_remote += 1,
            SyncOutcome::Uploaded => self.uploaded += 1,
            SyncOutcome::UploadFailed => self.upload_failed += 1,
            SyncOutcome::MissingLocally => self.missing_locally += 1,
        }
    }

    /// Total candidates processed.
    pub fn total(&self) -> u64 {
        self.already_remote + self.uploaded + self.upload_failed + self.missing_locally
    }

    /// Whether the ref update may proceed. Already-present and freshly
    /// uploaded objects are both fine; any failure or cache miss blocks.
    pub fn passed(&self) -> bool {
        self.upload_failed == 0 && self.missing_locally == 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Checked {} large object(s):", self.total())?;
        writeln!(f, "  already stored:     {}", self.already_remote)?;
        writeln!(f, "  uploaded:           {}", self.uploaded)?;
        writeln!(f, "  upload failures:    {}", self.upload_failed)?;
        write!(f, "  missing from cache: {}", self.missing_locally)
    }
}

/// Classify the paths changed in `range` into candidate files.
///
/// Two gates, both required: the path still exists in the working copy, and
/// the attribute oracle marks it as managed. The result is materialized so
/// the total is known before the first progress line and each path costs one
/// attribute query.
pub fn collect_candidates(
    lister: &dyn ChangeLister,
    oracle: &dyn AttrOracle,
    workdir: &Path,
    range: &CommitRange,
) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();
    for path in lister.changed_paths(range)? {
        if !workdir.join(&path).is_file() {
            // Deleted or never present post-range; nothing to upload.
            continue;
        }
        if oracle.is_managed(&path)? {
            candidates.push(path);
        }
    }
    tracing::debug!(range = %range, candidates = candidates.len(), "classified range");
    Ok(candidates)
}

/// Drives the check/upload pipeline for ref updates.
pub struct SyncEngine<'a> {
    lister: &'a dyn ChangeLister,
    oracle: &'a dyn AttrOracle,
    cache: &'a LocalCache,
    remote: &'a dyn RemoteStore,
    workdir: &'a Path,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        lister: &'a dyn ChangeLister,
        oracle: &'a dyn AttrOracle,
        cache: &'a LocalCache,
        remote: &'a dyn RemoteStore,
        workdir: &'a Path,
    ) -> Self {
        Self {
            lister,
            oracle,
            cache,
            remote,
            workdir,
        }
    }

    /// Process one ref update, writing progress to `out`.
    ///
    /// Returns an empty (passing) summary for ref deletions. Candidates are
    /// processed strictly sequentially; the summary is fresh per call and
    /// never shared across refs.
    pub async fn process_ref(
        &self,
        update: &RefUpdate,
        out: &mut dyn Write,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let Some(range) = update.commit_range() else {
            tracing::info!(refname = %update.remote_ref, "ref deletion, nothing to verify");
            return Ok(summary);
        };

        let candidates = collect_candidates(self.lister, self.oracle, self.workdir, &range)?;
        let total = candidates.len();

        for (i, path) in candidates.iter().enumerate() {
            let outcome = self.sync_one(path).await?;
            writeln!(
                out,
                "[{}/{}] checking: {}... {}",
                i + 1,
                total,
                path.display(),
                outcome.status_label()
            )?;
            summary.record(outcome);
        }

        Ok(summary)
    }

    /// The per-file chain: hash, probe, upload-from-cache.
    async fn sync_one(&self, path: &Path) -> Result<SyncOutcome> {
        let full = self.workdir.join(path);
        let id = ContentId::from_file(&full)
            .with_context(|| format!("Failed to hash {}", full.display()))?;
        let key = RemoteKey::new(path.to_path_buf(), id);

        match self.remote.exists(&key).await {
            Ok(true) => return Ok(SyncOutcome::AlreadyRemote),
            Ok(false) => {}
            Err(e) => {
                // Absence unconfirmed. Proceeding as absent risks a redundant
                // upload, never a false "already present".
                tracing::warn!(key = %key, error = %e, "existence probe failed, treating as absent");
            }
        }

        if !self.cache.contains(&id) {
            tracing::error!(path = %path.display(), id = %id, "blob not in local cache");
            return Ok(SyncOutcome::MissingLocally);
        }

        match self.remote.put(&key, &self.cache.entry_path(&id)).await {
            Ok(()) => Ok(SyncOutcome::Uploaded),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "upload failed");
                Ok(SyncOutcome::UploadFailed)
            }
        }
    }
}
