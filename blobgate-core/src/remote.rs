//! Remote object store abstraction.
//!
//! The gate needs exactly two operations from the store: a metadata-only
//! existence probe and a blob copy. There is deliberately no delete — objects
//! are never removed by this tool, so an upload left behind by an aborted
//! push is harmless and saves work on the retry.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::content_id::RemoteKey;

/// Result type for remote store operations
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors from the remote object store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The probe itself failed (spawn error, auth, network) — absence is
    /// not confirmed. Confirmed absence is `Ok(false)` from `exists`.
    #[error("Existence probe failed for {key}: {detail}")]
    Probe { key: String, detail: String },

    #[error("Upload failed for {key}: {detail}")]
    Upload { key: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Remote blob store the push gate synchronizes against.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Metadata-only presence check; never downloads content.
    async fn exists(&self, key: &RemoteKey) -> Result<bool>;

    /// Copy a local file to the remote key. At most one attempt per call;
    /// retries belong to a re-run of the whole hook.
    async fn put(&self, key: &RemoteKey, source: &Path) -> Result<()>;
}

/// Remote store backed by the `gsutil` CLI.
///
/// Existence is `gsutil -q stat <url>` (exit 1 means not found) and upload is
/// `gsutil -q cp <local> <url>`. Credentials, retransmission and bucket
/// addressing all stay the external client's problem.
pub struct GsutilRemote {
    prefix: String,
    program: String,
}

impl GsutilRemote {
    /// Create a client uploading under `prefix` (e.g. `gs://bucket/blobs`).
    pub fn new(prefix: &str) -> Self {
        Self::with_program(prefix, "gsutil")
    }

    /// Use an alternative program name (stubbed in tests).
    pub fn with_program(prefix: &str, program: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            program: program.to_string(),
        }
    }

    fn url(&self, key: &RemoteKey) -> String {
        key.object_name(&self.prefix)
    }
}

#[async_trait]
impl RemoteStore for GsutilRemote {
    async fn exists(&self, key: &RemoteKey) -> Result<bool> {
        let url = self.url(key);
        let out = Command::new(&self.program)
            .args(["-q", "stat", &url])
            .output()
            .await
            .map_err(|e| RemoteError::Probe {
                key: url.clone(),
                detail: format!("Failed to execute {}: {}", self.program, e),
            })?;

        if out.status.success() {
            return Ok(true);
        }
        // Exit 1 is the documented not-found status; anything else means the
        // probe itself failed and absence is unconfirmed.
        match out.status.code() {
            Some(1) => Ok(false),
            code => Err(RemoteError::Probe {
                key: url,
                detail: format!(
                    "exit {:?}: {}",
                    code,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            }),
        }
    }

    async fn put(&self, key: &RemoteKey, source: &Path) -> Result<()> {
        let url = self.url(key);
        let source_str = source.to_string_lossy();
        let out = Command::new(&self.program)
            .args(["-q", "cp", source_str.as_ref(), &url])
            .output()
            .await
            .map_err(|e| RemoteError::Upload {
                key: url.clone(),
                detail: format!("Failed to execute {}: {}", self.program, e),
            })?;

        if out.status.success() {
            tracing::debug!(key = %url, "uploaded blob");
            Ok(())
        } else {
            Err(RemoteError::Upload {
                key: url,
                detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            })
        }
    }
}
