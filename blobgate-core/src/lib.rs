//! Blobgate Core Library
//!
//! Core functionality for the blobgate pre-push gate:
//! - Content identity (SHA-256) and remote key addressing
//! - Gate configuration
//! - Local content-addressed blob cache
//! - Ref-update parsing and commit-range resolution
//! - Git change listing and attribute oracle
//! - Remote store abstraction (gsutil-backed)
//! - Per-ref synchronization engine and outcome accounting
//! - Append-only push log

pub mod cache;
pub mod config;
pub mod content_id;
pub mod engine;
pub mod git;
pub mod push_log;
pub mod refspec;
pub mod remote;

pub use cache::LocalCache;
pub use config::{Config, ConfigError};
pub use content_id::{ContentId, RemoteKey};
pub use engine::{collect_candidates, RunSummary, SyncEngine, SyncOutcome};
pub use git::{repo_toplevel, AttrOracle, ChangeLister, GitRepo};
pub use push_log::{PushLog, PushLogEntry};
pub use refspec::{CommitRange, RefUpdate, RefUpdateError};
pub use remote::{GsutilRemote, RemoteError, RemoteStore};
