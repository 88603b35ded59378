//! Ref-update parsing and commit-range resolution.
//!
//! The pre-push hook receives one line per ref being pushed:
//! `<local_ref> <local_rev> <remote_ref> <remote_rev>`. An all-zero revision
//! is the null sentinel: a null local revision means the ref is being deleted
//! (nothing to verify), a null remote revision means the ref is new (the
//! whole history reachable from the tip must be inspected).

use std::fmt;

/// Errors raised while parsing a ref-update line.
#[derive(Debug, thiserror::Error)]
pub enum RefUpdateError {
    #[error("Expected 4 whitespace-separated fields, got {got}: {line:?}")]
    FieldCount { got: usize, line: String },

    #[error("Revision {0:?} is not a hexadecimal object name")]
    BadRevision(String),
}

/// One ref being pushed: source/destination ref names and revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    pub local_ref: String,
    pub local_rev: String,
    pub remote_ref: String,
    pub remote_rev: String,
}

impl RefUpdate {
    /// Parse a single stdin line from the hook invocation.
    ///
    /// Malformed input fails loudly rather than silently skipping the ref.
    pub fn parse(line: &str) -> Result<Self, RefUpdateError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(RefUpdateError::FieldCount {
                got: fields.len(),
                line: line.to_string(),
            });
        }
        for rev in [fields[1], fields[3]] {
            if rev.is_empty() || !rev.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(RefUpdateError::BadRevision(rev.to_string()));
            }
        }
        Ok(Self {
            local_ref: fields[0].to_string(),
            local_rev: fields[1].to_string(),
            remote_ref: fields[2].to_string(),
            remote_rev: fields[3].to_string(),
        })
    }

    /// Whether this update deletes the remote ref (null local revision).
    pub fn is_delete(&self) -> bool {
        is_null_rev(&self.local_rev)
    }

    /// Resolve the commit range to inspect, or `None` for a ref deletion.
    pub fn commit_range(&self) -> Option<CommitRange> {
        if self.is_delete() {
            return None;
        }
        if is_null_rev(&self.remote_rev) {
            Some(CommitRange::InitialPush {
                tip: self.local_rev.clone(),
            })
        } else {
            Some(CommitRange::Incremental {
                old: self.remote_rev.clone(),
                new: self.local_rev.clone(),
            })
        }
    }
}

/// True for the all-zero null-revision sentinel (any object-name width).
fn is_null_rev(rev: &str) -> bool {
    !rev.is_empty() && rev.bytes().all(|b| b == b'0')
}

/// The set of commits to inspect for one ref update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitRange {
    /// First push of a ref: everything reachable from the tip.
    InitialPush { tip: String },
    /// Update of an existing ref: commits in `new` but not in `old`.
    Incremental { old: String, new: String },
}

impl CommitRange {
    /// Render the revision-walk argument passed to the change lister.
    pub fn rev_arg(&self) -> String {
        match self {
            CommitRange::InitialPush { tip } => tip.clone(),
            CommitRange::Incremental { old, new } => format!("{}..{}", old, new),
        }
    }
}

impl fmt::Display for CommitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rev_arg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NULL40: &str = "0000000000000000000000000000000000000000";
    const REV_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const REV_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn line(local_rev: &str, remote_rev: &str) -> String {
        format!(
            "refs/heads/main {} refs/heads/main {}",
            local_rev, remote_rev
        )
    }

    #[test]
    fn test_parse_ok() {
        let update = RefUpdate::parse(&line(REV_A, REV_B)).unwrap();
        assert_eq!(update.local_ref, "refs/heads/main");
        assert_eq!(update.local_rev, REV_A);
        assert_eq!(update.remote_rev, REV_B);
    }

    #[test]
    fn test_parse_wrong_field_count() {
        let res = RefUpdate::parse("refs/heads/main abc");
        assert!(matches!(res, Err(RefUpdateError::FieldCount { got: 2, .. })));
    }

    #[test]
    fn test_parse_non_hex_revision() {
        let res = RefUpdate::parse("refs/heads/main zzzz refs/heads/main 0000");
        assert!(matches!(res, Err(RefUpdateError::BadRevision(_))));
    }

    #[test]
    fn test_delete_yields_no_range() {
        let update = RefUpdate::parse(&line(NULL40, REV_B)).unwrap();
        assert!(update.is_delete());
        assert!(update.commit_range().is_none());
    }

    #[test]
    fn test_new_ref_walks_full_history() {
        let update = RefUpdate::parse(&line(REV_A, NULL40)).unwrap();
        let range = update.commit_range().unwrap();
        assert_eq!(range, CommitRange::InitialPush { tip: REV_A.into() });
        assert_eq!(range.rev_arg(), REV_A);
    }

    #[test]
    fn test_existing_ref_walks_delta() {
        let update = RefUpdate::parse(&line(REV_A, REV_B)).unwrap();
        let range = update.commit_range().unwrap();
        assert_eq!(range.rev_arg(), format!("{}..{}", REV_B, REV_A));
    }

    #[test]
    fn test_null_rev_width_independent() {
        // SHA-256 repositories use 64-character object names
        let null64 = "0".repeat(64);
        let update = RefUpdate::parse(&line(&null64, REV_B)).unwrap();
        assert!(update.is_delete());
    }
}
