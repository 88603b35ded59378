//! Git plumbing for the pre-push gate.
//!
//! Two capabilities are needed from the version-control side: listing the
//! file paths touched by a commit range, and asking whether a path is
//! filtered through the large-object mechanism. Both are modeled as traits
//! so the engine can be exercised without a real repository; `GitRepo` is the
//! subprocess-backed implementation.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::refspec::CommitRange;

/// Lists file paths touched within a commit range.
pub trait ChangeLister {
    fn changed_paths(&self, range: &CommitRange) -> Result<Vec<PathBuf>>;
}

/// Answers whether a path is large-object-managed.
pub trait AttrOracle {
    fn is_managed(&self, path: &Path) -> Result<bool>;
}

/// Working-directory root of the repository containing the current directory.
/// Config discovery needs this before a `GitRepo` can be constructed.
pub fn repo_toplevel() -> Result<PathBuf> {
    let out = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .context("Failed to execute git rev-parse")?;
    if !out.status.success() {
        return Err(anyhow!(
            "Not inside a git repository: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        ));
    }
    Ok(PathBuf::from(
        String::from_utf8_lossy(&out.stdout).trim(),
    ))
}

/// Subprocess-backed git repository handle.
pub struct GitRepo {
    workdir: PathBuf,
    /// Attribute filter value marking a path as managed.
    filter: String,
}

impl GitRepo {
    /// Create a handle for a repository working directory.
    pub fn new(workdir: PathBuf, filter: String) -> Self {
        Self { workdir, filter }
    }

    /// The repository working directory.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Absolute path of the repository's git directory (`.git`).
    pub fn git_dir(&self) -> Result<PathBuf> {
        let out = self.run(&["rev-parse", "--absolute-git-dir"])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Run a git command in the working directory, returning stdout.
    /// Non-zero exit becomes an error carrying the command's stderr.
    fn run(&self, args: &[&str]) -> Result<String> {
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;
        if !out.status.success() {
            return Err(anyhow!(
                "git {} failed (exit {}): {}",
                args.join(" "),
                out.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&out.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl ChangeLister for GitRepo {
    /// List every path touched by any commit in the range.
    ///
    /// Paths from deleted files appear here too; the classifier drops them
    /// via the exists-on-disk gate.
    fn changed_paths(&self, range: &CommitRange) -> Result<Vec<PathBuf>> {
        let rev_arg = range.rev_arg();
        let out = self.run(&[
            "log",
            "--no-renames",
            "--name-only",
            "--format=",
            &rev_arg,
        ])?;

        // Deduplicate: a path modified in several commits is checked once.
        let paths: BTreeSet<PathBuf> = out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect();

        tracing::debug!(range = %rev_arg, count = paths.len(), "listed changed paths");
        Ok(paths.into_iter().collect())
    }
}

impl AttrOracle for GitRepo {
    /// Ask git whether `path` carries the managed filter attribute.
    ///
    /// `git check-attr filter -- <path>` prints `<path>: filter: <value>`;
    /// the path is managed iff the value equals the configured filter name.
    fn is_managed(&self, path: &Path) -> Result<bool> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Non-UTF-8 path: {:?}", path))?;
        let out = self.run(&["check-attr", "filter", "--", path_str])?;
        let value = out
            .lines()
            .next()
            .and_then(|l| l.rsplit(": ").next())
            .unwrap_or("unspecified")
            .trim();
        Ok(value == self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Init a repository with one commit and return (tempdir, repo, tip).
    fn make_repo(attrs: &str, files: &[(&str, &[u8])]) -> (TempDir, GitRepo, String) {
        let tmp = TempDir::new().unwrap();
        let git = |args: &[&str]| {
            let out = Command::new("git")
                .args(args)
                .current_dir(tmp.path())
                .env("GIT_AUTHOR_NAME", "test")
                .env("GIT_AUTHOR_EMAIL", "test@test")
                .env("GIT_COMMITTER_NAME", "test")
                .env("GIT_COMMITTER_EMAIL", "test@test")
                .output()
                .unwrap();
            assert!(
                out.status.success(),
                "git {:?}: {}",
                args,
                String::from_utf8_lossy(&out.stderr)
            );
            String::from_utf8_lossy(&out.stdout).into_owned()
        };

        git(&["init", "-q"]);
        if !attrs.is_empty() {
            fs::write(tmp.path().join(".gitattributes"), attrs).unwrap();
        }
        for (path, data) in files {
            let full = tmp.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&full, data).unwrap();
        }
        git(&["add", "-A"]);
        git(&["commit", "-q", "-m", "initial"]);
        let tip = git(&["rev-parse", "HEAD"]).trim().to_string();

        let repo = GitRepo::new(tmp.path().to_path_buf(), "blobgate".to_string());
        (tmp, repo, tip)
    }

    #[test]
    fn test_changed_paths_initial_push() {
        let (_tmp, repo, tip) = make_repo("", &[("a.txt", b"a"), ("dir/b.bin", b"b")]);
        let range = CommitRange::InitialPush { tip };
        let paths = repo.changed_paths(&range).unwrap();
        assert!(paths.contains(&PathBuf::from("a.txt")));
        assert!(paths.contains(&PathBuf::from("dir/b.bin")));
    }

    #[test]
    fn test_changed_paths_incremental() {
        let (tmp, repo, old) = make_repo("", &[("a.txt", b"a")]);
        fs::write(tmp.path().join("new.bin"), b"new").unwrap();
        let git = |args: &[&str]| {
            let out = Command::new("git")
                .args(args)
                .current_dir(tmp.path())
                .env("GIT_AUTHOR_NAME", "test")
                .env("GIT_AUTHOR_EMAIL", "test@test")
                .env("GIT_COMMITTER_NAME", "test")
                .env("GIT_COMMITTER_EMAIL", "test@test")
                .output()
                .unwrap();
            assert!(out.status.success());
            String::from_utf8_lossy(&out.stdout).into_owned()
        };
        git(&["add", "-A"]);
        git(&["commit", "-q", "-m", "second"]);
        let new = git(&["rev-parse", "HEAD"]).trim().to_string();

        let range = CommitRange::Incremental { old, new };
        let paths = repo.changed_paths(&range).unwrap();
        assert_eq!(paths, vec![PathBuf::from("new.bin")]);
    }

    #[test]
    fn test_attr_oracle() {
        let (_tmp, repo, _tip) = make_repo(
            "*.bin filter=blobgate\n",
            &[("data.bin", b"x"), ("readme.txt", b"y")],
        );
        assert!(repo.is_managed(Path::new("data.bin")).unwrap());
        assert!(!repo.is_managed(Path::new("readme.txt")).unwrap());
    }

    #[test]
    fn test_attr_oracle_other_filter_not_managed() {
        let (_tmp, repo, _tip) =
            make_repo("*.bin filter=lfs\n", &[("data.bin", b"x")]);
        assert!(!repo.is_managed(Path::new("data.bin")).unwrap());
    }

    #[test]
    fn test_git_dir_discovery() {
        let (tmp, repo, _tip) = make_repo("", &[("a.txt", b"a")]);
        let git_dir = repo.git_dir().unwrap();
        assert_eq!(git_dir, tmp.path().join(".git").canonicalize().unwrap());
    }
}
