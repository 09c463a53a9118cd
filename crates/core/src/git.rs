//! Asynchronous git CLI client.
//!
//! One-shot subprocess invocations with fully buffered output. The public
//! queries never fail: a missing binary, a non-zero exit, or unreadable
//! output all collapse to "no result", logged at debug level. The engine
//! only ever reads repository state, never writes it.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::errors::GitError;

/// Asynchronous client for querying git repository state via the CLI.
#[derive(Debug, Clone)]
pub struct GitClient {
    program: String,
}

impl GitClient {
    /// Create a client invoking `program` (normally just `git`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve the repository control directory (`.git`) governing `dir`.
    ///
    /// Returns `None` when `dir` is not inside a working tree.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn resolve_git_dir(&self, dir: &Path) -> Option<PathBuf> {
        match self.run_git(dir, &["rev-parse", "--absolute-git-dir"]).await {
            Ok(output) => {
                let path = output.lines().next().unwrap_or("").trim();
                if path.is_empty() {
                    None
                } else {
                    debug!(git_dir = path, "resolved git control directory");
                    Some(PathBuf::from(path))
                }
            }
            Err(e) => {
                debug!(error = %e, "not inside a git repository");
                None
            }
        }
    }

    /// Resolve the top-level working-tree directory governing `dir`.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn worktree_root(&self, dir: &Path) -> Option<PathBuf> {
        match self.run_git(dir, &["rev-parse", "--show-toplevel"]).await {
            Ok(output) => {
                let path = output.lines().next().unwrap_or("").trim();
                if path.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(path))
                }
            }
            Err(e) => {
                debug!(error = %e, "no worktree root");
                None
            }
        }
    }

    /// Absolute paths of every unmerged (conflicted) file in the working
    /// tree containing `dir`. Empty on any failure.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn unmerged_paths(&self, dir: &Path) -> Vec<PathBuf> {
        let Some(root) = self.worktree_root(dir).await else {
            return Vec::new();
        };
        match self
            .run_git(dir, &["diff", "--name-only", "--diff-filter=U"])
            .await
        {
            Ok(output) => {
                let paths: Vec<PathBuf> = output
                    .lines()
                    .filter(|l| !l.is_empty())
                    .map(|rel| root.join(rel))
                    .collect();
                debug!(count = paths.len(), "listed unmerged paths");
                paths
            }
            Err(e) => {
                debug!(error = %e, "unmerged path query failed");
                Vec::new()
            }
        }
    }

    async fn run_git(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(dir)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = ?format!("{} {}", self.program, args.join(" ")), "running git command");
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound(self.program.clone())
            } else {
                GitError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(exit_code, %stderr, "git command failed");
            return Err(GitError::CommandFailed { exit_code, stderr });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for GitClient {
    fn default() -> Self {
        Self::new("git")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_ok()
    }

    #[tokio::test]
    async fn test_missing_binary_degrades_to_none() {
        let client = GitClient::new("definitely-not-a-git-binary");
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(client.resolve_git_dir(dir.path()).await, None);
        assert!(client.unmerged_paths(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_repository_degrades_to_none() {
        if !git_available() {
            eprintln!("git not available, skipping");
            return;
        }
        let client = GitClient::default();
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(client.resolve_git_dir(dir.path()).await, None);
        assert!(client.unmerged_paths(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_git_dir_in_repository() {
        if !git_available() {
            eprintln!("git not available, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::process::Command::new("git")
            .arg("init")
            .current_dir(dir.path())
            .output()
            .unwrap();

        let client = GitClient::default();
        let git_dir = client.resolve_git_dir(dir.path()).await.unwrap();
        assert!(git_dir.ends_with(".git"));

        let root = client.worktree_root(dir.path()).await.unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
        // Fresh repository has no conflicts.
        assert!(client.unmerged_paths(dir.path()).await.is_empty());
    }
}
