//! Error types for the MergeMark core library.
//!
//! Each subsystem that can actually fail has its own error type derived with
//! `thiserror`, and a top-level [`CoreError`] enum unifies them. Most of the
//! engine deliberately has no error surface: parse anomalies, tracker query
//! failures, and stale buffers all degrade to "do nothing" per the
//! availability-first failure policy.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from git CLI invocations.
///
/// These are internal to the subprocess layer; the public query API on
/// [`crate::git::GitClient`] maps them to "no result".
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// A `git` command exited with a non-zero status.
    #[error("git command failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = GitError::BinaryNotFound("git".into());
        assert_eq!(err.to_string(), "git binary not found: git");

        let err = GitError::CommandFailed {
            exit_code: 128,
            stderr: "fatal: not a git repository".into(),
        };
        assert!(err.to_string().contains("exit 128"));

        let err = ConfigError::FileNotFound("/etc/mergemark.toml".into());
        assert!(err.to_string().contains("/etc/mergemark.toml"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let git_err = GitError::BinaryNotFound("git".into());
        let core_err: CoreError = git_err.into();
        assert!(matches!(core_err, CoreError::Git(_)));
    }
}
