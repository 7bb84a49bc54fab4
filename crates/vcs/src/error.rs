use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    /// Non-zero exit from a git invocation; carries stderr.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Target directory does not exist: {0}")]
    TargetMissing(PathBuf),

    #[error("Target directory is not empty: {0}")]
    TargetNotEmpty(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GitError>;
