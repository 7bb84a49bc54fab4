use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Version-control operations against a working directory.
///
/// Every call wraps one external invocation (or the documented compound
/// sequence) and re-derives its outcome from the tool's exit code; no
/// state is kept between calls.
#[async_trait]
pub trait GitOps: Send + Sync {
    /// Check that the underlying tool exists.
    async fn is_available(&self) -> bool;

    /// Clone `url` into `target`, which must exist and be empty.
    /// Checks out `branch` after cloning when given.
    async fn clone_repo(&self, url: &str, target: &Path, branch: Option<&str>) -> Result<()>;

    /// Apply local repo config entries in order. Stops on the first
    /// failure; earlier entries remain applied.
    async fn configure(&self, target: &Path, entries: &[(String, String)]) -> Result<()>;

    /// Create and switch to a new branch, optionally from `base`.
    async fn create_branch(&self, name: &str, base: Option<&str>, target: &Path) -> Result<()>;

    /// Stage every change in the working tree.
    async fn stage_all(&self, target: &Path) -> Result<()>;

    /// Commit staged changes and return the new commit hash.
    async fn commit(&self, message: &str, target: &Path) -> Result<String>;

    /// Push `branch` to `remote` (default `origin`), setting upstream.
    async fn push(&self, branch: &str, remote: Option<&str>, target: &Path) -> Result<()>;
}
