use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{GitError, Result};
use crate::traits::GitOps;

const DEFAULT_REMOTE: &str = "origin";

/// `git` CLI wrapper. The program name is injectable so failure paths can
/// be exercised without a repository.
pub struct GitCli {
    program: String,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run_git(&self, args: &[&str], cwd: &Path) -> Result<String> {
        debug!("Running {} {:?} in {:?}", self.program, args, cwd);

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::CommandFailed(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitOps for GitCli {
    async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn clone_repo(&self, url: &str, target: &Path, branch: Option<&str>) -> Result<()> {
        if !target.is_dir() {
            return Err(GitError::TargetMissing(target.to_path_buf()));
        }
        let mut entries = tokio::fs::read_dir(target).await?;
        if entries.next_entry().await?.is_some() {
            return Err(GitError::TargetNotEmpty(target.to_path_buf()));
        }

        info!("Cloning {} into {:?}", url, target);
        self.run_git(&["clone", url, "."], target).await?;

        if let Some(branch) = branch {
            self.run_git(&["checkout", branch], target).await?;
            info!("Checked out branch {}", branch);
        }

        Ok(())
    }

    async fn configure(&self, target: &Path, entries: &[(String, String)]) -> Result<()> {
        for (key, value) in entries {
            debug!("Setting git config {}={}", key, value);
            self.run_git(&["config", key, value], target).await?;
        }
        Ok(())
    }

    async fn create_branch(&self, name: &str, base: Option<&str>, target: &Path) -> Result<()> {
        info!("Creating branch {} in {:?}", name, target);
        match base {
            Some(base) => self.run_git(&["checkout", "-b", name, base], target).await?,
            None => self.run_git(&["checkout", "-b", name], target).await?,
        };
        Ok(())
    }

    async fn stage_all(&self, target: &Path) -> Result<()> {
        self.run_git(&["add", "-A"], target).await?;
        Ok(())
    }

    async fn commit(&self, message: &str, target: &Path) -> Result<String> {
        info!("Committing in {:?}: {}", target, message);
        self.run_git(&["commit", "-m", message], target).await?;

        let output = self.run_git(&["rev-parse", "HEAD"], target).await?;
        Ok(output.trim().to_string())
    }

    async fn push(&self, branch: &str, remote: Option<&str>, target: &Path) -> Result<()> {
        let remote = remote.unwrap_or(DEFAULT_REMOTE);
        info!("Pushing {} to {} from {:?}", branch, remote, target);
        self.run_git(&["push", "-u", remote, branch], target).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_clone_requires_existing_target() {
        let git = GitCli::new();
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = git
            .clone_repo("https://example.com/r.git", &missing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::TargetMissing(_)));
    }

    #[tokio::test]
    async fn test_clone_requires_empty_target() {
        let git = GitCli::new();
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("existing.txt"), "x").unwrap();

        let err = git
            .clone_repo("https://example.com/r.git", dir.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::TargetNotEmpty(_)));
    }

    #[tokio::test]
    async fn test_nonzero_exit_maps_to_command_failed() {
        // `false` exits 1 for any arguments.
        let git = GitCli::with_program("false");
        let dir = TempDir::new().unwrap();

        let err = git.stage_all(dir.path()).await.unwrap_err();
        assert!(matches!(err, GitError::CommandFailed(_)));

        let err = git
            .create_branch("feature/x", None, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::CommandFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_program_maps_to_io_error() {
        let git = GitCli::with_program("definitely-not-a-real-binary");
        let dir = TempDir::new().unwrap();

        let err = git.stage_all(dir.path()).await.unwrap_err();
        assert!(matches!(err, GitError::Io(_)));
        assert!(!git.is_available().await);
    }

    #[tokio::test]
    async fn test_configure_stops_on_first_error() {
        // `true` succeeds and `false` fails regardless of arguments, so a
        // failing program means the first entry already errors out.
        let git = GitCli::with_program("false");
        let dir = TempDir::new().unwrap();

        let entries = vec![
            ("user.name".to_string(), "Dev".to_string()),
            ("user.email".to_string(), "dev@example.com".to_string()),
        ];
        let err = git.configure(dir.path(), &entries).await.unwrap_err();
        assert!(matches!(err, GitError::CommandFailed(_)));
    }

    #[tokio::test]
    async fn test_configure_empty_entries_is_noop() {
        let git = GitCli::with_program("false");
        let dir = TempDir::new().unwrap();

        git.configure(dir.path(), &[]).await.unwrap();
    }
}
