use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, SandboxError};

/// Allocates and destroys isolated working directories under one root.
///
/// Each acquired sandbox is a uniquely-named subdirectory owned by exactly
/// one workflow run; the random suffix carries 32 bits of entropy so
/// concurrent runs sharing a root cannot collide.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Create a fresh sandbox directory, creating the root first if needed.
    async fn acquire(&self, name: Option<&str>) -> Result<PathBuf>;

    /// Validate a caller-owned working directory. The manager never deletes
    /// adopted directories; cleanup responsibility stays with the caller.
    async fn adopt(&self, dir: &Path) -> Result<PathBuf>;

    /// Recursively delete a sandbox. Already-absent paths are success.
    async fn release(&self, path: &Path) -> Result<()>;
}

pub struct SandboxManager {
    root: PathBuf,
}

impl SandboxManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unique_name() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("sandbox-{}", &suffix[..8])
    }
}

#[async_trait]
impl SandboxProvider for SandboxManager {
    async fn acquire(&self, name: Option<&str>) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| SandboxError::Create {
                path: self.root.clone(),
                source,
            })?;

        let dir_name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => Self::unique_name(),
        };
        let path = self.root.join(dir_name);

        // A derived name may collide with a leftover from an earlier run;
        // start from an empty directory either way.
        if fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Removing stale sandbox at {:?}", path);
            fs::remove_dir_all(&path)
                .await
                .map_err(|source| SandboxError::Remove {
                    path: path.clone(),
                    source,
                })?;
        }

        fs::create_dir(&path)
            .await
            .map_err(|source| SandboxError::Create {
                path: path.clone(),
                source,
            })?;

        info!("Created sandbox at {:?}", path);
        Ok(path)
    }

    async fn adopt(&self, dir: &Path) -> Result<PathBuf> {
        if !fs::try_exists(dir).await.unwrap_or(false) {
            return Err(SandboxError::MissingExternalDir(dir.to_path_buf()));
        }
        info!("Using caller-owned working directory at {:?}", dir);
        Ok(dir.to_path_buf())
    }

    async fn release(&self, path: &Path) -> Result<()> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!("Sandbox already absent at {:?}", path);
            return Ok(());
        }

        if !path.starts_with(&self.root) {
            warn!("Refusing to release directory outside sandbox root: {:?}", path);
            return Ok(());
        }

        info!("Releasing sandbox at {:?}", path);
        fs::remove_dir_all(path)
            .await
            .map_err(|source| SandboxError::Remove {
                path: path.to_path_buf(),
                source,
            })
    }
}
