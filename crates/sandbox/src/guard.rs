//! RAII guard for sandbox lifecycle.
//!
//! The orchestrator releases the sandbox explicitly; the guard's `Drop`
//! is the fallback that still removes an owned directory when the scope
//! is left some other way.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::manager::SandboxProvider;

pub struct SandboxGuard {
    path: PathBuf,
    provider: Arc<dyn SandboxProvider>,
    /// False for caller-owned directories, which are never deleted.
    owned: bool,
    released: bool,
}

impl SandboxGuard {
    pub fn owned(path: PathBuf, provider: Arc<dyn SandboxProvider>) -> Self {
        debug!("Sandbox guard created for {:?}", path);
        Self {
            path,
            provider,
            owned: true,
            released: false,
        }
    }

    pub fn external(path: PathBuf, provider: Arc<dyn SandboxProvider>) -> Self {
        Self {
            path,
            provider,
            owned: false,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release the sandbox through the provider. Idempotent; external
    /// directories are left in place but the guard is still disarmed.
    pub async fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if !self.owned {
            debug!("Leaving caller-owned directory in place: {:?}", self.path);
            return Ok(());
        }

        self.provider.release(&self.path).await
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        if self.released || !self.owned {
            return;
        }

        warn!(
            "Sandbox guard dropped without release, removing {:?}",
            self.path
        );
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Fallback sandbox removal failed for {:?}: {}", self.path, e);
            }
        }
    }
}
