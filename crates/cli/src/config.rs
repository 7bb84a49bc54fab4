//! Configuration: `forgeflow.toml` overlaid with environment variables.
//!
//! Secrets (`GITHUB_TOKEN`, `OPENAI_API_KEY`) come from the environment
//! only and are passed through opaque; the config file never holds them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use forgeflow_core::GitConfig;
use validation::ValidatorConfig;

pub const CONFIG_FILE: &str = "forgeflow.toml";

pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
const GIT_AUTHOR_NAME_VAR: &str = "GIT_AUTHOR_NAME";
const GIT_AUTHOR_EMAIL_VAR: &str = "GIT_AUTHOR_EMAIL";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub sandbox: SandboxSection,
    #[serde(default)]
    pub git: GitSection,
    #[serde(default)]
    pub forge: ForgeSection,
    #[serde(default)]
    pub coder: CoderSection,
    #[serde(default)]
    pub validation: ValidatorConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SandboxSection {
    pub root: PathBuf,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join("forgeflow-sandboxes"),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GitSection {
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ForgeSection {
    /// Override for self-hosted forges; default is api.github.com.
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CoderSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_files: Option<usize>,
    pub max_total_lines: Option<usize>,
}

impl FlowConfig {
    /// Load from an explicit path, or from `forgeflow.toml` in the current
    /// directory when it exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => {
                let default = Path::new(CONFIG_FILE);
                if default.exists() {
                    Self::read_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(name) = std::env::var(GIT_AUTHOR_NAME_VAR) {
            if !name.is_empty() {
                self.git.author_name = Some(name);
            }
        }
        if let Ok(email) = std::env::var(GIT_AUTHOR_EMAIL_VAR) {
            if !email.is_empty() {
                self.git.author_email = Some(email);
            }
        }
    }

    /// Identity entries for the clone's local git config.
    pub fn git_config(&self) -> GitConfig {
        let mut config = GitConfig::new();
        if let Some(name) = &self.git.author_name {
            config.set("user.name", name);
        }
        if let Some(email) = &self.git.author_email {
            config.set("user.email", email);
        }
        config
    }
}

/// Fetch a secret from the environment, failing with the variable name so
/// the message says what to set without echoing any value.
pub fn require_env_secret(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => anyhow::bail!("Environment variable {} is not set", var),
    }
}
