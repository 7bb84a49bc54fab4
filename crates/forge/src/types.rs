use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct CreatePrRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub draft: bool,
}

impl CreatePrRequest {
    pub fn new(title: impl Into<String>, head: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            head: head.into(),
            base: base.into(),
            draft: false,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn as_draft(mut self) -> Self {
        self.draft = true;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub owner: String,
    pub repo: String,
}

impl RepoConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn from_full_name(full_name: &str) -> Result<Self> {
        let parts: Vec<&str> = full_name.split('/').collect();
        match parts.as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self::new(*owner, *repo))
            }
            _ => Err(ForgeError::InvalidRepo(full_name.to_string())),
        }
    }

    pub fn from_git_url(url: &str) -> Result<Self> {
        let trimmed = url.trim();

        if let Some(rest) = trimmed.strip_prefix("git@") {
            if let Some((_, repo_path)) = rest.split_once(':') {
                return Self::from_full_name(repo_path.trim_end_matches(".git"))
                    .map_err(|_| ForgeError::InvalidRepo(url.to_string()));
            }
            return Err(ForgeError::InvalidRepo(url.to_string()));
        }

        if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            let stripped = trimmed.trim_end_matches(".git");
            let mut parts = stripped.rsplit('/');
            if let (Some(repo), Some(owner)) = (parts.next(), parts.next()) {
                if !owner.contains('.') && !owner.is_empty() && !repo.is_empty() {
                    return Ok(Self::new(owner, repo));
                }
            }
            return Err(ForgeError::InvalidRepo(url.to_string()));
        }

        Err(ForgeError::InvalidRepo(url.to_string()))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}
