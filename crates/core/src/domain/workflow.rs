use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::domain::run::{RunId, RunStatus, StepResult};

pub const DEFAULT_BASE_BRANCH: &str = "main";

/// Git identity applied to the clone before committing. Entries are applied
/// in key order; partially applied config is left in place on error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitConfig {
    #[serde(flatten)]
    pub entries: BTreeMap<String, String>,
}

impl GitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(name: impl Into<String>, email: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert("user.name".to_string(), name.into());
        entries.insert("user.email".to_string(), email.into());
        Self { entries }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// File written into the clone when no code-change instruction is given,
/// so the commit step has something to commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFile {
    pub path: String,
    pub content: String,
}

/// Everything the orchestrator needs for one end-to-end run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub repo_url: String,
    /// Caller-owned working directory. When set, no sandbox is created and
    /// cleanup stays with the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    /// Branch to check out after cloning; the remote default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_branch: Option<String>,
    /// Branch to create for the change; derived from the run id when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Branch the PR targets.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    pub commit_message: String,
    #[serde(default)]
    pub git_config: GitConfig,
    /// Natural-language instruction for the code-modification step.
    /// `None` skips the step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_instruction: Option<String>,
    /// Fallback content to commit when no instruction is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<SeedFile>,
    /// `owner/repo` for the forge API; `None` skips PR creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_full_name: Option<String>,
    pub pr_title: String,
    #[serde(default)]
    pub pr_body: String,
    /// Open the pull request as a draft.
    #[serde(default)]
    pub draft_pr: bool,
    /// Whether to run configured validators after the change.
    #[serde(default)]
    pub run_validation: bool,
}

fn default_base_branch() -> String {
    DEFAULT_BASE_BRANCH.to_string()
}

impl WorkflowRequest {
    pub fn new(repo_url: impl Into<String>, commit_message: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            workdir: None,
            clone_branch: None,
            branch_name: None,
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            commit_message: commit_message.into(),
            git_config: GitConfig::new(),
            change_instruction: None,
            seed_file: None,
            repo_full_name: None,
            pr_title: String::new(),
            pr_body: String::new(),
            draft_pr: false,
            run_validation: false,
        }
    }

    pub fn branch_for(&self, id: &RunId) -> String {
        match &self.branch_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("feature/workflow-{}", id.short()),
        }
    }

    pub fn wants_pull_request(&self) -> bool {
        self.repo_full_name.is_some()
    }
}

/// Final caller-facing report: every attempted step with its status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub run_id: RunId,
    pub status: RunStatus,
    pub success: bool,
    pub steps: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_config_identity() {
        let config = GitConfig::identity("Dev", "dev@example.com");
        let pairs: Vec<_> = config.iter().collect();
        assert_eq!(
            pairs,
            vec![("user.email", "dev@example.com"), ("user.name", "Dev")]
        );
    }

    #[test]
    fn test_branch_for_derives_from_run_id() {
        let request = WorkflowRequest::new("https://example.com/a/b.git", "msg");
        let id = RunId::generate();
        let branch = request.branch_for(&id);
        assert_eq!(branch, format!("feature/workflow-{}", id.short()));
    }

    #[test]
    fn test_branch_for_honors_explicit_name() {
        let mut request = WorkflowRequest::new("https://example.com/a/b.git", "msg");
        request.branch_name = Some("fix/flaky-test".to_string());
        assert_eq!(request.branch_for(&RunId::generate()), "fix/flaky-test");
    }

    #[test]
    fn test_wants_pull_request() {
        let mut request = WorkflowRequest::new("url", "msg");
        assert!(!request.wants_pull_request());
        request.repo_full_name = Some("owner/repo".to_string());
        assert!(request.wants_pull_request());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let json = r#"{"repo_url": "u", "commit_message": "m", "pr_title": "t"}"#;
        let request: WorkflowRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.base_branch, "main");
        assert!(!request.run_validation);
        assert!(request.git_config.is_empty());
    }
}
