//! The end-to-end modify pipeline: bundle the tree, ask the completion
//! API for edits, parse the response, and write the results back.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::changes::{apply_changes, change_summary, parse_file_blocks, ChangeReport};
use crate::collector::{bundle_source_files, CollectLimits};
use crate::completion::CompletionBackend;
use crate::error::Result;

const SYSTEM_PROMPT: &str = "You are a code editor assistant. You receive source files and an \
instruction describing a change. Respond with the complete updated content of every file you \
change, using exactly this format for each one:\n\n\
=== FILE: relative/path/to/file ===\n\
<full file content>\n\n\
Do not include any file you did not change. Do not use any other format.";

/// Applies a natural-language change instruction to a repository tree.
#[async_trait]
pub trait CodeModifier: Send + Sync {
    async fn modify(&self, repo: &Path, instruction: &str) -> Result<ChangeReport>;
}

pub struct CodeModTool {
    backend: Arc<dyn CompletionBackend>,
    limits: CollectLimits,
}

impl CodeModTool {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            limits: CollectLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: CollectLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[async_trait]
impl CodeModifier for CodeModTool {
    async fn modify(&self, repo: &Path, instruction: &str) -> Result<ChangeReport> {
        let bundle = bundle_source_files(repo, &self.limits).await?;
        info!(
            "Requesting changes for {} bundled files: {}",
            bundle.files.len(),
            instruction
        );

        let user_message = format!(
            "Instruction: {}\n\nCurrent files:\n\n{}",
            instruction, bundle.text
        );

        let response = self.backend.complete(SYSTEM_PROMPT, user_message).await?;

        let blocks = parse_file_blocks(&response);
        if blocks.is_empty() {
            warn!("Completion response contained no file blocks");
            return Ok(ChangeReport::empty(
                "Response contained no file changes in the expected format",
            ));
        }

        let summary = change_summary(repo, &blocks);
        let outcomes = apply_changes(repo, &blocks).await;
        let files_changed = outcomes.iter().filter(|o| o.success).count();
        let success = files_changed > 0 && outcomes.iter().all(|o| o.success);

        info!("Applied changes to {} files", files_changed);
        Ok(ChangeReport {
            success,
            files_changed,
            outcomes,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct CannedBackend {
        response: String,
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn complete(&self, _system: &str, _user: String) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    fn tool(response: &str) -> CodeModTool {
        CodeModTool::new(Arc::new(CannedBackend {
            response: response.to_string(),
        }))
    }

    #[tokio::test]
    async fn test_modify_applies_returned_blocks() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();

        let report = tool("=== FILE: main.rs ===\nfn main() { println!(\"hi\"); }\n")
            .modify(dir.path(), "add a greeting")
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.files_changed, 1);
        assert!(report.summary.contains("Modified: main.rs"));
        let content = std::fs::read_to_string(dir.path().join("main.rs")).unwrap();
        assert!(content.contains("println!"));
    }

    #[tokio::test]
    async fn test_modify_without_blocks_reports_failure_not_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();

        let report = tool("I cannot make that change.")
            .modify(dir.path(), "do something")
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.files_changed, 0);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_modify_mixed_outcomes_is_not_success() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();

        let report = tool(
            "=== FILE: main.rs ===\nfn main() { run(); }\n\
             === FILE: ../outside.rs ===\nbad\n",
        )
        .modify(dir.path(), "change things")
        .await
        .unwrap();

        assert!(!report.success);
        assert_eq!(report.files_changed, 1);
        assert_eq!(report.outcomes.len(), 2);
    }

    #[tokio::test]
    async fn test_modify_empty_tree_uses_placeholder() {
        let dir = TempDir::new().unwrap();

        let report = tool("=== FILE: NOTES.md ===\n# Updated notes\n")
            .modify(dir.path(), "write some notes")
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("NOTES.md")).unwrap(),
            "# Updated notes"
        );
    }
}
