//! Parsing and applying file blocks returned by the completion API.
//!
//! The response is expected in the same `=== FILE: path ===` format the
//! bundle was sent in. Anything that does not match the marker format is
//! ignored; a response with no markers yields an empty change set rather
//! than an error.

use std::path::{Component, Path};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::collector::{FILE_MARKER_PREFIX, FILE_MARKER_SUFFIX};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeReport {
    /// True only if at least one file parsed and every parsed file applied.
    pub success: bool,
    pub files_changed: usize,
    pub outcomes: Vec<FileOutcome>,
    pub summary: String,
}

impl ChangeReport {
    pub fn empty(reason: &str) -> Self {
        Self {
            success: false,
            files_changed: 0,
            outcomes: Vec::new(),
            summary: reason.to_string(),
        }
    }
}

/// Extract `(path, content)` pairs from a marker-delimited response.
/// Later blocks for the same path win. Prose around the blocks is inert.
pub fn parse_file_blocks(response: &str) -> Vec<(String, String)> {
    let mut blocks: Vec<(String, String)> = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in response.lines() {
        let trimmed = line.trim_end();
        let marker = trimmed
            .strip_prefix(FILE_MARKER_PREFIX)
            .and_then(|rest| rest.strip_suffix(FILE_MARKER_SUFFIX));

        if let Some(path) = marker {
            if let Some((done_path, lines)) = current.take() {
                push_block(&mut blocks, done_path, &lines);
            }
            current = Some((path.trim().to_string(), Vec::new()));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some((path, lines)) = current {
        push_block(&mut blocks, path, &lines);
    }

    debug!("Parsed {} file blocks from response", blocks.len());
    blocks
}

fn push_block(blocks: &mut Vec<(String, String)>, path: String, lines: &[&str]) {
    let content = lines.join("\n").trim().to_string();
    if path.is_empty() || content.is_empty() {
        return;
    }
    blocks.retain(|(existing, _)| existing != &path);
    blocks.push((path, content));
}

fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Write each parsed block back under `root`. Per-file failures are
/// recorded, not raised; paths escaping the tree are rejected.
pub async fn apply_changes(root: &Path, blocks: &[(String, String)]) -> Vec<FileOutcome> {
    let mut outcomes = Vec::new();

    for (path, content) in blocks {
        let relative = Path::new(path);
        if !is_safe_relative(relative) {
            warn!("Rejecting unsafe path from response: {}", path);
            outcomes.push(FileOutcome {
                path: path.clone(),
                success: false,
                message: "Path escapes repository root".to_string(),
            });
            continue;
        }

        let target = root.join(relative);
        let result = async {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&target, content).await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Updated file: {}", path);
                outcomes.push(FileOutcome {
                    path: path.clone(),
                    success: true,
                    message: "Success".to_string(),
                });
            }
            Err(e) => {
                warn!("Failed to update {}: {}", path, e);
                outcomes.push(FileOutcome {
                    path: path.clone(),
                    success: false,
                    message: e.to_string(),
                });
            }
        }
    }

    outcomes
}

/// Created-vs-modified summary, decided before the blocks are written.
pub fn change_summary(root: &Path, blocks: &[(String, String)]) -> String {
    let mut summary = String::new();
    for (path, _) in blocks {
        let verb = if root.join(path).exists() {
            "Modified"
        } else {
            "Created"
        };
        summary.push_str(&format!("{}: {}\n", verb, path));
    }
    summary
}
