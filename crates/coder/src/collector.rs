//! Source-file collection and bundling.
//!
//! Files are gathered in lexicographic path order so the bundle sent to
//! the completion API is deterministic for a given tree.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::Result;

pub const FILE_MARKER_PREFIX: &str = "=== FILE: ";
pub const FILE_MARKER_SUFFIX: &str = " ===";

const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "__pycache__", "venv", "vendor"];
const DEFAULT_EXTENSIONS: &[&str] = &["rs", "py", "js", "ts", "go", "java", "rb", "c", "cpp", "h"];

/// Placeholder written when the tree has no matching source files, so the
/// pipeline still has something to operate on.
const PLACEHOLDER_PATH: &str = "NOTES.md";
const PLACEHOLDER_CONTENT: &str = "# Notes\n\nThis file was created as a starting point for code changes.\n";

#[derive(Debug, Clone)]
pub struct CollectLimits {
    pub max_files: usize,
    pub max_total_lines: usize,
}

impl Default for CollectLimits {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_total_lines: 2000,
        }
    }
}

/// A delimited text blob plus the files that went into it.
#[derive(Debug, Clone)]
pub struct SourceBundle {
    pub text: String,
    pub files: Vec<PathBuf>,
    pub total_lines: usize,
    /// True when the bundle consists of a synthesized placeholder file.
    pub synthesized: bool,
}

impl SourceBundle {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DEFAULT_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Walk `root` and return matching file paths, relative to `root`, in
/// lexicographic order. The walk itself is unordered; ordering is imposed
/// by a final sort.
async fn collect_source_paths(root: &Path) -> Result<Vec<PathBuf>> {
    let mut pending = vec![root.to_path_buf()];
    let mut found = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                if !is_skipped_dir(&name) {
                    pending.push(path);
                }
            } else if file_type.is_file() && has_source_extension(&path) {
                if let Ok(relative) = path.strip_prefix(root) {
                    found.push(relative.to_path_buf());
                }
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Bundle source files under `root` into one marker-delimited blob,
/// honoring the file and line limits. An empty tree gets a synthesized
/// placeholder file instead of an empty bundle.
pub async fn bundle_source_files(root: &Path, limits: &CollectLimits) -> Result<SourceBundle> {
    info!(
        "Collecting source files from {:?} (max {} files, {} lines)",
        root, limits.max_files, limits.max_total_lines
    );

    let candidates = collect_source_paths(root).await?;

    if candidates.is_empty() {
        debug!("No source files found, synthesizing {}", PLACEHOLDER_PATH);
        let placeholder = root.join(PLACEHOLDER_PATH);
        fs::write(&placeholder, PLACEHOLDER_CONTENT).await?;

        let text = format!(
            "{}{}{}\n{}",
            FILE_MARKER_PREFIX, PLACEHOLDER_PATH, FILE_MARKER_SUFFIX, PLACEHOLDER_CONTENT
        );
        return Ok(SourceBundle {
            text,
            files: vec![PathBuf::from(PLACEHOLDER_PATH)],
            total_lines: PLACEHOLDER_CONTENT.lines().count(),
            synthesized: true,
        });
    }

    let mut text = String::new();
    let mut files = Vec::new();
    let mut total_lines = 0;

    for relative in candidates {
        if files.len() >= limits.max_files {
            debug!("Reached file limit ({})", limits.max_files);
            break;
        }

        let content = match fs::read_to_string(root.join(&relative)).await {
            Ok(content) if !content.is_empty() => content,
            Ok(_) => continue,
            Err(e) => {
                debug!("Skipping unreadable file {:?}: {}", relative, e);
                continue;
            }
        };

        let line_count = content.lines().count();
        if total_lines + line_count > limits.max_total_lines {
            debug!("Reached line limit ({})", limits.max_total_lines);
            break;
        }

        text.push_str(FILE_MARKER_PREFIX);
        text.push_str(&relative.to_string_lossy());
        text.push_str(FILE_MARKER_SUFFIX);
        text.push('\n');
        text.push_str(&content);
        text.push('\n');

        total_lines += line_count;
        files.push(relative);
    }

    info!("Bundled {} files ({} lines)", files.len(), total_lines);
    Ok(SourceBundle {
        text,
        files,
        total_lines,
        synthesized: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_bundle_is_lexicographically_ordered() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "zeta.rs", "fn z() {}\n").await;
        write(dir.path(), "alpha.rs", "fn a() {}\n").await;
        write(dir.path(), "src/mid.rs", "fn m() {}\n").await;

        let bundle = bundle_source_files(dir.path(), &CollectLimits::default())
            .await
            .unwrap();

        assert_eq!(
            bundle.files,
            vec![
                PathBuf::from("alpha.rs"),
                PathBuf::from("src/mid.rs"),
                PathBuf::from("zeta.rs"),
            ]
        );
        let a = bundle.text.find("alpha.rs").unwrap();
        let z = bundle.text.find("zeta.rs").unwrap();
        assert!(a < z);
    }

    #[tokio::test]
    async fn test_bundle_skips_hidden_and_build_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "keep.rs", "fn k() {}\n").await;
        write(dir.path(), ".git/config.rs", "ignored\n").await;
        write(dir.path(), "target/debug/out.rs", "ignored\n").await;
        write(dir.path(), "node_modules/x/y.js", "ignored\n").await;

        let bundle = bundle_source_files(dir.path(), &CollectLimits::default())
            .await
            .unwrap();
        assert_eq!(bundle.files, vec![PathBuf::from("keep.rs")]);
    }

    #[tokio::test]
    async fn test_bundle_honors_file_limit() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            write(dir.path(), &format!("f{:02}.rs", i), "fn f() {}\n").await;
        }

        let limits = CollectLimits {
            max_files: 3,
            max_total_lines: 2000,
        };
        let bundle = bundle_source_files(dir.path(), &limits).await.unwrap();
        assert_eq!(bundle.files.len(), 3);
        assert_eq!(bundle.files[0], PathBuf::from("f00.rs"));
    }

    #[tokio::test]
    async fn test_bundle_honors_line_limit() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.rs", &"line\n".repeat(30)).await;
        write(dir.path(), "b.rs", &"line\n".repeat(30)).await;

        let limits = CollectLimits {
            max_files: 10,
            max_total_lines: 40,
        };
        let bundle = bundle_source_files(dir.path(), &limits).await.unwrap();
        assert_eq!(bundle.files.len(), 1);
        assert_eq!(bundle.total_lines, 30);
    }

    #[tokio::test]
    async fn test_empty_tree_synthesizes_placeholder() {
        let dir = TempDir::new().unwrap();

        let bundle = bundle_source_files(dir.path(), &CollectLimits::default())
            .await
            .unwrap();

        assert!(bundle.synthesized);
        assert_eq!(bundle.files, vec![PathBuf::from("NOTES.md")]);
        assert!(dir.path().join("NOTES.md").exists());
        assert!(bundle.text.starts_with("=== FILE: NOTES.md ==="));
    }
}
