//! The assistant-visible query operations.
//!
//! Each tool takes a typed input (deserialized from the MCP params), reads
//! through the [`IndexStore`] seam, and renders either markdown (default) or
//! a byte-budgeted compact table.

pub mod calls;
pub mod context;
pub mod deps;
pub mod files;
pub mod overview;
pub mod references;
pub mod related;
pub mod search;
pub mod source;
pub mod sync;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lazyload_core::config::LazyloadConfig;
use lazyload_core::store::IndexStore;
use lazyload_core::types::StoreError;
use lazyload_parsers::paths::{PathResolver, ResolveFailure, ResolvedPath};

use crate::indexer::{IndexError, Indexer};
use crate::synonyms::SynonymExpander;

/// Soft deadline for a single tool invocation. Crossing it truncates the
/// response with a partial marker rather than failing.
pub const TOOL_DEADLINE: Duration = Duration::from_secs(15);

/// Marker appended when a tool stops early at its deadline.
pub const PARTIAL_MARKER: &str = "\n[partial: deadline exceeded]";

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{what} not found{}", hint.as_deref().map(|h| format!("; {h}")).unwrap_or_default())]
    NotFound {
        what: String,
        hint: Option<String>,
    },

    #[error("ambiguous {0}: {1}")]
    Ambiguous(String, String),

    #[error("invalid argument: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state behind all tool handlers: config, the synonym expander, and
/// the indexer (for `sync_index`).
pub struct QueryTools {
    indexer: Indexer,
    expander: SynonymExpander,
}

impl QueryTools {
    pub fn new(root: &Path, config: LazyloadConfig) -> Self {
        let expander = SynonymExpander::from_config(&config.synonyms);
        Self {
            indexer: Indexer::new(root, config),
            expander,
        }
    }

    pub fn root(&self) -> &Path {
        self.indexer.root()
    }

    pub fn config(&self) -> &LazyloadConfig {
        self.indexer.config()
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub(crate) fn expander(&self) -> &SynonymExpander {
        &self.expander
    }

    /// Run the path-resolver ladder against the indexed paths.
    pub(crate) fn resolve_path(
        &self,
        store: &dyn IndexStore,
        user_path: &str,
    ) -> Result<ResolvedPath, ToolError> {
        let indexed = store.all_file_paths();
        let resolver = PathResolver::new(self.root(), &indexed);
        resolver.resolve(user_path).map_err(|failure| match failure {
            ResolveFailure::Ambiguous { suggestions } => {
                ToolError::Ambiguous("path".into(), suggestions.join(", "))
            }
            ResolveFailure::NotFound {
                suggestions,
                directory_files,
            } => {
                let mut hint = None;
                if !suggestions.is_empty() {
                    hint = Some(format!("did you mean: {}", suggestions.join(", ")));
                } else if !directory_files.is_empty() {
                    hint = Some(format!("nearby files: {}", directory_files.join(", ")));
                }
                ToolError::NotFound {
                    what: format!("file {}", user_path),
                    hint,
                }
            }
        })
    }

    /// Read a span of lines (1-based, inclusive) from a source file.
    pub(crate) fn read_source_span(
        &self,
        path: &str,
        start_line: u32,
        end_line: u32,
        context_lines: u32,
    ) -> Result<String, ToolError> {
        let content = std::fs::read_to_string(PathBuf::from(path))?;
        let lines: Vec<&str> = content.lines().collect();
        // The file may have shrunk since indexing; clamp both ends.
        let to = ((end_line + context_lines) as usize).min(lines.len());
        let from = (start_line.saturating_sub(1 + context_lines) as usize).min(to);
        Ok(lines[from..to].join("\n"))
    }
}

/// Tracks the per-tool soft deadline.
pub(crate) struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            limit: TOOL_DEADLINE,
        }
    }

    pub fn exceeded(&self) -> bool {
        self.started.elapsed() > self.limit
    }
}

/// Heuristic test-file detection shared by `list_files` and the related-
/// context bundler.
pub(crate) fn is_test_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    let basename = lower.rsplit('/').next().unwrap_or(&lower);
    lower.contains("/tests/")
        || lower.contains("/__tests__/")
        || lower.contains("/test/")
        || basename.contains(".test.")
        || basename.contains(".spec.")
        || basename.starts_with("test_")
        || basename.ends_with("_test.py")
}

#[cfg(test)]
#[path = "tests.rs"]
mod tool_tests;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_test_path() {
        assert!(is_test_path("src/__tests__/user.ts"));
        assert!(is_test_path("src/user.test.ts"));
        assert!(is_test_path("src/user.spec.tsx"));
        assert!(is_test_path("pkg/test_models.py"));
        assert!(is_test_path("pkg/models_test.py"));
        assert!(is_test_path("project/tests/helpers.py"));
        assert!(!is_test_path("src/user.ts"));
        assert!(!is_test_path("pkg/contest.py"));
    }
}
