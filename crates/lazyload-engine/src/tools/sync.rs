//! `sync_index`: re-index changed files, optionally rebuilding chains.

use serde::Deserialize;

use lazyload_core::store::IndexStore;
use lazyload_output::markdown;

use super::{QueryTools, ToolError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncIndexInput {
    pub files: Option<Vec<String>>,
    pub rebuild_chains: Option<bool>,
}

impl QueryTools {
    pub fn sync_index(
        &self,
        store: &mut dyn IndexStore,
        input: &SyncIndexInput,
    ) -> Result<String, ToolError> {
        let summary = self.indexer().sync(
            store,
            input.files.as_deref(),
            input.rebuild_chains.unwrap_or(false),
        )?;

        let mut out = String::new();
        out.push_str(&markdown::heading(2, "Index sync"));
        out.push_str(&format!(
            "{} checked, {} updated, {} unchanged ({} ms)\n",
            summary.total_files,
            summary.indexed_files,
            summary.skipped_files,
            summary.duration_ms
        ));
        if input.rebuild_chains.unwrap_or(false) {
            out.push_str("Chains rebuilt.\n");
        }
        if !summary.errors.is_empty() {
            out.push_str(&markdown::heading(3, "Errors"));
            for error in &summary.errors {
                out.push_str(&markdown::bullet(&format!(
                    "{}: {}",
                    error.path, error.message
                )));
            }
        }
        Ok(out)
    }
}
