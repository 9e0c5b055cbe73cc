//! `get_architecture_overview`: module map, entry points, public API.

use std::collections::BTreeMap;

use serde::Deserialize;

use lazyload_core::store::IndexStore;
use lazyload_core::types::FileFilter;
use lazyload_output::compact::{table, truncate_to_bytes};
use lazyload_output::markdown;
use lazyload_output::OutputFormat;

use super::{QueryTools, ToolError};

const OVERVIEW_BYTE_BUDGET: usize = 16 * 1024;
const MAX_PUBLIC_API: usize = 40;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchitectureOverviewInput {
    pub focus: Option<String>,
    pub format: Option<String>,
}

impl QueryTools {
    pub fn get_architecture_overview(
        &self,
        store: &dyn IndexStore,
        input: &ArchitectureOverviewInput,
    ) -> Result<String, ToolError> {
        let directory = input.focus.as_deref().map(|dir| {
            if std::path::Path::new(dir).is_absolute() {
                dir.trim_end_matches('/').to_string()
            } else {
                lazyload_parsers::imports::normalize(&self.root().join(dir))
            }
        });
        let files = store.list_files(&FileFilter {
            directory,
            language: None,
            limit: None,
            offset: 0,
        });

        // Module map: per-directory file and line counts.
        let mut modules: BTreeMap<String, (usize, u64)> = BTreeMap::new();
        for file in &files {
            let dir = match file.path.rfind('/') {
                Some(slash) => file.path[..slash].to_string(),
                None => ".".to_string(),
            };
            let slot = modules.entry(dir).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += u64::from(file.line_count);
        }

        // Entry points: files that import others but are imported by nothing.
        let mut entry_points = Vec::new();
        for file in &files {
            if store.get_reverse_dependencies(&file.path).is_empty()
                && !store.get_file_imports(&file.path).is_empty()
            {
                entry_points.push(file.path.clone());
            }
        }

        // Public API: exported symbols across the scope.
        let mut public_api = Vec::new();
        'outer: for file in &files {
            for symbol in store.get_symbols_in_file(&file.path) {
                if symbol.is_exported() {
                    public_api.push(symbol);
                    if public_api.len() >= MAX_PUBLIC_API {
                        break 'outer;
                    }
                }
            }
        }

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                let mut rows = Vec::new();
                for (dir, (count, lines)) in &modules {
                    rows.push(vec![
                        "module".to_string(),
                        dir.clone(),
                        count.to_string(),
                        lines.to_string(),
                    ]);
                }
                for entry in &entry_points {
                    rows.push(vec![
                        "entry".to_string(),
                        entry.clone(),
                        String::new(),
                        String::new(),
                    ]);
                }
                for symbol in &public_api {
                    rows.push(vec![
                        "api".to_string(),
                        symbol.name.clone(),
                        symbol.kind.to_string(),
                        symbol.file_path.clone(),
                    ]);
                }
                out.push_str(&table(&["section", "name", "a", "b"], &rows));
                Ok(truncate_to_bytes(&out, OVERVIEW_BYTE_BUDGET))
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(2, "Architecture overview"));
                if let Some(focus) = &input.focus {
                    out.push_str(&format!("Focus: {}\n\n", focus));
                }

                out.push_str(&markdown::heading(3, "Modules"));
                for (dir, (count, lines)) in &modules {
                    out.push_str(&markdown::bullet(&format!(
                        "{}: {} files, {} lines",
                        dir, count, lines
                    )));
                }
                out.push('\n');

                out.push_str(&markdown::heading(3, "Entry points"));
                if entry_points.is_empty() {
                    out.push_str("None detected.\n\n");
                } else {
                    for entry in &entry_points {
                        out.push_str(&markdown::bullet(entry));
                    }
                    out.push('\n');
                }

                out.push_str(&markdown::heading(3, "Public API"));
                for symbol in &public_api {
                    out.push_str(&markdown::bullet(&markdown::symbol_line(
                        &symbol.name,
                        symbol.kind.as_str(),
                        &symbol.file_path,
                        symbol.location.start_line,
                    )));
                }
                Ok(out)
            }
        }
    }
}
