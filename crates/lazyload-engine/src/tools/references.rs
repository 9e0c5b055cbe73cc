//! `find_references`: grouped-by-file reference listing.

use std::collections::BTreeMap;

use serde::Deserialize;

use lazyload_core::store::IndexStore;
use lazyload_core::types::SymbolReference;
use lazyload_output::compact::{table, truncate_to_bytes};
use lazyload_output::markdown;
use lazyload_output::OutputFormat;

use super::{QueryTools, ToolError};

const REFERENCES_BYTE_BUDGET: usize = 12 * 1024;
const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindReferencesInput {
    #[serde(rename = "symbolName")]
    pub symbol_name: String,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    pub limit: Option<usize>,
    pub format: Option<String>,
}

impl QueryTools {
    pub fn find_references(
        &self,
        store: &dyn IndexStore,
        input: &FindReferencesInput,
    ) -> Result<String, ToolError> {
        let mut references = store.get_references_by_name(&input.symbol_name);

        if let Some(user_path) = &input.file_path {
            let resolved = self.resolve_path(store, user_path)?;
            references.retain(|r| r.referencing_file == resolved.resolved_path);
        }

        let limit = input.limit.unwrap_or(DEFAULT_LIMIT);
        let total = references.len();
        references.truncate(limit);

        // Insertion order within each file is preserved by the grouped map.
        let mut by_file: BTreeMap<String, Vec<&SymbolReference>> = BTreeMap::new();
        for reference in &references {
            by_file
                .entry(reference.referencing_file.clone())
                .or_default()
                .push(reference);
        }

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                let rows: Vec<Vec<String>> = references
                    .iter()
                    .map(|r| {
                        vec![
                            r.referencing_file.clone(),
                            r.line.to_string(),
                            r.kind.as_str().to_string(),
                            r.context.clone(),
                        ]
                    })
                    .collect();
                out.push_str(&table(&["file", "line", "kind", "context"], &rows));
                if total > references.len() {
                    out.push_str(&format!("total\t{}\n", total));
                }
                Ok(truncate_to_bytes(&out, REFERENCES_BYTE_BUDGET))
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(
                    2,
                    &format!("References to {}", input.symbol_name),
                ));
                if references.is_empty() {
                    out.push_str("No references found.\n");
                    return Ok(out);
                }
                out.push_str(&format!(
                    "{} references in {} files\n\n",
                    total,
                    by_file.len()
                ));
                for (file, refs) in &by_file {
                    out.push_str(&markdown::heading(3, file));
                    for reference in refs {
                        let enclosing = reference
                            .referencing_symbol_name
                            .as_deref()
                            .map(|n| format!(" in `{}`", n))
                            .unwrap_or_default();
                        out.push_str(&markdown::bullet(&format!(
                            "L{} ({}){}: `{}`",
                            reference.line,
                            reference.kind.as_str(),
                            enclosing,
                            reference.context
                        )));
                    }
                    out.push('\n');
                }
                if total > references.len() {
                    out.push_str(&format!("({} more not shown)\n", total - references.len()));
                }
                Ok(out)
            }
        }
    }
}
