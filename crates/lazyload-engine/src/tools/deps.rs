//! `get_module_dependencies`: imports, reverse deps, transitive tree,
//! cycle detection.

use serde::Deserialize;

use lazyload_core::store::{DepEdge, IndexStore};
use lazyload_output::compact::{table, truncate_to_bytes};
use lazyload_output::markdown;
use lazyload_output::OutputFormat;

use super::{QueryTools, ToolError};

const DEPS_BYTE_BUDGET: usize = 12 * 1024;
const MAX_DEPTH: u32 = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDependenciesInput {
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub depth: Option<u32>,
    #[serde(rename = "includeReverse")]
    pub include_reverse: Option<bool>,
    #[serde(rename = "includeExternal")]
    pub include_external: Option<bool>,
    #[serde(rename = "includeTypeOnly")]
    pub include_type_only: Option<bool>,
    #[serde(rename = "detectCycles")]
    pub detect_cycles: Option<bool>,
    #[serde(rename = "outputFormat")]
    pub output_format: Option<String>,
    pub format: Option<String>,
}

impl QueryTools {
    pub fn get_module_dependencies(
        &self,
        store: &dyn IndexStore,
        input: &ModuleDependenciesInput,
    ) -> Result<String, ToolError> {
        let resolved = self.resolve_path(store, &input.file_path)?;
        let depth = input.depth.unwrap_or(2).clamp(1, MAX_DEPTH);
        let as_tree = input.output_format.as_deref().unwrap_or("tree") == "tree";

        let imports: Vec<_> = store
            .get_file_imports(&resolved.resolved_path)
            .into_iter()
            .filter(|i| input.include_external.unwrap_or(false) || !i.is_external)
            .filter(|i| input.include_type_only.unwrap_or(true) || !i.is_type_only)
            .collect();
        let reverse = if input.include_reverse.unwrap_or(true) {
            store.get_reverse_dependencies(&resolved.resolved_path)
        } else {
            Vec::new()
        };
        let transitive = store.get_transitive_dependencies(&resolved.resolved_path, depth);
        let cycle = if input.detect_cycles.unwrap_or(false) {
            store.detect_circular_dependencies(&resolved.resolved_path)
        } else {
            None
        };

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                let mut rows = Vec::new();
                for import in &imports {
                    rows.push(vec![
                        "import".to_string(),
                        import.source.clone(),
                        import.resolved_path.clone().unwrap_or_default(),
                        import_class(import),
                    ]);
                }
                for dependent in &reverse {
                    rows.push(vec![
                        "reverse".to_string(),
                        dependent.clone(),
                        String::new(),
                        String::new(),
                    ]);
                }
                for edge in &transitive {
                    rows.push(vec![
                        "transitive".to_string(),
                        edge.from.clone(),
                        edge.to.clone(),
                        edge.depth.to_string(),
                    ]);
                }
                if let Some(path) = &cycle {
                    rows.push(vec![
                        "cycle".to_string(),
                        path.join(" -> "),
                        String::new(),
                        String::new(),
                    ]);
                }
                out.push_str(&table(&["relation", "from", "to", "info"], &rows));
                Ok(truncate_to_bytes(&out, DEPS_BYTE_BUDGET))
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(
                    2,
                    &format!("Dependencies of {}", resolved.relative_path),
                ));

                out.push_str(&markdown::heading(3, "Direct imports"));
                if imports.is_empty() {
                    out.push_str("None.\n\n");
                } else {
                    for import in &imports {
                        let annotation = match &import.resolved_path {
                            Some(path) => format!(" -> {}", path),
                            None => format!(" ({})", import_class(import)),
                        };
                        out.push_str(&markdown::bullet(&format!(
                            "{}{}",
                            import.source, annotation
                        )));
                    }
                    out.push('\n');
                }

                if input.include_reverse.unwrap_or(true) {
                    out.push_str(&markdown::heading(3, "Imported by"));
                    if reverse.is_empty() {
                        out.push_str("Nothing imports this file.\n\n");
                    } else {
                        for dependent in &reverse {
                            out.push_str(&markdown::bullet(dependent));
                        }
                        out.push('\n');
                    }
                }

                if !transitive.is_empty() {
                    out.push_str(&markdown::heading(
                        3,
                        &format!("Transitive (depth {})", depth),
                    ));
                    if as_tree {
                        render_tree(&mut out, &resolved.resolved_path, &transitive, 1, depth);
                    } else {
                        for edge in &transitive {
                            out.push_str(&markdown::bullet(&format!(
                                "[{}] {} -> {}",
                                edge.depth, edge.from, edge.to
                            )));
                        }
                    }
                    out.push('\n');
                }

                if input.detect_cycles.unwrap_or(false) {
                    out.push_str(&markdown::heading(3, "Cycles"));
                    match &cycle {
                        Some(path) => {
                            out.push_str(&format!("Cycle detected: {}\n", path.join(" -> ")))
                        }
                        None => out.push_str("No cycles reachable from this file.\n"),
                    }
                }
                Ok(out)
            }
        }
    }
}

fn import_class(import: &lazyload_core::types::Import) -> String {
    if import.is_builtin {
        "builtin".to_string()
    } else if import.is_external {
        "external".to_string()
    } else {
        "local".to_string()
    }
}

/// Indented tree rendering of the BFS edge list.
fn render_tree(out: &mut String, node: &str, edges: &[DepEdge], level: u32, max_depth: u32) {
    if level > max_depth {
        return;
    }
    for edge in edges.iter().filter(|e| e.from == node && e.depth == level) {
        out.push_str(&format!(
            "{}- {}\n",
            "  ".repeat(level as usize - 1),
            edge.to
        ));
        render_tree(out, &edge.to, edges, level + 1, max_depth);
    }
}
