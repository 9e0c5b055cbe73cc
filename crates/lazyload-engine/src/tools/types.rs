//! `trace_types`: inheritance hierarchies and implementations.

use serde::Deserialize;

use lazyload_core::store::IndexStore;
use lazyload_output::compact::{table, truncate_to_bytes};
use lazyload_output::markdown;
use lazyload_output::OutputFormat;

use super::{QueryTools, ToolError};

const TYPES_BYTE_BUDGET: usize = 8 * 1024;
const HIERARCHY_DEPTH: u32 = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceTypesInput {
    #[serde(rename = "className")]
    pub class_name: String,
    pub mode: Option<String>,
    pub direction: Option<String>,
    pub limit: Option<usize>,
    pub format: Option<String>,
}

impl QueryTools {
    pub fn trace_types(
        &self,
        store: &dyn IndexStore,
        input: &TraceTypesInput,
    ) -> Result<String, ToolError> {
        let mode = input.mode.as_deref().unwrap_or("hierarchy");
        let limit = input.limit.unwrap_or(25);
        let format = OutputFormat::from_str(input.format.as_deref());

        match mode {
            "implementations" => {
                let mut implementations = store.find_implementations(&input.class_name);
                implementations.truncate(limit);
                let mut out = String::new();
                match format {
                    OutputFormat::Compact => {
                        let rows: Vec<Vec<String>> = implementations
                            .iter()
                            .map(|r| vec![r.source_name.clone(), r.kind.as_str().to_string()])
                            .collect();
                        out.push_str(&table(&["implementor", "kind"], &rows));
                        Ok(truncate_to_bytes(&out, TYPES_BYTE_BUDGET))
                    }
                    OutputFormat::Markdown => {
                        out.push_str(&markdown::heading(
                            2,
                            &format!("Implementations of {}", input.class_name),
                        ));
                        if implementations.is_empty() {
                            out.push_str("No implementations found.\n");
                            return Ok(out);
                        }
                        for relationship in &implementations {
                            out.push_str(&markdown::bullet(&relationship.source_name));
                        }
                        Ok(out)
                    }
                }
            }
            "hierarchy" => {
                let hierarchy = store.get_type_hierarchy(&input.class_name, HIERARCHY_DEPTH);
                let upward_only = input.direction.as_deref() == Some("up");
                let downward_only = input.direction.as_deref() == Some("down");

                let mut out = String::new();
                match format {
                    OutputFormat::Compact => {
                        let mut rows = Vec::new();
                        if !downward_only {
                            for (i, ancestor) in hierarchy.ancestors.iter().enumerate() {
                                rows.push(vec![
                                    "ancestor".to_string(),
                                    (i + 1).to_string(),
                                    ancestor.clone(),
                                ]);
                            }
                        }
                        if !upward_only {
                            for (name, depth) in hierarchy.descendants.iter().take(limit) {
                                rows.push(vec![
                                    "descendant".to_string(),
                                    depth.to_string(),
                                    name.clone(),
                                ]);
                            }
                        }
                        out.push_str(&table(&["relation", "depth", "name"], &rows));
                        Ok(truncate_to_bytes(&out, TYPES_BYTE_BUDGET))
                    }
                    OutputFormat::Markdown => {
                        out.push_str(&markdown::heading(
                            2,
                            &format!("Type hierarchy of {}", input.class_name),
                        ));
                        if !downward_only {
                            if hierarchy.ancestors.is_empty() {
                                out.push_str("No ancestors.\n\n");
                            } else {
                                let chain = std::iter::once(input.class_name.as_str())
                                    .chain(hierarchy.ancestors.iter().map(|s| s.as_str()))
                                    .collect::<Vec<_>>()
                                    .join(" -> ");
                                out.push_str(&format!("Ancestors: {}\n\n", chain));
                            }
                        }
                        if !upward_only {
                            if hierarchy.descendants.is_empty() {
                                out.push_str("No subtypes.\n");
                            } else {
                                out.push_str(&markdown::heading(3, "Subtypes"));
                                for (name, depth) in hierarchy.descendants.iter().take(limit) {
                                    out.push_str(&markdown::bullet(&format!(
                                        "{}{}",
                                        "  ".repeat((depth.saturating_sub(1)) as usize),
                                        name
                                    )));
                                }
                            }
                        }
                        Ok(out)
                    }
                }
            }
            other => Err(ToolError::BadRequest(format!(
                "mode must be hierarchy or implementations, got {other:?}"
            ))),
        }
    }
}
