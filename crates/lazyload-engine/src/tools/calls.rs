//! `trace_calls`: caller/callee traversal with reference fallback.

use std::collections::HashSet;

use serde::Deserialize;

use lazyload_core::store::IndexStore;
use lazyload_core::types::CallEdge;
use lazyload_output::compact::{table, truncate_to_bytes};
use lazyload_output::markdown;
use lazyload_output::OutputFormat;

use super::{QueryTools, ToolError};

const CALLS_BYTE_BUDGET: usize = 8 * 1024;
const MAX_DEPTH: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceCallsInput {
    #[serde(rename = "functionName")]
    pub function_name: String,
    pub direction: Option<String>,
    pub depth: Option<u32>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Callers,
    Callees,
    Both,
}

struct TraceRow {
    depth: u32,
    edge: CallEdge,
}

impl QueryTools {
    pub fn trace_calls(
        &self,
        store: &dyn IndexStore,
        input: &TraceCallsInput,
    ) -> Result<String, ToolError> {
        let direction = match input.direction.as_deref() {
            None | Some("callers") => Direction::Callers,
            Some("callees") => Direction::Callees,
            Some("both") => Direction::Both,
            Some(other) => {
                return Err(ToolError::BadRequest(format!(
                    "direction must be callers, callees, or both, got {other:?}"
                )))
            }
        };
        let depth = input.depth.unwrap_or(1).clamp(1, MAX_DEPTH);

        let mut callers = Vec::new();
        let mut callees = Vec::new();
        if direction != Direction::Callees {
            trace(store, &input.function_name, depth, true, &mut callers);
        }
        if direction != Direction::Callers {
            trace(store, &input.function_name, depth, false, &mut callees);
        }

        // Only a completely empty call graph falls back to references;
        // partial hits are returned as-is.
        if callers.is_empty() && callees.is_empty() {
            return self.trace_fallback(store, input);
        }

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                let mut rows = Vec::new();
                for row in callers.iter() {
                    rows.push(vec![
                        "caller".to_string(),
                        row.depth.to_string(),
                        row.edge.caller_name.clone(),
                        row.edge.call_count.to_string(),
                        flags(&row.edge),
                    ]);
                }
                for row in callees.iter() {
                    rows.push(vec![
                        "callee".to_string(),
                        row.depth.to_string(),
                        row.edge.callee_name.clone(),
                        row.edge.call_count.to_string(),
                        flags(&row.edge),
                    ]);
                }
                out.push_str(&table(&["direction", "depth", "name", "calls", "flags"], &rows));
                Ok(truncate_to_bytes(&out, CALLS_BYTE_BUDGET))
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(
                    2,
                    &format!("Call trace for {}", input.function_name),
                ));
                if !callers.is_empty() {
                    out.push_str(&markdown::heading(3, "Callers"));
                    for row in &callers {
                        out.push_str(&markdown::bullet(&format!(
                            "{}{} -> {} (x{}{})",
                            "  ".repeat(row.depth.saturating_sub(1) as usize),
                            row.edge.caller_name,
                            row.edge.callee_name,
                            row.edge.call_count,
                            flag_suffix(&row.edge)
                        )));
                    }
                    out.push('\n');
                }
                if !callees.is_empty() {
                    out.push_str(&markdown::heading(3, "Callees"));
                    for row in &callees {
                        out.push_str(&markdown::bullet(&format!(
                            "{}{} -> {} (x{}{})",
                            "  ".repeat(row.depth.saturating_sub(1) as usize),
                            row.edge.caller_name,
                            row.edge.callee_name,
                            row.edge.call_count,
                            flag_suffix(&row.edge)
                        )));
                    }
                }
                Ok(out)
            }
        }
    }

    fn trace_fallback(
        &self,
        store: &dyn IndexStore,
        input: &TraceCallsInput,
    ) -> Result<String, ToolError> {
        let references = store.get_references_by_name(&input.function_name);
        let mut out = String::new();
        out.push_str(&markdown::heading(
            2,
            &format!("Call trace for {}", input.function_name),
        ));
        if references.is_empty() {
            out.push_str("No call edges or references found.\n");
            return Ok(out);
        }
        out.push_str("No call-graph edges; falling back to references.\n\n");
        for reference in references.iter().take(25) {
            out.push_str(&markdown::bullet(&format!(
                "{}:{} ({})",
                reference.referencing_file,
                reference.line,
                reference.kind.as_str()
            )));
        }
        Ok(out)
    }
}

fn flags(edge: &CallEdge) -> String {
    let mut parts = Vec::new();
    if edge.is_async {
        parts.push("async");
    }
    if edge.is_conditional {
        parts.push("conditional");
    }
    parts.join(",")
}

fn flag_suffix(edge: &CallEdge) -> String {
    let rendered = flags(edge);
    if rendered.is_empty() {
        String::new()
    } else {
        format!(", {}", rendered)
    }
}

/// Breadth-first expansion of the call graph in one direction. Edges are
/// already ordered by call count desc, then name asc, by the store.
fn trace(
    store: &dyn IndexStore,
    start: &str,
    max_depth: u32,
    upstream: bool,
    out: &mut Vec<TraceRow>,
) {
    let mut frontier: Vec<String> = vec![start.to_string()];
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(start.to_string());

    for depth in 1..=max_depth {
        let mut next = Vec::new();
        for name in &frontier {
            let edges = if upstream {
                store.get_callers(name)
            } else {
                store.get_callees(name)
            };
            for edge in edges {
                let neighbor = if upstream {
                    edge.caller_name.clone()
                } else {
                    edge.callee_name.clone()
                };
                out.push(TraceRow {
                    depth,
                    edge,
                });
                if visited.insert(neighbor.clone()) {
                    next.push(neighbor);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
}
