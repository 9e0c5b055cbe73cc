//! `suggest_related`: the Markov suggestion engine as a tool.

use serde::Deserialize;

use lazyload_core::store::IndexStore;
use lazyload_core::types::ChainKind;
use lazyload_output::compact::{table, truncate_to_bytes};
use lazyload_output::markdown;
use lazyload_output::OutputFormat;

use super::{QueryTools, ToolError};
use crate::markov::{suggest, SuggestOptions};

const RELATED_BYTE_BUDGET: usize = 8 * 1024;
const MAX_DEPTH: u32 = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuggestRelatedInput {
    pub symbol_name: String,
    pub file_path: Option<String>,
    pub chain_types: Option<Vec<String>>,
    pub depth: Option<u32>,
    pub min_probability: Option<f64>,
    pub limit: Option<usize>,
    pub explain: Option<bool>,
    pub format: Option<String>,
}

impl QueryTools {
    pub fn suggest_related(
        &self,
        store: &dyn IndexStore,
        input: &SuggestRelatedInput,
    ) -> Result<String, ToolError> {
        let config = &self.config().markov;
        let chains = match &input.chain_types {
            Some(tags) => {
                let mut chains = Vec::new();
                for tag in tags {
                    chains.push(ChainKind::from_str(tag).ok_or_else(|| {
                        ToolError::BadRequest(format!("unknown chain type {tag:?}"))
                    })?);
                }
                chains
            }
            None => config.chain_types.clone(),
        };

        let file_path = match &input.file_path {
            Some(user_path) => Some(self.resolve_path(store, user_path)?.resolved_path),
            None => None,
        };

        let opts = SuggestOptions {
            chains,
            depth: input.depth.unwrap_or(config.default_depth).clamp(1, MAX_DEPTH),
            min_probability: input
                .min_probability
                .unwrap_or(config.min_probability)
                .clamp(0.0, 1.0),
            max_results: input.limit.unwrap_or(10),
            decay_factor: config.default_decay_factor,
            explain: input.explain.unwrap_or(false),
        };

        let result = suggest(
            store,
            config,
            &input.symbol_name,
            file_path.as_deref(),
            &opts,
        );

        // States are IDs/paths; show symbol names when they resolve.
        let display = |state: &str| -> String {
            store
                .get_symbol(state)
                .map(|s| format!("{} ({}:{})", s.name, s.file_path, s.location.start_line))
                .unwrap_or_else(|| state.to_string())
        };

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                let rows: Vec<Vec<String>> = result
                    .suggestions
                    .iter()
                    .map(|s| {
                        vec![
                            display(&s.state),
                            format!("{:.4}", s.score),
                            s.depth.to_string(),
                            s.chain.to_string(),
                        ]
                    })
                    .collect();
                out.push_str(&table(&["related", "score", "depth", "chain"], &rows));
                if result.fallback_used {
                    out.push_str(&format!(
                        "fallback\t{}\n",
                        result.fallback_type.as_deref().unwrap_or("unknown")
                    ));
                }
                Ok(truncate_to_bytes(&out, RELATED_BYTE_BUDGET))
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(
                    2,
                    &format!("Related to {}", input.symbol_name),
                ));
                if result.fallback_used {
                    out.push_str(&format!(
                        "Chains had no data for this symbol; fell back to {}.\n\n",
                        result.fallback_type.as_deref().unwrap_or("nothing")
                    ));
                }
                if result.suggestions.is_empty() {
                    out.push_str("No related symbols found.\n");
                    return Ok(out);
                }
                for suggestion in &result.suggestions {
                    out.push_str(&markdown::bullet(&format!(
                        "{} — score {:.4}, depth {}, via {}",
                        display(&suggestion.state),
                        suggestion.score,
                        suggestion.depth,
                        suggestion.chain
                    )));
                    if let Some(explanation) = &suggestion.explanation {
                        out.push_str(&format!("  - {}\n", explanation));
                    }
                }
                Ok(out)
            }
        }
    }
}
