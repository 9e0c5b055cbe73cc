//! `search_symbols`: name search with synonym expansion and/or
//! type-signature search.

use std::collections::HashSet;

use serde::Deserialize;

use lazyload_core::store::{IndexStore, TypeSearchOptions};
use lazyload_core::typeinfo::TypeMatchMode;
use lazyload_core::types::{Language, SymbolHit, SymbolKind, SymbolSearchOptions};
use lazyload_output::compact::{table, truncate_to_bytes};
use lazyload_output::markdown;
use lazyload_output::OutputFormat;

use super::{QueryTools, ToolError};

const SEARCH_BYTE_BUDGET: usize = 8 * 1024;
const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSymbolsInput {
    pub query: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub language: Option<String>,
    pub limit: Option<usize>,
    pub expand_synonyms: Option<bool>,
    pub return_type: Option<String>,
    pub param_type: Option<String>,
    pub match_mode: Option<String>,
    pub verbose: Option<bool>,
    pub format: Option<String>,
}

impl QueryTools {
    pub fn search_symbols(
        &self,
        store: &dyn IndexStore,
        input: &SearchSymbolsInput,
    ) -> Result<String, ToolError> {
        let has_name_query = input
            .query
            .as_deref()
            .map(|q| !q.trim().is_empty())
            .unwrap_or(false);
        let has_type_query = input.return_type.is_some() || input.param_type.is_some();
        if !has_name_query && !has_type_query {
            return Err(ToolError::BadRequest(
                "provide query, return_type, or param_type".into(),
            ));
        }

        let kind = match input.kind.as_deref() {
            Some(tag) => Some(
                SymbolKind::from_str(tag)
                    .ok_or_else(|| ToolError::BadRequest(format!("unknown symbol kind {tag:?}")))?,
            ),
            None => None,
        };
        let language = match input.language.as_deref() {
            Some(tag) => Some(
                Language::from_str(tag)
                    .ok_or_else(|| ToolError::BadRequest(format!("unknown language {tag:?}")))?,
            ),
            None => None,
        };
        let limit = input.limit.unwrap_or(DEFAULT_LIMIT);
        let mode = match input.match_mode.as_deref() {
            Some(tag) => Some(
                TypeMatchMode::from_str(tag)
                    .ok_or_else(|| ToolError::BadRequest(format!("unknown match_mode {tag:?}")))?,
            ),
            None => None,
        };

        let mut expansion_note = None;
        let mut hits: Vec<SymbolHit> = if has_name_query {
            let query = input.query.as_deref().expect("checked above");
            let expand = input.expand_synonyms.unwrap_or(true)
                && self.config().synonyms.enabled;
            let expanded = if expand {
                self.expander().expand(query)
            } else {
                // Without expansion the raw tokens still form the FTS query.
                let bare = crate::synonyms::SynonymExpander::from_config(
                    &lazyload_core::config::SynonymsConfig {
                        enabled: false,
                        ..self.config().synonyms.clone()
                    },
                );
                bare.expand(query)
            };
            if expanded.expansions.len() > 1 {
                expansion_note = Some(
                    expanded
                        .expansions
                        .iter()
                        .map(|e| format!("{}({:.2})", e.term, e.weight))
                        .collect::<Vec<_>>()
                        .join(", "),
                );
            }
            // Fetch wider than the limit, then rerank before cutting.
            let backend = store.search_symbols(
                &expanded.fts_query,
                &SymbolSearchOptions {
                    kind,
                    language,
                    limit: limit * 3,
                    prefix: true,
                },
            );
            self.expander().rerank(backend, &expanded)
        } else {
            Vec::new()
        };

        if has_type_query {
            let type_hits = store.search_by_type(&TypeSearchOptions {
                return_type: input.return_type.clone(),
                param_type: input.param_type.clone(),
                mode,
                include_async_variants: true,
                language,
                limit: if has_name_query { 0 } else { limit },
            });
            if has_name_query {
                // Both dimensions given: intersect on symbol identity.
                let type_ids: HashSet<String> =
                    type_hits.into_iter().map(|h| h.symbol.id).collect();
                hits.retain(|h| type_ids.contains(&h.symbol.id));
            } else {
                hits = type_hits;
            }
        }

        if let Some(k) = kind {
            hits.retain(|h| h.symbol.kind == k);
        }
        hits.truncate(limit);

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                let rows: Vec<Vec<String>> = hits
                    .iter()
                    .map(|h| {
                        vec![
                            h.symbol.name.clone(),
                            h.symbol.kind.to_string(),
                            h.symbol.language.to_string(),
                            format!("{}:{}", h.symbol.file_path, h.symbol.location.start_line),
                            format!("{:.3}", h.score),
                        ]
                    })
                    .collect();
                out.push_str(&table(&["name", "kind", "language", "location", "score"], &rows));
                Ok(truncate_to_bytes(&out, SEARCH_BYTE_BUDGET))
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(2, "Symbol search"));
                if let Some(note) = expansion_note {
                    out.push_str(&format!("Expanded terms: {}\n\n", note));
                }
                if hits.is_empty() {
                    out.push_str("No matching symbols.\n");
                    return Ok(out);
                }
                for hit in &hits {
                    out.push_str(&markdown::bullet(&markdown::symbol_line(
                        &hit.symbol.name,
                        hit.symbol.kind.as_str(),
                        &hit.symbol.file_path,
                        hit.symbol.location.start_line,
                    )));
                    if input.verbose.unwrap_or(false) {
                        out.push_str(&format!("  - `{}`\n", hit.symbol.signature()));
                        let doc = hit.symbol.doc_text();
                        if !doc.is_empty() {
                            out.push_str(&format!("  - {}\n", doc));
                        }
                    }
                }
                Ok(out)
            }
        }
    }
}
