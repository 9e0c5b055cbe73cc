//! `get_related_context`: token-budgeted bundle of a symbol, its types, its
//! callees, and related tests.

use serde::Deserialize;

use lazyload_core::store::IndexStore;
use lazyload_core::typeinfo::parse_type;
use lazyload_core::types::{SymbolData, SymbolKind};
use lazyload_output::markdown;
use lazyload_output::token_budget::{allocate, fit_section, CharsPerToken, TokenEstimator};

use super::{is_test_path, QueryTools, ToolError};

const DEFAULT_MAX_TOKENS: usize = 2000;
const MAX_CALLEE_DEPTH: u32 = 2;
const MAX_RELATED_TESTS: usize = 5;

/// Budget shares without tests: target / types / callees.
const SHARES_NO_TESTS: [u32; 3] = [45, 28, 27];
/// With tests: target / types / callees / tests.
const SHARES_WITH_TESTS: [u32; 4] = [40, 25, 25, 10];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelatedContextInput {
    #[serde(rename = "symbolName")]
    pub symbol_name: String,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "includeTypes")]
    pub include_types: Option<bool>,
    #[serde(rename = "includeCallees")]
    pub include_callees: Option<bool>,
    #[serde(rename = "includeTests")]
    pub include_tests: Option<bool>,
    #[serde(rename = "calleeDepth")]
    pub callee_depth: Option<u32>,
    #[serde(rename = "maxTokens")]
    pub max_tokens: Option<usize>,
    pub format: Option<String>,
}

impl QueryTools {
    pub fn get_related_context(
        &self,
        store: &dyn IndexStore,
        input: &RelatedContextInput,
    ) -> Result<String, ToolError> {
        let symbol = self.find_symbol(
            store,
            &input.symbol_name,
            &[
                SymbolKind::Function,
                SymbolKind::Method,
                SymbolKind::Constructor,
                SymbolKind::Class,
                SymbolKind::Interface,
            ],
            input.file_path.as_deref(),
        )?;

        let include_types = input.include_types.unwrap_or(true);
        let include_callees = input.include_callees.unwrap_or(true);
        let include_tests = input.include_tests.unwrap_or(false);
        let callee_depth = input.callee_depth.unwrap_or(1).clamp(1, MAX_CALLEE_DEPTH);
        let max_tokens = input.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        let estimator = CharsPerToken;

        // -- target section --------------------------------------------------
        let source = self.read_source_span(
            &symbol.file_path,
            symbol.location.start_line,
            symbol.location.end_line,
            0,
        )?;
        let mut target_section = format!(
            "{}:{}-{}\n",
            symbol.file_path, symbol.location.start_line, symbol.location.end_line
        );
        target_section.push_str(&markdown::code_block(symbol.language.as_str(), &source));

        // -- types section ---------------------------------------------------
        let mut types_section = String::new();
        if include_types {
            if let SymbolData::Function(f) = &symbol.data {
                let mut names = Vec::new();
                for param in &f.params {
                    if let Some(t) = &param.type_name {
                        names.push(t.clone());
                    }
                }
                if let Some(ret) = &f.return_type {
                    names.push(ret.clone());
                }
                for raw in names {
                    let Some(parsed) = parse_type(&raw, symbol.language) else {
                        continue;
                    };
                    types_section.push_str(&markdown::bullet(&format!(
                        "`{}` (base {}{}{})",
                        parsed.raw,
                        parsed.base,
                        if parsed.is_nullable { ", nullable" } else { "" },
                        if parsed.is_async { ", async" } else { "" },
                    )));
                    // Inline the definitions of project-local named types.
                    for inner_name in type_names_of(&parsed) {
                        for definition in store.get_symbols_by_name(&inner_name, None) {
                            if matches!(
                                definition.kind,
                                SymbolKind::Class | SymbolKind::Interface | SymbolKind::TypeAlias
                            ) {
                                types_section.push_str(&format!(
                                    "  - {} defined at {}:{}\n",
                                    definition.name,
                                    definition.file_path,
                                    definition.location.start_line
                                ));
                            }
                        }
                    }
                }
            }
        }

        // -- callees section -------------------------------------------------
        let mut callees_section = String::new();
        if include_callees {
            let mut frontier = vec![symbol.name.clone()];
            let mut seen = std::collections::HashSet::new();
            for depth in 1..=callee_depth {
                let mut next = Vec::new();
                for name in &frontier {
                    for edge in store.get_callees(name) {
                        callees_section.push_str(&markdown::bullet(&format!(
                            "{}{} (x{})",
                            "  ".repeat(depth as usize - 1),
                            edge.callee_name,
                            edge.call_count
                        )));
                        if let Some(callee_id) = &edge.callee_symbol_id {
                            if let Some(callee) = store.get_symbol(callee_id) {
                                callees_section.push_str(&format!(
                                    "  {}`{}` — {}:{}\n",
                                    "  ".repeat(depth as usize - 1),
                                    callee.signature(),
                                    callee.file_path,
                                    callee.location.start_line
                                ));
                            }
                        }
                        if seen.insert(edge.callee_name.clone()) {
                            next.push(edge.callee_name);
                        }
                    }
                }
                frontier = next;
            }
        }

        // -- tests section ---------------------------------------------------
        let mut tests_section = String::new();
        if include_tests {
            let mut count = 0;
            for reference in store.get_references_by_name(&symbol.name) {
                if count >= MAX_RELATED_TESTS {
                    break;
                }
                if is_test_path(&reference.referencing_file) {
                    tests_section.push_str(&markdown::bullet(&format!(
                        "{}:{} `{}`",
                        reference.referencing_file, reference.line, reference.context
                    )));
                    count += 1;
                }
            }
        }

        // -- budget allocation ------------------------------------------------
        let has_tests = include_tests && !tests_section.is_empty();
        let budgets = if has_tests {
            allocate(max_tokens, &SHARES_WITH_TESTS)
        } else {
            allocate(max_tokens, &SHARES_NO_TESTS)
        };

        let (target_fitted, target_cut) = fit_section(&estimator, &target_section, budgets[0]);
        let (types_fitted, _) = fit_section(&estimator, &types_section, budgets[1]);
        let (callees_fitted, _) = fit_section(&estimator, &callees_section, budgets[2]);
        let tests_fitted = if has_tests {
            fit_section(&estimator, &tests_section, budgets[3]).0
        } else {
            String::new()
        };

        let mut out = String::new();
        out.push_str(&markdown::heading(2, &format!("Context for {}", symbol.name)));
        out.push_str(&target_fitted);
        if target_cut {
            out.push_str("(target truncated to fit budget)\n");
        }
        if !types_fitted.trim().is_empty() {
            out.push_str(&markdown::heading(3, "Types"));
            out.push_str(&types_fitted);
        }
        if !callees_fitted.trim().is_empty() {
            out.push_str(&markdown::heading(3, "Callees"));
            out.push_str(&callees_fitted);
        }
        if !tests_fitted.trim().is_empty() {
            out.push_str(&markdown::heading(3, "Related tests"));
            out.push_str(&tests_fitted);
        }
        out.push_str(&format!(
            "\n(~{} tokens of {} budget)\n",
            estimator.estimate(&out),
            max_tokens
        ));
        Ok(out)
    }
}

/// Named (non-builtin) types mentioned by a parsed type, base plus inners.
fn type_names_of(parsed: &lazyload_core::typeinfo::ParsedType) -> Vec<String> {
    let builtin = |name: &str| {
        matches!(
            name,
            "String" | "Number" | "Boolean" | "Void" | "Any" | "Array" | "Map" | "Set"
                | "Promise" | "Tuple" | "Union"
        )
    };
    let mut names = Vec::new();
    if !builtin(&parsed.base) {
        names.push(parsed.base.clone());
    }
    for inner in &parsed.inner {
        if !builtin(&inner.base) {
            names.push(inner.base.clone());
        }
    }
    names
}
