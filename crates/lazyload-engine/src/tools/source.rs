//! `get_function` and `get_class`: full source plus metadata.

use serde::Deserialize;

use lazyload_core::store::IndexStore;
use lazyload_core::types::{Symbol, SymbolData, SymbolKind};
use lazyload_output::compact::truncate_to_bytes;
use lazyload_output::markdown;
use lazyload_output::OutputFormat;

use super::{QueryTools, ToolError};

const SOURCE_BYTE_BUDGET: usize = 24 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetFunctionInput {
    #[serde(rename = "functionName")]
    pub function_name: String,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "includeContext")]
    pub include_context: Option<bool>,
    #[serde(rename = "contextLines")]
    pub context_lines: Option<u32>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetClassInput {
    #[serde(rename = "className")]
    pub class_name: String,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "includeContext")]
    pub include_context: Option<bool>,
    pub format: Option<String>,
}

impl QueryTools {
    /// Locate a named symbol of the given kinds, narrowing by file when one
    /// was provided.
    pub(crate) fn find_symbol(
        &self,
        store: &dyn IndexStore,
        name: &str,
        kinds: &[SymbolKind],
        file_path: Option<&str>,
    ) -> Result<Symbol, ToolError> {
        let mut candidates: Vec<Symbol> = kinds
            .iter()
            .flat_map(|k| store.get_symbols_by_name(name, Some(*k)))
            .collect();

        if let Some(user_path) = file_path {
            let resolved = self.resolve_path(store, user_path)?;
            candidates.retain(|s| s.file_path == resolved.resolved_path);
        }

        match candidates.len() {
            0 => Err(ToolError::NotFound {
                what: format!("symbol {}", name),
                hint: None,
            }),
            1 => Ok(candidates.remove(0)),
            _ => {
                let locations: Vec<String> = candidates
                    .iter()
                    .take(5)
                    .map(|s| format!("{}:{}", s.file_path, s.location.start_line))
                    .collect();
                Err(ToolError::Ambiguous(
                    format!("symbol {}", name),
                    locations.join(", "),
                ))
            }
        }
    }

    pub fn get_function(
        &self,
        store: &dyn IndexStore,
        input: &GetFunctionInput,
    ) -> Result<String, ToolError> {
        let symbol = self.find_symbol(
            store,
            &input.function_name,
            &[
                SymbolKind::Function,
                SymbolKind::Method,
                SymbolKind::Constructor,
                SymbolKind::Callback,
            ],
            input.file_path.as_deref(),
        )?;

        let context_lines = if input.include_context.unwrap_or(false) {
            input.context_lines.unwrap_or(5)
        } else {
            0
        };
        let source = self.read_source_span(
            &symbol.file_path,
            symbol.location.start_line,
            symbol.location.end_line,
            context_lines,
        )?;

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                out.push_str(&format!(
                    "{}\t{}\t{}:{}-{}\n{}\n",
                    symbol.name,
                    symbol.kind,
                    symbol.file_path,
                    symbol.location.start_line,
                    symbol.location.end_line,
                    source
                ));
                return Ok(truncate_to_bytes(&out, SOURCE_BYTE_BUDGET));
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(2, &symbol.name));
                out.push_str(&format!(
                    "{}:{}-{}\n\n",
                    symbol.file_path, symbol.location.start_line, symbol.location.end_line
                ));
                if let SymbolData::Function(f) = &symbol.data {
                    out.push_str(&format!("Signature: `{}`\n", symbol.signature()));
                    if f.modifiers.is_async {
                        out.push_str("Async: yes\n");
                    }
                    if let Some(parent) = &f.parent_class {
                        out.push_str(&format!("Member of: {}\n", parent));
                    }
                    if let Some(context) = &f.modifiers.callback_context {
                        out.push_str(&format!("Callback context: {}\n", context));
                    }
                    if let Some(docs) = &f.docs {
                        if let Some(description) = &docs.description {
                            out.push_str(&format!("\n{}\n", description));
                        }
                    }
                }
                out.push('\n');
                out.push_str(&markdown::code_block(symbol.language.as_str(), &source));
            }
        }
        Ok(out)
    }

    pub fn get_class(
        &self,
        store: &dyn IndexStore,
        input: &GetClassInput,
    ) -> Result<String, ToolError> {
        let symbol = self.find_symbol(
            store,
            &input.class_name,
            &[SymbolKind::Class, SymbolKind::Interface],
            input.file_path.as_deref(),
        )?;

        let context_lines = if input.include_context.unwrap_or(false) {
            5
        } else {
            0
        };
        let source = self.read_source_span(
            &symbol.file_path,
            symbol.location.start_line,
            symbol.location.end_line,
            context_lines,
        )?;

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                out.push_str(&format!(
                    "{}\t{}\t{}:{}-{}\n{}\n",
                    symbol.name,
                    symbol.kind,
                    symbol.file_path,
                    symbol.location.start_line,
                    symbol.location.end_line,
                    source
                ));
                return Ok(truncate_to_bytes(&out, SOURCE_BYTE_BUDGET));
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(2, &symbol.name));
                out.push_str(&format!(
                    "{}:{}-{}\n\n",
                    symbol.file_path, symbol.location.start_line, symbol.location.end_line
                ));
                match &symbol.data {
                    SymbolData::Class(c) => {
                        if let Some(base) = &c.extends {
                            out.push_str(&format!("Extends: {}\n", base));
                        }
                        if !c.implements.is_empty() {
                            out.push_str(&format!("Implements: {}\n", c.implements.join(", ")));
                        }
                        if !c.methods.is_empty() {
                            out.push_str(&format!("Methods: {}\n", c.methods.join(", ")));
                        }
                        if !c.properties.is_empty() {
                            let names: Vec<&str> =
                                c.properties.iter().map(|p| p.name.as_str()).collect();
                            out.push_str(&format!("Properties: {}\n", names.join(", ")));
                        }
                    }
                    SymbolData::Interface(i) => {
                        if !i.extends.is_empty() {
                            out.push_str(&format!("Extends: {}\n", i.extends.join(", ")));
                        }
                        if !i.methods.is_empty() {
                            out.push_str(&format!("Methods: {}\n", i.methods.join(", ")));
                        }
                    }
                    _ => {}
                }
                out.push('\n');
                out.push_str(&markdown::code_block(symbol.language.as_str(), &source));
            }
        }
        Ok(out)
    }
}
