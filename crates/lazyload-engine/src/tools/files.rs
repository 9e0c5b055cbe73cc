//! `list_files` and `list_functions`.

use std::collections::BTreeMap;

use globset::{Glob, GlobSetBuilder};
use serde::Deserialize;

use lazyload_core::store::IndexStore;
use lazyload_core::types::{FileFilter, Language, SymbolKind};
use lazyload_output::compact::{table, truncate_to_bytes};
use lazyload_output::markdown;
use lazyload_output::OutputFormat;

use super::{is_test_path, Deadline, QueryTools, ToolError, PARTIAL_MARKER};

const LIST_FILES_BYTE_BUDGET: usize = 8 * 1024;
const LIST_FUNCTIONS_BYTE_BUDGET: usize = 16 * 1024;
/// Functions whose source is inlined when `include_source` is set.
const MAX_INLINE_SOURCES: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListFilesInput {
    pub directory: Option<String>,
    pub recursive: Option<bool>,
    pub language: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub exclude_patterns: Option<Vec<String>>,
    pub include_tests: Option<bool>,
    pub summary_only: Option<bool>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListFunctionsInput {
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub include_source: Option<bool>,
    pub limit: Option<usize>,
    pub format: Option<String>,
}

impl QueryTools {
    pub fn list_files(
        &self,
        store: &dyn IndexStore,
        input: &ListFilesInput,
    ) -> Result<String, ToolError> {
        let deadline = Deadline::start();
        let language = match input.language.as_deref() {
            Some(tag) => Some(
                Language::from_str(tag)
                    .ok_or_else(|| ToolError::BadRequest(format!("unknown language {tag:?}")))?,
            ),
            None => None,
        };

        let exclude = match &input.exclude_patterns {
            Some(patterns) if !patterns.is_empty() => {
                let mut builder = GlobSetBuilder::new();
                for pattern in patterns {
                    builder.add(
                        Glob::new(pattern)
                            .map_err(|e| ToolError::BadRequest(format!("bad glob: {e}")))?,
                    );
                }
                Some(builder.build().map_err(|e| ToolError::BadRequest(e.to_string()))?)
            }
            _ => None,
        };

        // Relative directories are anchored at the index root, matching how
        // paths were stored.
        let directory = input.directory.as_deref().map(|dir| {
            if std::path::Path::new(dir).is_absolute() {
                dir.trim_end_matches('/').to_string()
            } else {
                lazyload_parsers::imports::normalize(&self.root().join(dir))
            }
        });

        // Filters that SQL can't express run here, so pagination happens
        // after them.
        let all = store.list_files(&FileFilter {
            directory: directory.clone(),
            language,
            limit: None,
            offset: 0,
        });
        let include_tests = input.include_tests.unwrap_or(false);
        let recursive = input.recursive.unwrap_or(true);
        let direct_prefix = directory.as_deref().map(|d| format!("{}/", d));

        let filtered: Vec<_> = all
            .into_iter()
            .filter(|f| include_tests || !is_test_path(&f.path))
            .filter(|f| match &exclude {
                Some(set) => !set.is_match(&f.path),
                None => true,
            })
            .filter(|f| {
                if recursive {
                    return true;
                }
                // Non-recursive: only files directly inside the directory.
                match &direct_prefix {
                    Some(prefix) => f
                        .path
                        .strip_prefix(prefix.as_str())
                        .map(|rest| !rest.contains('/'))
                        .unwrap_or(false),
                    None => true,
                }
            })
            .collect();

        let total = filtered.len();
        let offset = input.offset.unwrap_or(0);
        let limit = input.limit.unwrap_or(100);
        let page: Vec<_> = filtered.iter().skip(offset).take(limit).collect();

        // Per-directory aggregates over the filtered set.
        let mut directories: BTreeMap<String, (usize, u64)> = BTreeMap::new();
        for file in &filtered {
            let dir = match file.path.rfind('/') {
                Some(slash) => file.path[..slash].to_string(),
                None => ".".to_string(),
            };
            let slot = directories.entry(dir).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += u64::from(file.line_count);
        }

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                if input.summary_only.unwrap_or(false) {
                    let rows: Vec<Vec<String>> = directories
                        .iter()
                        .map(|(dir, (files, lines))| {
                            vec![dir.clone(), files.to_string(), lines.to_string()]
                        })
                        .collect();
                    out.push_str(&table(&["directory", "files", "lines"], &rows));
                } else {
                    let rows: Vec<Vec<String>> = page
                        .iter()
                        .map(|f| {
                            vec![
                                f.path.clone(),
                                f.language.to_string(),
                                f.line_count.to_string(),
                                f.parse_status.as_str().to_string(),
                            ]
                        })
                        .collect();
                    out.push_str(&table(&["path", "language", "lines", "status"], &rows));
                    out.push_str(&format!("total\t{}\tshown\t{}\n", total, page.len()));
                }
                return Ok(truncate_to_bytes(&out, LIST_FILES_BYTE_BUDGET));
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(2, "Indexed files"));
                out.push_str(&format!(
                    "{} files ({} shown, offset {})\n\n",
                    total,
                    page.len(),
                    offset
                ));
                if !input.summary_only.unwrap_or(false) {
                    for file in &page {
                        if deadline.exceeded() {
                            out.push_str(PARTIAL_MARKER);
                            return Ok(out);
                        }
                        out.push_str(&markdown::bullet(&format!(
                            "{} ({}, {} lines, {})",
                            file.path,
                            file.language,
                            file.line_count,
                            file.parse_status.as_str()
                        )));
                    }
                    out.push('\n');
                }
                out.push_str(&markdown::heading(3, "Directories"));
                for (dir, (files, lines)) in &directories {
                    out.push_str(&markdown::bullet(&format!(
                        "{}: {} files, {} lines",
                        dir, files, lines
                    )));
                }
            }
        }
        Ok(out)
    }

    pub fn list_functions(
        &self,
        store: &dyn IndexStore,
        input: &ListFunctionsInput,
    ) -> Result<String, ToolError> {
        let resolved = self.resolve_path(store, &input.file_path)?;
        let symbols = store.get_symbols_in_file(&resolved.resolved_path);
        let functions: Vec<_> = symbols
            .iter()
            .filter(|s| {
                matches!(
                    s.kind,
                    SymbolKind::Function
                        | SymbolKind::Method
                        | SymbolKind::Constructor
                        | SymbolKind::Callback
                )
            })
            .collect();
        let limit = input.limit.unwrap_or(usize::MAX);
        let shown: Vec<_> = functions.iter().take(limit).collect();

        let format = OutputFormat::from_str(input.format.as_deref());
        let mut out = String::new();
        match format {
            OutputFormat::Compact => {
                let rows: Vec<Vec<String>> = shown
                    .iter()
                    .map(|s| {
                        vec![
                            s.signature(),
                            s.kind.to_string(),
                            s.location.start_line.to_string(),
                        ]
                    })
                    .collect();
                out.push_str(&table(&["signature", "kind", "line"], &rows));
                return Ok(truncate_to_bytes(&out, LIST_FUNCTIONS_BYTE_BUDGET));
            }
            OutputFormat::Markdown => {
                out.push_str(&markdown::heading(
                    2,
                    &format!("Functions in {}", resolved.relative_path),
                ));
                if resolved.auto_resolved {
                    out.push_str(&format!(
                        "(resolved {} -> {})\n\n",
                        input.file_path, resolved.relative_path
                    ));
                }
                if shown.is_empty() {
                    out.push_str("No functions found.\n");
                    return Ok(out);
                }
                for symbol in &shown {
                    out.push_str(&markdown::bullet(&format!(
                        "`{}` (line {})",
                        symbol.signature(),
                        symbol.location.start_line
                    )));
                }
                if input.include_source.unwrap_or(false) {
                    out.push('\n');
                    for symbol in shown.iter().take(MAX_INLINE_SOURCES) {
                        let source = self.read_source_span(
                            &resolved.resolved_path,
                            symbol.location.start_line,
                            symbol.location.end_line,
                            0,
                        )?;
                        out.push_str(&markdown::heading(3, &symbol.name));
                        out.push_str(&markdown::code_block(
                            symbol.language.as_str(),
                            &source,
                        ));
                    }
                }
                if functions.len() > shown.len() {
                    out.push_str(&format!(
                        "\n({} more not shown)\n",
                        functions.len() - shown.len()
                    ));
                }
            }
        }
        Ok(out)
    }
}
