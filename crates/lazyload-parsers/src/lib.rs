//! Language parsers and path/import resolution for lazyload.
//!
//! - [`parser`] — the [`LanguageParser`](parser::LanguageParser) trait and parse output types
//! - [`registry`] — extension-based parser dispatch
//! - [`typescript`] / [`python`] — tree-sitter walkers producing the symbol model
//! - [`imports`] — import-source → file-path resolution (aliases, baseUrl, builtins)
//! - [`paths`] — user-provided path → indexed-entry mapping (suffix + fuzzy ladder)
//! - [`walker`] — source-tree walking with ignore files and config globs

pub mod imports;
pub mod parser;
pub mod paths;
pub mod registry;
pub mod treesitter;
pub mod walker;

pub mod python;
pub mod typescript;
