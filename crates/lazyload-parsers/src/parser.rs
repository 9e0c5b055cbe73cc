use std::path::Path;

use lazyload_core::types::{
    CallEdge, Export, Import, Language, Symbol, SymbolReference, TypeRelationship,
};

// ---------------------------------------------------------------------------
// FROZEN CONTRACT -- LanguageParser trait
// The seam between the parser registry and the indexer. Implementors must be
// Send + Sync so files can be parsed from parallel workers.
// ---------------------------------------------------------------------------

/// The core abstraction every language parser implements.
///
/// `parse` produces the complete structural model for one file; the indexer
/// attaches file-level metadata and hands the result to storage.
pub trait LanguageParser: Send + Sync {
    /// The language this parser produces symbols for. For TS/JS the concrete
    /// tag depends on the file extension; this is the primary language.
    fn language(&self) -> Language;

    /// Extensions (lowercase, without dot) this parser accepts.
    fn extensions(&self) -> &[&'static str];

    /// Whether this parser handles the given path. Matching is
    /// case-insensitive on the extension.
    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let lower = e.to_ascii_lowercase();
                self.extensions().iter().any(|known| *known == lower)
            })
            .unwrap_or(false)
    }

    /// Parse a single file. Grammar-level failures degrade: the parser
    /// records warnings and returns what it could extract. A [`ParseError`]
    /// means nothing usable was produced.
    fn parse(&self, path: &str, content: &str) -> Result<ParseOutput, ParseError>;
}

/// Complete parse output for a single source file, before file-level
/// metadata (checksum, size, status) is attached by the indexer.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub references: Vec<SymbolReference>,
    pub calls: Vec<CallEdge>,
    pub type_relationships: Vec<TypeRelationship>,
    pub warnings: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("language error: {0}")]
    Language(String),
    #[error("parse failed")]
    ParseFailed,
}

/// Per-parser tuning taken from the language section of the config.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub extract_documentation: bool,
    pub include_private: bool,
    /// `google` / `numpy` / `sphinx`; `None` auto-detects.
    pub docstring_format: Option<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            extract_documentation: true,
            include_private: false,
            docstring_format: None,
        }
    }
}

/// Derives the module path used in qualified names: the file path without
/// extension, forward slashes.
pub fn module_path_of(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    match normalized.rfind('.') {
        Some(dot) if dot > normalized.rfind('/').map(|s| s + 1).unwrap_or(0) => {
            normalized[..dot].to_string()
        }
        _ => normalized,
    }
}

/// Builds a qualified name: `"<module-path>#[<parent>.]<name>"`.
pub fn qualify(module_path: &str, parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(p) => format!("{}#{}.{}", module_path, p, name),
        None => format!("{}#{}", module_path, name),
    }
}
