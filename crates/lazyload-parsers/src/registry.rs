//! Static parser registry populated at startup.
//!
//! Dispatches file paths to language parsers by extension. Replaces dynamic
//! parser loading with a fixed set known at construction time.

use std::path::Path;

use crate::parser::{LanguageParser, ParserOptions};
use crate::python::PythonParser;
use crate::typescript::TypeScriptParser;
use lazyload_core::config::LazyloadConfig;
use lazyload_core::types::Language;

pub struct ParserRegistry {
    parsers: Vec<Box<dyn LanguageParser>>,
}

impl ParserRegistry {
    /// Empty registry; parsers are added explicitly (used by tests).
    pub fn new() -> Self {
        Self { parsers: vec![] }
    }

    /// Registry with the TS/JS and Python parsers configured from the
    /// language sections of the config.
    pub fn with_defaults(config: &LazyloadConfig) -> Self {
        let ts_opts = ParserOptions {
            extract_documentation: config.languages.typescript.extract_documentation,
            include_private: config.languages.typescript.include_private,
            docstring_format: None,
        };
        let py_opts = ParserOptions {
            extract_documentation: config.languages.python.extract_documentation,
            include_private: config.languages.python.include_private,
            docstring_format: config.languages.python.docstring_format.clone(),
        };
        let mut registry = Self::new();
        registry.register(Box::new(TypeScriptParser::new(ts_opts)));
        registry.register(Box::new(PythonParser::new(py_opts)));
        registry
    }

    pub fn register(&mut self, parser: Box<dyn LanguageParser>) {
        self.parsers.push(parser);
    }

    /// The parser responsible for a path, if any accepts it.
    pub fn parser_for_path(&self, path: &Path) -> Option<&dyn LanguageParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(path))
            .map(|p| p.as_ref())
    }

    /// Early rejection for unmatched paths.
    pub fn can_parse(&self, path: &Path) -> bool {
        self.parser_for_path(path).is_some()
    }

    pub fn languages(&self) -> Vec<Language> {
        self.parsers.iter().map(|p| p.language()).collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults(&LazyloadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_extension() {
        let registry = ParserRegistry::default();
        assert!(registry.can_parse(Path::new("src/app.ts")));
        assert!(registry.can_parse(Path::new("src/app.tsx")));
        assert!(registry.can_parse(Path::new("src/app.js")));
        assert!(registry.can_parse(Path::new("src/mod.py")));
        assert!(!registry.can_parse(Path::new("src/main.rs")));
        assert!(!registry.can_parse(Path::new("README.md")));
        assert!(!registry.can_parse(Path::new("no_extension")));
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let registry = ParserRegistry::default();
        assert!(registry.can_parse(Path::new("src/APP.TS")));
        assert!(registry.can_parse(Path::new("src/Mod.PY")));
    }

    #[test]
    fn test_parser_language_selection() {
        let registry = ParserRegistry::default();
        let ts = registry.parser_for_path(Path::new("a.ts")).unwrap();
        assert_eq!(ts.language(), Language::TypeScript);
        let py = registry.parser_for_path(Path::new("a.py")).unwrap();
        assert_eq!(py.language(), Language::Python);
    }
}
