//! Shared tree-sitter plumbing for the language walkers.

use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::parser::ParseError;
use lazyload_core::types::Language;

/// Maximum AST depth the walkers descend before giving up on a subtree.
/// Guards against pathological grammars on minified or generated input.
pub const MAX_WALK_DEPTH: usize = 200;

/// Build a parser configured for the given language tag. Plain TS/JS uses
/// the TypeScript grammar; JSX dialects need [`build_tsx_parser`].
pub fn build_parser(language: Language) -> Result<Parser, ParseError> {
    let grammar: tree_sitter::Language = match language {
        Language::TypeScript | Language::JavaScript => {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        }
        Language::Python => tree_sitter_python::LANGUAGE.into(),
    };
    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| ParseError::Language(format!("{e}")))?;
    Ok(parser)
}

/// Parser for `.tsx` / `.jsx` sources, where angle brackets are JSX.
pub fn build_tsx_parser() -> Result<Parser, ParseError> {
    let grammar: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TSX.into();
    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| ParseError::Language(format!("{e}")))?;
    Ok(parser)
}

/// Whether a path needs the TSX grammar.
pub fn is_jsx_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()),
        Some(ref ext) if ext == "tsx" || ext == "jsx"
    )
}

/// Detect a language tag from a file extension (case-insensitive).
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
        "py" => Some(Language::Python),
        _ => None,
    }
}

/// UTF-8 text of a node, empty on boundary errors.
pub fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// 1-based start line of a node.
pub fn start_line(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-based end line of a node.
pub fn end_line(node: Node) -> u32 {
    node.end_position().row as u32 + 1
}

/// 0-based start column of a node.
pub fn start_column(node: Node) -> u32 {
    node.start_position().column as u32
}

/// The trimmed source line a node starts on, for reference context.
pub fn line_context(source: &str, line_1based: u32) -> String {
    source
        .lines()
        .nth(line_1based.saturating_sub(1) as usize)
        .map(|l| l.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(
            detect_language(Path::new("a/b.ts")),
            Some(Language::TypeScript)
        );
        assert_eq!(
            detect_language(Path::new("a/b.TSX")),
            Some(Language::TypeScript)
        );
        assert_eq!(
            detect_language(Path::new("a/b.mjs")),
            Some(Language::JavaScript)
        );
        assert_eq!(detect_language(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(detect_language(Path::new("a/b.rs")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn test_build_parser_parses() {
        let mut parser = build_parser(Language::TypeScript).unwrap();
        let tree = parser.parse("const x = 1;", None).unwrap();
        assert_eq!(tree.root_node().kind(), "program");

        let mut parser = build_parser(Language::Python).unwrap();
        let tree = parser.parse("x = 1\n", None).unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn test_line_context() {
        let src = "line one\n  line two  \nline three";
        assert_eq!(line_context(src, 2), "line two");
        assert_eq!(line_context(src, 99), "");
    }
}
