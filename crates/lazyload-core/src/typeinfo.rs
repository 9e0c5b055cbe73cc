//! Cross-language type normalization.
//!
//! Raw type strings from the parsers (`Promise<User | null>`,
//! `Optional[Dict[str, int]]`) are parsed into a shared [`ParsedType`]
//! vocabulary so that type search works identically across TypeScript and
//! Python.

use serde::{Deserialize, Serialize};

use crate::types::Language;

/// A language-neutral view of one type expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedType {
    /// The string exactly as written in source.
    pub raw: String,
    /// Canonical rendering, e.g. `Promise<User>`.
    pub normalized: String,
    /// Normalized base name, e.g. `Promise`.
    pub base: String,
    /// Generic arguments / union arms, parsed recursively.
    pub inner: Vec<ParsedType>,
    pub is_async: bool,
    pub is_nullable: bool,
    pub is_array: bool,
    pub is_generic: bool,
    pub is_optional: bool,
    pub has_default: bool,
}

/// How a search expression is compared against a stored type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeMatchMode {
    Exact,
    Base,
    Inner,
    Partial,
}

impl TypeMatchMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(TypeMatchMode::Exact),
            "base" => Some(TypeMatchMode::Base),
            "inner" => Some(TypeMatchMode::Inner),
            "partial" => Some(TypeMatchMode::Partial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMatchOptions {
    /// In `base` mode, let `Promise<X>` match a search for `X`.
    pub include_async_variants: bool,
}

/// Maps a language-specific base name onto the shared vocabulary.
fn normalize_base(name: &str, language: Option<Language>) -> String {
    let trimmed = name.trim();
    // Python spellings only apply when the language is Python or unknown
    // (search expressions carry no language).
    let python = !matches!(
        language,
        Some(Language::TypeScript) | Some(Language::JavaScript)
    );
    match trimmed {
        "string" | "String" => "String".into(),
        "str" if python => "String".into(),
        "number" | "Number" | "bigint" => "Number".into(),
        "int" | "float" | "complex" if python => "Number".into(),
        "boolean" | "bool" | "Boolean" => "Boolean".into(),
        "void" | "undefined" | "null" | "Void" => "Void".into(),
        "None" | "NoneType" if python => "Void".into(),
        "any" | "Any" | "unknown" | "object" => "Any".into(),
        "Array" | "array" => "Array".into(),
        "list" | "List" | "Sequence" if python => "Array".into(),
        "Map" | "Record" => "Map".into(),
        "dict" | "Dict" | "Mapping" if python => "Map".into(),
        "Set" | "set" | "FrozenSet" | "frozenset" => "Set".into(),
        "Promise" => "Promise".into(),
        "Awaitable" | "Future" | "Coroutine" if python => "Promise".into(),
        "tuple" | "Tuple" if python => "Tuple".into(),
        _ => trimmed.to_string(),
    }
}

/// True for the "no value" arm of a union in either language.
fn is_null_arm(name: &str) -> bool {
    matches!(name.trim(), "null" | "undefined" | "None")
}

/// Split `text` on `sep` at bracket depth zero (`<>`, `[]`, `()`).
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '<' | '[' | '(' | '{' => {
                depth += 1;
                current.push(c);
            }
            '>' | ']' | ')' | '}' => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Find the generic argument span for `Base<args>` / `Base[args]`.
/// Returns (base, args) when the brackets wrap the whole remainder.
fn split_generic(text: &str) -> Option<(String, String)> {
    for (open, close) in [('<', '>'), ('[', ']')] {
        if let Some(start) = text.find(open) {
            if text.ends_with(close) && start > 0 {
                let base = text[..start].trim().to_string();
                let args = text[start + 1..text.len() - 1].to_string();
                // A leading bracket (e.g. tuple syntax) is not a generic.
                if !base.is_empty() {
                    return Some((base, args));
                }
            }
        }
    }
    None
}

/// Parse a raw type string into the shared vocabulary.
///
/// Returns `None` for empty input. Parsing never fails on odd syntax; the
/// raw string is kept and the base falls back to the trimmed text.
pub fn parse_type(raw: &str, language: Language) -> Option<ParsedType> {
    parse_inner(raw, Some(language))
}

/// Parse a search expression, which carries no language: both TypeScript and
/// Python spellings normalize.
pub fn parse_search_type(raw: &str) -> Option<ParsedType> {
    parse_inner(raw, None)
}

fn parse_inner(raw: &str, language: Option<Language>) -> Option<ParsedType> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut is_optional = false;
    let mut text = trimmed.to_string();
    if let Some(stripped) = text.strip_suffix('?') {
        // Trailing `?` only marks optionality when it is not part of a
        // conditional-type expression.
        if !stripped.contains('?') {
            is_optional = true;
            text = stripped.trim().to_string();
        }
    }

    // Python Optional[X] is sugar for X | None.
    if let Some((base, args)) = split_generic(&text) {
        if base == "Optional" {
            let mut parsed = parse_inner(&args, language)?;
            parsed.raw = trimmed.to_string();
            parsed.is_nullable = true;
            parsed.is_optional = parsed.is_optional || is_optional;
            return Some(parsed);
        }
        if base == "Union" {
            return Some(finish_union(
                trimmed,
                split_top_level(&args, ','),
                language,
                is_optional,
            ));
        }
    }

    // Top-level union arms: `A | B | null`.
    let arms = split_top_level(&text, '|');
    if arms.len() > 1 {
        return Some(finish_union(trimmed, arms, language, is_optional));
    }

    // Array suffix `T[]`.
    if let Some(elem) = text.strip_suffix("[]") {
        let inner = parse_inner(elem, language);
        let inner_vec: Vec<ParsedType> = inner.into_iter().collect();
        let normalized = match inner_vec.first() {
            Some(i) => format!("Array<{}>", i.normalized),
            None => "Array".to_string(),
        };
        return Some(ParsedType {
            raw: trimmed.to_string(),
            normalized,
            base: "Array".to_string(),
            inner: inner_vec,
            is_async: false,
            is_nullable: false,
            is_array: true,
            is_generic: true,
            is_optional,
            has_default: false,
        });
    }

    // Generic `Base<args>` / `Base[args]`.
    if let Some((base_raw, args)) = split_generic(&text) {
        let base = normalize_base(&base_raw, language);
        let inner: Vec<ParsedType> = split_top_level(&args, ',')
            .iter()
            .filter_map(|a| parse_inner(a, language))
            .collect();
        let is_async = base == "Promise";
        // A promise of a nullable value is itself nullable from the
        // caller's point of view.
        let is_nullable = is_async && inner.len() == 1 && inner[0].is_nullable;
        let inner = if is_nullable {
            vec![strip_nullable(inner.into_iter().next().expect("checked len")) ]
        } else {
            inner
        };
        let rendered: Vec<&str> = inner.iter().map(|i| i.normalized.as_str()).collect();
        let normalized = if rendered.is_empty() {
            base.clone()
        } else {
            format!("{}<{}>", base, rendered.join(", "))
        };
        return Some(ParsedType {
            raw: trimmed.to_string(),
            normalized,
            base: base.clone(),
            inner,
            is_async,
            is_nullable,
            is_array: base == "Array",
            is_generic: true,
            is_optional,
            has_default: false,
        });
    }

    // Plain name.
    let base = normalize_base(&text, language);
    Some(ParsedType {
        raw: trimmed.to_string(),
        normalized: base.clone(),
        base: base.clone(),
        inner: vec![],
        is_async: base == "Promise",
        is_nullable: false,
        is_array: base == "Array",
        is_generic: false,
        is_optional,
        has_default: false,
    })
}

fn strip_nullable(mut t: ParsedType) -> ParsedType {
    t.is_nullable = false;
    t
}

fn finish_union(
    raw: &str,
    arms: Vec<String>,
    language: Option<Language>,
    is_optional: bool,
) -> ParsedType {
    let mut nullable = false;
    let mut parsed_arms: Vec<ParsedType> = Vec::new();
    for arm in arms {
        if is_null_arm(&arm) {
            nullable = true;
            continue;
        }
        if let Some(p) = parse_inner(&arm, language) {
            parsed_arms.push(p);
        }
    }

    match parsed_arms.len() {
        // `null | undefined` alone: just Void.
        0 => ParsedType {
            raw: raw.to_string(),
            normalized: "Void".to_string(),
            base: "Void".to_string(),
            inner: vec![],
            is_async: false,
            is_nullable: true,
            is_array: false,
            is_generic: false,
            is_optional,
            has_default: false,
        },
        // `T | null` collapses onto the non-null arm.
        1 => {
            let mut only = parsed_arms.into_iter().next().expect("checked len");
            only.raw = raw.to_string();
            only.is_nullable = only.is_nullable || nullable;
            only.is_optional = only.is_optional || is_optional;
            only
        }
        // Multi-arm unions keep every arm.
        _ => {
            let rendered: Vec<&str> = parsed_arms.iter().map(|a| a.normalized.as_str()).collect();
            ParsedType {
                raw: raw.to_string(),
                normalized: format!("Union<{}>", rendered.join(", ")),
                base: "Union".to_string(),
                inner: parsed_arms,
                is_async: false,
                is_nullable: nullable,
                is_array: false,
                is_generic: true,
                is_optional,
                has_default: false,
            }
        }
    }
}

/// Evaluate a match predicate between a stored type and a search expression.
pub fn types_match(
    t: &ParsedType,
    search: &str,
    mode: TypeMatchMode,
    opts: &TypeMatchOptions,
) -> bool {
    let Some(wanted) = parse_search_type(search) else {
        return false;
    };
    match mode {
        TypeMatchMode::Exact => t.normalized.eq_ignore_ascii_case(&wanted.normalized),
        TypeMatchMode::Base => {
            if t.base.eq_ignore_ascii_case(&wanted.base) {
                return true;
            }
            if opts.include_async_variants && t.base == "Promise" {
                return t
                    .inner
                    .iter()
                    .any(|i| i.base.eq_ignore_ascii_case(&wanted.base));
            }
            false
        }
        TypeMatchMode::Inner => t.inner.iter().any(|i| {
            i.base.eq_ignore_ascii_case(&wanted.base)
                || i.normalized
                    .to_lowercase()
                    .contains(&wanted.normalized.to_lowercase())
        }),
        TypeMatchMode::Partial => {
            let needle = wanted.normalized.to_lowercase();
            t.normalized.to_lowercase().contains(&needle)
                || t.base.to_lowercase().contains(&needle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_normalize() {
        let t = parse_type("str", Language::Python).unwrap();
        assert_eq!(t.base, "String");
        let t = parse_type("string", Language::TypeScript).unwrap();
        assert_eq!(t.base, "String");
        let t = parse_type("int", Language::Python).unwrap();
        assert_eq!(t.base, "Number");
        let t = parse_type("None", Language::Python).unwrap();
        assert_eq!(t.base, "Void");
    }

    #[test]
    fn test_str_is_not_python_in_typescript() {
        // `str` is a user type name in TS, not the builtin string.
        let t = parse_type("str", Language::TypeScript).unwrap();
        assert_eq!(t.base, "str");
    }

    #[test]
    fn test_nullable_promise() {
        let t = parse_type("Promise<User | null>", Language::TypeScript).unwrap();
        assert_eq!(t.base, "Promise");
        assert!(t.is_async);
        assert!(t.is_nullable);
        assert_eq!(t.inner.len(), 1);
        assert_eq!(t.inner[0].base, "User");
        assert_eq!(t.normalized, "Promise<User>");
    }

    #[test]
    fn test_async_variant_match() {
        let t = parse_type("Promise<User | null>", Language::TypeScript).unwrap();
        let opts = TypeMatchOptions {
            include_async_variants: true,
        };
        assert!(types_match(&t, "User", TypeMatchMode::Base, &opts));
        assert!(!types_match(
            &t,
            "User",
            TypeMatchMode::Base,
            &TypeMatchOptions::default()
        ));
    }

    #[test]
    fn test_python_awaitable_maps_to_promise() {
        let t = parse_type("Awaitable[User]", Language::Python).unwrap();
        assert_eq!(t.base, "Promise");
        assert!(t.is_async);
        assert_eq!(t.inner[0].base, "User");
    }

    #[test]
    fn test_optional_collapses() {
        let t = parse_type("Optional[str]", Language::Python).unwrap();
        assert_eq!(t.base, "String");
        assert!(t.is_nullable);
    }

    #[test]
    fn test_multi_arm_union() {
        let t = parse_type("string | number | boolean", Language::TypeScript).unwrap();
        assert_eq!(t.base, "Union");
        assert_eq!(t.inner.len(), 3);
        assert!(!t.is_nullable);
        let t = parse_type("string | number | null", Language::TypeScript).unwrap();
        assert_eq!(t.base, "Union");
        assert_eq!(t.inner.len(), 2);
        assert!(t.is_nullable);
    }

    #[test]
    fn test_array_suffix() {
        let t = parse_type("User[]", Language::TypeScript).unwrap();
        assert_eq!(t.base, "Array");
        assert!(t.is_array);
        assert_eq!(t.inner[0].base, "User");
        assert_eq!(t.normalized, "Array<User>");
    }

    #[test]
    fn test_python_list_generic() {
        let t = parse_type("List[Dict[str, int]]", Language::Python).unwrap();
        assert_eq!(t.base, "Array");
        assert_eq!(t.inner[0].base, "Map");
        assert_eq!(t.inner[0].inner.len(), 2);
        assert_eq!(t.normalized, "Array<Map<String, Number>>");
    }

    #[test]
    fn test_nested_commas_respected() {
        let t = parse_type("Map<string, Map<string, number>>", Language::TypeScript).unwrap();
        assert_eq!(t.inner.len(), 2);
        assert_eq!(t.inner[1].base, "Map");
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let t = parse_type("Promise<User>", Language::TypeScript).unwrap();
        assert!(types_match(
            &t,
            "promise<user>",
            TypeMatchMode::Exact,
            &TypeMatchOptions::default()
        ));
    }

    #[test]
    fn test_inner_and_partial_match() {
        let t = parse_type("Map<string, User>", Language::TypeScript).unwrap();
        let opts = TypeMatchOptions::default();
        assert!(types_match(&t, "User", TypeMatchMode::Inner, &opts));
        assert!(types_match(&t, "user", TypeMatchMode::Partial, &opts));
        assert!(!types_match(&t, "Account", TypeMatchMode::Inner, &opts));
    }

    #[test]
    fn test_cross_language_base_equivalence() {
        let ts = parse_type("string", Language::TypeScript).unwrap();
        let py = parse_type("str", Language::Python).unwrap();
        assert_eq!(ts.base, py.base);
        let opts = TypeMatchOptions::default();
        assert!(types_match(&ts, "String", TypeMatchMode::Base, &opts));
        assert!(types_match(&py, "String", TypeMatchMode::Base, &opts));
    }

    #[test]
    fn test_optional_suffix() {
        let t = parse_type("string?", Language::TypeScript).unwrap();
        assert!(t.is_optional);
        assert_eq!(t.base, "String");
    }

    #[test]
    fn test_empty_returns_none() {
        assert!(parse_type("", Language::TypeScript).is_none());
        assert!(parse_type("   ", Language::Python).is_none());
    }
}
