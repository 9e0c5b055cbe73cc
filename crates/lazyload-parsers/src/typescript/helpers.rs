use tree_sitter::Node;

use crate::treesitter::node_text;
use lazyload_core::types::{DocBlock, DocParam, Param};

/// Callback hosts recognised as symbol-producing contexts. Array-method
/// callbacks (`map`, `filter`, `reduce`, `forEach`, ...) are deliberately
/// excluded.
const CALLBACK_HOSTS: &[&str] = &[
    "describe",
    "it",
    "test",
    "beforeEach",
    "afterEach",
    "beforeAll",
    "afterAll",
    "then",
    "catch",
    "finally",
    "setTimeout",
    "setInterval",
    "action",
];

/// Event-subscription hosts whose first string argument names the event.
const EVENT_HOSTS: &[&str] = &["on", "once", "addEventListener"];

const ARRAY_METHOD_HOSTS: &[&str] = &[
    "map", "filter", "reduce", "forEach", "some", "every", "find", "findIndex", "flatMap",
];

/// Classify a call-expression callee as a callback context.
///
/// Returns the `callbackContext` value (`"describe"`, `"on:click"`, ...) when
/// function arguments of this call should become callback symbols.
pub fn callback_context(callee: &str, first_string_arg: Option<&str>) -> Option<String> {
    let method = callee.rsplit('.').next().unwrap_or(callee);
    if ARRAY_METHOD_HOSTS.contains(&method) {
        return None;
    }
    if CALLBACK_HOSTS.contains(&method) {
        return Some(method.to_string());
    }
    if EVENT_HOSTS.contains(&method) {
        let event = first_string_arg.unwrap_or("*");
        return Some(format!("{}:{}", method, event));
    }
    None
}

/// Underscore prefix marks a private name in both supported languages.
pub fn is_private_name(name: &str) -> bool {
    name.starts_with('_')
}

/// Find a JSDoc block (`/** ... */`) immediately preceding `node`, looking
/// through an `export` wrapper and decorators.
pub fn jsdoc_before<'a>(node: Node<'a>, source: &'a [u8]) -> Option<String> {
    let mut target = node;
    // JSDoc for `export function f()` sits before the export_statement.
    if let Some(parent) = node.parent() {
        if parent.kind() == "export_statement" {
            target = parent;
        }
    }
    let mut prev = target.prev_sibling()?;
    loop {
        match prev.kind() {
            "comment" => {
                let text = node_text(prev, source);
                if text.starts_with("/**") {
                    return Some(text.to_string());
                }
                return None;
            }
            "decorator" => {
                prev = prev.prev_sibling()?;
            }
            _ => return None,
        }
    }
}

/// Parse a JSDoc block into its documentation record.
pub fn parse_jsdoc(raw: &str) -> DocBlock {
    let mut doc = DocBlock::default();
    let mut description_lines: Vec<String> = Vec::new();

    for line in raw.lines() {
        let line = line
            .trim()
            .trim_start_matches("/**")
            .trim_end_matches("*/")
            .trim_start_matches('*')
            .trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("@param") {
            let rest = rest.trim();
            // Optional {type} annotation before the name.
            let rest = if rest.starts_with('{') {
                match rest.find('}') {
                    Some(end) => rest[end + 1..].trim(),
                    None => rest,
                }
            } else {
                rest
            };
            let mut parts = rest.splitn(2, char::is_whitespace);
            let name = parts.next().unwrap_or("").trim_matches(|c| c == '[' || c == ']');
            let description = parts.next().unwrap_or("").trim_start_matches('-').trim();
            if !name.is_empty() {
                doc.params.push(DocParam {
                    name: name.to_string(),
                    description: description.to_string(),
                });
            }
        } else if let Some(rest) = line
            .strip_prefix("@returns")
            .or_else(|| line.strip_prefix("@return"))
        {
            let rest = rest.trim();
            let rest = if rest.starts_with('{') {
                match rest.find('}') {
                    Some(end) => rest[end + 1..].trim(),
                    None => rest,
                }
            } else {
                rest
            };
            if !rest.is_empty() {
                doc.returns = Some(rest.to_string());
            }
        } else if let Some(rest) = line
            .strip_prefix("@throws")
            .or_else(|| line.strip_prefix("@throw"))
        {
            let rest = rest.trim();
            if !rest.is_empty() {
                doc.throws = Some(rest.to_string());
            }
        } else if line.starts_with('@') {
            // Other tags (@deprecated, @example, ...) are not captured.
            continue;
        } else {
            description_lines.push(line.to_string());
        }
    }

    if !description_lines.is_empty() {
        doc.description = Some(description_lines.join(" "));
    }
    doc
}

/// Extract ordered parameters from a `formal_parameters` node.
pub fn extract_params(params_node: Node, source: &[u8]) -> Vec<Param> {
    let mut params = Vec::new();
    let mut cursor = params_node.walk();
    for child in params_node.named_children(&mut cursor) {
        match child.kind() {
            "required_parameter" | "optional_parameter" => {
                let name = child
                    .child_by_field_name("pattern")
                    .map(|p| pattern_name(p, source))
                    .unwrap_or_default();
                let type_name = child
                    .child_by_field_name("type")
                    .and_then(|a| a.named_child(0))
                    .map(|t| node_text(t, source).to_string());
                let default_value = child
                    .child_by_field_name("value")
                    .map(|v| node_text(v, source).to_string());
                let rest = child
                    .child_by_field_name("pattern")
                    .map(|p| p.kind() == "rest_pattern")
                    .unwrap_or(false);
                params.push(Param {
                    name,
                    type_name,
                    optional: child.kind() == "optional_parameter" || default_value.is_some(),
                    default_value,
                    rest,
                });
            }
            // Plain identifiers appear in JS-style parameter lists.
            "identifier" => params.push(Param {
                name: node_text(child, source).to_string(),
                ..Param::default()
            }),
            "rest_pattern" => params.push(Param {
                name: pattern_name(child, source),
                rest: true,
                ..Param::default()
            }),
            _ => {}
        }
    }
    params
}

/// The identifier inside a binding pattern; destructuring patterns keep their
/// source text.
fn pattern_name(pattern: Node, source: &[u8]) -> String {
    match pattern.kind() {
        "identifier" | "this" => node_text(pattern, source).to_string(),
        "rest_pattern" => pattern
            .named_child(0)
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_default(),
        _ => node_text(pattern, source).to_string(),
    }
}

/// The return type text of a function-like node, without the leading colon.
pub fn return_type_of(node: Node, source: &[u8]) -> Option<String> {
    node.child_by_field_name("return_type")
        .and_then(|a| a.named_child(0))
        .map(|t| node_text(t, source).to_string())
}

/// Type parameter names from a `type_parameters` node.
pub fn type_params_of(node: Node, source: &[u8]) -> Vec<String> {
    let Some(tp) = node.child_by_field_name("type_parameters") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = tp.walk();
    for child in tp.named_children(&mut cursor) {
        if child.kind() == "type_parameter" {
            if let Some(name) = child.child_by_field_name("name") {
                out.push(node_text(name, source).to_string());
            }
        }
    }
    out
}

/// Classify a variable initializer for the data model.
pub fn initializer_kind(value: Node) -> &'static str {
    match value.kind() {
        "arrow_function" | "function_expression" | "generator_function" => "function",
        "number" | "string" | "template_string" | "true" | "false" | "null" | "undefined" => {
            "literal"
        }
        "object" => "object",
        "array" => "array",
        "call_expression" => "call",
        "new_expression" => "new",
        "await_expression" => "await",
        _ => "expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_context_recognised_hosts() {
        assert_eq!(callback_context("describe", None).as_deref(), Some("describe"));
        assert_eq!(callback_context("promise.then", None).as_deref(), Some("then"));
        assert_eq!(
            callback_context("emitter.on", Some("close")).as_deref(),
            Some("on:close")
        );
        assert_eq!(
            callback_context("emitter.once", Some("ready")).as_deref(),
            Some("once:ready")
        );
        assert_eq!(
            callback_context("socket.addEventListener", Some("message")).as_deref(),
            Some("addEventListener:message")
        );
    }

    #[test]
    fn test_callback_context_excludes_array_methods() {
        assert_eq!(callback_context("items.map", None), None);
        assert_eq!(callback_context("list.forEach", None), None);
        assert_eq!(callback_context("values.reduce", None), None);
    }

    #[test]
    fn test_callback_context_unknown_host() {
        assert_eq!(callback_context("doWork", None), None);
    }

    #[test]
    fn test_parse_jsdoc_sections() {
        let doc = parse_jsdoc(
            "/**\n * Greets a user by name.\n *\n * @param {string} name - who to greet\n * @param greeting optional greeting word\n * @returns {string} the full greeting\n * @throws when name is empty\n */",
        );
        assert_eq!(doc.description.as_deref(), Some("Greets a user by name."));
        assert_eq!(doc.params.len(), 2);
        assert_eq!(doc.params[0].name, "name");
        assert_eq!(doc.params[0].description, "who to greet");
        assert_eq!(doc.params[1].name, "greeting");
        assert_eq!(doc.returns.as_deref(), Some("the full greeting"));
        assert_eq!(doc.throws.as_deref(), Some("when name is empty"));
    }

    #[test]
    fn test_parse_jsdoc_ignores_unknown_tags() {
        let doc = parse_jsdoc("/** Does things.\n * @deprecated use other\n */");
        assert_eq!(doc.description.as_deref(), Some("Does things."));
        assert!(doc.params.is_empty());
    }

    #[test]
    fn test_private_name() {
        assert!(is_private_name("_hidden"));
        assert!(!is_private_name("visible"));
    }
}
