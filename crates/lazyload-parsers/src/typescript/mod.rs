pub(crate) mod helpers;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tree_sitter::{Node, Parser};

use crate::parser::{module_path_of, qualify, LanguageParser, ParseError, ParseOutput, ParserOptions};
use crate::treesitter::{
    build_parser, build_tsx_parser, detect_language, end_line, is_jsx_path, line_context,
    node_text, start_column, start_line, MAX_WALK_DEPTH,
};
use lazyload_core::types::{
    CallEdge, ClassData, DocBlock, Export, FunctionData, FunctionModifiers, Import,
    ImportSpecifier, InterfaceData, Language, Location, PropertyInfo, ReferenceKind, Symbol,
    SymbolData, SymbolKind, SymbolReference, TypeAliasData, TypeRelationKind, TypeRelationship,
    VariableData,
};

use helpers::{
    callback_context, extract_params, initializer_kind, is_private_name, jsdoc_before,
    parse_jsdoc, return_type_of, type_params_of,
};

/// Functions nested deeper than this stop producing symbols; their bodies are
/// still walked for references.
const MAX_FUNCTION_NESTING: usize = 3;

/// Tree-sitter walker for TypeScript, TSX, and JavaScript sources.
///
/// The emitted language tag follows the file extension; JSX dialects parse
/// with the TSX grammar.
pub struct TypeScriptParser {
    parser: Mutex<Parser>,
    /// JSX dialects get their own grammar: `<T>` is a tag there, not generics.
    tsx_parser: Mutex<Parser>,
    options: ParserOptions,
}

impl TypeScriptParser {
    pub fn new(options: ParserOptions) -> Self {
        let parser = build_parser(Language::TypeScript)
            .expect("TypeScript grammar is bundled and always loads");
        let tsx_parser = build_tsx_parser().expect("TSX grammar is bundled and always loads");
        Self {
            parser: Mutex::new(parser),
            tsx_parser: Mutex::new(tsx_parser),
            options,
        }
    }
}

impl LanguageParser for TypeScriptParser {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn extensions(&self) -> &[&'static str] {
        &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"]
    }

    fn parse(&self, path: &str, content: &str) -> Result<ParseOutput, ParseError> {
        let source = if is_jsx_path(std::path::Path::new(path)) {
            &self.tsx_parser
        } else {
            &self.parser
        };
        let tree = {
            let mut parser = source.lock().map_err(|_| ParseError::ParseFailed)?;
            parser.parse(content, None).ok_or(ParseError::ParseFailed)?
        };

        let language = detect_language(std::path::Path::new(path)).unwrap_or(Language::TypeScript);
        let mut walk = TsWalk {
            path,
            module_path: module_path_of(path),
            language,
            source: content,
            bytes: content.as_bytes(),
            opts: &self.options,
            out: ParseOutput::default(),
            scopes: Vec::new(),
            class_stack: Vec::new(),
            conditional_depth: 0,
            call_keys: HashMap::new(),
            named_exports: HashSet::new(),
            default_export: None,
        };
        walk.visit(tree.root_node(), 0);
        walk.apply_export_sets();
        Ok(walk.out)
    }
}

struct Scope {
    name: String,
    symbol_id: String,
    is_async: bool,
}

struct TsWalk<'a> {
    path: &'a str,
    module_path: String,
    language: Language,
    source: &'a str,
    bytes: &'a [u8],
    opts: &'a ParserOptions,
    out: ParseOutput,
    scopes: Vec<Scope>,
    class_stack: Vec<String>,
    conditional_depth: u32,
    /// (caller symbol id, callee name) -> index into out.calls, for coalescing.
    call_keys: HashMap<(String, String), usize>,
    named_exports: HashSet<String>,
    default_export: Option<String>,
}

impl<'a> TsWalk<'a> {
    fn visit(&mut self, node: Node<'a>, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            return;
        }
        match node.kind() {
            "import_statement" => self.handle_import(node),
            "export_statement" => self.handle_export(node, depth),
            "function_declaration" | "generator_function_declaration" => {
                self.handle_function(node, depth, false);
            }
            "class_declaration" | "abstract_class_declaration" => {
                self.handle_class(node, depth, false);
            }
            "interface_declaration" => self.handle_interface(node, false),
            "type_alias_declaration" => self.handle_type_alias(node, false),
            "enum_declaration" => self.handle_enum(node, false),
            "lexical_declaration" | "variable_declaration" => {
                self.handle_variables(node, depth, false);
            }
            "call_expression" => self.handle_call(node, depth),
            "assignment_expression" => self.handle_assignment(node, depth),
            "arrow_function" | "function_expression" | "generator_function" => {
                // Anonymous functions reached outside a handled context: walk
                // the body only, attributing to the enclosing scope.
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, depth + 1);
                }
            }
            "if_statement" => {
                if let Some(condition) = node.child_by_field_name("condition") {
                    self.visit(condition, depth + 1);
                }
                self.conditional_depth += 1;
                if let Some(consequence) = node.child_by_field_name("consequence") {
                    self.visit(consequence, depth + 1);
                }
                if let Some(alternative) = node.child_by_field_name("alternative") {
                    self.visit(alternative, depth + 1);
                }
                self.conditional_depth -= 1;
            }
            "while_statement" | "do_statement" | "for_statement" | "for_in_statement" => {
                self.conditional_depth += 1;
                self.visit_children(node, depth);
                self.conditional_depth -= 1;
            }
            "switch_case" | "switch_default" | "catch_clause" => {
                self.conditional_depth += 1;
                self.visit_children(node, depth);
                self.conditional_depth -= 1;
            }
            "ternary_expression" => {
                if let Some(condition) = node.child_by_field_name("condition") {
                    self.visit(condition, depth + 1);
                }
                self.conditional_depth += 1;
                if let Some(consequence) = node.child_by_field_name("consequence") {
                    self.visit(consequence, depth + 1);
                }
                if let Some(alternative) = node.child_by_field_name("alternative") {
                    self.visit(alternative, depth + 1);
                }
                self.conditional_depth -= 1;
            }
            "binary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| node_text(o, self.bytes))
                    .unwrap_or("");
                if operator == "&&" || operator == "||" || operator == "??" {
                    if let Some(left) = node.child_by_field_name("left") {
                        self.visit(left, depth + 1);
                    }
                    self.conditional_depth += 1;
                    if let Some(right) = node.child_by_field_name("right") {
                        self.visit(right, depth + 1);
                    }
                    self.conditional_depth -= 1;
                } else {
                    self.visit_children(node, depth);
                }
            }
            "identifier" => {
                self.add_reference(node, node_text(node, self.bytes), ReferenceKind::Read);
            }
            "type_identifier" => {
                self.add_reference(node, node_text(node, self.bytes), ReferenceKind::Type);
            }
            "comment" | "string" | "template_string" | "number" | "predefined_type"
            | "property_identifier" => {}
            _ => self.visit_children(node, depth),
        }
    }

    fn visit_children(&mut self, node: Node<'a>, depth: usize) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, depth + 1);
        }
    }

    // -- declarations --------------------------------------------------------

    fn handle_import(&mut self, node: Node<'a>) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let source = node_text(source_node, self.bytes)
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();
        let statement_text = node_text(node, self.bytes);
        let is_type_only = statement_text.starts_with("import type");

        let mut specifiers = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "import_clause" {
                continue;
            }
            let mut clause_cursor = child.walk();
            for item in child.named_children(&mut clause_cursor) {
                match item.kind() {
                    "identifier" => specifiers.push(ImportSpecifier {
                        name: node_text(item, self.bytes).to_string(),
                        is_default: true,
                        ..ImportSpecifier::default()
                    }),
                    "namespace_import" => {
                        let name = item
                            .named_child(0)
                            .map(|n| node_text(n, self.bytes).to_string())
                            .unwrap_or_default();
                        specifiers.push(ImportSpecifier {
                            name,
                            is_namespace: true,
                            ..ImportSpecifier::default()
                        });
                    }
                    "named_imports" => {
                        let mut names_cursor = item.walk();
                        for spec in item.named_children(&mut names_cursor) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            let name = spec
                                .child_by_field_name("name")
                                .map(|n| node_text(n, self.bytes).to_string())
                                .unwrap_or_default();
                            let alias = spec
                                .child_by_field_name("alias")
                                .map(|n| node_text(n, self.bytes).to_string());
                            specifiers.push(ImportSpecifier {
                                name,
                                alias,
                                ..ImportSpecifier::default()
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        let line = start_line(node);
        for spec in &specifiers {
            self.out.references.push(SymbolReference {
                id: 0,
                symbol_id: None,
                symbol_name: spec.name.clone(),
                referencing_file: self.path.to_string(),
                referencing_symbol_id: None,
                referencing_symbol_name: self.scopes.last().map(|s| s.name.clone()),
                line,
                column: start_column(node),
                context: line_context(self.source, line),
                kind: ReferenceKind::Import,
            });
        }

        self.out.imports.push(Import {
            source,
            specifiers,
            is_type_only,
            line,
            resolved_path: None,
            is_external: false,
            is_builtin: false,
        });
    }

    fn handle_export(&mut self, node: Node<'a>, depth: usize) {
        let source = node.child_by_field_name("source").map(|s| {
            node_text(s, self.bytes)
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string()
        });

        if let Some(declaration) = node.child_by_field_name("declaration") {
            let line = start_line(declaration);
            match declaration.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    self.record_export(&self.decl_name(declaration), "function", line);
                    self.handle_function(declaration, depth, true);
                }
                "class_declaration" | "abstract_class_declaration" => {
                    self.record_export(&self.decl_name(declaration), "class", line);
                    self.handle_class(declaration, depth, true);
                }
                "interface_declaration" => {
                    self.record_export(&self.decl_name(declaration), "interface", line);
                    self.handle_interface(declaration, true);
                }
                "type_alias_declaration" => {
                    self.record_export(&self.decl_name(declaration), "type_alias", line);
                    self.handle_type_alias(declaration, true);
                }
                "enum_declaration" => {
                    self.record_export(&self.decl_name(declaration), "enum", line);
                    self.handle_enum(declaration, true);
                }
                "lexical_declaration" | "variable_declaration" => {
                    self.handle_variables(declaration, depth, true);
                }
                _ => self.visit(declaration, depth + 1),
            }
            return;
        }

        // `export default <expr>` without a declaration names an existing symbol.
        let has_default = (0..node.child_count()).any(|i| {
            node.child(i as usize)
                .map(|c| c.kind() == "default")
                .unwrap_or(false)
        });

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "export_clause" => {
                    let mut spec_cursor = child.walk();
                    for spec in child.named_children(&mut spec_cursor) {
                        if spec.kind() != "export_specifier" {
                            continue;
                        }
                        let name = spec
                            .child_by_field_name("name")
                            .map(|n| node_text(n, self.bytes).to_string())
                            .unwrap_or_default();
                        if source.is_none() {
                            self.named_exports.insert(name.clone());
                        }
                        self.out.exports.push(Export {
                            name,
                            kind: "named".into(),
                            line: start_line(spec),
                            is_reexport: source.is_some(),
                            reexport_source: source.clone(),
                        });
                    }
                }
                "identifier" if has_default => {
                    let name = node_text(child, self.bytes).to_string();
                    self.default_export = Some(name.clone());
                    self.out.exports.push(Export {
                        name,
                        kind: "default".into(),
                        line: start_line(node),
                        is_reexport: false,
                        reexport_source: None,
                    });
                }
                _ => {}
            }
        }

        // `export * from './mod'`
        let exports_star = (0..node.child_count()).any(|i| {
            node.child(i as usize)
                .map(|c| c.kind() == "*")
                .unwrap_or(false)
        });
        if exports_star {
            self.out.exports.push(Export {
                name: "*".into(),
                kind: "reexport".into(),
                line: start_line(node),
                is_reexport: true,
                reexport_source: source,
            });
        }
    }

    fn decl_name(&self, declaration: Node) -> String {
        declaration
            .child_by_field_name("name")
            .map(|n| node_text(n, self.bytes).to_string())
            .unwrap_or_default()
    }

    fn record_export(&mut self, name: &str, kind: &str, line: u32) {
        if name.is_empty() {
            return;
        }
        self.out.exports.push(Export {
            name: name.to_string(),
            kind: kind.to_string(),
            line,
            is_reexport: false,
            reexport_source: None,
        });
    }

    fn handle_function(&mut self, node: Node<'a>, depth: usize, exported: bool) {
        let name = self.decl_name(node);
        if name.is_empty() {
            self.visit_children(node, depth);
            return;
        }
        let fn_depth = self.scopes.len();
        let excluded = (is_private_name(&name) && !self.opts.include_private)
            || fn_depth >= MAX_FUNCTION_NESTING;
        if excluded {
            // No symbol, but the body still contributes references.
            if let Some(body) = node.child_by_field_name("body") {
                self.visit(body, depth + 1);
            }
            return;
        }

        let is_async = self.has_keyword_child(node, "async");
        let is_generator = node.kind() == "generator_function_declaration"
            || self.has_keyword_child(node, "*");
        let parent = self
            .scopes
            .last()
            .map(|s| s.name.clone())
            .or_else(|| self.class_stack.last().cloned());
        let nested = fn_depth > 0;

        let data = FunctionData {
            params: node
                .child_by_field_name("parameters")
                .map(|p| extract_params(p, self.bytes))
                .unwrap_or_default(),
            return_type: return_type_of(node, self.bytes),
            type_params: type_params_of(node, self.bytes),
            modifiers: FunctionModifiers {
                exported,
                is_async,
                is_generator,
                ..FunctionModifiers::default()
            },
            docs: self.docs_for(node),
            parent_class: None,
            local_name: if nested { Some(name.clone()) } else { None },
            decorators: vec![],
        };

        let symbol_id = self.push_symbol(
            node,
            &name,
            SymbolKind::Function,
            parent.as_deref(),
            SymbolData::Function(data),
        );

        self.scopes.push(Scope {
            name: name.clone(),
            symbol_id,
            is_async,
        });
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body, depth + 1);
        }
        self.scopes.pop();
    }

    fn handle_class(&mut self, node: Node<'a>, depth: usize, exported: bool) {
        let name = self.decl_name(node);
        if name.is_empty() || (is_private_name(&name) && !self.opts.include_private) {
            return;
        }
        let is_abstract = node.kind() == "abstract_class_declaration";
        let class_line = start_line(node);
        let class_id = Symbol::make_id(self.path, &name, SymbolKind::Class, class_line);

        let mut extends = None;
        let mut implements = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "class_heritage" {
                continue;
            }
            let mut heritage_cursor = child.walk();
            for clause in child.named_children(&mut heritage_cursor) {
                match clause.kind() {
                    "extends_clause" => {
                        if let Some(value) = clause.named_child(0) {
                            let base = node_text(value, self.bytes).to_string();
                            self.out.type_relationships.push(TypeRelationship {
                                id: 0,
                                source_symbol_id: class_id.clone(),
                                source_name: name.clone(),
                                target_symbol_id: None,
                                target_name: base.clone(),
                                kind: TypeRelationKind::Extends,
                            });
                            extends = Some(base);
                        }
                    }
                    "implements_clause" => {
                        let mut types_cursor = clause.walk();
                        for t in clause.named_children(&mut types_cursor) {
                            let target = node_text(t, self.bytes).to_string();
                            self.out.type_relationships.push(TypeRelationship {
                                id: 0,
                                source_symbol_id: class_id.clone(),
                                source_name: name.clone(),
                                target_symbol_id: None,
                                target_name: target.clone(),
                                kind: TypeRelationKind::Implements,
                            });
                            implements.push(target);
                        }
                    }
                    _ => {}
                }
            }
        }

        let docs = self.docs_for(node);
        let mut methods = Vec::new();
        let mut properties = Vec::new();

        self.class_stack.push(name.clone());
        if let Some(body) = node.child_by_field_name("body") {
            let mut body_cursor = body.walk();
            let members: Vec<Node> = body.named_children(&mut body_cursor).collect();
            for member in members {
                match member.kind() {
                    "method_definition" | "abstract_method_signature" => {
                        if let Some(method_name) =
                            self.handle_method(member, depth, &name)
                        {
                            methods.push(method_name);
                        }
                    }
                    "public_field_definition" | "property_signature" => {
                        let prop_name = member
                            .child_by_field_name("name")
                            .map(|n| node_text(n, self.bytes).to_string())
                            .unwrap_or_default();
                        if prop_name.is_empty() {
                            continue;
                        }
                        properties.push(PropertyInfo {
                            name: prop_name,
                            type_name: member
                                .child_by_field_name("type")
                                .and_then(|a| a.named_child(0))
                                .map(|t| node_text(t, self.bytes).to_string()),
                            is_static: self.has_keyword_child(member, "static"),
                            visibility: self.accessibility_of(member),
                        });
                        if let Some(value) = member.child_by_field_name("value") {
                            self.visit(value, depth + 1);
                        }
                    }
                    _ => self.visit(member, depth + 1),
                }
            }
        }
        self.class_stack.pop();

        let data = ClassData {
            methods,
            properties,
            extends,
            implements,
            type_params: type_params_of(node, self.bytes),
            is_abstract,
            exported,
            docs,
            decorators: vec![],
        };
        self.push_symbol(node, &name, SymbolKind::Class, None, SymbolData::Class(data));
    }

    /// Emits the method symbol and returns its name for the class record.
    fn handle_method(&mut self, node: Node<'a>, depth: usize, class_name: &str) -> Option<String> {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, self.bytes).to_string())?;
        if is_private_name(&name) && !self.opts.include_private {
            return None;
        }
        let kind = if name == "constructor" {
            SymbolKind::Constructor
        } else {
            SymbolKind::Method
        };
        let is_async = self.has_keyword_child(node, "async");

        let data = FunctionData {
            params: node
                .child_by_field_name("parameters")
                .map(|p| extract_params(p, self.bytes))
                .unwrap_or_default(),
            return_type: return_type_of(node, self.bytes),
            type_params: type_params_of(node, self.bytes),
            modifiers: FunctionModifiers {
                is_async,
                is_generator: self.has_keyword_child(node, "*"),
                is_static: self.has_keyword_child(node, "static"),
                is_abstract: node.kind() == "abstract_method_signature",
                visibility: self.accessibility_of(node),
                ..FunctionModifiers::default()
            },
            docs: self.docs_for(node),
            parent_class: Some(class_name.to_string()),
            local_name: None,
            decorators: vec![],
        };

        let symbol_id = self.push_symbol(
            node,
            &name,
            kind,
            Some(class_name),
            SymbolData::Function(data),
        );

        self.scopes.push(Scope {
            name: name.clone(),
            symbol_id,
            is_async,
        });
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body, depth + 1);
        }
        self.scopes.pop();
        Some(name)
    }

    fn handle_interface(&mut self, node: Node<'a>, exported: bool) {
        let name = self.decl_name(node);
        if name.is_empty() {
            return;
        }
        let interface_id =
            Symbol::make_id(self.path, &name, SymbolKind::Interface, start_line(node));

        let mut extends = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "extends_type_clause" {
                let mut types_cursor = child.walk();
                for t in child.named_children(&mut types_cursor) {
                    let target = node_text(t, self.bytes).to_string();
                    self.out.type_relationships.push(TypeRelationship {
                        id: 0,
                        source_symbol_id: interface_id.clone(),
                        source_name: name.clone(),
                        target_symbol_id: None,
                        target_name: target.clone(),
                        kind: TypeRelationKind::Extends,
                    });
                    extends.push(target);
                }
            }
        }

        let mut methods = Vec::new();
        let mut properties = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut body_cursor = body.walk();
            for member in body.named_children(&mut body_cursor) {
                let member_name = member
                    .child_by_field_name("name")
                    .map(|n| node_text(n, self.bytes).to_string())
                    .unwrap_or_default();
                if member_name.is_empty() {
                    continue;
                }
                match member.kind() {
                    "method_signature" => methods.push(member_name),
                    "property_signature" => properties.push(PropertyInfo {
                        name: member_name,
                        type_name: member
                            .child_by_field_name("type")
                            .and_then(|a| a.named_child(0))
                            .map(|t| node_text(t, self.bytes).to_string()),
                        is_static: false,
                        visibility: None,
                    }),
                    _ => {}
                }
            }
        }

        let data = InterfaceData {
            methods,
            properties,
            extends,
            type_params: type_params_of(node, self.bytes),
            exported,
            docs: self.docs_for(node),
        };
        self.push_symbol(
            node,
            &name,
            SymbolKind::Interface,
            None,
            SymbolData::Interface(data),
        );
    }

    fn handle_type_alias(&mut self, node: Node<'a>, exported: bool) {
        let name = self.decl_name(node);
        if name.is_empty() {
            return;
        }
        let aliased = node
            .child_by_field_name("value")
            .map(|v| node_text(v, self.bytes).to_string())
            .unwrap_or_default();
        let data = TypeAliasData {
            aliased,
            type_params: type_params_of(node, self.bytes),
            exported,
        };
        self.push_symbol(
            node,
            &name,
            SymbolKind::TypeAlias,
            None,
            SymbolData::TypeAlias(data),
        );
    }

    fn handle_enum(&mut self, node: Node<'a>, exported: bool) {
        let name = self.decl_name(node);
        if name.is_empty() {
            return;
        }
        let data = VariableData {
            declared_type: None,
            initializer_kind: Some("enum".into()),
            exported,
        };
        self.push_symbol(
            node,
            &name,
            SymbolKind::Variable,
            None,
            SymbolData::Variable(data),
        );
    }

    fn handle_variables(&mut self, node: Node<'a>, depth: usize, exported: bool) {
        let top_level = self.scopes.is_empty() && self.class_stack.is_empty();
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
            .collect();
        for declarator in declarators {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name_node.kind() != "identifier" {
                // Destructuring declarations contribute references only.
                if let Some(value) = declarator.child_by_field_name("value") {
                    self.visit(value, depth + 1);
                }
                continue;
            }
            let name = node_text(name_node, self.bytes).to_string();
            let value = declarator.child_by_field_name("value");
            let declared_type = declarator
                .child_by_field_name("type")
                .and_then(|a| a.named_child(0))
                .map(|t| node_text(t, self.bytes).to_string());

            let is_function_value = value
                .map(|v| {
                    matches!(
                        v.kind(),
                        "arrow_function" | "function_expression" | "generator_function"
                    )
                })
                .unwrap_or(false);

            let private_excluded = is_private_name(&name) && !self.opts.include_private;

            if is_function_value {
                let value = value.expect("checked above");
                if private_excluded || self.scopes.len() >= MAX_FUNCTION_NESTING {
                    if let Some(body) = value.child_by_field_name("body") {
                        self.visit(body, depth + 1);
                    }
                    continue;
                }
                let is_async = self.has_keyword_child(value, "async");
                let nested = !self.scopes.is_empty();
                let parent = self
                    .scopes
                    .last()
                    .map(|s| s.name.clone())
                    .or_else(|| self.class_stack.last().cloned());
                let data = FunctionData {
                    params: value
                        .child_by_field_name("parameters")
                        .map(|p| extract_params(p, self.bytes))
                        .unwrap_or_default(),
                    return_type: return_type_of(value, self.bytes),
                    type_params: type_params_of(value, self.bytes),
                    modifiers: FunctionModifiers {
                        exported,
                        is_async,
                        is_generator: value.kind() == "generator_function",
                        ..FunctionModifiers::default()
                    },
                    docs: self.docs_for(node),
                    parent_class: None,
                    local_name: if nested { Some(name.clone()) } else { None },
                    decorators: vec![],
                };
                let symbol_id = self.push_symbol(
                    declarator,
                    &name,
                    SymbolKind::Function,
                    parent.as_deref(),
                    SymbolData::Function(data),
                );
                self.scopes.push(Scope {
                    name: name.clone(),
                    symbol_id,
                    is_async,
                });
                if let Some(body) = value.child_by_field_name("body") {
                    self.visit(body, depth + 1);
                }
                self.scopes.pop();
                continue;
            }

            // Plain variables are only symbols at module scope.
            if top_level && !private_excluded {
                let data = VariableData {
                    declared_type,
                    initializer_kind: value.map(|v| initializer_kind(v).to_string()),
                    exported,
                };
                self.push_symbol(
                    declarator,
                    &name,
                    SymbolKind::Variable,
                    None,
                    SymbolData::Variable(data),
                );
            }
            if let Some(value) = value {
                self.visit(value, depth + 1);
            }
        }
    }

    // -- expressions ---------------------------------------------------------

    fn handle_call(&mut self, node: Node<'a>, depth: usize) {
        let Some(function) = node.child_by_field_name("function") else {
            self.visit_children(node, depth);
            return;
        };

        let (callee_name, full_callee) = match function.kind() {
            "identifier" => {
                let name = node_text(function, self.bytes).to_string();
                (name.clone(), name)
            }
            "member_expression" => {
                let property = function
                    .child_by_field_name("property")
                    .map(|p| node_text(p, self.bytes).to_string())
                    .unwrap_or_default();
                let full = node_text(function, self.bytes).to_string();
                // The receiver expression is itself a read.
                if let Some(object) = function.child_by_field_name("object") {
                    self.visit(object, depth + 1);
                }
                (property, full)
            }
            _ => {
                self.visit(function, depth + 1);
                (String::new(), String::new())
            }
        };

        if !callee_name.is_empty() {
            self.add_reference(node, &callee_name, ReferenceKind::Call);
            self.add_call_edge(&callee_name);
        }

        let Some(arguments) = node.child_by_field_name("arguments") else {
            return;
        };

        let first_string_arg = {
            let mut cursor = arguments.walk();
            let result = arguments
                .named_children(&mut cursor)
                .find(|a| a.kind() == "string")
                .map(|a| {
                    node_text(a, self.bytes)
                        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                        .to_string()
                });
            result
        };

        let context = if callee_name.is_empty() {
            None
        } else {
            callback_context(&full_callee, first_string_arg.as_deref())
        };

        let mut cursor = arguments.walk();
        let args: Vec<Node> = arguments.named_children(&mut cursor).collect();
        for arg in args {
            match arg.kind() {
                "arrow_function" | "function_expression" => match &context {
                    Some(ctx) => self.emit_callback(arg, ctx, depth),
                    None => {
                        if let Some(body) = arg.child_by_field_name("body") {
                            self.visit(body, depth + 1);
                        }
                    }
                },
                _ => self.visit(arg, depth + 1),
            }
        }
    }

    fn emit_callback(&mut self, node: Node<'a>, context: &str, depth: usize) {
        if self.scopes.len() >= MAX_FUNCTION_NESTING {
            if let Some(body) = node.child_by_field_name("body") {
                self.visit(body, depth + 1);
            }
            return;
        }
        let name = format!("{} callback", context);
        let is_async = self.has_keyword_child(node, "async");
        let parent = self
            .scopes
            .last()
            .map(|s| s.name.clone())
            .or_else(|| self.class_stack.last().cloned());

        let data = FunctionData {
            params: node
                .child_by_field_name("parameters")
                .map(|p| extract_params(p, self.bytes))
                .unwrap_or_default(),
            return_type: return_type_of(node, self.bytes),
            type_params: vec![],
            modifiers: FunctionModifiers {
                is_async,
                callback_context: Some(context.to_string()),
                ..FunctionModifiers::default()
            },
            docs: None,
            parent_class: None,
            local_name: None,
            decorators: vec![],
        };

        let symbol_id = self.push_symbol(
            node,
            &name,
            SymbolKind::Callback,
            parent.as_deref(),
            SymbolData::Function(data),
        );
        self.scopes.push(Scope {
            name,
            symbol_id,
            is_async,
        });
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body, depth + 1);
        }
        self.scopes.pop();
    }

    fn handle_assignment(&mut self, node: Node<'a>, depth: usize) {
        if let Some(left) = node.child_by_field_name("left") {
            if left.kind() == "identifier" {
                self.add_reference(left, node_text(left, self.bytes), ReferenceKind::Write);
            } else {
                self.visit(left, depth + 1);
            }
        }
        if let Some(right) = node.child_by_field_name("right") {
            self.visit(right, depth + 1);
        }
    }

    // -- bookkeeping ---------------------------------------------------------

    fn has_keyword_child(&self, node: Node, keyword: &str) -> bool {
        (0..node.child_count()).any(|i| {
            node.child(i)
                .map(|c| c.kind() == keyword)
                .unwrap_or(false)
        })
    }

    fn accessibility_of(&self, node: Node) -> Option<String> {
        (0..node.child_count()).find_map(|i| {
            let child = node.child(i)?;
            if child.kind() == "accessibility_modifier" {
                Some(node_text(child, self.bytes).to_string())
            } else {
                None
            }
        })
    }

    fn docs_for(&self, node: Node) -> Option<DocBlock> {
        if !self.opts.extract_documentation {
            return None;
        }
        jsdoc_before(node, self.bytes).map(|raw| parse_jsdoc(&raw))
    }

    fn push_symbol(
        &mut self,
        node: Node,
        name: &str,
        kind: SymbolKind,
        parent: Option<&str>,
        data: SymbolData,
    ) -> String {
        let line = start_line(node);
        let id = Symbol::make_id(self.path, name, kind, line);
        self.out.symbols.push(Symbol {
            id: id.clone(),
            name: name.to_string(),
            qualified_name: qualify(&self.module_path, parent, name),
            kind,
            file_path: self.path.to_string(),
            language: self.language,
            location: Location {
                start_line: line,
                end_line: end_line(node),
                start_column: start_column(node),
                end_column: node.end_position().column as u32,
            },
            data,
        });
        id
    }

    fn add_reference(&mut self, node: Node, name: &str, kind: ReferenceKind) {
        if name.is_empty() {
            return;
        }
        let line = start_line(node);
        self.out.references.push(SymbolReference {
            id: 0,
            symbol_id: None,
            symbol_name: name.to_string(),
            referencing_file: self.path.to_string(),
            referencing_symbol_id: None,
            referencing_symbol_name: self.scopes.last().map(|s| s.name.clone()),
            line,
            column: start_column(node),
            context: line_context(self.source, line),
            kind,
        });
    }

    fn add_call_edge(&mut self, callee: &str) {
        let Some(scope) = self.scopes.last() else {
            return;
        };
        let key = (scope.symbol_id.clone(), callee.to_string());
        let conditional = self.conditional_depth > 0;
        match self.call_keys.get(&key) {
            Some(&index) => {
                let edge = &mut self.out.calls[index];
                edge.call_count += 1;
                edge.is_conditional = edge.is_conditional || conditional;
            }
            None => {
                self.out.calls.push(CallEdge {
                    id: 0,
                    caller_symbol_id: scope.symbol_id.clone(),
                    caller_name: scope.name.clone(),
                    callee_symbol_id: None,
                    callee_name: callee.to_string(),
                    call_count: 1,
                    is_async: scope.is_async,
                    is_conditional: conditional,
                });
                self.call_keys.insert(key, self.out.calls.len() - 1);
            }
        }
    }

    fn apply_export_sets(&mut self) {
        for symbol in &mut self.out.symbols {
            let named = self.named_exports.contains(&symbol.name)
                || self.default_export.as_deref() == Some(&symbol.name);
            if !named {
                continue;
            }
            match &mut symbol.data {
                SymbolData::Function(f) => f.modifiers.exported = true,
                SymbolData::Class(c) => c.exported = true,
                SymbolData::Interface(i) => i.exported = true,
                SymbolData::TypeAlias(t) => t.exported = true,
                SymbolData::Variable(v) => v.exported = true,
            }
        }
    }
}
