pub(crate) mod helpers;


use std::collections::HashMap;
use std::sync::Mutex;

use tree_sitter::{Node, Parser};

use crate::parser::{module_path_of, qualify, LanguageParser, ParseError, ParseOutput, ParserOptions};
use crate::treesitter::{
    build_parser, end_line, line_context, node_text, start_column, start_line, MAX_WALK_DEPTH,
};
use lazyload_core::types::{
    CallEdge, ClassData, DocBlock, Export, FunctionData, FunctionModifiers, Import,
    ImportSpecifier, Language, Location, PropertyInfo, ReferenceKind, Symbol, SymbolData,
    SymbolKind, SymbolReference, TypeRelationKind, TypeRelationship, VariableData,
};

use helpers::{is_python_private, parse_docstring, DocstringFormat, DunderAll};

const MAX_FUNCTION_NESTING: usize = 3;

/// Tree-sitter walker for Python sources.
pub struct PythonParser {
    parser: Mutex<Parser>,
    options: ParserOptions,
    forced_format: Option<DocstringFormat>,
}

impl PythonParser {
    pub fn new(options: ParserOptions) -> Self {
        let parser =
            build_parser(Language::Python).expect("Python grammar is bundled and always loads");
        let forced_format = DocstringFormat::from_config(options.docstring_format.as_deref());
        Self {
            parser: Mutex::new(parser),
            options,
            forced_format,
        }
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &[&'static str] {
        &["py"]
    }

    fn parse(&self, path: &str, content: &str) -> Result<ParseOutput, ParseError> {
        let tree = {
            let mut parser = self.parser.lock().map_err(|_| ParseError::ParseFailed)?;
            parser.parse(content, None).ok_or(ParseError::ParseFailed)?
        };

        let mut walk = PyWalk {
            path,
            module_path: module_path_of(path),
            source: content,
            bytes: content.as_bytes(),
            opts: &self.options,
            forced_format: self.forced_format,
            out: ParseOutput::default(),
            scopes: Vec::new(),
            class_stack: Vec::new(),
            conditional_depth: 0,
            call_keys: HashMap::new(),
            dunder_all: None,
        };
        walk.dunder_all = walk.extract_dunder_all(tree.root_node());
        walk.visit(tree.root_node(), 0);
        walk.apply_visibility();
        walk.emit_dunder_all_exports();
        Ok(walk.out)
    }
}

struct Scope {
    name: String,
    symbol_id: String,
    is_async: bool,
}

struct PyWalk<'a> {
    path: &'a str,
    module_path: String,
    source: &'a str,
    bytes: &'a [u8],
    opts: &'a ParserOptions,
    forced_format: Option<DocstringFormat>,
    out: ParseOutput,
    scopes: Vec<Scope>,
    class_stack: Vec<String>,
    conditional_depth: u32,
    call_keys: HashMap<(String, String), usize>,
    dunder_all: Option<DunderAll>,
}

impl<'a> PyWalk<'a> {
    fn visit(&mut self, node: Node<'a>, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            return;
        }
        match node.kind() {
            "import_statement" | "import_from_statement" => self.handle_import(node),
            "decorated_definition" => self.handle_decorated(node, depth),
            "function_definition" => self.handle_function(node, depth, &[]),
            "class_definition" => self.handle_class(node, depth, &[]),
            "call" => self.handle_call(node, depth),
            "assignment" => self.handle_assignment(node, depth),
            "if_statement" => {
                if let Some(condition) = node.child_by_field_name("condition") {
                    self.visit(condition, depth + 1);
                }
                self.conditional_depth += 1;
                if let Some(consequence) = node.child_by_field_name("consequence") {
                    self.visit(consequence, depth + 1);
                }
                let mut cursor = node.walk();
                let alternatives: Vec<Node> = node
                    .named_children(&mut cursor)
                    .filter(|c| matches!(c.kind(), "elif_clause" | "else_clause"))
                    .collect();
                for alt in alternatives {
                    self.visit(alt, depth + 1);
                }
                self.conditional_depth -= 1;
            }
            "for_statement" | "while_statement" => {
                self.conditional_depth += 1;
                self.visit_children(node, depth);
                self.conditional_depth -= 1;
            }
            "except_clause" | "conditional_expression" => {
                self.conditional_depth += 1;
                self.visit_children(node, depth);
                self.conditional_depth -= 1;
            }
            "boolean_operator" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.visit(left, depth + 1);
                }
                self.conditional_depth += 1;
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right, depth + 1);
                }
                self.conditional_depth -= 1;
            }
            "identifier" => {
                self.add_reference(node, node_text(node, self.bytes), ReferenceKind::Read);
            }
            "attribute" => {
                // `obj.attr` reads the object; the attribute name is not an
                // independent symbol reference outside call position.
                if let Some(object) = node.child_by_field_name("object") {
                    self.visit(object, depth + 1);
                }
            }
            "string" | "comment" | "integer" | "float" => {}
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

    // -- imports and exports -------------------------------------------------

    fn handle_import(&mut self, node: Node<'a>) {
        let line = start_line(node);
        match node.kind() {
            "import_statement" => {
                // `import a.b, c as d` — one Import per module.
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => {
                            let source = node_text(child, self.bytes).to_string();
                            self.push_import(source, vec![], line);
                        }
                        "aliased_import" => {
                            let source = child
                                .child_by_field_name("name")
                                .map(|n| node_text(n, self.bytes).to_string())
                                .unwrap_or_default();
                            let alias = child
                                .child_by_field_name("alias")
                                .map(|n| node_text(n, self.bytes).to_string());
                            let specifiers = vec![ImportSpecifier {
                                name: source.clone(),
                                alias,
                                is_namespace: true,
                                ..ImportSpecifier::default()
                            }];
                            self.push_import(source, specifiers, line);
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                let source = node
                    .child_by_field_name("module_name")
                    .map(|n| node_text(n, self.bytes).to_string())
                    .unwrap_or_default();
                let mut specifiers = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    // The module_name field also matches dotted_name; skip it.
                    if Some(child) == node.child_by_field_name("module_name") {
                        continue;
                    }
                    match child.kind() {
                        "dotted_name" => specifiers.push(ImportSpecifier {
                            name: node_text(child, self.bytes).to_string(),
                            ..ImportSpecifier::default()
                        }),
                        "aliased_import" => {
                            let name = child
                                .child_by_field_name("name")
                                .map(|n| node_text(n, self.bytes).to_string())
                                .unwrap_or_default();
                            let alias = child
                                .child_by_field_name("alias")
                                .map(|n| node_text(n, self.bytes).to_string());
                            specifiers.push(ImportSpecifier {
                                name,
                                alias,
                                ..ImportSpecifier::default()
                            });
                        }
                        "wildcard_import" => specifiers.push(ImportSpecifier {
                            name: "*".into(),
                            is_namespace: true,
                            ..ImportSpecifier::default()
                        }),
                        _ => {}
                    }
                }
                self.push_import(source, specifiers, line);
            }
            _ => {}
        }
    }

    fn push_import(&mut self, source: String, specifiers: Vec<ImportSpecifier>, line: u32) {
        for spec in &specifiers {
            if spec.name == "*" {
                continue;
            }
            self.out.references.push(SymbolReference {
                id: 0,
                symbol_id: None,
                symbol_name: spec.name.clone(),
                referencing_file: self.path.to_string(),
                referencing_symbol_id: None,
                referencing_symbol_name: self.scopes.last().map(|s| s.name.clone()),
                line,
                column: 0,
                context: line_context(self.source, line),
                kind: ReferenceKind::Import,
            });
        }
        self.out.imports.push(Import {
            source,
            specifiers,
            is_type_only: false,
            line,
            resolved_path: None,
            is_external: false,
            is_builtin: false,
        });
    }

    /// Module-level `__all__ = [...]` assignment, if present.
    fn extract_dunder_all(&self, root: Node<'a>) -> Option<DunderAll> {
        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            if statement.kind() != "expression_statement" {
                continue;
            }
            let Some(assignment) = statement.named_child(0) else {
                continue;
            };
            if assignment.kind() != "assignment" {
                continue;
            }
            let Some(left) = assignment.child_by_field_name("left") else {
                continue;
            };
            if node_text(left, self.bytes) != "__all__" {
                continue;
            }
            let Some(right) = assignment.child_by_field_name("right") else {
                return Some(DunderAll::Dynamic);
            };
            if right.kind() != "list" {
                return Some(DunderAll::Dynamic);
            }
            let mut names = Vec::new();
            let mut list_cursor = right.walk();
            for item in right.named_children(&mut list_cursor) {
                if item.kind() != "string" {
                    return Some(DunderAll::Dynamic);
                }
                let name = node_text(item, self.bytes)
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string();
                names.push(name);
            }
            return Some(DunderAll::Literal(names));
        }
        None
    }

    fn emit_dunder_all_exports(&mut self) {
        let Some(DunderAll::Literal(names)) = self.dunder_all.clone() else {
            return;
        };
        for name in names {
            let kind = self
                .out
                .symbols
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.kind.as_str().to_string())
                .unwrap_or_else(|| "name".into());
            self.out.exports.push(Export {
                name,
                kind,
                line: 0,
                is_reexport: false,
                reexport_source: None,
            });
        }
    }

    // -- definitions ---------------------------------------------------------

    fn handle_decorated(&mut self, node: Node<'a>, depth: usize) {
        let mut decorators = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "decorator" {
                decorators.push(node_text(child, self.bytes).to_string());
            }
        }
        let Some(definition) = node.child_by_field_name("definition") else {
            return;
        };
        match definition.kind() {
            "function_definition" => self.handle_function(definition, depth, &decorators),
            "class_definition" => self.handle_class(definition, depth, &decorators),
            _ => self.visit(definition, depth + 1),
        }
    }

    fn handle_function(&mut self, node: Node<'a>, depth: usize, decorators: &[String]) {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, self.bytes).to_string())
            .unwrap_or_default();
        if name.is_empty() {
            return;
        }
        let in_class = !self.class_stack.is_empty() && self.scopes.is_empty();
        let fn_depth = self.scopes.len();
        let excluded = (is_python_private(&name) && !self.opts.include_private)
            || fn_depth >= MAX_FUNCTION_NESTING;
        if excluded {
            if let Some(body) = node.child_by_field_name("body") {
                self.visit(body, depth + 1);
            }
            return;
        }

        let is_async = self.has_keyword_child(node, "async");
        let kind = if in_class && name == "__init__" {
            SymbolKind::Constructor
        } else if in_class {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };

        let has_decorator = |suffix: &str| {
            decorators
                .iter()
                .any(|d| d.trim_start_matches('@').trim() == suffix)
        };

        let parent = if in_class {
            self.class_stack.last().cloned()
        } else {
            self.scopes.last().map(|s| s.name.clone())
        };
        let nested = fn_depth > 0;

        let data = FunctionData {
            params: self.extract_params(node),
            return_type: node
                .child_by_field_name("return_type")
                .map(|t| node_text(t, self.bytes).to_string()),
            type_params: vec![],
            modifiers: FunctionModifiers {
                exported: !is_python_private(&name),
                is_async,
                is_generator: false,
                is_static: has_decorator("staticmethod") || has_decorator("classmethod"),
                is_abstract: has_decorator("abstractmethod")
                    || has_decorator("abc.abstractmethod"),
                visibility: Some(
                    if is_python_private(&name) {
                        "private"
                    } else {
                        "public"
                    }
                    .into(),
                ),
                callback_context: None,
            },
            docs: self.docstring_of(node),
            parent_class: if in_class {
                self.class_stack.last().cloned()
            } else {
                None
            },
            local_name: if nested { Some(name.clone()) } else { None },
            decorators: decorators.to_vec(),
        };

        self.collect_annotation_refs(node);

        let symbol_id = self.push_symbol(node, &name, kind, parent.as_deref(), SymbolData::Function(data));

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

    fn handle_class(&mut self, node: Node<'a>, depth: usize, decorators: &[String]) {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, self.bytes).to_string())
            .unwrap_or_default();
        if name.is_empty() || (is_python_private(&name) && !self.opts.include_private) {
            return;
        }
        let class_id = Symbol::make_id(self.path, &name, SymbolKind::Class, start_line(node));

        let mut extends = None;
        let mut implements = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for base in superclasses.named_children(&mut cursor) {
                match base.kind() {
                    "identifier" | "attribute" => {
                        let base_name = node_text(base, self.bytes).to_string();
                        let kind = if extends.is_none() {
                            extends = Some(base_name.clone());
                            TypeRelationKind::Extends
                        } else {
                            implements.push(base_name.clone());
                            TypeRelationKind::Extends
                        };
                        self.out.type_relationships.push(TypeRelationship {
                            id: 0,
                            source_symbol_id: class_id.clone(),
                            source_name: name.clone(),
                            target_symbol_id: None,
                            target_name: base_name,
                            kind,
                        });
                    }
                    "keyword_argument" => {
                        let key = base
                            .child_by_field_name("name")
                            .map(|n| node_text(n, self.bytes))
                            .unwrap_or("");
                        if key == "metaclass" {
                            let target = base
                                .child_by_field_name("value")
                                .map(|n| node_text(n, self.bytes).to_string())
                                .unwrap_or_default();
                            if !target.is_empty() {
                                implements.push(target.clone());
                                self.out.type_relationships.push(TypeRelationship {
                                    id: 0,
                                    source_symbol_id: class_id.clone(),
                                    source_name: name.clone(),
                                    target_symbol_id: None,
                                    target_name: target,
                                    kind: TypeRelationKind::Implements,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        let docs = self.docstring_of(node);
        let symbols_before = self.out.symbols.len();

        self.class_stack.push(name.clone());
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_children(body, depth);
        }
        self.class_stack.pop();

        // Methods registered while walking the body.
        let methods: Vec<String> = self.out.symbols[symbols_before..]
            .iter()
            .filter(|s| {
                matches!(s.kind, SymbolKind::Method | SymbolKind::Constructor)
                    && match &s.data {
                        SymbolData::Function(f) => f.parent_class.as_deref() == Some(&name),
                        _ => false,
                    }
            })
            .map(|s| s.name.clone())
            .collect();

        let data = ClassData {
            methods,
            properties: Vec::<PropertyInfo>::new(),
            extends,
            implements,
            type_params: vec![],
            is_abstract: decorators
                .iter()
                .any(|d| d.contains("abstractmethod") || d.contains("ABCMeta")),
            exported: !is_python_private(&name),
            docs,
            decorators: decorators.to_vec(),
        };
        self.push_symbol(node, &name, SymbolKind::Class, None, SymbolData::Class(data));
    }

    fn extract_params(&mut self, node: Node<'a>) -> Vec<lazyload_core::types::Param> {
        let Some(parameters) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut params = Vec::new();
        let mut cursor = parameters.walk();
        for child in parameters.named_children(&mut cursor) {
            let param = match child.kind() {
                "identifier" => lazyload_core::types::Param {
                    name: node_text(child, self.bytes).to_string(),
                    ..Default::default()
                },
                "typed_parameter" => lazyload_core::types::Param {
                    name: child
                        .named_child(0)
                        .map(|n| node_text(n, self.bytes).to_string())
                        .unwrap_or_default(),
                    type_name: child
                        .child_by_field_name("type")
                        .map(|t| node_text(t, self.bytes).to_string()),
                    ..Default::default()
                },
                "default_parameter" => lazyload_core::types::Param {
                    name: child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, self.bytes).to_string())
                        .unwrap_or_default(),
                    default_value: child
                        .child_by_field_name("value")
                        .map(|v| node_text(v, self.bytes).to_string()),
                    optional: true,
                    ..Default::default()
                },
                "typed_default_parameter" => lazyload_core::types::Param {
                    name: child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, self.bytes).to_string())
                        .unwrap_or_default(),
                    type_name: child
                        .child_by_field_name("type")
                        .map(|t| node_text(t, self.bytes).to_string()),
                    default_value: child
                        .child_by_field_name("value")
                        .map(|v| node_text(v, self.bytes).to_string()),
                    optional: true,
                    ..Default::default()
                },
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    lazyload_core::types::Param {
                        name: child
                            .named_child(0)
                            .map(|n| node_text(n, self.bytes).to_string())
                            .unwrap_or_default(),
                        rest: true,
                        ..Default::default()
                    }
                }
                _ => continue,
            };
            if !param.name.is_empty() && param.name != "self" && param.name != "cls" {
                params.push(param);
            }
        }
        params
    }

    /// Type annotations contribute `type` references.
    fn collect_annotation_refs(&mut self, node: Node<'a>) {
        let mut targets: Vec<Node> = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            for child in parameters.named_children(&mut cursor) {
                if let Some(t) = child.child_by_field_name("type") {
                    targets.push(t);
                }
            }
        }
        if let Some(ret) = node.child_by_field_name("return_type") {
            targets.push(ret);
        }
        for target in targets {
            self.collect_type_identifiers(target);
        }
    }

    fn collect_type_identifiers(&mut self, node: Node<'a>) {
        if node.kind() == "identifier" {
            let name = node_text(node, self.bytes).to_string();
            self.add_reference(node, &name, ReferenceKind::Type);
            return;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.collect_type_identifiers(child);
        }
    }

    fn docstring_of(&self, node: Node<'a>) -> Option<DocBlock> {
        if !self.opts.extract_documentation {
            return None;
        }
        let body = node.child_by_field_name("body")?;
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0)?;
        if string.kind() != "string" {
            return None;
        }
        Some(parse_docstring(
            node_text(string, self.bytes),
            self.forced_format,
        ))
    }

    // -- expressions ---------------------------------------------------------

    fn handle_call(&mut self, node: Node<'a>, depth: usize) {
        let Some(function) = node.child_by_field_name("function") else {
            self.visit_children(node, depth);
            return;
        };
        let callee = match function.kind() {
            "identifier" => node_text(function, self.bytes).to_string(),
            "attribute" => {
                if let Some(object) = function.child_by_field_name("object") {
                    self.visit(object, depth + 1);
                }
                function
                    .child_by_field_name("attribute")
                    .map(|a| node_text(a, self.bytes).to_string())
                    .unwrap_or_default()
            }
            _ => {
                self.visit(function, depth + 1);
                String::new()
            }
        };

        if !callee.is_empty() {
            self.add_reference(node, &callee, ReferenceKind::Call);
            self.add_call_edge(&callee);
        }

        if let Some(arguments) = node.child_by_field_name("arguments") {
            self.visit_children(arguments, depth);
        }
    }

    fn handle_assignment(&mut self, node: Node<'a>, depth: usize) {
        if let Some(left) = node.child_by_field_name("left") {
            if left.kind() == "identifier" {
                let name = node_text(left, self.bytes).to_string();
                if name != "__all__" {
                    self.add_reference(left, &name, ReferenceKind::Write);
                    self.maybe_module_variable(node, &name);
                }
            } else {
                self.visit(left, depth + 1);
            }
        }
        if let Some(type_node) = node.child_by_field_name("type") {
            self.collect_type_identifiers(type_node);
        }
        if let Some(right) = node.child_by_field_name("right") {
            self.visit(right, depth + 1);
        }
    }

    /// Module-level assignments of constant-cased names become variable
    /// symbols, mirroring what the TS side does for top-level declarations.
    fn maybe_module_variable(&mut self, assignment: Node<'a>, name: &str) {
        if !self.scopes.is_empty() || !self.class_stack.is_empty() {
            return;
        }
        if is_python_private(name) && !self.opts.include_private {
            return;
        }
        // Only first assignment wins; rebinding is just a write.
        if self.out.symbols.iter().any(|s| s.name == name) {
            return;
        }
        let declared_type = assignment
            .child_by_field_name("type")
            .map(|t| node_text(t, self.bytes).to_string());
        let initializer = assignment.child_by_field_name("right").map(|v| {
            match v.kind() {
                "string" | "integer" | "float" | "true" | "false" | "none" => "literal",
                "list" | "list_comprehension" => "array",
                "dictionary" | "dictionary_comprehension" => "object",
                "call" => "call",
                "lambda" => "function",
                _ => "expression",
            }
            .to_string()
        });
        let data = VariableData {
            declared_type,
            initializer_kind: initializer,
            exported: !is_python_private(name),
        };
        self.push_symbol(
            assignment,
            name,
            SymbolKind::Variable,
            None,
            SymbolData::Variable(data),
        );
    }

    // -- bookkeeping ---------------------------------------------------------

    fn has_keyword_child(&self, node: Node, keyword: &str) -> bool {
        (0..node.child_count()).any(|i| {
            node.child(i)
                .map(|c| c.kind() == keyword)
                .unwrap_or(false)
        })
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
            language: Language::Python,
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
        if name.is_empty() || name == "self" || name == "cls" {
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

    /// `__all__` overrides the underscore visibility rule.
    fn apply_visibility(&mut self) {
        let Some(DunderAll::Literal(names)) = &self.dunder_all else {
            return;
        };
        for symbol in &mut self.out.symbols {
            let public = names.contains(&symbol.name);
            match &mut symbol.data {
                SymbolData::Function(f) => f.modifiers.exported = public,
                SymbolData::Class(c) => c.exported = public,
                SymbolData::Variable(v) => v.exported = public,
                _ => {}
            }
        }
    }
}
