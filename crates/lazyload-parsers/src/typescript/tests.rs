use super::*;
use crate::parser::{LanguageParser, ParserOptions};
use lazyload_core::types::{ReferenceKind, SymbolData, SymbolKind};

fn parse(source: &str) -> ParseOutput {
    let parser = TypeScriptParser::new(ParserOptions::default());
    parser.parse("src/app.ts", source).unwrap()
}

fn find<'a>(out: &'a ParseOutput, name: &str) -> &'a lazyload_core::types::Symbol {
    out.symbols
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("symbol {name} not found"))
}

#[test]
fn test_function_declaration() {
    let out = parse("export function greet(name: string): string {\n  return `hi ${name}`;\n}\n");
    let sym = find(&out, "greet");
    assert_eq!(sym.kind, SymbolKind::Function);
    assert_eq!(sym.location.start_line, 1);
    assert_eq!(sym.qualified_name, "src/app#greet");
    let SymbolData::Function(f) = &sym.data else {
        panic!("expected function data");
    };
    assert!(f.modifiers.exported);
    assert_eq!(f.params.len(), 1);
    assert_eq!(f.params[0].name, "name");
    assert_eq!(f.params[0].type_name.as_deref(), Some("string"));
    assert_eq!(f.return_type.as_deref(), Some("string"));
}

#[test]
fn test_async_arrow_bound_to_identifier() {
    let out = parse("const fetchUser = async (id: string): Promise<User> => {\n  return load(id);\n};\n");
    let sym = find(&out, "fetchUser");
    assert_eq!(sym.kind, SymbolKind::Function);
    let SymbolData::Function(f) = &sym.data else {
        panic!("expected function data");
    };
    assert!(f.modifiers.is_async);
    assert_eq!(f.return_type.as_deref(), Some("Promise<User>"));
}

#[test]
fn test_jsdoc_extraction() {
    let out = parse(
        "/**\n * Greets a user.\n * @param name who to greet\n * @returns the greeting\n */\nexport function greet(name: string): string { return name; }\n",
    );
    let sym = find(&out, "greet");
    let SymbolData::Function(f) = &sym.data else {
        panic!("expected function data");
    };
    let docs = f.docs.as_ref().expect("jsdoc should be extracted");
    assert_eq!(docs.description.as_deref(), Some("Greets a user."));
    assert_eq!(docs.params.len(), 1);
    assert_eq!(docs.returns.as_deref(), Some("the greeting"));
}

#[test]
fn test_class_with_methods_and_heritage() {
    let out = parse(
        "export class Admin extends User implements Auditable {\n  role: string;\n  constructor(name: string) { super(name); }\n  promote(): void {}\n  static count(): number { return 0; }\n}\n",
    );
    let class_sym = find(&out, "Admin");
    assert_eq!(class_sym.kind, SymbolKind::Class);
    let SymbolData::Class(c) = &class_sym.data else {
        panic!("expected class data");
    };
    assert!(c.exported);
    assert_eq!(c.extends.as_deref(), Some("User"));
    assert_eq!(c.implements, vec!["Auditable"]);
    assert!(c.methods.contains(&"promote".to_string()));
    assert_eq!(c.properties.len(), 1);
    assert_eq!(c.properties[0].name, "role");

    let ctor = find(&out, "constructor");
    assert_eq!(ctor.kind, SymbolKind::Constructor);
    let promote = find(&out, "promote");
    assert_eq!(promote.kind, SymbolKind::Method);
    assert_eq!(promote.qualified_name, "src/app#Admin.promote");
    let SymbolData::Function(f) = &promote.data else {
        panic!("expected function data");
    };
    assert_eq!(f.parent_class.as_deref(), Some("Admin"));

    let statics = find(&out, "count");
    let SymbolData::Function(f) = &statics.data else {
        panic!("expected function data");
    };
    assert!(f.modifiers.is_static);

    // extends + implements edges
    assert_eq!(out.type_relationships.len(), 2);
    assert!(out
        .type_relationships
        .iter()
        .any(|r| r.target_name == "User" && r.kind == lazyload_core::types::TypeRelationKind::Extends));
}

#[test]
fn test_interface_and_type_alias() {
    let out = parse(
        "export interface Repo extends Base {\n  find(id: string): User;\n  name: string;\n}\nexport type UserId = string | number;\n",
    );
    let interface = find(&out, "Repo");
    assert_eq!(interface.kind, SymbolKind::Interface);
    let SymbolData::Interface(i) = &interface.data else {
        panic!("expected interface data");
    };
    assert_eq!(i.extends, vec!["Base"]);
    assert!(i.methods.contains(&"find".to_string()));
    assert_eq!(i.properties.len(), 1);

    let alias = find(&out, "UserId");
    assert_eq!(alias.kind, SymbolKind::TypeAlias);
    let SymbolData::TypeAlias(t) = &alias.data else {
        panic!("expected alias data");
    };
    assert_eq!(t.aliased, "string | number");
}

#[test]
fn test_imports_and_exports() {
    let out = parse(
        "import { load, save as persist } from './storage';\nimport type { User } from './types';\nimport * as utils from './utils';\nimport defaultThing from 'pkg';\nexport { helper };\nexport * from './reexports';\n",
    );
    assert_eq!(out.imports.len(), 4);
    let storage = &out.imports[0];
    assert_eq!(storage.source, "./storage");
    assert_eq!(storage.specifiers.len(), 2);
    assert_eq!(storage.specifiers[1].alias.as_deref(), Some("persist"));
    assert!(out.imports[1].is_type_only);
    assert!(out.imports[2].specifiers[0].is_namespace);
    assert!(out.imports[3].specifiers[0].is_default);

    assert!(out
        .exports
        .iter()
        .any(|e| e.name == "helper" && e.kind == "named"));
    assert!(out
        .exports
        .iter()
        .any(|e| e.name == "*" && e.is_reexport && e.reexport_source.as_deref() == Some("./reexports")));

    // Import references are emitted per specifier.
    let import_refs: Vec<_> = out
        .references
        .iter()
        .filter(|r| r.kind == ReferenceKind::Import)
        .collect();
    assert!(import_refs.iter().any(|r| r.symbol_name == "load"));
    assert!(import_refs.iter().any(|r| r.symbol_name == "User"));
}

#[test]
fn test_call_edges_coalesce() {
    let out = parse(
        "function a() {\n  b();\n  b();\n  if (x) { c(); }\n}\nfunction b() {}\nfunction c() {}\n",
    );
    let edges: Vec<_> = out.calls.iter().filter(|c| c.caller_name == "a").collect();
    assert_eq!(edges.len(), 2);
    let to_b = edges.iter().find(|e| e.callee_name == "b").unwrap();
    assert_eq!(to_b.call_count, 2);
    assert!(!to_b.is_conditional);
    let to_c = edges.iter().find(|e| e.callee_name == "c").unwrap();
    assert!(to_c.is_conditional);
}

#[test]
fn test_async_caller_flag() {
    let out = parse("async function run() {\n  await step();\n}\nfunction step() {}\n");
    let edge = out.calls.iter().find(|c| c.caller_name == "run").unwrap();
    assert!(edge.is_async);
}

#[test]
fn test_callback_symbols() {
    let out = parse(
        "describe('user flow', () => {\n  it('works', async () => {\n    run();\n  });\n});\nitems.map((x) => x * 2);\n",
    );
    let describe_cb = find(&out, "describe callback");
    assert_eq!(describe_cb.kind, SymbolKind::Callback);
    let SymbolData::Function(f) = &describe_cb.data else {
        panic!("expected function data");
    };
    assert_eq!(f.modifiers.callback_context.as_deref(), Some("describe"));

    let it_cb = find(&out, "it callback");
    let SymbolData::Function(f) = &it_cb.data else {
        panic!("expected function data");
    };
    assert!(f.modifiers.is_async);

    // Array-method callbacks are excluded.
    assert!(!out.symbols.iter().any(|s| s.name == "map callback"));

    // Calls inside the callback attribute to the callback symbol.
    let edge = out.calls.iter().find(|c| c.callee_name == "run").unwrap();
    assert_eq!(edge.caller_name, "it callback");
}

#[test]
fn test_event_callback_context() {
    let out = parse("server.on('close', () => {\n  cleanup();\n});\n");
    let cb = find(&out, "on:close callback");
    let SymbolData::Function(f) = &cb.data else {
        panic!("expected function data");
    };
    assert_eq!(f.modifiers.callback_context.as_deref(), Some("on:close"));
}

#[test]
fn test_nesting_depth_cap() {
    let out = parse(
        "function l1() {\n  function l2() {\n    function l3() {\n      function l4() {}\n    }\n  }\n}\n",
    );
    assert!(out.symbols.iter().any(|s| s.name == "l1"));
    assert!(out.symbols.iter().any(|s| s.name == "l2"));
    assert!(out.symbols.iter().any(|s| s.name == "l3"));
    assert!(!out.symbols.iter().any(|s| s.name == "l4"));
    let l2 = find(&out, "l2");
    let SymbolData::Function(f) = &l2.data else {
        panic!("expected function data");
    };
    assert_eq!(f.local_name.as_deref(), Some("l2"));
}

#[test]
fn test_private_names_excluded_by_default() {
    let out = parse("function _hidden() {}\nfunction visible() {}\n");
    assert!(!out.symbols.iter().any(|s| s.name == "_hidden"));
    assert!(out.symbols.iter().any(|s| s.name == "visible"));

    let parser = TypeScriptParser::new(ParserOptions {
        include_private: true,
        ..ParserOptions::default()
    });
    let out = parser.parse("src/app.ts", "function _hidden() {}\n").unwrap();
    assert!(out.symbols.iter().any(|s| s.name == "_hidden"));
}

#[test]
fn test_variable_symbols() {
    let out = parse("export const LIMIT: number = 10;\nconst cache = new Map();\n");
    let limit = find(&out, "LIMIT");
    assert_eq!(limit.kind, SymbolKind::Variable);
    let SymbolData::Variable(v) = &limit.data else {
        panic!("expected variable data");
    };
    assert!(v.exported);
    assert_eq!(v.declared_type.as_deref(), Some("number"));
    assert_eq!(v.initializer_kind.as_deref(), Some("literal"));

    let cache = find(&out, "cache");
    let SymbolData::Variable(v) = &cache.data else {
        panic!("expected variable data");
    };
    assert_eq!(v.initializer_kind.as_deref(), Some("new"));
}

#[test]
fn test_enum_recognised() {
    let out = parse("export enum Color { Red, Green }\n");
    let color = find(&out, "Color");
    assert_eq!(color.kind, SymbolKind::Variable);
    let SymbolData::Variable(v) = &color.data else {
        panic!("expected variable data");
    };
    assert_eq!(v.initializer_kind.as_deref(), Some("enum"));
    assert!(v.exported);
}

#[test]
fn test_write_reference() {
    let out = parse("let total = 0;\nfunction bump() {\n  total = total + 1;\n}\n");
    assert!(out
        .references
        .iter()
        .any(|r| r.symbol_name == "total" && r.kind == ReferenceKind::Write));
    assert!(out
        .references
        .iter()
        .any(|r| r.symbol_name == "total" && r.kind == ReferenceKind::Read));
}

#[test]
fn test_reference_context_and_enclosing() {
    let out = parse("function outer() {\n  inner();\n}\n");
    let call_ref = out
        .references
        .iter()
        .find(|r| r.symbol_name == "inner" && r.kind == ReferenceKind::Call)
        .unwrap();
    assert_eq!(call_ref.referencing_symbol_name.as_deref(), Some("outer"));
    assert_eq!(call_ref.context, "inner();");
    assert_eq!(call_ref.line, 2);
}

#[test]
fn test_named_export_marks_symbol_exported() {
    let out = parse("function helper() {}\nexport { helper };\n");
    let helper = find(&out, "helper");
    assert!(helper.is_exported());
}

#[test]
fn test_parse_garbage_still_returns() {
    let parser = TypeScriptParser::new(ParserOptions::default());
    let out = parser.parse("src/broken.ts", "function ) {{{ ???").unwrap();
    // Tree-sitter recovers; whatever was extracted is returned without error.
    assert!(out.calls.is_empty());
}
