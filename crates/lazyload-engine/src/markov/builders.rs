use std::collections::{BTreeMap, HashMap, HashSet};

use lazyload_core::config::MarkovConfig;
use lazyload_core::store::IndexStore;
use lazyload_core::typeinfo::parse_type;
use lazyload_core::types::{ChainKind, StoreError};

/// Rebuild every enabled chain from the current index contents.
pub fn build_all_chains(
    store: &mut dyn IndexStore,
    config: &MarkovConfig,
) -> Result<(), StoreError> {
    for chain in &config.chain_types {
        let transitions = match chain {
            ChainKind::CallFlow => build_call_flow(store),
            ChainKind::Cooccurrence => build_cooccurrence(store, &config.cooccurrence_scope),
            ChainKind::TypeAffinity => build_type_affinity(store),
            ChainKind::ImportCluster => build_import_cluster(store),
        };
        store.rebuild_chain(*chain, &transitions)?;
    }
    Ok(())
}

/// State = function symbol ID; weight = call count. Edges with unresolved
/// callees (external functions) are skipped.
fn build_call_flow(store: &dyn IndexStore) -> Vec<(String, String, u32)> {
    store
        .resolved_call_edges()
        .into_iter()
        .filter_map(|edge| {
            edge.callee_symbol_id
                .map(|callee| (edge.caller_symbol_id, callee, edge.call_count))
        })
        .collect()
}

/// State = symbol ID. Every pair of symbols referenced within the same scope
/// (file by default, enclosing function when configured) gains +1 in both
/// directions.
fn build_cooccurrence(store: &dyn IndexStore, scope: &str) -> Vec<(String, String, u32)> {
    let by_function = scope == "function";
    let mut scopes: HashMap<String, HashSet<String>> = HashMap::new();
    for (file, referencing_symbol, symbol_id) in store.resolved_reference_rows() {
        let key = if by_function {
            match referencing_symbol {
                Some(id) => id,
                // References outside any function fall back to file scope.
                None => file,
            }
        } else {
            file
        };
        scopes.entry(key).or_default().insert(symbol_id);
    }

    let mut counts: BTreeMap<(String, String), u32> = BTreeMap::new();
    for members in scopes.values() {
        let mut sorted: Vec<&String> = members.iter().collect();
        sorted.sort();
        for (i, a) in sorted.iter().enumerate() {
            for b in sorted.iter().skip(i + 1) {
                *counts
                    .entry(((*a).clone(), (*b).clone()))
                    .or_default() += 1;
                *counts
                    .entry(((*b).clone(), (*a).clone()))
                    .or_default() += 1;
            }
        }
    }

    counts
        .into_iter()
        .map(|((from, to), count)| (from, to, count))
        .collect()
}

/// State = normalized type base name. Types co-appearing in one function
/// signature (params + return) are affine to each other.
fn build_type_affinity(store: &dyn IndexStore) -> Vec<(String, String, u32)> {
    let mut by_symbol: HashMap<String, HashSet<String>> = HashMap::new();
    for (symbol_id, language, _slot, raw_type) in store.type_slot_rows() {
        if let Some(parsed) = parse_type(&raw_type, language) {
            by_symbol.entry(symbol_id).or_default().insert(parsed.base);
        }
    }

    let mut counts: BTreeMap<(String, String), u32> = BTreeMap::new();
    for bases in by_symbol.values() {
        let mut sorted: Vec<&String> = bases.iter().collect();
        sorted.sort();
        for (i, a) in sorted.iter().enumerate() {
            for b in sorted.iter().skip(i + 1) {
                *counts
                    .entry(((*a).clone(), (*b).clone()))
                    .or_default() += 1;
                *counts
                    .entry(((*b).clone(), (*a).clone()))
                    .or_default() += 1;
            }
        }
    }

    counts
        .into_iter()
        .map(|((from, to), count)| (from, to, count))
        .collect()
}

/// State = file path. Edge weight = number of import targets two files share.
fn build_import_cluster(store: &dyn IndexStore) -> Vec<(String, String, u32)> {
    let mut by_target: HashMap<String, HashSet<String>> = HashMap::new();
    for (file, target) in store.import_target_rows() {
        by_target.entry(target).or_default().insert(file);
    }

    let mut counts: BTreeMap<(String, String), u32> = BTreeMap::new();
    for files in by_target.values() {
        let mut sorted: Vec<&String> = files.iter().collect();
        sorted.sort();
        for (i, a) in sorted.iter().enumerate() {
            for b in sorted.iter().skip(i + 1) {
                *counts
                    .entry(((*a).clone(), (*b).clone()))
                    .or_default() += 1;
                *counts
                    .entry(((*b).clone(), (*a).clone()))
                    .or_default() += 1;
            }
        }
    }

    counts
        .into_iter()
        .map(|((from, to), count)| (from, to, count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyload_core::sqlite::SqliteIndexStore;
    use lazyload_core::types::{
        CallEdge, FileIndex, FileRecord, FunctionData, FunctionModifiers, Import, Language,
        Location, ParseStatus, ReferenceKind, Symbol, SymbolData, SymbolKind, SymbolReference,
    };

    fn file_record(path: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            language: Language::TypeScript,
            checksum: format!("c-{}", path),
            mtime_ms: 0,
            line_count: 1,
            byte_size: 1,
            parse_status: ParseStatus::Complete,
            warnings: vec![],
        }
    }

    fn function(path: &str, name: &str, line: u32) -> Symbol {
        Symbol {
            id: Symbol::make_id(path, name, SymbolKind::Function, line),
            name: name.to_string(),
            qualified_name: format!("{}#{}", path, name),
            kind: SymbolKind::Function,
            file_path: path.to_string(),
            language: Language::TypeScript,
            location: Location {
                start_line: line,
                end_line: line,
                start_column: 0,
                end_column: 0,
            },
            data: SymbolData::Function(FunctionData {
                modifiers: FunctionModifiers {
                    exported: true,
                    ..FunctionModifiers::default()
                },
                ..FunctionData::default()
            }),
        }
    }

    fn call(path: &str, caller: &str, caller_line: u32, callee: &str, count: u32) -> CallEdge {
        CallEdge {
            id: 0,
            caller_symbol_id: Symbol::make_id(path, caller, SymbolKind::Function, caller_line),
            caller_name: caller.to_string(),
            callee_symbol_id: None,
            callee_name: callee.to_string(),
            call_count: count,
            is_async: false,
            is_conditional: false,
        }
    }

    fn reference(path: &str, name: &str, line: u32) -> SymbolReference {
        SymbolReference {
            id: 0,
            symbol_id: None,
            symbol_name: name.to_string(),
            referencing_file: path.to_string(),
            referencing_symbol_id: None,
            referencing_symbol_name: None,
            line,
            column: 0,
            context: String::new(),
            kind: ReferenceKind::Call,
        }
    }

    #[test]
    fn test_call_flow_normalization() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        store
            .put_file(&FileIndex {
                file: file_record("a.ts"),
                symbols: vec![
                    function("a.ts", "a", 1),
                    function("a.ts", "b", 5),
                    function("a.ts", "c", 9),
                ],
                imports: vec![],
                exports: vec![],
                references: vec![],
                calls: vec![
                    call("a.ts", "a", 1, "b", 3),
                    call("a.ts", "a", 1, "c", 1),
                    call("a.ts", "a", 1, "external", 7),
                ],
                type_relationships: vec![],
            })
            .unwrap();
        store.resolve_symbol_references().unwrap();

        let config = MarkovConfig::default();
        build_all_chains(&mut store, &config).unwrap();

        let a_id = Symbol::make_id("a.ts", "a", SymbolKind::Function, 1);
        let transitions = store.get_transitions(ChainKind::CallFlow, &a_id);
        // The unresolved external edge is skipped.
        assert_eq!(transitions.len(), 2);
        let total: f64 = transitions.iter().map(|t| t.probability).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((transitions[0].probability - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_cooccurrence_is_symmetric() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        store
            .put_file(&FileIndex {
                file: file_record("a.ts"),
                symbols: vec![function("a.ts", "x", 1), function("a.ts", "y", 5)],
                imports: vec![],
                exports: vec![],
                references: vec![reference("a.ts", "x", 2), reference("a.ts", "y", 3)],
                calls: vec![],
                type_relationships: vec![],
            })
            .unwrap();
        store.resolve_symbol_references().unwrap();

        build_all_chains(&mut store, &MarkovConfig::default()).unwrap();

        let x_id = Symbol::make_id("a.ts", "x", SymbolKind::Function, 1);
        let y_id = Symbol::make_id("a.ts", "y", SymbolKind::Function, 5);
        let from_x = store.get_transitions(ChainKind::Cooccurrence, &x_id);
        let from_y = store.get_transitions(ChainKind::Cooccurrence, &y_id);
        assert_eq!(from_x.len(), 1);
        assert_eq!(from_x[0].to_state, y_id);
        assert_eq!(from_y.len(), 1);
        assert_eq!(from_y[0].to_state, x_id);
    }

    #[test]
    fn test_type_affinity_uses_base_names() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let mut sym = function("a.ts", "findUser", 1);
        if let SymbolData::Function(f) = &mut sym.data {
            f.params.push(lazyload_core::types::Param {
                name: "id".into(),
                type_name: Some("string".into()),
                ..Default::default()
            });
            f.return_type = Some("Promise<User>".into());
        }
        store
            .put_file(&FileIndex {
                file: file_record("a.ts"),
                symbols: vec![sym],
                imports: vec![],
                exports: vec![],
                references: vec![],
                calls: vec![],
                type_relationships: vec![],
            })
            .unwrap();

        build_all_chains(&mut store, &MarkovConfig::default()).unwrap();

        let transitions = store.get_transitions(ChainKind::TypeAffinity, "String");
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].to_state, "Promise");
    }

    #[test]
    fn test_import_cluster_links_files_sharing_targets() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        for path in ["a.ts", "b.ts", "c.ts"] {
            let shared = Import {
                source: "./common".into(),
                resolved_path: Some("common.ts".into()),
                line: 1,
                ..Import::default()
            };
            let mut imports = vec![shared];
            if path == "c.ts" {
                imports = vec![Import {
                    source: "./elsewhere".into(),
                    resolved_path: Some("elsewhere.ts".into()),
                    line: 1,
                    ..Import::default()
                }];
            }
            store
                .put_file(&FileIndex {
                    file: file_record(path),
                    symbols: vec![],
                    imports,
                    exports: vec![],
                    references: vec![],
                    calls: vec![],
                    type_relationships: vec![],
                })
                .unwrap();
        }

        build_all_chains(&mut store, &MarkovConfig::default()).unwrap();

        let from_a = store.get_transitions(ChainKind::ImportCluster, "a.ts");
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].to_state, "b.ts");
        assert!(store
            .get_transitions(ChainKind::ImportCluster, "c.ts")
            .is_empty());
    }

    #[test]
    fn test_function_scope_cooccurrence() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let mut r1 = reference("a.ts", "x", 2);
        r1.referencing_symbol_name = Some("a".into());
        let mut r2 = reference("a.ts", "y", 3);
        r2.referencing_symbol_name = Some("other".into());
        store
            .put_file(&FileIndex {
                file: file_record("a.ts"),
                symbols: vec![
                    function("a.ts", "a", 1),
                    function("a.ts", "other", 4),
                    function("a.ts", "x", 7),
                    function("a.ts", "y", 9),
                ],
                imports: vec![],
                exports: vec![],
                references: vec![r1, r2],
                calls: vec![],
                type_relationships: vec![],
            })
            .unwrap();
        store.resolve_symbol_references().unwrap();

        let config = MarkovConfig {
            cooccurrence_scope: "function".into(),
            ..MarkovConfig::default()
        };
        build_all_chains(&mut store, &config).unwrap();

        // x and y live in different enclosing functions: no edge.
        let x_id = Symbol::make_id("a.ts", "x", SymbolKind::Function, 7);
        assert!(store
            .get_transitions(ChainKind::Cooccurrence, &x_id)
            .is_empty());
    }
}
