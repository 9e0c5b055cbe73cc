//! Cross-crate property tests: checksum gating, atomic replacement, FTS
//! parity, resolution semantics, chain normalization, resolver ladder,
//! expansion idempotence, and governor accounting.

use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use serde_json::json;

use lazyload_core::config::LazyloadConfig;
use lazyload_core::sqlite::SqliteIndexStore;
use lazyload_core::store::IndexStore;
use lazyload_core::types::ChainKind;
use lazyload_engine::governor::{GovernorDecision, SessionGovernor};
use lazyload_engine::indexer::Indexer;
use lazyload_engine::markov::build_all_chains;
use lazyload_engine::synonyms::SynonymExpander;
use lazyload_parsers::paths::{PathResolver, ResolveFailure};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Property 1: re-indexing an unchanged tree does zero writes.
#[test]
fn property_checksum_gating() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..3 {
        write(
            dir.path(),
            &format!("src/m{}.ts", i),
            &format!("export function f{}() {{}}\n", i),
        );
    }
    let indexer = Indexer::new(dir.path(), LazyloadConfig::default());
    let mut store = SqliteIndexStore::in_memory().unwrap();
    let cancel = AtomicBool::new(false);

    indexer.index_directory(&mut store, None, &cancel).unwrap();
    let second = indexer.index_directory(&mut store, None, &cancel).unwrap();
    assert_eq!(second.indexed_files, 0);
    assert_eq!(second.skipped_files, 3);
}

/// Property 2: after re-indexing a modified file, nothing derived from the
/// old content survives.
#[test]
fn property_atomic_replacement() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/a.ts",
        "export function vanished() { helper(); }\nfunction helper() {}\n",
    );
    let indexer = Indexer::new(dir.path(), LazyloadConfig::default());
    let mut store = SqliteIndexStore::in_memory().unwrap();
    let file = dir.path().join("src/a.ts");
    indexer.index_file(&mut store, &file).unwrap();
    store.resolve_symbol_references().unwrap();

    write(dir.path(), "src/a.ts", "export function fresh() {}\n");
    indexer.index_file(&mut store, &file).unwrap();

    assert!(store.get_symbols_by_name("vanished", None).is_empty());
    assert!(store.get_symbols_by_name("helper", None).is_empty());
    assert!(store.get_references_by_name("helper").is_empty());
    assert!(store.get_callers("helper").is_empty());
    assert_eq!(store.get_symbols_by_name("fresh", None).len(), 1);
}

/// Property 3: symbols and FTS rows stay in lockstep, checked at the SQL
/// level through a separate connection.
#[test]
fn property_fts_symbol_parity() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/a.ts", "export function one() {}\nexport function two() {}\n");
    write(dir.path(), "src/b.py", "def three():\n    pass\n");

    let db_path = dir.path().join(".lazyload/index.db");
    {
        let mut store = SqliteIndexStore::open(&db_path).unwrap();
        let indexer = Indexer::new(dir.path(), LazyloadConfig::default());
        let cancel = AtomicBool::new(false);
        indexer.index_directory(&mut store, None, &cancel).unwrap();

        // Mutate one file and re-index to exercise the replacement path.
        write(dir.path(), "src/a.ts", "export function uno() {}\n");
        indexer
            .index_file(&mut store, &dir.path().join("src/a.ts"))
            .unwrap();
    }

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let symbols: i64 = conn
        .query_row("SELECT COUNT(*) FROM symbols", [], |r| r.get(0))
        .unwrap();
    let fts: i64 = conn
        .query_row("SELECT COUNT(*) FROM fts_symbols", [], |r| r.get(0))
        .unwrap();
    assert_eq!(symbols, fts);

    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM fts_symbols WHERE symbol_id NOT IN (SELECT id FROM symbols)",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

/// Property 4: the resolution pass fills IDs for known names and leaves
/// unknown names null yet queryable.
#[test]
fn property_symbol_resolution() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/a.ts",
        "import { known } from './b';\nexport function caller() { known(); unknownExternal(); }\n",
    );
    write(dir.path(), "src/b.ts", "export function known() {}\n");
    let indexer = Indexer::new(dir.path(), LazyloadConfig::default());
    let mut store = SqliteIndexStore::in_memory().unwrap();
    let cancel = AtomicBool::new(false);
    indexer.index_directory(&mut store, None, &cancel).unwrap();

    for reference in store.get_references_by_name("known") {
        assert!(reference.symbol_id.is_some());
    }
    let externals = store.get_references_by_name("unknownExternal");
    assert!(!externals.is_empty());
    assert!(externals.iter().all(|r| r.symbol_id.is_none()));
}

/// Property 5: chain probabilities per from-state sum to 1 within 1e-6.
#[test]
fn property_markov_normalization() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/flow.ts",
        "export function a() { b(); b(); c(); }\nexport function b() { c(); }\nexport function c() {}\n",
    );
    let indexer = Indexer::new(dir.path(), LazyloadConfig::default());
    let mut store = SqliteIndexStore::in_memory().unwrap();
    let cancel = AtomicBool::new(false);
    indexer.index_directory(&mut store, None, &cancel).unwrap();
    build_all_chains(&mut store, &LazyloadConfig::default().markov).unwrap();

    for chain in ChainKind::ALL {
        // Walk every from-state reachable from the stats by probing the
        // symbols we know about.
        for symbol in ["a", "b", "c"] {
            for candidate in store.get_symbols_by_name(symbol, None) {
                let transitions = store.get_transitions(chain, &candidate.id);
                if transitions.is_empty() {
                    continue;
                }
                let total: f64 = transitions.iter().map(|t| t.probability).sum();
                assert!(
                    (total - 1.0).abs() < 1e-6,
                    "chain {} from {} sums to {}",
                    chain,
                    candidate.id,
                    total
                );
            }
        }
    }
}

/// Property 6: with decay < 1, scores strictly shrink with each hop along
/// a single path.
#[test]
fn property_markov_decay() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/chain.ts",
        "export function a() { b(); }\nexport function b() { c(); }\nexport function c() {}\n",
    );
    let indexer = Indexer::new(dir.path(), LazyloadConfig::default());
    let mut store = SqliteIndexStore::in_memory().unwrap();
    let cancel = AtomicBool::new(false);
    indexer.index_directory(&mut store, None, &cancel).unwrap();
    let config = LazyloadConfig::default().markov;
    build_all_chains(&mut store, &config).unwrap();

    let result = lazyload_engine::markov::suggest(
        &store,
        &config,
        "a",
        None,
        &lazyload_engine::markov::SuggestOptions {
            chains: vec![ChainKind::CallFlow],
            depth: 2,
            min_probability: 0.0,
            max_results: 10,
            decay_factor: 0.7,
            explain: false,
        },
    );
    let score = |name: &str| {
        result
            .suggestions
            .iter()
            .find(|s| s.state.contains(&format!(":{}:", name)))
            .map(|s| s.score)
            .unwrap()
    };
    assert!(score("b") > score("c"));
}

/// Property 7: the resolver ladder reports ambiguity with suggestions and
/// auto-resolves close typos.
#[test]
fn property_path_resolver_ladder() {
    let indexed = vec![
        "/project/src/api/config.ts".to_string(),
        "/project/src/web/config.ts".to_string(),
        "/project/src/services/user_service.ts".to_string(),
    ];
    let resolver = PathResolver::new(Path::new("/project"), &indexed);

    match resolver.resolve("config.ts") {
        Err(ResolveFailure::Ambiguous { suggestions }) => {
            assert!(suggestions.len() >= 2);
        }
        other => panic!("expected ambiguous, got {:?}", other),
    }

    let hit = resolver.resolve("usr_service.ts").unwrap();
    assert!(hit.auto_resolved);
    assert_eq!(hit.resolved_path, "/project/src/services/user_service.ts");
}

/// Property 8: feeding an expansion back through the expander adds nothing
/// (idempotence up to ordering/caps).
#[test]
fn property_synonym_expansion_idempotence() {
    let expander = SynonymExpander::from_config(&LazyloadConfig::default().synonyms);
    let first = expander.expand("fetchConfig");
    let terms: Vec<String> = first
        .expansions
        .iter()
        .filter(|e| !e.term.contains(' '))
        .map(|e| e.term.clone())
        .collect();
    let second = expander.expand(&terms.join(" "));

    // Every single-word term of the first expansion survives, or got cut by
    // the shared cap only.
    let max = LazyloadConfig::default().synonyms.max_expansions;
    for term in &terms {
        let present = second.expansions.iter().any(|e| e.term == *term);
        assert!(
            present || second.expansions.len() == max,
            "{} lost in re-expansion",
            term
        );
    }
}

/// Property 9: equivalent normalized searches count as one novel target and
/// the phase transitions follow the thresholds.
#[test]
fn property_governor_counting() {
    let mut governor = SessionGovernor::default();
    for i in 0..15 {
        let spelling = if i % 2 == 0 { "parseUser" } else { " PARSEUSER  " };
        let decision = governor.admit("search_symbols", &json!({ "query": spelling }));
        assert!(matches!(decision, GovernorDecision::Proceed { .. }));
    }
    assert_eq!(governor.novel_count(), 1);
    assert_eq!(governor.total_calls(), 15);
}

/// Property 10: sync_index wipes the response cache.
#[test]
fn property_cache_invalidation_on_sync() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/main.ts", "export function greet() {}\n");
    let server =
        lazyload_server::LazyloadServer::in_memory(dir.path(), LazyloadConfig::default()).unwrap();
    {
        let mut state = server.state.lock().unwrap();
        let lazyload_server::ServerState { store, tools, .. } = &mut *state;
        let cancel = AtomicBool::new(false);
        tools
            .indexer()
            .index_directory(store, None, &cancel)
            .unwrap();
    }

    let call = |method: &str, args: serde_json::Value| -> String {
        let line = json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": { "name": method, "arguments": args }
        })
        .to_string();
        let response = lazyload_server::mcp::process_line(&server.state, &line);
        let parsed: serde_json::Value = serde_json::from_str(&response).unwrap();
        parsed["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string()
    };

    call("find_references", json!({ "symbolName": "greet" }));
    let cached = call("find_references", json!({ "symbolName": "greet" }));
    assert!(cached.contains("[Cached call reused]"));

    call("sync_index", json!({}));
    let after = call("find_references", json!({ "symbolName": "greet" }));
    assert!(!after.contains("[Cached call reused]"));
}
