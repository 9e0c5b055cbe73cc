use std::collections::HashMap;

use lazyload_core::config::MarkovConfig;
use lazyload_core::store::IndexStore;
use lazyload_core::types::{ChainKind, Symbol};

#[derive(Debug, Clone)]
pub struct SuggestOptions {
    pub chains: Vec<ChainKind>,
    pub depth: u32,
    pub min_probability: f64,
    pub max_results: usize,
    pub decay_factor: f64,
    pub explain: bool,
}

impl SuggestOptions {
    pub fn from_config(config: &MarkovConfig) -> Self {
        Self {
            chains: config.chain_types.clone(),
            depth: config.default_depth,
            min_probability: config.min_probability,
            max_results: 10,
            decay_factor: config.default_decay_factor,
            explain: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Suggestion {
    /// Target state: a symbol ID, type base name, or file path per chain.
    pub state: String,
    pub score: f64,
    pub depth: u32,
    /// The chain that contributed the strongest path.
    pub chain: ChainKind,
    pub path: Vec<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestResult {
    pub suggestions: Vec<Suggestion>,
    pub fallback_used: bool,
    pub fallback_type: Option<String>,
}

/// Bounded BFS random-walk over the selected chains.
///
/// Score of reaching `state` through `s0 → … → sk` is
/// `∏ p(si→si+1) × decay^(k−1) × chainWeight`; partial products below
/// `min_probability` are pruned. Scores for the same target aggregate by sum
/// across chains and paths.
pub fn suggest(
    store: &dyn IndexStore,
    config: &MarkovConfig,
    symbol_name: &str,
    file_path: Option<&str>,
    opts: &SuggestOptions,
) -> SuggestResult {
    // Resolve the start symbol once; each chain interprets it as its own
    // state space.
    let symbol = store
        .get_symbols_by_name(symbol_name, None)
        .into_iter()
        .find(|s| file_path.map(|p| s.file_path == p).unwrap_or(true))
        .or_else(|| store.get_symbol(symbol_name));

    let mut aggregated: HashMap<String, Suggestion> = HashMap::new();
    let mut any_transitions = false;

    for chain in &opts.chains {
        let Some(start) = start_state(*chain, symbol_name, file_path, symbol.as_ref()) else {
            continue;
        };
        if !store.has_chain_support(*chain, &start) {
            continue;
        }
        any_transitions = true;
        walk_chain(
            store,
            *chain,
            config.chain_weights.weight(*chain),
            &start,
            opts,
            &mut aggregated,
        );
    }

    if !any_transitions || aggregated.is_empty() {
        return fallback(store, symbol_name, opts);
    }

    let mut suggestions: Vec<Suggestion> = aggregated.into_values().collect();
    suggestions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.state.cmp(&b.state))
    });
    suggestions.truncate(opts.max_results);

    SuggestResult {
        suggestions,
        fallback_used: false,
        fallback_type: None,
    }
}

/// The state a chain starts from, per its state space.
fn start_state(
    chain: ChainKind,
    symbol_name: &str,
    file_path: Option<&str>,
    symbol: Option<&Symbol>,
) -> Option<String> {
    match chain {
        ChainKind::CallFlow | ChainKind::Cooccurrence => {
            symbol.map(|s| s.id.clone()).or_else(|| {
                // Callers may pass a full symbol ID directly.
                symbol_name.contains(':').then(|| symbol_name.to_string())
            })
        }
        ChainKind::TypeAffinity => Some(symbol_name.to_string()),
        ChainKind::ImportCluster => file_path
            .map(|p| p.to_string())
            .or_else(|| symbol.map(|s| s.file_path.clone())),
    }
}

fn walk_chain(
    store: &dyn IndexStore,
    chain: ChainKind,
    chain_weight: f64,
    start: &str,
    opts: &SuggestOptions,
    aggregated: &mut HashMap<String, Suggestion>,
) {
    // Frontier entries carry the running probability product and path.
    let mut frontier: Vec<(String, f64, Vec<String>)> =
        vec![(start.to_string(), 1.0, vec![start.to_string()])];

    for hop in 1..=opts.depth {
        let mut next = Vec::new();
        for (state, product, path) in &frontier {
            for transition in store.get_transitions(chain, state) {
                let new_product = product * transition.probability;
                if new_product < opts.min_probability {
                    continue;
                }
                let mut new_path = path.clone();
                new_path.push(transition.to_state.clone());
                let score =
                    new_product * opts.decay_factor.powi(hop as i32 - 1) * chain_weight;

                if transition.to_state != start {
                    record(
                        aggregated,
                        chain,
                        &transition.to_state,
                        score,
                        hop,
                        &new_path,
                        opts.explain,
                    );
                }
                next.push((transition.to_state, new_product, new_path));
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
}

fn record(
    aggregated: &mut HashMap<String, Suggestion>,
    chain: ChainKind,
    state: &str,
    score: f64,
    depth: u32,
    path: &[String],
    explain: bool,
) {
    let explanation = explain.then(|| {
        format!(
            "{}: {} (score {:.4})",
            chain,
            path.join(" -> "),
            score
        )
    });
    match aggregated.get_mut(state) {
        Some(existing) => {
            existing.score += score;
            if depth < existing.depth {
                existing.depth = depth;
                existing.path = path.to_vec();
                existing.chain = chain;
            }
            if let (Some(existing_text), Some(new_text)) =
                (existing.explanation.as_mut(), explanation)
            {
                existing_text.push_str("; ");
                existing_text.push_str(&new_text);
            }
        }
        None => {
            aggregated.insert(
                state.to_string(),
                Suggestion {
                    state: state.to_string(),
                    score,
                    depth,
                    chain,
                    path: path.to_vec(),
                    explanation,
                },
            );
        }
    }
}

/// When every chain comes up empty for the start state, answer from the
/// direct graphs instead.
fn fallback(store: &dyn IndexStore, symbol_name: &str, opts: &SuggestOptions) -> SuggestResult {
    let mut suggestions = Vec::new();

    let callers = store.get_callers(symbol_name);
    let callees = store.get_callees(symbol_name);
    if !callers.is_empty() || !callees.is_empty() {
        for edge in callers {
            suggestions.push(Suggestion {
                state: edge
                    .caller_symbol_id
                    .clone(),
                score: edge.call_count as f64,
                depth: 1,
                chain: ChainKind::CallFlow,
                path: vec![edge.caller_name, symbol_name.to_string()],
                explanation: None,
            });
        }
        for edge in callees {
            suggestions.push(Suggestion {
                state: edge
                    .callee_symbol_id
                    .unwrap_or_else(|| edge.callee_name.clone()),
                score: edge.call_count as f64,
                depth: 1,
                chain: ChainKind::CallFlow,
                path: vec![symbol_name.to_string(), edge.callee_name],
                explanation: None,
            });
        }
        suggestions.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        suggestions.truncate(opts.max_results);
        return SuggestResult {
            suggestions,
            fallback_used: true,
            fallback_type: Some("call_graph".into()),
        };
    }

    for reference in store.get_references_by_name(symbol_name) {
        let state = reference
            .referencing_symbol_id
            .unwrap_or_else(|| reference.referencing_file.clone());
        if !suggestions.iter().any(|s: &Suggestion| s.state == state) {
            suggestions.push(Suggestion {
                state,
                score: 1.0,
                depth: 1,
                chain: ChainKind::Cooccurrence,
                path: vec![symbol_name.to_string()],
                explanation: None,
            });
        }
    }
    suggestions.truncate(opts.max_results);
    SuggestResult {
        fallback_used: true,
        fallback_type: suggestions
            .is_empty()
            .then(|| "none".to_string())
            .or(Some("references".into())),
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyload_core::sqlite::SqliteIndexStore;
    use lazyload_core::types::{
        FileIndex, FileRecord, FunctionData, Language, Location, ParseStatus, SymbolData,
        SymbolKind,
    };

    fn seed_symbols(store: &mut SqliteIndexStore, names: &[&str]) {
        let symbols = names
            .iter()
            .enumerate()
            .map(|(i, name)| Symbol {
                id: Symbol::make_id("m.ts", name, SymbolKind::Function, i as u32 + 1),
                name: name.to_string(),
                qualified_name: format!("m#{}", name),
                kind: SymbolKind::Function,
                file_path: "m.ts".into(),
                language: Language::TypeScript,
                location: Location {
                    start_line: i as u32 + 1,
                    end_line: i as u32 + 1,
                    start_column: 0,
                    end_column: 0,
                },
                data: SymbolData::Function(FunctionData::default()),
            })
            .collect();
        store
            .put_file(&FileIndex {
                file: FileRecord {
                    path: "m.ts".into(),
                    language: Language::TypeScript,
                    checksum: "c".into(),
                    mtime_ms: 0,
                    line_count: 1,
                    byte_size: 1,
                    parse_status: ParseStatus::Complete,
                    warnings: vec![],
                },
                symbols,
                imports: vec![],
                exports: vec![],
                references: vec![],
                calls: vec![],
                type_relationships: vec![],
            })
            .unwrap();
    }

    fn id(name: &str, line: u32) -> String {
        Symbol::make_id("m.ts", name, SymbolKind::Function, line)
    }

    fn diamond_config() -> MarkovConfig {
        let mut config = MarkovConfig::default();
        // Single chain with unit weight keeps the arithmetic visible.
        config.chain_weights.call_flow = 1.0;
        config
    }

    fn opts(depth: u32) -> SuggestOptions {
        SuggestOptions {
            chains: vec![ChainKind::CallFlow],
            depth,
            min_probability: 0.05,
            max_results: 10,
            decay_factor: 0.7,
            explain: false,
        }
    }

    /// a→b, a→c, b→d, c→d: b and c tie at depth 1; d aggregates both paths.
    fn seed_diamond(store: &mut SqliteIndexStore) {
        seed_symbols(store, &["a", "b", "c", "d"]);
        store
            .rebuild_chain(
                ChainKind::CallFlow,
                &[
                    (id("a", 1), id("b", 2), 1),
                    (id("a", 1), id("c", 3), 1),
                    (id("b", 2), id("d", 4), 1),
                    (id("c", 3), id("d", 4), 1),
                ],
            )
            .unwrap();
    }

    #[test]
    fn test_diamond_scores() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        seed_diamond(&mut store);
        let config = diamond_config();
        let result = suggest(&store, &config, "a", None, &opts(2));
        assert!(!result.fallback_used);

        let by_state: HashMap<&str, &Suggestion> = result
            .suggestions
            .iter()
            .map(|s| (s.state.as_str(), s))
            .collect();
        let b = by_state[id("b", 2).as_str()];
        let c = by_state[id("c", 3).as_str()];
        let d = by_state[id("d", 4).as_str()];

        // Depth 1: probability 0.5, decay^0.
        assert!((b.score - 0.5).abs() < 1e-9);
        assert!((c.score - 0.5).abs() < 1e-9);
        assert_eq!(b.depth, 1);
        // Depth 2 through both arms: 2 × (0.5 × 1.0 × decay) = decay.
        assert!((d.score - 0.7).abs() < 1e-9);
        assert_eq!(d.depth, 2);
        assert_eq!(d.path.len(), 3);
    }

    #[test]
    fn test_decay_orders_depths() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        seed_symbols(&mut store, &["a", "b", "c"]);
        // A single linear path: a→b→c with certain transitions.
        store
            .rebuild_chain(
                ChainKind::CallFlow,
                &[(id("a", 1), id("b", 2), 1), (id("b", 2), id("c", 3), 1)],
            )
            .unwrap();
        let config = diamond_config();
        let result = suggest(&store, &config, "a", None, &opts(2));
        let scores: HashMap<&str, f64> = result
            .suggestions
            .iter()
            .map(|s| (s.state.as_str(), s.score))
            .collect();
        // Along one path, each extra hop strictly shrinks the score.
        assert!(scores[id("b", 2).as_str()] > scores[id("c", 3).as_str()]);
    }

    #[test]
    fn test_min_probability_prunes() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        seed_symbols(&mut store, &["a", "b", "rare"]);
        store
            .rebuild_chain(
                ChainKind::CallFlow,
                &[(id("a", 1), id("b", 2), 99), (id("a", 1), id("rare", 3), 1)],
            )
            .unwrap();
        let config = diamond_config();
        let result = suggest(&store, &config, "a", None, &opts(1));
        assert!(result
            .suggestions
            .iter()
            .all(|s| s.state != id("rare", 3)));
    }

    #[test]
    fn test_fallback_to_call_graph() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        // Symbols and call edges exist, but no chain was ever built.
        let mut index = FileIndex {
            file: FileRecord {
                path: "m.ts".into(),
                language: Language::TypeScript,
                checksum: "c".into(),
                mtime_ms: 0,
                line_count: 1,
                byte_size: 1,
                parse_status: ParseStatus::Complete,
                warnings: vec![],
            },
            symbols: vec![],
            imports: vec![],
            exports: vec![],
            references: vec![],
            calls: vec![],
            type_relationships: vec![],
        };
        index.calls.push(lazyload_core::types::CallEdge {
            id: 0,
            caller_symbol_id: id("x", 1),
            caller_name: "x".into(),
            callee_symbol_id: None,
            callee_name: "target".into(),
            call_count: 2,
            is_async: false,
            is_conditional: false,
        });
        store.put_file(&index).unwrap();

        let config = MarkovConfig::default();
        let result = suggest(&store, &config, "target", None, &opts(2));
        assert!(result.fallback_used);
        assert_eq!(result.fallback_type.as_deref(), Some("call_graph"));
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].state, id("x", 1));
    }

    #[test]
    fn test_explain_paths() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        seed_diamond(&mut store);
        let config = diamond_config();
        let mut options = opts(2);
        options.explain = true;
        let result = suggest(&store, &config, "a", None, &options);
        let d = result
            .suggestions
            .iter()
            .find(|s| s.state == id("d", 4))
            .unwrap();
        let text = d.explanation.as_deref().unwrap();
        assert!(text.contains("call_flow"));
        assert!(text.contains("->"));
    }

    #[test]
    fn test_max_results_caps() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let names: Vec<String> = (0..20).map(|i| format!("t{}", i)).collect();
        let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut all = vec!["a"];
        all.extend(name_refs.iter());
        seed_symbols(&mut store, &all);
        let transitions: Vec<(String, String, u32)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (id("a", 1), id(n, i as u32 + 2), 1))
            .collect();
        store.rebuild_chain(ChainKind::CallFlow, &transitions).unwrap();

        let config = diamond_config();
        let mut options = opts(1);
        options.max_results = 5;
        options.min_probability = 0.0;
        let result = suggest(&store, &config, "a", None, &options);
        assert_eq!(result.suggestions.len(), 5);
    }
}
