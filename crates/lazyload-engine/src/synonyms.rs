//! Weighted synonym expansion for name queries.
//!
//! A query is tokenized (camelCase split, separators to spaces, one-char
//! tokens dropped), each token is expanded through the synonym graph, and
//! the result becomes an FTS prefix query. Backend hits are then reranked
//! with the expansion weights.

use std::collections::HashMap;

use lazyload_core::config::{SynonymsConfig, SynonymEntry, SynonymGroup};
use lazyload_core::types::SymbolHit;

use crate::synonyms_builtin::builtin_groups;

/// Where an expansion term came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionSource {
    Original,
    Canonical,
    Synonym,
}

#[derive(Debug, Clone)]
pub struct Expansion {
    pub term: String,
    pub weight: f64,
    pub source: ExpansionSource,
}

#[derive(Debug, Clone)]
pub struct ExpandedQuery {
    pub original: String,
    pub expansions: Vec<Expansion>,
    pub fts_query: String,
}

/// Weight applied to a canonical reached through one of its synonyms.
const CANONICAL_FACTOR: f64 = 0.9;
/// Mixing factors for the rerank pass.
const BACKEND_FACTOR: f64 = 0.6;
const SYNONYM_FACTOR: f64 = 0.4;

pub struct SynonymExpander {
    /// canonical -> its synonym list.
    groups: HashMap<String, Vec<SynonymEntry>>,
    /// synonym term -> (canonical, weight) for bidirectional entries.
    reverse: HashMap<String, Vec<(String, f64)>>,
    enabled: bool,
    min_weight_threshold: f64,
    max_expansions: usize,
}

impl SynonymExpander {
    pub fn from_config(config: &SynonymsConfig) -> Self {
        let mut source_groups: Vec<SynonymGroup> = Vec::new();
        if config.use_builtin_synonyms {
            source_groups.extend(builtin_groups());
        }
        source_groups.extend(config.custom_synonyms.clone());

        let mut groups: HashMap<String, Vec<SynonymEntry>> = HashMap::new();
        for group in source_groups {
            if config.disabled.contains(&group.canonical) {
                continue;
            }
            groups
                .entry(group.canonical.to_lowercase())
                .or_default()
                .extend(group.synonyms);
        }
        // Overrides replace a canonical's synonym list entirely.
        for (canonical, entries) in &config.overrides {
            groups.insert(canonical.to_lowercase(), entries.clone());
        }

        let mut reverse: HashMap<String, Vec<(String, f64)>> = HashMap::new();
        for (canonical, entries) in &groups {
            for entry in entries {
                if entry.bidirectional {
                    reverse
                        .entry(entry.term.to_lowercase())
                        .or_default()
                        .push((canonical.clone(), entry.weight));
                }
            }
        }

        Self {
            groups,
            reverse,
            enabled: config.enabled,
            min_weight_threshold: config.min_weight_threshold,
            max_expansions: config.max_expansions,
        }
    }

    /// Expand a query into weighted terms plus the FTS expression.
    pub fn expand(&self, query: &str) -> ExpandedQuery {
        let tokens = tokenize(query);
        let mut weights: HashMap<String, (f64, ExpansionSource)> = HashMap::new();
        let mut add = |term: &str, weight: f64, source: ExpansionSource| {
            if term.is_empty() {
                return;
            }
            let slot = weights.entry(term.to_string()).or_insert((0.0, source));
            // Same-term duplicates keep the maximum weight.
            if weight > slot.0 {
                *slot = (weight, source);
            }
        };

        // A multi-word query also contributes the whole phrase.
        if tokens.len() > 1 {
            add(&tokens.join(" "), 1.0, ExpansionSource::Original);
        }
        for token in &tokens {
            add(token, 1.0, ExpansionSource::Original);
        }

        if self.enabled {
            for token in &tokens {
                // Canonical-term match: pull in the synonym list.
                if let Some(entries) = self.groups.get(token) {
                    for entry in entries {
                        if entry.weight >= self.min_weight_threshold {
                            add(&entry.term.to_lowercase(), entry.weight, ExpansionSource::Synonym);
                        }
                    }
                }
                // Bidirectional synonym match: pull in the canonical and its
                // siblings.
                if let Some(canonicals) = self.reverse.get(token) {
                    for (canonical, match_weight) in canonicals {
                        add(
                            canonical,
                            CANONICAL_FACTOR * match_weight,
                            ExpansionSource::Canonical,
                        );
                        if let Some(entries) = self.groups.get(canonical) {
                            for entry in entries {
                                let weight = entry.weight * match_weight;
                                if entry.weight >= self.min_weight_threshold {
                                    add(
                                        &entry.term.to_lowercase(),
                                        weight,
                                        ExpansionSource::Synonym,
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut expansions: Vec<Expansion> = weights
            .into_iter()
            .map(|(term, (weight, source))| Expansion {
                term,
                weight,
                source,
            })
            .collect();
        expansions.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.term.cmp(&b.term))
        });
        expansions.truncate(self.max_expansions);

        let fts_query = expansions
            .iter()
            .map(|e| format!("\"{}\"*", e.term.replace('"', "")))
            .collect::<Vec<_>>()
            .join(" OR ");

        ExpandedQuery {
            original: query.to_string(),
            expansions,
            fts_query,
        }
    }

    /// Combine backend scores with synonym-term hits:
    /// `combined = backend × 0.6 + synonym × 0.4`, both normalized to [0, 1].
    pub fn rerank(&self, mut hits: Vec<SymbolHit>, expanded: &ExpandedQuery) -> Vec<SymbolHit> {
        if hits.is_empty() {
            return hits;
        }
        let max_backend = hits
            .iter()
            .map(|h| h.score)
            .fold(f64::MIN, f64::max)
            .max(f64::EPSILON);

        for hit in &mut hits {
            let haystack = format!(
                "{} {}",
                hit.symbol.name.to_lowercase(),
                hit.symbol.signature().to_lowercase()
            );
            let synonym_score = expanded
                .expansions
                .iter()
                .filter(|e| haystack.contains(&e.term))
                .map(|e| e.weight)
                .fold(0.0, f64::max);
            let backend_norm = (hit.score / max_backend).clamp(0.0, 1.0);
            hit.score = backend_norm * BACKEND_FACTOR + synonym_score * SYNONYM_FACTOR;
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.id.cmp(&b.symbol.id))
        });
        hits
    }
}

/// Lowercase; split camelCase on case boundaries; `_`/`-` become spaces;
/// single-character tokens are dropped.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(query.len() + 8);
    let chars: Vec<char> = query.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            spaced.push(' ');
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            // fooBar -> foo Bar; HTTPServer -> HTTP Server.
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_lower) {
                spaced.push(' ');
            }
        }
        spaced.push(c);
    }
    spaced
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.len() > 1)
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyload_core::config::SynonymsConfig;

    fn expander() -> SynonymExpander {
        SynonymExpander::from_config(&SynonymsConfig::default())
    }

    #[test]
    fn test_tokenize_camel_case() {
        assert_eq!(tokenize("fetchUserData"), vec!["fetch", "user", "data"]);
        assert_eq!(tokenize("HTTPServer"), vec!["http", "server"]);
        assert_eq!(tokenize("save_user-record"), vec!["save", "user", "record"]);
        assert_eq!(tokenize("a x"), Vec::<String>::new()); // one-char tokens dropped
    }

    #[test]
    fn test_expand_includes_original_terms() {
        let expanded = expander().expand("fetchUser");
        let terms: Vec<&str> = expanded.expansions.iter().map(|e| e.term.as_str()).collect();
        assert!(terms.contains(&"fetch"));
        assert!(terms.contains(&"user"));
        assert!(terms.contains(&"fetch user"));
        // Originals carry full weight.
        let fetch = expanded
            .expansions
            .iter()
            .find(|e| e.term == "fetch")
            .unwrap();
        assert_eq!(fetch.weight, 1.0);
        assert_eq!(fetch.source, ExpansionSource::Original);
    }

    #[test]
    fn test_expand_bidirectional_synonym_reaches_canonical() {
        let expanded = expander().expand("fetch");
        let get = expanded.expansions.iter().find(|e| e.term == "get").unwrap();
        assert_eq!(get.source, ExpansionSource::Canonical);
        assert!((get.weight - 0.9 * 0.85).abs() < 1e-9);
        // Siblings of the canonical come along.
        assert!(expanded.expansions.iter().any(|e| e.term == "load"));
    }

    #[test]
    fn test_expansion_cap_and_ordering() {
        let config = SynonymsConfig {
            max_expansions: 5,
            ..SynonymsConfig::default()
        };
        let expanded = SynonymExpander::from_config(&config).expand("get");
        assert!(expanded.expansions.len() <= 5);
        for pair in expanded.expansions.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
    }

    #[test]
    fn test_min_weight_threshold_filters() {
        let config = SynonymsConfig {
            min_weight_threshold: 0.9,
            ..SynonymsConfig::default()
        };
        let expanded = SynonymExpander::from_config(&config).expand("get");
        // `query` (0.65) is below the 0.9 threshold.
        assert!(!expanded.expansions.iter().any(|e| e.term == "query"));
        assert!(expanded.expansions.iter().any(|e| e.term == "retrieve"));
    }

    #[test]
    fn test_disabled_expander_keeps_only_originals() {
        let config = SynonymsConfig {
            enabled: false,
            ..SynonymsConfig::default()
        };
        let expanded = SynonymExpander::from_config(&config).expand("fetch");
        assert_eq!(expanded.expansions.len(), 1);
        assert_eq!(expanded.expansions[0].term, "fetch");
    }

    #[test]
    fn test_disabled_terms_removed() {
        let config = SynonymsConfig {
            disabled: vec!["get".to_string()],
            ..SynonymsConfig::default()
        };
        let expanded = SynonymExpander::from_config(&config).expand("fetch");
        assert!(!expanded.expansions.iter().any(|e| e.term == "load"));
    }

    #[test]
    fn test_fts_query_is_prefix_or() {
        let expanded = expander().expand("db");
        assert!(expanded.fts_query.contains("\"db\"*"));
        assert!(expanded.fts_query.contains(" OR "));
        assert!(expanded.fts_query.contains("\"database\"*"));
    }

    #[test]
    fn test_expansion_idempotence() {
        // Expanding the terms of an expansion adds nothing new (up to order).
        let exp = expander();
        let first = exp.expand("fetchUser");
        let mut first_terms: Vec<String> =
            first.expansions.iter().map(|e| e.term.clone()).collect();
        first_terms.sort();

        let joined = first
            .expansions
            .iter()
            .map(|e| e.term.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let second = exp.expand(&joined);
        for term in &first_terms {
            // Multi-word phrase entries are re-derived differently; single
            // terms must all survive.
            if !term.contains(' ') {
                assert!(
                    second.expansions.iter().any(|e| e.term == *term)
                        || second.expansions.len() == exp.max_expansions,
                    "{} lost in re-expansion",
                    term
                );
            }
        }
    }

    #[test]
    fn test_rerank_prefers_synonym_matches() {
        use lazyload_core::types::{
            FunctionData, Language, Location, Symbol, SymbolData, SymbolHit, SymbolKind,
        };
        let make = |name: &str, score: f64| SymbolHit {
            symbol: Symbol {
                id: format!("a.ts:{}:function:1", name),
                name: name.to_string(),
                qualified_name: format!("a#{}", name),
                kind: SymbolKind::Function,
                file_path: "a.ts".into(),
                language: Language::TypeScript,
                location: Location::default(),
                data: SymbolData::Function(FunctionData::default()),
            },
            score,
        };
        let exp = expander();
        let expanded = exp.expand("fetch");
        // Equal backend scores; the synonym match should win.
        let hits = exp.rerank(vec![make("unrelated", 5.0), make("loadUser", 5.0)], &expanded);
        assert_eq!(hits[0].symbol.name, "loadUser");
        assert!(hits[0].score > hits[1].score);
    }
}
