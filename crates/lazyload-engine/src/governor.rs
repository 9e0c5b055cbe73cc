//! Per-session call governance.
//!
//! Wraps every tool invocation: counts novel (tool, normalized-target)
//! pairs and total calls, memoizes responses by a stable parameter key, and
//! moves the session through explore → synthesize → finalize.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

/// Marker appended to responses served from the cache.
pub const CACHED_MARKER: &str = "\n\n[Cached call reused]";

/// Nudge appended while the session is in the synthesize band.
pub const SYNTHESIZE_NOTE: &str = "\n\n[Note: exploration budget is running low. Consider synthesizing what you have learned before making further calls.]";

/// Terminal response once the session is finalized.
pub const FINALIZE_MESSAGE: &str = "Session exploration budget exhausted. Synthesize an answer from the context already gathered; further index queries will not be served this session.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Explore,
    Synthesize,
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GovernorLimits {
    pub novel_explore: usize,
    pub novel_synthesize: usize,
    pub total_hard_cap: usize,
}

impl Default for GovernorLimits {
    fn default() -> Self {
        Self {
            novel_explore: 8,
            novel_synthesize: 15,
            total_hard_cap: 25,
        }
    }
}

/// What the caller should do with a tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GovernorDecision {
    /// Serve this cached response; do not run the handler or count the call.
    Cached(String),
    /// Run the handler; append the synthesize note when flagged.
    Proceed { phase: SessionPhase },
    /// Do not run the handler; return this terminal message.
    Finalized(String),
}

pub struct SessionGovernor {
    limits: GovernorLimits,
    novel_targets: HashSet<(String, String)>,
    total_calls: usize,
    cache: HashMap<String, String>,
}

impl SessionGovernor {
    pub fn new(limits: GovernorLimits) -> Self {
        Self {
            limits,
            novel_targets: HashSet::new(),
            total_calls: 0,
            cache: HashMap::new(),
        }
    }

    pub fn novel_count(&self) -> usize {
        self.novel_targets.len()
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls
    }

    /// Evaluate a call before running its handler.
    pub fn admit(&mut self, tool: &str, params: &Value) -> GovernorDecision {
        let key = cache_key(tool, params);
        if let Some(cached) = self.cache.get(&key) {
            return GovernorDecision::Cached(format!("{}{}", cached, CACHED_MARKER));
        }

        // The finalize check runs against the counts before this call: the
        // call that crosses a threshold still executes; the next one stops.
        if self.novel_targets.len() > self.limits.novel_synthesize
            || self.total_calls >= self.limits.total_hard_cap
        {
            return GovernorDecision::Finalized(FINALIZE_MESSAGE.to_string());
        }

        self.total_calls += 1;
        if let Some(target) = normalized_target(tool, params) {
            self.novel_targets.insert((tool.to_string(), target));
        }

        let phase = if self.novel_targets.len() <= self.limits.novel_explore {
            SessionPhase::Explore
        } else {
            SessionPhase::Synthesize
        };
        GovernorDecision::Proceed { phase }
    }

    /// Memoize a handler response for future equivalent calls.
    pub fn record_response(&mut self, tool: &str, params: &Value, response: &str) {
        self.cache
            .insert(cache_key(tool, params), response.to_string());
    }

    /// `sync_index` invalidates everything previously cached.
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for SessionGovernor {
    fn default() -> Self {
        Self::new(GovernorLimits::default())
    }
}

/// Stable cache key: tool name plus the params rendered with recursively
/// sorted object keys. `search_symbols` keys on a normalized form of its
/// text inputs so trivially-different spellings hit the same entry.
pub fn cache_key(tool: &str, params: &Value) -> String {
    let effective = if tool == "search_symbols" {
        normalize_search_params(params)
    } else {
        params.clone()
    };
    format!("{}:{}", tool, stable_json(&effective))
}

fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_search_params(params: &Value) -> Value {
    let mut normalized = params.clone();
    if let Some(object) = normalized.as_object_mut() {
        for field in ["query", "return_type", "param_type"] {
            if let Some(Value::String(text)) = object.get(field) {
                let cleaned = normalize_text(text);
                object.insert(field.to_string(), Value::String(cleaned));
            }
        }
    }
    normalized
}

/// Render JSON with object keys sorted recursively, so equal parameter sets
/// produce equal keys regardless of field order.
pub fn stable_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        stable_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(stable_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}

/// The per-tool target used for novelty counting (`None` means the call
/// never counts as novel).
pub fn normalized_target(tool: &str, params: &Value) -> Option<String> {
    let get = |field: &str| {
        params
            .get(field)
            .and_then(|v| v.as_str())
            .map(normalize_text)
    };
    match tool {
        "search_symbols" => Some(format!(
            "query:{}||return_type:{}||param_type:{}",
            get("query").unwrap_or_default(),
            get("return_type").unwrap_or_default(),
            get("param_type").unwrap_or_default(),
        )),
        "get_function" | "trace_calls" => get("functionName"),
        "get_class" | "trace_types" => get("className"),
        "find_references" | "get_related_context" => get("symbolName"),
        "suggest_related" => get("symbol_name"),
        "list_functions" | "get_module_dependencies" => get("filePath"),
        "list_files" => Some(get("directory").unwrap_or_else(|| "*".to_string())),
        "get_architecture_overview" => Some(get("focus").unwrap_or_else(|| "*".to_string())),
        "sync_index" => None,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stable_json_sorts_keys() {
        let a = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let b = json!({"a": {"c": 3, "d": 2}, "b": 1});
        assert_eq!(stable_json(&a), stable_json(&b));
    }

    #[test]
    fn test_search_normalization_counts_one_novel_target() {
        let mut governor = SessionGovernor::default();
        for variant in ["parseUser", "  parseUser ", "PARSEUSER", "parseuser"] {
            let params = json!({"query": variant});
            let decision = governor.admit("search_symbols", &params);
            assert!(matches!(decision, GovernorDecision::Proceed { .. }));
            governor.record_response("search_symbols", &params, "result");
        }
        assert_eq!(governor.novel_count(), 1);
    }

    #[test]
    fn test_phase_thresholds() {
        let mut governor = SessionGovernor::default();
        for i in 0..8 {
            let decision =
                governor.admit("find_references", &json!({"symbolName": format!("s{}", i)}));
            assert_eq!(
                decision,
                GovernorDecision::Proceed {
                    phase: SessionPhase::Explore
                }
            );
        }
        for i in 8..16 {
            let decision =
                governor.admit("find_references", &json!({"symbolName": format!("s{}", i)}));
            assert_eq!(
                decision,
                GovernorDecision::Proceed {
                    phase: SessionPhase::Synthesize
                }
            );
        }
        // After 16 novel targets the next call is refused outright.
        let decision = governor.admit("find_references", &json!({"symbolName": "s16"}));
        assert!(matches!(decision, GovernorDecision::Finalized(_)));
        assert_eq!(governor.novel_count(), 16);
    }

    #[test]
    fn test_total_hard_cap() {
        let mut governor = SessionGovernor::default();
        // Repeated same-target calls never grow novelty but do count.
        for _ in 0..25 {
            let decision = governor.admit("find_references", &json!({"symbolName": "same"}));
            assert!(matches!(decision, GovernorDecision::Proceed { .. }));
        }
        assert_eq!(governor.total_calls(), 25);
        let decision = governor.admit("find_references", &json!({"symbolName": "same"}));
        assert!(matches!(decision, GovernorDecision::Finalized(_)));
    }

    #[test]
    fn test_cache_hit_skips_counting() {
        let mut governor = SessionGovernor::default();
        let params = json!({"symbolName": "greet"});
        governor.admit("find_references", &params);
        governor.record_response("find_references", &params, "two references");

        let decision = governor.admit("find_references", &params);
        match decision {
            GovernorDecision::Cached(text) => {
                assert!(text.starts_with("two references"));
                assert!(text.ends_with(CACHED_MARKER));
            }
            other => panic!("expected cache hit, got {:?}", other),
        }
        assert_eq!(governor.total_calls(), 1);
    }

    #[test]
    fn test_sync_invalidates_cache() {
        let mut governor = SessionGovernor::default();
        let params = json!({"symbolName": "greet"});
        governor.admit("find_references", &params);
        governor.record_response("find_references", &params, "result");
        governor.invalidate_cache();
        let decision = governor.admit("find_references", &params);
        assert!(matches!(decision, GovernorDecision::Proceed { .. }));
    }

    #[test]
    fn test_sync_index_has_no_target() {
        assert_eq!(normalized_target("sync_index", &json!({})), None);
        assert_eq!(
            normalized_target("list_files", &json!({})),
            Some("*".to_string())
        );
        assert_eq!(
            normalized_target("get_function", &json!({"functionName": " Greet "})),
            Some("greet".to_string())
        );
    }
}
