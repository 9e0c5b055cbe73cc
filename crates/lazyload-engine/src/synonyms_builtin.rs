//! Builtin synonym graph.
//!
//! Canonical programming-vocabulary terms with weighted synonyms, grouped by
//! category. Weights follow the relation: exact ≈ 0.95, abbreviation ≈ 0.9,
//! conceptual ≈ 0.7–0.85, implementation ≈ 0.5–0.65.

use lazyload_core::config::{SynonymEntry, SynonymGroup};

fn entry(term: &str, relation: &str, weight: f64) -> SynonymEntry {
    SynonymEntry {
        term: term.to_string(),
        relation: relation.to_string(),
        weight,
        bidirectional: true,
    }
}

fn group(canonical: &str, category: &str, synonyms: Vec<SynonymEntry>) -> SynonymGroup {
    SynonymGroup {
        canonical: canonical.to_string(),
        category: Some(category.to_string()),
        synonyms,
    }
}

pub fn builtin_groups() -> Vec<SynonymGroup> {
    vec![
        group(
            "create",
            "creation",
            vec![
                entry("make", "conceptual", 0.85),
                entry("build", "conceptual", 0.8),
                entry("construct", "conceptual", 0.8),
                entry("new", "implementation", 0.65),
                entry("init", "abbreviation", 0.7),
                entry("initialize", "conceptual", 0.75),
                entry("generate", "conceptual", 0.7),
                entry("spawn", "implementation", 0.5),
            ],
        ),
        group(
            "get",
            "read",
            vec![
                entry("fetch", "conceptual", 0.85),
                entry("load", "conceptual", 0.8),
                entry("retrieve", "exact", 0.95),
                entry("read", "conceptual", 0.8),
                entry("find", "conceptual", 0.7),
                entry("lookup", "conceptual", 0.75),
                entry("query", "implementation", 0.65),
            ],
        ),
        group(
            "update",
            "update",
            vec![
                entry("modify", "exact", 0.95),
                entry("edit", "conceptual", 0.8),
                entry("change", "conceptual", 0.75),
                entry("set", "implementation", 0.6),
                entry("patch", "implementation", 0.65),
                entry("mutate", "implementation", 0.5),
            ],
        ),
        group(
            "delete",
            "delete",
            vec![
                entry("remove", "exact", 0.95),
                entry("destroy", "conceptual", 0.8),
                entry("drop", "implementation", 0.65),
                entry("clear", "conceptual", 0.7),
                entry("purge", "implementation", 0.55),
            ],
        ),
        group(
            "search",
            "search",
            vec![
                entry("find", "exact", 0.9),
                entry("filter", "conceptual", 0.7),
                entry("match", "conceptual", 0.7),
                entry("locate", "conceptual", 0.75),
                entry("scan", "implementation", 0.55),
            ],
        ),
        group(
            "save",
            "storage",
            vec![
                entry("store", "exact", 0.95),
                entry("persist", "conceptual", 0.85),
                entry("write", "conceptual", 0.75),
                entry("flush", "implementation", 0.5),
                entry("commit", "implementation", 0.6),
            ],
        ),
        group(
            "config",
            "config",
            vec![
                entry("settings", "exact", 0.9),
                entry("options", "conceptual", 0.8),
                entry("preferences", "conceptual", 0.7),
                entry("configuration", "exact", 0.95),
                entry("setup", "conceptual", 0.65),
            ],
        ),
        group(
            "auth",
            "auth",
            vec![
                entry("authentication", "exact", 0.95),
                entry("login", "conceptual", 0.8),
                entry("authorize", "conceptual", 0.75),
                entry("session", "implementation", 0.55),
                entry("token", "implementation", 0.55),
                entry("credential", "conceptual", 0.7),
            ],
        ),
        group(
            "error",
            "error",
            vec![
                entry("exception", "exact", 0.9),
                entry("failure", "conceptual", 0.8),
                entry("fault", "conceptual", 0.65),
                entry("panic", "implementation", 0.5),
            ],
        ),
        group(
            "test",
            "test",
            vec![
                entry("spec", "exact", 0.85),
                entry("check", "conceptual", 0.65),
                entry("verify", "conceptual", 0.75),
                entry("assert", "implementation", 0.6),
                entry("mock", "implementation", 0.5),
            ],
        ),
        group(
            "request",
            "network",
            vec![
                entry("http", "implementation", 0.6),
                entry("call", "conceptual", 0.6),
                entry("api", "conceptual", 0.65),
                entry("endpoint", "implementation", 0.55),
            ],
        ),
        group(
            "user",
            "domain",
            vec![
                entry("account", "conceptual", 0.8),
                entry("member", "conceptual", 0.65),
                entry("profile", "conceptual", 0.6),
                entry("person", "conceptual", 0.55),
            ],
        ),
        group(
            "send",
            "messaging",
            vec![
                entry("emit", "conceptual", 0.8),
                entry("publish", "conceptual", 0.75),
                entry("dispatch", "conceptual", 0.75),
                entry("post", "implementation", 0.6),
                entry("notify", "conceptual", 0.65),
            ],
        ),
        group(
            "parse",
            "transform",
            vec![
                entry("decode", "conceptual", 0.75),
                entry("deserialize", "conceptual", 0.8),
                entry("tokenize", "implementation", 0.6),
                entry("extract", "conceptual", 0.65),
            ],
        ),
        group(
            "render",
            "transform",
            vec![
                entry("format", "conceptual", 0.75),
                entry("serialize", "conceptual", 0.7),
                entry("encode", "conceptual", 0.7),
                entry("display", "conceptual", 0.65),
            ],
        ),
        group(
            "validate",
            "validation",
            vec![
                entry("check", "conceptual", 0.75),
                entry("verify", "exact", 0.9),
                entry("sanitize", "implementation", 0.6),
                entry("ensure", "conceptual", 0.65),
            ],
        ),
        // Common abbreviations.
        group("database", "abbreviation", vec![entry("db", "abbreviation", 0.95)]),
        group("context", "abbreviation", vec![entry("ctx", "abbreviation", 0.95)]),
        group("environment", "abbreviation", vec![entry("env", "abbreviation", 0.95)]),
        group("message", "abbreviation", vec![entry("msg", "abbreviation", 0.95)]),
        group("index", "abbreviation", vec![entry("idx", "abbreviation", 0.9)]),
        group(
            "implementation",
            "abbreviation",
            vec![entry("impl", "abbreviation", 0.95)],
        ),
        group(
            "repository",
            "abbreviation",
            vec![entry("repo", "abbreviation", 0.95)],
        ),
        group(
            "parameter",
            "abbreviation",
            vec![
                entry("param", "abbreviation", 0.95),
                entry("arg", "conceptual", 0.8),
                entry("argument", "conceptual", 0.85),
            ],
        ),
        group(
            "function",
            "abbreviation",
            vec![
                entry("fn", "abbreviation", 0.95),
                entry("func", "abbreviation", 0.95),
                entry("method", "conceptual", 0.75),
            ],
        ),
        group(
            "directory",
            "abbreviation",
            vec![
                entry("dir", "abbreviation", 0.95),
                entry("folder", "conceptual", 0.85),
            ],
        ),
        group("document", "abbreviation", vec![entry("doc", "abbreviation", 0.9)]),
        group("temporary", "abbreviation", vec![entry("temp", "abbreviation", 0.9)]),
        group("value", "abbreviation", vec![entry("val", "abbreviation", 0.9)]),
        group("variable", "abbreviation", vec![entry("var", "abbreviation", 0.9)]),
        group("number", "abbreviation", vec![entry("num", "abbreviation", 0.9)]),
        group("string", "abbreviation", vec![entry("str", "abbreviation", 0.9)]),
        group("object", "abbreviation", vec![entry("obj", "abbreviation", 0.9)]),
        group("array", "abbreviation", vec![entry("arr", "abbreviation", 0.9)]),
        group("previous", "abbreviation", vec![entry("prev", "abbreviation", 0.9)]),
        group("current", "abbreviation", vec![entry("curr", "abbreviation", 0.9)]),
        group("length", "abbreviation", vec![entry("len", "abbreviation", 0.9)]),
        group(
            "utility",
            "abbreviation",
            vec![
                entry("util", "abbreviation", 0.95),
                entry("helper", "conceptual", 0.8),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_weights_in_range() {
        for group in builtin_groups() {
            for syn in &group.synonyms {
                assert!(
                    syn.weight > 0.0 && syn.weight <= 1.0,
                    "{} -> {} out of range",
                    group.canonical,
                    syn.term
                );
            }
        }
    }

    #[test]
    fn test_no_duplicate_canonicals() {
        let groups = builtin_groups();
        let mut seen = std::collections::HashSet::new();
        for group in &groups {
            assert!(seen.insert(group.canonical.clone()), "duplicate {}", group.canonical);
        }
    }

    #[test]
    fn test_known_entries() {
        let groups = builtin_groups();
        let get = groups.iter().find(|g| g.canonical == "get").unwrap();
        assert!(get.synonyms.iter().any(|s| s.term == "fetch"));
        let db = groups.iter().find(|g| g.canonical == "database").unwrap();
        assert_eq!(db.synonyms[0].term, "db");
    }
}
