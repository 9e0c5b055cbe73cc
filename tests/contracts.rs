//! Contract tests: the config file format is schema-validated and stays
//! backward compatible; the tool catalog advertises valid JSON Schemas.

use jsonschema::validator_for;
use serde_json::json;

use lazyload_core::config::LazyloadConfig;

/// The documented config schema. Kept here so a drifting serde model fails
/// loudly instead of silently accepting junk.
fn config_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "directories": { "type": "array", "items": { "type": "string" } },
            "include": { "type": "array", "items": { "type": "string" } },
            "exclude": { "type": "array", "items": { "type": "string" } },
            "output": {
                "type": "object",
                "properties": { "database": { "type": "string" } }
            },
            "languages": {
                "type": "object",
                "properties": {
                    "typescript": { "$ref": "#/definitions/language" },
                    "javascript": { "$ref": "#/definitions/language" },
                    "python": { "$ref": "#/definitions/language" }
                }
            },
            "synonyms": {
                "type": "object",
                "properties": {
                    "enabled": { "type": "boolean" },
                    "useBuiltinSynonyms": { "type": "boolean" },
                    "customSynonyms": { "type": "array" },
                    "overrides": { "type": "object" },
                    "disabled": { "type": "array", "items": { "type": "string" } },
                    "minWeightThreshold": { "type": "number", "minimum": 0, "maximum": 1 },
                    "maxExpansions": { "type": "integer", "minimum": 1 }
                }
            },
            "markov": {
                "type": "object",
                "properties": {
                    "enabled": { "type": "boolean" },
                    "autoRebuild": { "type": "boolean" },
                    "chainTypes": {
                        "type": "array",
                        "items": { "enum": ["call_flow", "cooccurrence", "type_affinity", "import_cluster"] }
                    },
                    "defaultDepth": { "type": "integer", "minimum": 1, "maximum": 5 },
                    "defaultDecayFactor": { "type": "number", "minimum": 0, "maximum": 1 },
                    "minProbability": { "type": "number", "minimum": 0, "maximum": 1 },
                    "chainWeights": {
                        "type": "object",
                        "properties": {
                            "callFlow": { "type": "number" },
                            "cooccurrence": { "type": "number" },
                            "typeAffinity": { "type": "number" },
                            "importCluster": { "type": "number" }
                        }
                    },
                    "cooccurrenceScope": { "enum": ["file", "function"] }
                }
            },
            "parser": {
                "type": "object",
                "properties": {
                    "maxFileSize": { "type": "integer", "minimum": 0 }
                }
            }
        },
        "definitions": {
            "language": {
                "type": "object",
                "properties": {
                    "extractDocumentation": { "type": "boolean" },
                    "includePrivate": { "type": "boolean" },
                    "docstringFormat": { "type": ["string", "null"] },
                    "tsConfigPath": { "type": ["string", "null"] }
                }
            }
        }
    })
}

#[test]
fn test_default_config_matches_schema() {
    let schema = config_schema();
    let validator = validator_for(&schema).expect("schema should compile");
    let rendered = serde_json::to_value(LazyloadConfig::default()).unwrap();
    assert!(
        validator.is_valid(&rendered),
        "default config violates its schema: {:?}",
        validator.iter_errors(&rendered).collect::<Vec<_>>()
    );
}

#[test]
fn test_documented_defaults() {
    let config = LazyloadConfig::default();
    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["output"]["database"], ".lazyload/index.db");
    assert_eq!(value["synonyms"]["minWeightThreshold"], 0.3);
    assert_eq!(value["synonyms"]["maxExpansions"], 15);
    assert_eq!(value["markov"]["defaultDepth"], 2);
    assert_eq!(value["markov"]["defaultDecayFactor"], 0.7);
    assert_eq!(value["markov"]["minProbability"], 0.05);
    assert_eq!(value["markov"]["chainWeights"]["callFlow"], 0.4);
    assert_eq!(value["markov"]["chainWeights"]["cooccurrence"], 0.25);
    assert_eq!(value["markov"]["chainWeights"]["typeAffinity"], 0.2);
    assert_eq!(value["markov"]["chainWeights"]["importCluster"], 0.15);
    assert_eq!(value["parser"]["maxFileSize"], 1024 * 1024);
}

#[test]
fn test_old_configs_still_parse() {
    // A minimal config written by an early version keeps loading.
    let old = r#"{
        "directories": ["src"],
        "output": { "database": ".lazyload/index.db" }
    }"#;
    let parsed: LazyloadConfig = serde_json::from_str(old).unwrap();
    assert_eq!(parsed.directories, vec!["src"]);
    assert!(parsed.synonyms.enabled);
    assert!(parsed.markov.enabled);
}
