//! Configuration file loading for lazyload.
//!
//! Reads `.lazyload/config.json` and provides typed access to all settings.
//! Falls back to sensible defaults when the config file is missing or
//! incomplete, so old configs keep parsing as fields are added.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::ChainKind;

/// Top-level lazyload configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LazyloadConfig {
    #[serde(default = "default_directories")]
    pub directories: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub languages: LanguagesConfig,
    #[serde(default)]
    pub synonyms: SynonymsConfig,
    #[serde(default)]
    pub markov: MarkovConfig,
    #[serde(default)]
    pub parser: ParserConfig,
}

/// Where persisted state lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

/// Per-language parser options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguagesConfig {
    #[serde(default)]
    pub typescript: LanguageOptions,
    #[serde(default)]
    pub javascript: LanguageOptions,
    #[serde(default)]
    pub python: LanguageOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageOptions {
    #[serde(default = "default_true")]
    pub extract_documentation: bool,
    #[serde(default)]
    pub include_private: bool,
    /// `google`, `numpy`, or `sphinx`; `None` auto-detects (Python only).
    #[serde(default)]
    pub docstring_format: Option<String>,
    /// Explicit tsconfig.json location for path-alias loading (TS only).
    #[serde(default)]
    pub ts_config_path: Option<String>,
}

impl Default for LanguageOptions {
    fn default() -> Self {
        Self {
            extract_documentation: true,
            include_private: false,
            docstring_format: None,
            ts_config_path: None,
        }
    }
}

/// Synonym expansion tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub use_builtin_synonyms: bool,
    #[serde(default)]
    pub custom_synonyms: Vec<SynonymGroup>,
    /// canonical term -> replacement synonym list.
    #[serde(default)]
    pub overrides: std::collections::HashMap<String, Vec<SynonymEntry>>,
    /// Canonical terms to drop entirely.
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default = "default_min_weight")]
    pub min_weight_threshold: f64,
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,
}

impl Default for SynonymsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            use_builtin_synonyms: true,
            custom_synonyms: vec![],
            overrides: std::collections::HashMap::new(),
            disabled: vec![],
            min_weight_threshold: default_min_weight(),
            max_expansions: default_max_expansions(),
        }
    }
}

/// A canonical term plus its weighted synonyms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymGroup {
    pub canonical: String,
    #[serde(default)]
    pub category: Option<String>,
    pub synonyms: Vec<SynonymEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymEntry {
    pub term: String,
    /// `exact`, `abbreviation`, `conceptual`, or `implementation`.
    #[serde(default = "default_relation")]
    pub relation: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_true")]
    pub bidirectional: bool,
}

/// Markov suggestion engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkovConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub auto_rebuild: bool,
    #[serde(default = "default_chain_types")]
    pub chain_types: Vec<ChainKind>,
    #[serde(default = "default_depth")]
    pub default_depth: u32,
    #[serde(default = "default_decay")]
    pub default_decay_factor: f64,
    #[serde(default = "default_min_probability")]
    pub min_probability: f64,
    #[serde(default)]
    pub chain_weights: ChainWeights,
    /// `file` (default) or `function` pairing for the cooccurrence chain.
    #[serde(default = "default_cooccurrence_scope")]
    pub cooccurrence_scope: String,
}

impl Default for MarkovConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_rebuild: true,
            chain_types: default_chain_types(),
            default_depth: default_depth(),
            default_decay_factor: default_decay(),
            min_probability: default_min_probability(),
            chain_weights: ChainWeights::default(),
            cooccurrence_scope: default_cooccurrence_scope(),
        }
    }
}

/// Relative weight of each chain in the composite suggestion score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainWeights {
    #[serde(default = "default_w_call_flow")]
    pub call_flow: f64,
    #[serde(default = "default_w_cooccurrence")]
    pub cooccurrence: f64,
    #[serde(default = "default_w_type_affinity")]
    pub type_affinity: f64,
    #[serde(default = "default_w_import_cluster")]
    pub import_cluster: f64,
}

impl ChainWeights {
    pub fn weight(&self, chain: ChainKind) -> f64 {
        match chain {
            ChainKind::CallFlow => self.call_flow,
            ChainKind::Cooccurrence => self.cooccurrence,
            ChainKind::TypeAffinity => self.type_affinity,
            ChainKind::ImportCluster => self.import_cluster,
        }
    }
}

impl Default for ChainWeights {
    fn default() -> Self {
        Self {
            call_flow: default_w_call_flow(),
            cooccurrence: default_w_cooccurrence(),
            type_affinity: default_w_type_affinity(),
            import_cluster: default_w_import_cluster(),
        }
    }
}

/// Parser guards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserConfig {
    /// Files larger than this are recorded as skipped. 0 = unlimited.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_directories() -> Vec<String> {
    vec![".".to_string()]
}
fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/.git/**".to_string(),
        "**/dist/**".to_string(),
        "**/build/**".to_string(),
        "**/__pycache__/**".to_string(),
    ]
}
fn default_database() -> String {
    ".lazyload/index.db".to_string()
}
fn default_min_weight() -> f64 {
    0.3
}
fn default_max_expansions() -> usize {
    15
}
fn default_relation() -> String {
    "conceptual".to_string()
}
fn default_weight() -> f64 {
    0.7
}
fn default_chain_types() -> Vec<ChainKind> {
    ChainKind::ALL.to_vec()
}
fn default_depth() -> u32 {
    2
}
fn default_decay() -> f64 {
    0.7
}
fn default_min_probability() -> f64 {
    0.05
}
fn default_cooccurrence_scope() -> String {
    "file".to_string()
}
fn default_w_call_flow() -> f64 {
    0.4
}
fn default_w_cooccurrence() -> f64 {
    0.25
}
fn default_w_type_affinity() -> f64 {
    0.2
}
fn default_w_import_cluster() -> f64 {
    0.15
}
fn default_max_file_size() -> u64 {
    1024 * 1024
}

impl Default for LazyloadConfig {
    fn default() -> Self {
        Self {
            directories: default_directories(),
            include: vec![],
            exclude: default_exclude(),
            output: OutputConfig::default(),
            languages: LanguagesConfig::default(),
            synonyms: SynonymsConfig::default(),
            markov: MarkovConfig::default(),
            parser: ParserConfig::default(),
        }
    }
}

impl LazyloadConfig {
    /// Load configuration from `config.json` inside the given lazyload
    /// directory. Returns defaults if the file doesn't exist or can't be
    /// parsed.
    pub fn load(lazyload_dir: &Path) -> Self {
        let config_path = lazyload_dir.join("config.json");
        let content = match std::fs::read_to_string(&config_path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!(
                    "lazyload: warning: failed to parse {}: {}, using defaults",
                    config_path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Options for a specific language tag.
    pub fn language_options(&self, language: crate::types::Language) -> &LanguageOptions {
        match language {
            crate::types::Language::TypeScript => &self.languages.typescript,
            crate::types::Language::JavaScript => &self.languages.javascript,
            crate::types::Language::Python => &self.languages.python,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let cfg = LazyloadConfig::default();
        assert_eq!(cfg.directories, vec!["."]);
        assert_eq!(cfg.output.database, ".lazyload/index.db");
        assert!(cfg.synonyms.enabled);
        assert_eq!(cfg.synonyms.min_weight_threshold, 0.3);
        assert_eq!(cfg.synonyms.max_expansions, 15);
        assert!(cfg.markov.enabled);
        assert_eq!(cfg.markov.default_depth, 2);
        assert_eq!(cfg.markov.default_decay_factor, 0.7);
        assert_eq!(cfg.markov.min_probability, 0.05);
        assert_eq!(cfg.markov.chain_weights.call_flow, 0.4);
        assert_eq!(cfg.markov.chain_weights.cooccurrence, 0.25);
        assert_eq!(cfg.markov.chain_weights.type_affinity, 0.2);
        assert_eq!(cfg.markov.chain_weights.import_cluster, 0.15);
        assert_eq!(cfg.parser.max_file_size, 1024 * 1024);
    }

    #[test]
    fn test_roundtrip_non_default_values() {
        let mut overrides = std::collections::HashMap::new();
        overrides.insert(
            "fetch".to_string(),
            vec![SynonymEntry {
                term: "retrieve".to_string(),
                relation: "exact".to_string(),
                weight: 0.95,
                bidirectional: false,
            }],
        );
        let original = LazyloadConfig {
            directories: vec!["src".to_string(), "lib".to_string()],
            include: vec!["**/*.ts".to_string()],
            exclude: vec!["**/vendor/**".to_string()],
            output: OutputConfig {
                database: "/tmp/custom.db".to_string(),
            },
            languages: LanguagesConfig {
                typescript: LanguageOptions {
                    extract_documentation: false,
                    include_private: true,
                    docstring_format: None,
                    ts_config_path: Some("web/tsconfig.json".to_string()),
                },
                javascript: LanguageOptions::default(),
                python: LanguageOptions {
                    docstring_format: Some("numpy".to_string()),
                    ..LanguageOptions::default()
                },
            },
            synonyms: SynonymsConfig {
                enabled: false,
                use_builtin_synonyms: false,
                custom_synonyms: vec![SynonymGroup {
                    canonical: "persist".to_string(),
                    category: Some("storage".to_string()),
                    synonyms: vec![SynonymEntry {
                        term: "save".to_string(),
                        relation: "conceptual".to_string(),
                        weight: 0.8,
                        bidirectional: true,
                    }],
                }],
                overrides,
                disabled: vec!["delete".to_string()],
                min_weight_threshold: 0.5,
                max_expansions: 7,
            },
            markov: MarkovConfig {
                enabled: false,
                auto_rebuild: false,
                chain_types: vec![ChainKind::CallFlow],
                default_depth: 4,
                default_decay_factor: 0.5,
                min_probability: 0.1,
                chain_weights: ChainWeights {
                    call_flow: 0.7,
                    cooccurrence: 0.1,
                    type_affinity: 0.1,
                    import_cluster: 0.1,
                },
                cooccurrence_scope: "function".to_string(),
            },
            parser: ParserConfig { max_file_size: 0 },
        };

        let json = serde_json::to_string_pretty(&original).expect("config should serialize");
        let roundtripped: LazyloadConfig =
            serde_json::from_str(&json).expect("config JSON should deserialize back");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn test_load_missing_file() {
        let cfg = LazyloadConfig::load(Path::new("/nonexistent"));
        assert_eq!(cfg.synonyms.max_expansions, 15);
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = serde_json::json!({
            "directories": ["src"],
            "markov": { "defaultDepth": 3 }
        });
        fs::write(dir.path().join("config.json"), config.to_string()).unwrap();
        let cfg = LazyloadConfig::load(dir.path());
        assert_eq!(cfg.directories, vec!["src"]);
        assert_eq!(cfg.markov.default_depth, 3);
        assert_eq!(cfg.markov.default_decay_factor, 0.7); // default
        assert!(cfg.synonyms.enabled); // default
    }

    #[test]
    fn test_load_invalid_json_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();
        let cfg = LazyloadConfig::load(dir.path());
        assert_eq!(cfg, LazyloadConfig::default());
    }

    #[test]
    fn test_camel_case_keys() {
        let json = r#"{
            "synonyms": { "minWeightThreshold": 0.4, "maxExpansions": 10 },
            "parser": { "maxFileSize": 2048 }
        }"#;
        let cfg: LazyloadConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.synonyms.min_weight_threshold, 0.4);
        assert_eq!(cfg.synonyms.max_expansions, 10);
        assert_eq!(cfg.parser.max_file_size, 2048);
    }

    #[test]
    fn test_chain_weight_lookup() {
        let w = ChainWeights::default();
        assert_eq!(w.weight(ChainKind::CallFlow), 0.4);
        assert_eq!(w.weight(ChainKind::ImportCluster), 0.15);
    }
}
