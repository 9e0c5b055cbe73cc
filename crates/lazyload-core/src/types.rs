use serde::{Deserialize, Serialize};

/// Languages the indexer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
}

impl Language {
    /// Returns the lowercase string representation of this language.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "typescript" => Some(Language::TypeScript),
            "javascript" => Some(Language::JavaScript),
            "python" => Some(Language::Python),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the last parse attempt for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    /// Symbols were extracted.
    Complete,
    /// File-size guard tripped; a placeholder row keeps the file visible.
    Skipped,
    /// The parser failed; whatever it could emit was kept.
    Errored,
}

impl ParseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStatus::Complete => "complete",
            ParseStatus::Skipped => "skipped",
            ParseStatus::Errored => "errored",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "skipped" => ParseStatus::Skipped,
            "errored" => ParseStatus::Errored,
            _ => ParseStatus::Complete,
        }
    }
}

/// Source location. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub start_line: u32,
    pub end_line: u32,
    pub start_column: u32,
    pub end_column: u32,
}

/// One indexed file. Identified by absolute path; owns all dependent rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub language: Language,
    /// base62(xxh64) of the raw bytes; gates re-indexing.
    pub checksum: String,
    pub mtime_ms: i64,
    pub line_count: u32,
    pub byte_size: u64,
    pub parse_status: ParseStatus,
    pub warnings: Vec<String>,
}

/// Discriminator stored in the `symbols.kind` column for SQL filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Constructor,
    Callback,
    Class,
    Interface,
    TypeAlias,
    Variable,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Callback => "callback",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Variable => "variable",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "function" => Some(SymbolKind::Function),
            "method" => Some(SymbolKind::Method),
            "constructor" => Some(SymbolKind::Constructor),
            "callback" => Some(SymbolKind::Callback),
            "class" => Some(SymbolKind::Class),
            "interface" => Some(SymbolKind::Interface),
            "type_alias" => Some(SymbolKind::TypeAlias),
            "variable" => Some(SymbolKind::Variable),
            _ => None,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function/method parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub type_name: Option<String>,
    pub default_value: Option<String>,
    pub optional: bool,
    pub rest: bool,
}

/// Extracted documentation (JSDoc or docstring).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocBlock {
    pub description: Option<String>,
    pub params: Vec<DocParam>,
    pub returns: Option<String>,
    pub throws: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocParam {
    pub name: String,
    pub description: String,
}

/// Modifier flags for function-like symbols.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionModifiers {
    pub exported: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub visibility: Option<String>,
    /// Host method for callbacks (`describe`, `then`, `on:<event>`, ...).
    pub callback_context: Option<String>,
}

/// Payload for function-like symbols (function, method, constructor, callback).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionData {
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    pub type_params: Vec<String>,
    pub modifiers: FunctionModifiers,
    pub docs: Option<DocBlock>,
    /// Containing class name, for methods/constructors.
    pub parent_class: Option<String>,
    /// Name in the enclosing scope, for nested functions.
    pub local_name: Option<String>,
    /// Decorators preserved as written (Python).
    pub decorators: Vec<String>,
}

/// A class property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    pub type_name: Option<String>,
    pub is_static: bool,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassData {
    pub methods: Vec<String>,
    pub properties: Vec<PropertyInfo>,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub type_params: Vec<String>,
    pub is_abstract: bool,
    pub exported: bool,
    pub docs: Option<DocBlock>,
    pub decorators: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterfaceData {
    pub methods: Vec<String>,
    pub properties: Vec<PropertyInfo>,
    pub extends: Vec<String>,
    pub type_params: Vec<String>,
    pub exported: bool,
    pub docs: Option<DocBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeAliasData {
    pub aliased: String,
    pub type_params: Vec<String>,
    pub exported: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableData {
    pub declared_type: Option<String>,
    /// What the initializer syntactically is (`arrow_function`, `literal`, ...).
    pub initializer_kind: Option<String>,
    pub exported: bool,
}

/// Per-variant payload. The row-level discriminator is [`Symbol::kind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum SymbolData {
    Function(FunctionData),
    Class(ClassData),
    Interface(InterfaceData),
    TypeAlias(TypeAliasData),
    Variable(VariableData),
}

/// The polymorphic unit of the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    /// Stable ID: `"<path>:<name>:<kind>:<line>"`. Unique per database.
    pub id: String,
    pub name: String,
    /// `"<module-path>#[<parent>.]<name>"`.
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub language: Language,
    pub location: Location,
    pub data: SymbolData,
}

impl Symbol {
    /// Builds the stable symbol ID from its identifying parts.
    pub fn make_id(path: &str, name: &str, kind: SymbolKind, line: u32) -> String {
        format!("{}:{}:{}:{}", path, name, kind.as_str(), line)
    }

    /// A one-line signature for search results and listings.
    pub fn signature(&self) -> String {
        match &self.data {
            SymbolData::Function(f) => {
                let params: Vec<String> = f
                    .params
                    .iter()
                    .map(|p| match &p.type_name {
                        Some(t) => format!("{}: {}", p.name, t),
                        None => p.name.clone(),
                    })
                    .collect();
                let ret = f
                    .return_type
                    .as_deref()
                    .map(|r| format!(" -> {}", r))
                    .unwrap_or_default();
                format!("{}({}){}", self.name, params.join(", "), ret)
            }
            SymbolData::Class(c) => match &c.extends {
                Some(base) => format!("class {} extends {}", self.name, base),
                None => format!("class {}", self.name),
            },
            SymbolData::Interface(_) => format!("interface {}", self.name),
            SymbolData::TypeAlias(t) => format!("type {} = {}", self.name, t.aliased),
            SymbolData::Variable(v) => match &v.declared_type {
                Some(t) => format!("{}: {}", self.name, t),
                None => self.name.clone(),
            },
        }
    }

    /// Whether the symbol is visible outside its module.
    pub fn is_exported(&self) -> bool {
        match &self.data {
            SymbolData::Function(f) => f.modifiers.exported,
            SymbolData::Class(c) => c.exported,
            SymbolData::Interface(i) => i.exported,
            SymbolData::TypeAlias(t) => t.exported,
            SymbolData::Variable(v) => v.exported,
        }
    }

    /// Text indexed by the full-text search: docs flattened to one string.
    pub fn doc_text(&self) -> String {
        let docs = match &self.data {
            SymbolData::Function(f) => f.docs.as_ref(),
            SymbolData::Class(c) => c.docs.as_ref(),
            SymbolData::Interface(i) => i.docs.as_ref(),
            _ => None,
        };
        match docs {
            Some(d) => {
                let mut text = d.description.clone().unwrap_or_default();
                for p in &d.params {
                    text.push(' ');
                    text.push_str(&p.description);
                }
                if let Some(r) = &d.returns {
                    text.push(' ');
                    text.push_str(r);
                }
                text
            }
            None => String::new(),
        }
    }
}

/// The flavour of an identifier use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Call,
    Read,
    Write,
    Type,
    Import,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Call => "call",
            ReferenceKind::Read => "read",
            ReferenceKind::Write => "write",
            ReferenceKind::Type => "type",
            ReferenceKind::Import => "import",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "call" => ReferenceKind::Call,
            "write" => ReferenceKind::Write,
            "type" => ReferenceKind::Type,
            "import" => ReferenceKind::Import,
            _ => ReferenceKind::Read,
        }
    }
}

/// One identifier use. ID fields are filled by the resolution pass;
/// until then they are `None` and the row is matched by name only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolReference {
    pub id: i64,
    pub symbol_id: Option<String>,
    pub symbol_name: String,
    pub referencing_file: String,
    pub referencing_symbol_id: Option<String>,
    pub referencing_symbol_name: Option<String>,
    pub line: u32,
    pub column: u32,
    /// The source line the reference appears on, trimmed.
    pub context: String,
    pub kind: ReferenceKind,
}

/// A collapsed caller→callee edge with an occurrence count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdge {
    pub id: i64,
    pub caller_symbol_id: String,
    pub caller_name: String,
    pub callee_symbol_id: Option<String>,
    pub callee_name: String,
    pub call_count: u32,
    pub is_async: bool,
    pub is_conditional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRelationKind {
    Extends,
    Implements,
    Mixin,
}

impl TypeRelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeRelationKind::Extends => "extends",
            TypeRelationKind::Implements => "implements",
            TypeRelationKind::Mixin => "mixin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "implements" => TypeRelationKind::Implements,
            "mixin" => TypeRelationKind::Mixin,
            _ => TypeRelationKind::Extends,
        }
    }
}

/// An inheritance/implementation edge between named types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRelationship {
    pub id: i64,
    pub source_symbol_id: String,
    pub source_name: String,
    pub target_symbol_id: Option<String>,
    pub target_name: String,
    pub kind: TypeRelationKind,
}

/// One name brought in by an import statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSpecifier {
    pub name: String,
    pub alias: Option<String>,
    pub is_default: bool,
    pub is_namespace: bool,
}

/// An import statement, annotated by the import resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Import {
    pub source: String,
    pub specifiers: Vec<ImportSpecifier>,
    pub is_type_only: bool,
    pub line: u32,
    pub resolved_path: Option<String>,
    pub is_external: bool,
    pub is_builtin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub kind: String,
    pub line: u32,
    pub is_reexport: bool,
    pub reexport_source: Option<String>,
}

/// Everything one successful parse produced for a file. `put_file` replaces
/// all rows for `file.path` with exactly this content, atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileIndex {
    pub file: FileRecord,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub references: Vec<SymbolReference>,
    pub calls: Vec<CallEdge>,
    pub type_relationships: Vec<TypeRelationship>,
}

/// The four persisted relationship chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    CallFlow,
    Cooccurrence,
    TypeAffinity,
    ImportCluster,
}

impl ChainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainKind::CallFlow => "call_flow",
            ChainKind::Cooccurrence => "cooccurrence",
            ChainKind::TypeAffinity => "type_affinity",
            ChainKind::ImportCluster => "import_cluster",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "call_flow" => Some(ChainKind::CallFlow),
            "cooccurrence" => Some(ChainKind::Cooccurrence),
            "type_affinity" => Some(ChainKind::TypeAffinity),
            "import_cluster" => Some(ChainKind::ImportCluster),
            _ => None,
        }
    }

    pub const ALL: [ChainKind; 4] = [
        ChainKind::CallFlow,
        ChainKind::Cooccurrence,
        ChainKind::TypeAffinity,
        ChainKind::ImportCluster,
    ];
}

impl std::fmt::Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A weighted out-edge of a chain state. After normalization the
/// probabilities over each `from_state` sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub chain_id: i64,
    pub from_state: String,
    pub to_state: String,
    pub raw_count: u32,
    pub probability: f64,
}

/// Per-chain aggregate counts for `stats` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStats {
    pub chain: ChainKind,
    pub state_count: u64,
    pub transition_count: u64,
}

/// Filter for `list_files`.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub directory: Option<String>,
    pub language: Option<Language>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Options for full-text symbol search.
#[derive(Debug, Clone, Default)]
pub struct SymbolSearchOptions {
    pub kind: Option<SymbolKind>,
    pub language: Option<Language>,
    pub limit: usize,
    /// Append a prefix wildcard to each term.
    pub prefix: bool,
}

/// A search hit with its backend score.
#[derive(Debug, Clone)]
pub struct SymbolHit {
    pub symbol: Symbol,
    pub score: f64,
}

/// Normalized signature slot used by type search. `slot` is `"return"` or
/// `"param:<index>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeInfoRow {
    pub symbol_id: String,
    pub slot: String,
    pub raw_type: String,
}

/// Summary counts returned by `stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub file_count: u64,
    pub symbol_count: u64,
    pub reference_count: u64,
    pub call_count: u64,
    pub resolved_references: u64,
}

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("File not indexed: {0}")]
    FileNotFound(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Schema migration required: v{from} -> v{to}")]
    SchemaMigration { from: u32, to: u32 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_id_format() {
        let id = Symbol::make_id("src/app.ts", "greet", SymbolKind::Function, 12);
        assert_eq!(id, "src/app.ts:greet:function:12");
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            SymbolKind::Function,
            SymbolKind::Method,
            SymbolKind::Constructor,
            SymbolKind::Callback,
            SymbolKind::Class,
            SymbolKind::Interface,
            SymbolKind::TypeAlias,
            SymbolKind::Variable,
        ] {
            assert_eq!(SymbolKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(SymbolKind::from_str("enum"), None);
    }

    #[test]
    fn test_chain_kind_roundtrip() {
        for chain in ChainKind::ALL {
            assert_eq!(ChainKind::from_str(chain.as_str()), Some(chain));
        }
    }

    #[test]
    fn test_function_signature() {
        let sym = Symbol {
            id: "src/a.ts:greet:function:1".into(),
            name: "greet".into(),
            qualified_name: "src/a#greet".into(),
            kind: SymbolKind::Function,
            file_path: "src/a.ts".into(),
            language: Language::TypeScript,
            location: Location::default(),
            data: SymbolData::Function(FunctionData {
                params: vec![Param {
                    name: "name".into(),
                    type_name: Some("string".into()),
                    ..Param::default()
                }],
                return_type: Some("string".into()),
                ..FunctionData::default()
            }),
        };
        assert_eq!(sym.signature(), "greet(name: string) -> string");
    }

    #[test]
    fn test_doc_text_flattens_sections() {
        let sym = Symbol {
            id: "src/a.ts:greet:function:1".into(),
            name: "greet".into(),
            qualified_name: "src/a#greet".into(),
            kind: SymbolKind::Function,
            file_path: "src/a.ts".into(),
            language: Language::TypeScript,
            location: Location::default(),
            data: SymbolData::Function(FunctionData {
                docs: Some(DocBlock {
                    description: Some("Greets a user".into()),
                    params: vec![DocParam {
                        name: "name".into(),
                        description: "who to greet".into(),
                    }],
                    returns: Some("the greeting".into()),
                    throws: None,
                }),
                ..FunctionData::default()
            }),
        };
        let text = sym.doc_text();
        assert!(text.contains("Greets a user"));
        assert!(text.contains("who to greet"));
        assert!(text.contains("the greeting"));
    }
}
