use crate::typeinfo::TypeMatchMode;
use crate::types::{
    CallEdge, ChainKind, ChainStats, FileFilter, FileIndex, FileRecord, Import, IndexStats,
    StoreError, Symbol, SymbolHit, SymbolKind, SymbolReference, SymbolSearchOptions, Transition,
    TypeRelationship,
};

/// Options for a type-signature search.
#[derive(Debug, Clone, Default)]
pub struct TypeSearchOptions {
    pub return_type: Option<String>,
    pub param_type: Option<String>,
    pub mode: Option<TypeMatchMode>,
    pub include_async_variants: bool,
    pub language: Option<crate::types::Language>,
    pub limit: usize,
}

/// One hop of the transitive dependency walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
    pub from: String,
    pub to: String,
    pub depth: u32,
}

/// Upward chain and downward tree for a named type.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    pub name: String,
    /// Ancestors following `extends`, nearest first.
    pub ancestors: Vec<String>,
    /// Descendants with their distance from `name`.
    pub descendants: Vec<(String, u32)>,
}

/// Counts from one symbol-resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub references_resolved: u64,
    pub calls_resolved: u64,
    pub type_relationships_resolved: u64,
}

/// FROZEN CONTRACT — IndexStore trait.
///
/// The storage seam between the SQLite layer and everything above it
/// (indexer, suggestion engine, query tools). The storage layer is the only
/// component permitted to mutate on-disk state.
pub trait IndexStore {
    // -- files ---------------------------------------------------------------

    /// Atomically replace all rows keyed by `index.file.path`.
    fn put_file(&mut self, index: &FileIndex) -> Result<(), StoreError>;

    /// Remove a file and everything it owns. Returns whether it existed.
    fn remove_file(&mut self, path: &str) -> Result<bool, StoreError>;

    fn get_file(&self, path: &str) -> Option<FileRecord>;

    /// Cheap checksum lookup for the indexer's change gate.
    fn get_checksum(&self, path: &str) -> Option<String>;

    fn list_files(&self, filter: &FileFilter) -> Vec<FileRecord>;

    fn all_file_paths(&self) -> Vec<String>;

    fn stats(&self) -> IndexStats;

    // -- symbols -------------------------------------------------------------

    fn get_symbol(&self, id: &str) -> Option<Symbol>;

    fn get_symbols_by_name(&self, name: &str, kind: Option<SymbolKind>) -> Vec<Symbol>;

    fn get_symbols_in_file(&self, path: &str) -> Vec<Symbol>;

    /// Full-text search. `fts_query` is an FTS5 MATCH expression (the synonym
    /// expander builds these). Hits carry the backend score, higher = better.
    fn search_symbols(&self, fts_query: &str, opts: &SymbolSearchOptions) -> Vec<SymbolHit>;

    /// Signature search over normalized function type slots.
    fn search_by_type(&self, opts: &TypeSearchOptions) -> Vec<SymbolHit>;

    // -- graphs --------------------------------------------------------------

    fn get_references_by_name(&self, name: &str) -> Vec<SymbolReference>;

    /// Call edges whose callee matches the given name or symbol ID.
    fn get_callers(&self, callee: &str) -> Vec<CallEdge>;

    /// Call edges whose caller matches the given name or symbol ID.
    fn get_callees(&self, caller: &str) -> Vec<CallEdge>;

    /// `extends` edges pointing at the named type.
    fn get_subtypes(&self, name: &str) -> Vec<TypeRelationship>;

    /// `implements` edges pointing at the named interface.
    fn find_implementations(&self, name: &str) -> Vec<TypeRelationship>;

    /// Outgoing relationship edges of the named type.
    fn get_supertypes(&self, name: &str) -> Vec<TypeRelationship>;

    fn get_type_hierarchy(&self, name: &str, max_depth: u32) -> TypeHierarchy;

    // -- module dependencies -------------------------------------------------

    fn get_file_imports(&self, path: &str) -> Vec<Import>;

    /// Files whose imports resolve to `path`.
    fn get_reverse_dependencies(&self, path: &str) -> Vec<String>;

    /// BFS edges of the local import graph from `path`, up to `depth` hops.
    fn get_transitive_dependencies(&self, path: &str, depth: u32) -> Vec<DepEdge>;

    /// First import cycle reachable from `path`, as a closed path, if any.
    fn detect_circular_dependencies(&self, path: &str) -> Option<Vec<String>>;

    // -- resolution ----------------------------------------------------------

    /// Bulk pass filling null symbol IDs on references, call edges, and type
    /// relationships: file-local names win over global ones; names that match
    /// nothing stay null (external symbols).
    fn resolve_symbol_references(&mut self) -> Result<ResolutionStats, StoreError>;

    // -- markov chains -------------------------------------------------------

    fn get_chain_id(&self, chain: ChainKind) -> Option<i64>;

    /// Replace a chain's transitions atomically; raw counts are normalized
    /// into probabilities per from-state.
    fn rebuild_chain(
        &mut self,
        chain: ChainKind,
        transitions: &[(String, String, u32)],
    ) -> Result<(), StoreError>;

    fn get_transitions(&self, chain: ChainKind, from_state: &str) -> Vec<Transition>;

    fn has_chain_support(&self, chain: ChainKind, state: &str) -> bool;

    fn get_all_chain_stats(&self) -> Vec<ChainStats>;

    // -- bulk reads for the chain builders ------------------------------------

    /// All call edges with both endpoints resolved.
    fn resolved_call_edges(&self) -> Vec<CallEdge>;

    /// `(referencing_file, referencing_symbol_id, symbol_id)` for every
    /// resolved reference.
    fn resolved_reference_rows(&self) -> Vec<(String, Option<String>, String)>;

    /// `(symbol_id, language, slot, raw_type)` for every stored type slot.
    fn type_slot_rows(&self) -> Vec<(String, crate::types::Language, String, String)>;

    /// `(file_path, import target)` where the target is the resolved path for
    /// local imports or the source string for external ones.
    fn import_target_rows(&self) -> Vec<(String, String)>;
}
