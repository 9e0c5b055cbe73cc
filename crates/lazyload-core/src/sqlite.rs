use std::path::Path;

use rusqlite::{params, Connection};

use crate::types::{FileIndex, StoreError};

pub(crate) const SCHEMA_VERSION: u32 = 1;

/// SQLite-backed implementation of the IndexStore trait.
///
/// One connection, one writer: mutations run inside a single transaction per
/// call, readers observe the state at transaction start.
pub struct SqliteIndexStore {
    pub(crate) conn: Connection,
}

impl SqliteIndexStore {
    /// Open or create an index database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Internal(format!("create {}: {}", parent.display(), e)))?;
            }
        }
        let conn = Connection::open(path)?;
        let store = SqliteIndexStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory index database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteIndexStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Files
            CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                language TEXT NOT NULL,
                checksum TEXT NOT NULL,
                mtime_ms INTEGER NOT NULL,
                line_count INTEGER NOT NULL,
                byte_size INTEGER NOT NULL,
                parse_status TEXT NOT NULL CHECK (parse_status IN ('complete', 'skipped', 'errored')),
                warnings TEXT NOT NULL DEFAULT '[]',
                indexed_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_files_language ON files(language);

            -- Symbols (polymorphic via kind; variant payload in data JSON)
            CREATE TABLE IF NOT EXISTS symbols (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                qualified_name TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('function', 'method', 'constructor', 'callback', 'class', 'interface', 'type_alias', 'variable')),
                file_path TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
                language TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                start_column INTEGER NOT NULL,
                end_column INTEGER NOT NULL,
                exported INTEGER NOT NULL DEFAULT 0,
                signature TEXT NOT NULL DEFAULT '',
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
            CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_path);
            CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);
            CREATE INDEX IF NOT EXISTS idx_symbols_qualified ON symbols(qualified_name);

            -- Ordered parameters, projected out of function-like symbols
            CREATE TABLE IF NOT EXISTS function_params (
                id INTEGER PRIMARY KEY,
                symbol_id TEXT NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                type_name TEXT,
                default_value TEXT,
                optional INTEGER NOT NULL DEFAULT 0,
                rest INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_params_symbol ON function_params(symbol_id);

            -- Imports
            CREATE TABLE IF NOT EXISTS imports (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
                source TEXT NOT NULL,
                is_type_only INTEGER NOT NULL DEFAULT 0,
                line INTEGER NOT NULL,
                resolved_path TEXT,
                is_external INTEGER NOT NULL DEFAULT 0,
                is_builtin INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_imports_file ON imports(file_path);
            CREATE INDEX IF NOT EXISTS idx_imports_resolved ON imports(resolved_path);

            CREATE TABLE IF NOT EXISTS import_specifiers (
                id INTEGER PRIMARY KEY,
                import_id INTEGER NOT NULL REFERENCES imports(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                alias TEXT,
                is_default INTEGER NOT NULL DEFAULT 0,
                is_namespace INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_specifiers_import ON import_specifiers(import_id);

            -- Exports
            CREATE TABLE IF NOT EXISTS exports (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                line INTEGER NOT NULL,
                is_reexport INTEGER NOT NULL DEFAULT 0,
                reexport_source TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_exports_file ON exports(file_path);

            -- References (symbol uses); ID fields filled by the resolution pass
            CREATE TABLE IF NOT EXISTS symbol_references (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
                symbol_id TEXT,
                symbol_name TEXT NOT NULL,
                referencing_symbol_id TEXT,
                referencing_symbol_name TEXT,
                line INTEGER NOT NULL,
                column INTEGER NOT NULL,
                context TEXT NOT NULL DEFAULT '',
                kind TEXT NOT NULL CHECK (kind IN ('call', 'read', 'write', 'type', 'import'))
            );
            CREATE INDEX IF NOT EXISTS idx_refs_name ON symbol_references(symbol_name);
            CREATE INDEX IF NOT EXISTS idx_refs_file ON symbol_references(file_path);
            CREATE INDEX IF NOT EXISTS idx_refs_unresolved ON symbol_references(symbol_id) WHERE symbol_id IS NULL;

            -- Call graph; one row per caller/callee pair with a count
            CREATE TABLE IF NOT EXISTS call_edges (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
                caller_symbol_id TEXT NOT NULL,
                caller_name TEXT NOT NULL,
                callee_symbol_id TEXT,
                callee_name TEXT NOT NULL,
                call_count INTEGER NOT NULL DEFAULT 1,
                is_async INTEGER NOT NULL DEFAULT 0,
                is_conditional INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_calls_caller ON call_edges(caller_symbol_id);
            CREATE INDEX IF NOT EXISTS idx_calls_callee_name ON call_edges(callee_name);
            CREATE INDEX IF NOT EXISTS idx_calls_file ON call_edges(file_path);

            -- Inheritance / implementation edges
            CREATE TABLE IF NOT EXISTS type_relationships (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
                source_symbol_id TEXT NOT NULL,
                source_name TEXT NOT NULL,
                target_symbol_id TEXT,
                target_name TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('extends', 'implements', 'mixin'))
            );
            CREATE INDEX IF NOT EXISTS idx_typerel_source ON type_relationships(source_name);
            CREATE INDEX IF NOT EXISTS idx_typerel_target ON type_relationships(target_name);

            -- Normalized signature slots for type search
            CREATE TABLE IF NOT EXISTS symbol_type_info (
                id INTEGER PRIMARY KEY,
                symbol_id TEXT NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
                language TEXT NOT NULL,
                slot TEXT NOT NULL,
                raw_type TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_type_info_symbol ON symbol_type_info(symbol_id);
            CREATE INDEX IF NOT EXISTS idx_type_info_slot ON symbol_type_info(slot);

            -- Full-text search over name + signature + docs
            CREATE VIRTUAL TABLE IF NOT EXISTS fts_symbols USING fts5(
                symbol_id UNINDEXED,
                name,
                signature,
                doc
            );

            -- Markov chains
            CREATE TABLE IF NOT EXISTS markov_chains (
                id INTEGER PRIMARY KEY,
                chain_type TEXT NOT NULL UNIQUE,
                built_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS markov_states (
                id INTEGER PRIMARY KEY,
                chain_id INTEGER NOT NULL REFERENCES markov_chains(id) ON DELETE CASCADE,
                state TEXT NOT NULL,
                UNIQUE (chain_id, state)
            );

            CREATE TABLE IF NOT EXISTS markov_transitions (
                id INTEGER PRIMARY KEY,
                chain_id INTEGER NOT NULL REFERENCES markov_chains(id) ON DELETE CASCADE,
                from_state TEXT NOT NULL,
                to_state TEXT NOT NULL,
                raw_count INTEGER NOT NULL,
                probability REAL NOT NULL,
                UNIQUE (chain_id, from_state, to_state)
            );
            CREATE INDEX IF NOT EXISTS idx_transitions_from ON markov_transitions(chain_id, from_state);
            ",
        )?;

        // Set schema version if not present
        self.conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;

        let stored = self.schema_version()?;
        if stored > SCHEMA_VERSION {
            return Err(StoreError::SchemaMigration {
                from: stored,
                to: SCHEMA_VERSION,
            });
        }

        Ok(())
    }

    /// Get the current schema version.
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        let version: String = self.conn.query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        version
            .parse()
            .map_err(|e| StoreError::Internal(format!("Invalid schema version: {}", e)))
    }

    /// Atomic replacement of all rows keyed by the file path: cascade delete
    /// of the old generation plus bulk insert of the new one, in one
    /// transaction. No mixing of old and new versions is observable.
    pub(crate) fn put_file_tx(&mut self, index: &FileIndex) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        // FTS rows have no foreign key; clear them for the outgoing symbols.
        tx.execute(
            "DELETE FROM fts_symbols WHERE symbol_id IN (SELECT id FROM symbols WHERE file_path = ?1)",
            params![index.file.path],
        )?;
        tx.execute("DELETE FROM files WHERE path = ?1", params![index.file.path])?;

        tx.execute(
            "INSERT INTO files (path, language, checksum, mtime_ms, line_count, byte_size, parse_status, warnings)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                index.file.path,
                index.file.language.as_str(),
                index.file.checksum,
                index.file.mtime_ms,
                index.file.line_count,
                index.file.byte_size,
                index.file.parse_status.as_str(),
                serde_json::to_string(&index.file.warnings).unwrap_or_else(|_| "[]".into()),
            ],
        )?;

        Self::insert_symbols(&tx, index)?;
        Self::insert_imports(&tx, index)?;
        Self::insert_exports(&tx, index)?;
        Self::insert_references(&tx, index)?;
        Self::insert_calls(&tx, index)?;
        Self::insert_type_relationships(&tx, index)?;

        tx.commit()?;
        Ok(())
    }

    pub(crate) fn remove_file_tx(&mut self, path: &str) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM fts_symbols WHERE symbol_id IN (SELECT id FROM symbols WHERE file_path = ?1)",
            params![path],
        )?;
        let removed = tx.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod sqlite_tests;
