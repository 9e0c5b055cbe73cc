use rusqlite::{params, Result as SqlResult, Row, Transaction};

use crate::sqlite::SqliteIndexStore;
use crate::types::{
    CallEdge, FileIndex, FileRecord, Import, ImportSpecifier, Language, Location, ParseStatus,
    ReferenceKind, StoreError, Symbol, SymbolData, SymbolKind, SymbolReference, TypeRelationKind,
    TypeRelationship,
};

impl SqliteIndexStore {
    pub(crate) fn row_to_file(row: &Row) -> SqlResult<FileRecord> {
        let language: String = row.get("language")?;
        let status: String = row.get("parse_status")?;
        let warnings: String = row.get("warnings")?;
        Ok(FileRecord {
            path: row.get("path")?,
            language: Language::from_str(&language).unwrap_or(Language::JavaScript),
            checksum: row.get("checksum")?,
            mtime_ms: row.get("mtime_ms")?,
            line_count: row.get("line_count")?,
            byte_size: row.get("byte_size")?,
            parse_status: ParseStatus::from_str(&status),
            warnings: serde_json::from_str(&warnings).unwrap_or_default(),
        })
    }

    pub(crate) fn row_to_symbol(row: &Row) -> SqlResult<Symbol> {
        let kind_str: String = row.get("kind")?;
        let language: String = row.get("language")?;
        let data_json: String = row.get("data")?;
        let data: SymbolData = serde_json::from_str(&data_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        Ok(Symbol {
            id: row.get("id")?,
            name: row.get("name")?,
            qualified_name: row.get("qualified_name")?,
            kind: SymbolKind::from_str(&kind_str).unwrap_or(SymbolKind::Function),
            file_path: row.get("file_path")?,
            language: Language::from_str(&language).unwrap_or(Language::JavaScript),
            location: Location {
                start_line: row.get("start_line")?,
                end_line: row.get("end_line")?,
                start_column: row.get("start_column")?,
                end_column: row.get("end_column")?,
            },
            data,
        })
    }

    pub(crate) fn row_to_reference(row: &Row) -> SqlResult<SymbolReference> {
        let kind: String = row.get("kind")?;
        Ok(SymbolReference {
            id: row.get("id")?,
            symbol_id: row.get("symbol_id")?,
            symbol_name: row.get("symbol_name")?,
            referencing_file: row.get("file_path")?,
            referencing_symbol_id: row.get("referencing_symbol_id")?,
            referencing_symbol_name: row.get("referencing_symbol_name")?,
            line: row.get("line")?,
            column: row.get("column")?,
            context: row.get("context")?,
            kind: ReferenceKind::from_str(&kind),
        })
    }

    pub(crate) fn row_to_call(row: &Row) -> SqlResult<CallEdge> {
        Ok(CallEdge {
            id: row.get("id")?,
            caller_symbol_id: row.get("caller_symbol_id")?,
            caller_name: row.get("caller_name")?,
            callee_symbol_id: row.get("callee_symbol_id")?,
            callee_name: row.get("callee_name")?,
            call_count: row.get("call_count")?,
            is_async: row.get::<_, i32>("is_async")? != 0,
            is_conditional: row.get::<_, i32>("is_conditional")? != 0,
        })
    }

    pub(crate) fn row_to_type_relationship(row: &Row) -> SqlResult<TypeRelationship> {
        let kind: String = row.get("kind")?;
        Ok(TypeRelationship {
            id: row.get("id")?,
            source_symbol_id: row.get("source_symbol_id")?,
            source_name: row.get("source_name")?,
            target_symbol_id: row.get("target_symbol_id")?,
            target_name: row.get("target_name")?,
            kind: TypeRelationKind::from_str(&kind),
        })
    }

    pub(crate) fn insert_symbols(tx: &Transaction, index: &FileIndex) -> Result<(), StoreError> {
        let mut symbol_stmt = tx.prepare(
            "INSERT INTO symbols (id, name, qualified_name, kind, file_path, language, start_line, end_line, start_column, end_column, exported, signature, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )?;
        let mut param_stmt = tx.prepare(
            "INSERT INTO function_params (symbol_id, position, name, type_name, default_value, optional, rest)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut type_stmt = tx.prepare(
            "INSERT INTO symbol_type_info (symbol_id, language, slot, raw_type)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let mut fts_stmt = tx.prepare(
            "INSERT INTO fts_symbols (symbol_id, name, signature, doc) VALUES (?1, ?2, ?3, ?4)",
        )?;

        for symbol in &index.symbols {
            let data_json = serde_json::to_string(&symbol.data)
                .map_err(|e| StoreError::Internal(format!("serialize symbol data: {}", e)))?;
            symbol_stmt.execute(params![
                symbol.id,
                symbol.name,
                symbol.qualified_name,
                symbol.kind.as_str(),
                symbol.file_path,
                symbol.language.as_str(),
                symbol.location.start_line,
                symbol.location.end_line,
                symbol.location.start_column,
                symbol.location.end_column,
                symbol.is_exported() as i32,
                symbol.signature(),
                data_json,
            ])?;

            if let SymbolData::Function(f) = &symbol.data {
                for (position, p) in f.params.iter().enumerate() {
                    param_stmt.execute(params![
                        symbol.id,
                        position as i64,
                        p.name,
                        p.type_name,
                        p.default_value,
                        p.optional as i32,
                        p.rest as i32,
                    ])?;
                    if let Some(t) = &p.type_name {
                        type_stmt.execute(params![
                            symbol.id,
                            symbol.language.as_str(),
                            format!("param:{}", position),
                            t,
                        ])?;
                    }
                }
                if let Some(ret) = &f.return_type {
                    type_stmt.execute(params![
                        symbol.id,
                        symbol.language.as_str(),
                        "return",
                        ret,
                    ])?;
                }
            }

            fts_stmt.execute(params![
                symbol.id,
                symbol.name,
                symbol.signature(),
                symbol.doc_text(),
            ])?;
        }
        Ok(())
    }

    pub(crate) fn insert_imports(tx: &Transaction, index: &FileIndex) -> Result<(), StoreError> {
        let mut import_stmt = tx.prepare(
            "INSERT INTO imports (file_path, source, is_type_only, line, resolved_path, is_external, is_builtin)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut spec_stmt = tx.prepare(
            "INSERT INTO import_specifiers (import_id, name, alias, is_default, is_namespace)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for import in &index.imports {
            import_stmt.execute(params![
                index.file.path,
                import.source,
                import.is_type_only as i32,
                import.line,
                import.resolved_path,
                import.is_external as i32,
                import.is_builtin as i32,
            ])?;
            let import_id = tx.last_insert_rowid();
            for spec in &import.specifiers {
                spec_stmt.execute(params![
                    import_id,
                    spec.name,
                    spec.alias,
                    spec.is_default as i32,
                    spec.is_namespace as i32,
                ])?;
            }
        }
        Ok(())
    }

    pub(crate) fn insert_exports(tx: &Transaction, index: &FileIndex) -> Result<(), StoreError> {
        let mut stmt = tx.prepare(
            "INSERT INTO exports (file_path, name, kind, line, is_reexport, reexport_source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for export in &index.exports {
            stmt.execute(params![
                index.file.path,
                export.name,
                export.kind,
                export.line,
                export.is_reexport as i32,
                export.reexport_source,
            ])?;
        }
        Ok(())
    }

    pub(crate) fn insert_references(tx: &Transaction, index: &FileIndex) -> Result<(), StoreError> {
        let mut stmt = tx.prepare(
            "INSERT INTO symbol_references (file_path, symbol_id, symbol_name, referencing_symbol_id, referencing_symbol_name, line, column, context, kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for r in &index.references {
            stmt.execute(params![
                index.file.path,
                r.symbol_id,
                r.symbol_name,
                r.referencing_symbol_id,
                r.referencing_symbol_name,
                r.line,
                r.column,
                r.context,
                r.kind.as_str(),
            ])?;
        }
        Ok(())
    }

    pub(crate) fn insert_calls(tx: &Transaction, index: &FileIndex) -> Result<(), StoreError> {
        let mut stmt = tx.prepare(
            "INSERT INTO call_edges (file_path, caller_symbol_id, caller_name, callee_symbol_id, callee_name, call_count, is_async, is_conditional)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for c in &index.calls {
            stmt.execute(params![
                index.file.path,
                c.caller_symbol_id,
                c.caller_name,
                c.callee_symbol_id,
                c.callee_name,
                c.call_count,
                c.is_async as i32,
                c.is_conditional as i32,
            ])?;
        }
        Ok(())
    }

    pub(crate) fn insert_type_relationships(
        tx: &Transaction,
        index: &FileIndex,
    ) -> Result<(), StoreError> {
        let mut stmt = tx.prepare(
            "INSERT INTO type_relationships (file_path, source_symbol_id, source_name, target_symbol_id, target_name, kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for t in &index.type_relationships {
            stmt.execute(params![
                index.file.path,
                t.source_symbol_id,
                t.source_name,
                t.target_symbol_id,
                t.target_name,
                t.kind.as_str(),
            ])?;
        }
        Ok(())
    }

    /// Collect the import rows of one file, with their specifiers batch-loaded
    /// in a second query instead of one query per import.
    pub(crate) fn load_imports_with_specifiers(&self, path: &str) -> Vec<Import> {
        let mut stmt = match self.conn.prepare(
            "SELECT id, source, is_type_only, line, resolved_path, is_external, is_builtin
             FROM imports WHERE file_path = ?1 ORDER BY id",
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] load_imports: prepare failed: {e}");
                return Vec::new();
            }
        };
        let rows: Vec<(i64, Import)> = match stmt.query_map(params![path], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Import {
                    source: row.get(1)?,
                    specifiers: Vec::new(),
                    is_type_only: row.get::<_, i32>(2)? != 0,
                    line: row.get(3)?,
                    resolved_path: row.get(4)?,
                    is_external: row.get::<_, i32>(5)? != 0,
                    is_builtin: row.get::<_, i32>(6)? != 0,
                },
            ))
        }) {
            Ok(r) => r.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                eprintln!("[lazyload] load_imports: query failed: {e}");
                return Vec::new();
            }
        };
        if rows.is_empty() {
            return Vec::new();
        }

        let ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT import_id, name, alias, is_default, is_namespace FROM import_specifiers WHERE import_id IN ({})",
            placeholders.join(", ")
        );
        let mut spec_map: std::collections::HashMap<i64, Vec<ImportSpecifier>> =
            std::collections::HashMap::new();
        if let Ok(mut spec_stmt) = self.conn.prepare(&sql) {
            let spec_params: Vec<&dyn rusqlite::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
            if let Ok(spec_rows) = spec_stmt.query_map(spec_params.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    ImportSpecifier {
                        name: row.get(1)?,
                        alias: row.get(2)?,
                        is_default: row.get::<_, i32>(3)? != 0,
                        is_namespace: row.get::<_, i32>(4)? != 0,
                    },
                ))
            }) {
                for row in spec_rows.filter_map(|r| r.ok()) {
                    spec_map.entry(row.0).or_default().push(row.1);
                }
            }
        }

        rows.into_iter()
            .map(|(id, mut import)| {
                import.specifiers = spec_map.remove(&id).unwrap_or_default();
                import
            })
            .collect()
    }
}
