use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use rusqlite::params;

use crate::sqlite::SqliteIndexStore;
use crate::store::{
    DepEdge, IndexStore, ResolutionStats, TypeHierarchy, TypeSearchOptions,
};
use crate::typeinfo::{parse_type, types_match, TypeMatchMode, TypeMatchOptions};
use crate::types::{
    CallEdge, ChainKind, ChainStats, FileFilter, FileIndex, FileRecord, Import, IndexStats,
    Language, StoreError, Symbol, SymbolHit, SymbolKind, SymbolReference, SymbolSearchOptions,
    Transition, TypeRelationship,
};

/// Call-like kinds used when resolving callee names to symbols.
const CALLABLE_KINDS: &str = "('function', 'method', 'constructor', 'callback')";
/// Type-like kinds used when resolving inheritance targets.
const TYPE_KINDS: &str = "('class', 'interface', 'type_alias')";

impl SqliteIndexStore {
    fn count(&self, sql: &str) -> u64 {
        self.conn
            .query_row(sql, [], |row| row.get::<_, u64>(0))
            .unwrap_or(0)
    }

    fn query_symbols(&self, sql: &str, bind: &[&dyn rusqlite::ToSql]) -> Vec<Symbol> {
        let mut stmt = match self.conn.prepare(sql) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] symbol query: prepare failed: {e}");
                return Vec::new();
            }
        };
        let result = match stmt.query_map(bind, Self::row_to_symbol) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                eprintln!("[lazyload] symbol query: failed: {e}");
                Vec::new()
            }
        };
        result
    }

    fn query_calls(&self, sql: &str, bind: &[&dyn rusqlite::ToSql]) -> Vec<CallEdge> {
        let mut stmt = match self.conn.prepare(sql) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] call query: prepare failed: {e}");
                return Vec::new();
            }
        };
        let result = match stmt.query_map(bind, Self::row_to_call) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                eprintln!("[lazyload] call query: failed: {e}");
                Vec::new()
            }
        };
        result
    }

    fn query_type_relationships(
        &self,
        sql: &str,
        bind: &[&dyn rusqlite::ToSql],
    ) -> Vec<TypeRelationship> {
        let mut stmt = match self.conn.prepare(sql) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] type query: prepare failed: {e}");
                return Vec::new();
            }
        };
        let result = match stmt.query_map(bind, Self::row_to_type_relationship) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                eprintln!("[lazyload] type query: failed: {e}");
                Vec::new()
            }
        };
        result
    }

    /// The local import graph: `(from_file, to_file)` for every import whose
    /// target resolved to an indexed path.
    fn import_graph(&self) -> (DiGraph<String, ()>, HashMap<String, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut stmt = match self.conn.prepare(
            "SELECT DISTINCT file_path, resolved_path FROM imports WHERE resolved_path IS NOT NULL",
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] import_graph: prepare failed: {e}");
                return (graph, nodes);
            }
        };
        let edges: Vec<(String, String)> = match stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                eprintln!("[lazyload] import_graph: query failed: {e}");
                return (graph, nodes);
            }
        };
        for (from, to) in edges {
            let a = *nodes
                .entry(from.clone())
                .or_insert_with(|| graph.add_node(from.clone()));
            let b = *nodes
                .entry(to.clone())
                .or_insert_with(|| graph.add_node(to.clone()));
            graph.add_edge(a, b, ());
        }
        (graph, nodes)
    }

    /// Before/after non-null count delta for one resolution statement.
    fn run_resolution(
        tx: &rusqlite::Transaction,
        count_sql: &str,
        update_sql: &str,
    ) -> Result<u64, StoreError> {
        let before: u64 = tx.query_row(count_sql, [], |row| row.get(0))?;
        tx.execute(update_sql, [])?;
        let after: u64 = tx.query_row(count_sql, [], |row| row.get(0))?;
        Ok(after.saturating_sub(before))
    }
}

impl IndexStore for SqliteIndexStore {
    fn put_file(&mut self, index: &FileIndex) -> Result<(), StoreError> {
        self.put_file_tx(index)
    }

    fn remove_file(&mut self, path: &str) -> Result<bool, StoreError> {
        self.remove_file_tx(path)
    }

    fn get_file(&self, path: &str) -> Option<FileRecord> {
        let mut stmt = self.conn.prepare("SELECT * FROM files WHERE path = ?1").ok()?;
        stmt.query_row(params![path], Self::row_to_file).ok()
    }

    fn get_checksum(&self, path: &str) -> Option<String> {
        self.conn
            .query_row(
                "SELECT checksum FROM files WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .ok()
    }

    fn list_files(&self, filter: &FileFilter) -> Vec<FileRecord> {
        let mut sql = String::from("SELECT * FROM files");
        let mut clauses: Vec<String> = Vec::new();
        let mut bind: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(dir) = &filter.directory {
            let prefix = format!("{}%", dir.trim_end_matches('/').to_string() + "/");
            clauses.push(format!("path LIKE ?{}", bind.len() + 1));
            bind.push(Box::new(prefix));
        }
        if let Some(language) = filter.language {
            clauses.push(format!("language = ?{}", bind.len() + 1));
            bind.push(Box::new(language.as_str().to_string()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY rowid");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, filter.offset));
        } else if filter.offset > 0 {
            sql.push_str(&format!(" LIMIT -1 OFFSET {}", filter.offset));
        }

        let mut stmt = match self.conn.prepare(&sql) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] list_files: prepare failed: {e}");
                return Vec::new();
            }
        };
        let refs: Vec<&dyn rusqlite::ToSql> = bind.iter().map(|b| b.as_ref()).collect();
        let result = match stmt.query_map(refs.as_slice(), Self::row_to_file) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                eprintln!("[lazyload] list_files: query failed: {e}");
                Vec::new()
            }
        };
        result
    }

    fn all_file_paths(&self) -> Vec<String> {
        let mut stmt = match self.conn.prepare("SELECT path FROM files ORDER BY rowid") {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map([], |row| row.get(0))
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            file_count: self.count("SELECT COUNT(*) FROM files"),
            symbol_count: self.count("SELECT COUNT(*) FROM symbols"),
            reference_count: self.count("SELECT COUNT(*) FROM symbol_references"),
            call_count: self.count("SELECT COUNT(*) FROM call_edges"),
            resolved_references: self
                .count("SELECT COUNT(*) FROM symbol_references WHERE symbol_id IS NOT NULL"),
        }
    }

    fn get_symbol(&self, id: &str) -> Option<Symbol> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM symbols WHERE id = ?1")
            .ok()?;
        stmt.query_row(params![id], Self::row_to_symbol).ok()
    }

    fn get_symbols_by_name(&self, name: &str, kind: Option<SymbolKind>) -> Vec<Symbol> {
        match kind {
            Some(k) => self.query_symbols(
                "SELECT * FROM symbols WHERE name = ?1 AND kind = ?2 ORDER BY rowid",
                &[&name, &k.as_str()],
            ),
            None => self.query_symbols(
                "SELECT * FROM symbols WHERE name = ?1 ORDER BY rowid",
                &[&name],
            ),
        }
    }

    fn get_symbols_in_file(&self, path: &str) -> Vec<Symbol> {
        self.query_symbols(
            "SELECT * FROM symbols WHERE file_path = ?1 ORDER BY start_line, rowid",
            &[&path],
        )
    }

    fn search_symbols(&self, fts_query: &str, opts: &SymbolSearchOptions) -> Vec<SymbolHit> {
        if fts_query.trim().is_empty() {
            return Vec::new();
        }
        let mut sql = String::from(
            "SELECT symbols.*, fts_symbols.rank AS fts_rank
             FROM fts_symbols
             JOIN symbols ON symbols.id = fts_symbols.symbol_id
             WHERE fts_symbols MATCH ?1",
        );
        let mut bind: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(fts_query.to_string())];
        if let Some(kind) = opts.kind {
            sql.push_str(&format!(" AND symbols.kind = ?{}", bind.len() + 1));
            bind.push(Box::new(kind.as_str().to_string()));
        }
        if let Some(language) = opts.language {
            sql.push_str(&format!(" AND symbols.language = ?{}", bind.len() + 1));
            bind.push(Box::new(language.as_str().to_string()));
        }
        sql.push_str(" ORDER BY fts_symbols.rank");
        if opts.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", opts.limit));
        }

        let mut stmt = match self.conn.prepare(&sql) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] search_symbols: prepare failed: {e}");
                return Vec::new();
            }
        };
        let refs: Vec<&dyn rusqlite::ToSql> = bind.iter().map(|b| b.as_ref()).collect();
        let result = match stmt.query_map(refs.as_slice(), |row| {
            let symbol = Self::row_to_symbol(row)?;
            // bm25 rank is negative, more negative = better match.
            let rank: f64 = row.get("fts_rank")?;
            Ok(SymbolHit {
                symbol,
                score: -rank,
            })
        }) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                eprintln!("[lazyload] search_symbols: query failed: {e}");
                Vec::new()
            }
        };
        result
    }

    fn search_by_type(&self, opts: &TypeSearchOptions) -> Vec<SymbolHit> {
        let mode = opts.mode.unwrap_or(TypeMatchMode::Base);
        let match_opts = TypeMatchOptions {
            include_async_variants: opts.include_async_variants,
        };

        // Candidate slots fetched once, predicate applied in memory.
        let rows = self.type_slot_rows();
        let mut return_matches: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut param_matches: std::collections::HashSet<String> = std::collections::HashSet::new();
        for (symbol_id, language, slot, raw_type) in &rows {
            if let Some(lang_filter) = opts.language {
                if *language != lang_filter {
                    continue;
                }
            }
            let Some(parsed) = parse_type(raw_type, *language) else {
                continue;
            };
            if slot == "return" {
                if let Some(wanted) = &opts.return_type {
                    if types_match(&parsed, wanted, mode, &match_opts) {
                        return_matches.insert(symbol_id.clone());
                    }
                }
            } else if let Some(wanted) = &opts.param_type {
                if types_match(&parsed, wanted, mode, &match_opts) {
                    param_matches.insert(symbol_id.clone());
                }
            }
        }

        let ids: Vec<String> = match (&opts.return_type, &opts.param_type) {
            (Some(_), Some(_)) => return_matches
                .intersection(&param_matches)
                .cloned()
                .collect(),
            (Some(_), None) => return_matches.into_iter().collect(),
            (None, Some(_)) => param_matches.into_iter().collect(),
            (None, None) => return Vec::new(),
        };

        let mut hits: Vec<SymbolHit> = ids
            .iter()
            .filter_map(|id| self.get_symbol(id))
            .map(|symbol| SymbolHit { symbol, score: 1.0 })
            .collect();
        hits.sort_by(|a, b| a.symbol.id.cmp(&b.symbol.id));
        if opts.limit > 0 {
            hits.truncate(opts.limit);
        }
        hits
    }

    fn get_references_by_name(&self, name: &str) -> Vec<SymbolReference> {
        let mut stmt = match self.conn.prepare(
            "SELECT * FROM symbol_references WHERE symbol_name = ?1 ORDER BY file_path, line",
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] get_references_by_name: prepare failed: {e}");
                return Vec::new();
            }
        };
        let result = match stmt.query_map(params![name], Self::row_to_reference) {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                eprintln!("[lazyload] get_references_by_name: query failed: {e}");
                Vec::new()
            }
        };
        result
    }

    fn get_callers(&self, callee: &str) -> Vec<CallEdge> {
        self.query_calls(
            "SELECT * FROM call_edges WHERE callee_name = ?1 OR callee_symbol_id = ?1
             ORDER BY call_count DESC, caller_name ASC",
            &[&callee],
        )
    }

    fn get_callees(&self, caller: &str) -> Vec<CallEdge> {
        self.query_calls(
            "SELECT * FROM call_edges WHERE caller_name = ?1 OR caller_symbol_id = ?1
             ORDER BY call_count DESC, callee_name ASC",
            &[&caller],
        )
    }

    fn get_subtypes(&self, name: &str) -> Vec<TypeRelationship> {
        self.query_type_relationships(
            "SELECT * FROM type_relationships WHERE target_name = ?1 AND kind = 'extends' ORDER BY source_name",
            &[&name],
        )
    }

    fn find_implementations(&self, name: &str) -> Vec<TypeRelationship> {
        self.query_type_relationships(
            "SELECT * FROM type_relationships WHERE target_name = ?1 AND kind = 'implements' ORDER BY source_name",
            &[&name],
        )
    }

    fn get_supertypes(&self, name: &str) -> Vec<TypeRelationship> {
        self.query_type_relationships(
            "SELECT * FROM type_relationships WHERE source_name = ?1 ORDER BY kind, target_name",
            &[&name],
        )
    }

    fn get_type_hierarchy(&self, name: &str, max_depth: u32) -> TypeHierarchy {
        let mut hierarchy = TypeHierarchy {
            name: name.to_string(),
            ..TypeHierarchy::default()
        };

        // Upward: follow extends edges, guarding against cycles.
        let mut current = name.to_string();
        let mut seen = std::collections::HashSet::new();
        seen.insert(current.clone());
        for _ in 0..max_depth {
            let parents = self.get_supertypes(&current);
            let Some(parent) = parents
                .iter()
                .find(|r| r.kind == crate::types::TypeRelationKind::Extends)
            else {
                break;
            };
            if !seen.insert(parent.target_name.clone()) {
                break;
            }
            hierarchy.ancestors.push(parent.target_name.clone());
            current = parent.target_name.clone();
        }

        // Downward: BFS over subtype edges.
        let mut frontier = vec![name.to_string()];
        let mut depth = 1u32;
        while !frontier.is_empty() && depth <= max_depth {
            let mut next = Vec::new();
            for parent in &frontier {
                for sub in self.get_subtypes(parent) {
                    if seen.insert(sub.source_name.clone()) {
                        hierarchy.descendants.push((sub.source_name.clone(), depth));
                        next.push(sub.source_name);
                    }
                }
            }
            frontier = next;
            depth += 1;
        }

        hierarchy
    }

    fn get_file_imports(&self, path: &str) -> Vec<Import> {
        self.load_imports_with_specifiers(path)
    }

    fn get_reverse_dependencies(&self, path: &str) -> Vec<String> {
        let mut stmt = match self.conn.prepare(
            "SELECT DISTINCT file_path FROM imports WHERE resolved_path = ?1 ORDER BY file_path",
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] get_reverse_dependencies: prepare failed: {e}");
                return Vec::new();
            }
        };
        stmt.query_map(params![path], |row| row.get(0))
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    fn get_transitive_dependencies(&self, path: &str, depth: u32) -> Vec<DepEdge> {
        let (graph, nodes) = self.import_graph();
        let Some(&start) = nodes.get(path) else {
            return Vec::new();
        };

        let mut edges = Vec::new();
        let mut visited = std::collections::HashSet::new();
        visited.insert(start);
        let mut frontier = vec![start];
        let mut level = 1u32;
        while !frontier.is_empty() && level <= depth {
            let mut next = Vec::new();
            for node in frontier {
                for neighbor in graph.neighbors(node) {
                    edges.push(DepEdge {
                        from: graph[node].clone(),
                        to: graph[neighbor].clone(),
                        depth: level,
                    });
                    if visited.insert(neighbor) {
                        next.push(neighbor);
                    }
                }
            }
            frontier = next;
            level += 1;
        }
        edges
    }

    fn detect_circular_dependencies(&self, path: &str) -> Option<Vec<String>> {
        let (graph, nodes) = self.import_graph();
        let start = *nodes.get(path)?;

        // DFS reporting the first back-edge path found.
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = vec![(start, vec![start])];
        let mut done = std::collections::HashSet::new();
        while let Some((node, trail)) = stack.pop() {
            for neighbor in graph.neighbors(node) {
                if let Some(pos) = trail.iter().position(|&n| n == neighbor) {
                    let mut cycle: Vec<String> =
                        trail[pos..].iter().map(|&n| graph[n].clone()).collect();
                    cycle.push(graph[neighbor].clone());
                    return Some(cycle);
                }
                if done.contains(&neighbor) {
                    continue;
                }
                let mut next_trail = trail.clone();
                next_trail.push(neighbor);
                stack.push((neighbor, next_trail));
            }
            done.insert(node);
        }
        None
    }

    fn resolve_symbol_references(&mut self) -> Result<ResolutionStats, StoreError> {
        let tx = self.conn.transaction()?;

        let references_resolved = Self::run_resolution(
            &tx,
            "SELECT COUNT(*) FROM symbol_references WHERE symbol_id IS NOT NULL",
            "UPDATE symbol_references SET symbol_id = COALESCE(
                (SELECT s.id FROM symbols s
                 WHERE s.name = symbol_references.symbol_name
                   AND s.file_path = symbol_references.file_path
                 ORDER BY s.rowid LIMIT 1),
                (SELECT s.id FROM symbols s
                 WHERE s.name = symbol_references.symbol_name
                 ORDER BY s.rowid LIMIT 1)
            ) WHERE symbol_id IS NULL",
        )?;

        // Enclosing-symbol IDs are always file-local.
        tx.execute(
            "UPDATE symbol_references SET referencing_symbol_id =
                (SELECT s.id FROM symbols s
                 WHERE s.name = symbol_references.referencing_symbol_name
                   AND s.file_path = symbol_references.file_path
                 ORDER BY s.rowid LIMIT 1)
             WHERE referencing_symbol_id IS NULL AND referencing_symbol_name IS NOT NULL",
            [],
        )?;

        let calls_resolved = Self::run_resolution(
            &tx,
            "SELECT COUNT(*) FROM call_edges WHERE callee_symbol_id IS NOT NULL",
            &format!(
                "UPDATE call_edges SET callee_symbol_id = COALESCE(
                    (SELECT s.id FROM symbols s
                     WHERE s.name = call_edges.callee_name
                       AND s.file_path = call_edges.file_path
                       AND s.kind IN {kinds}
                     ORDER BY s.rowid LIMIT 1),
                    (SELECT s.id FROM symbols s
                     WHERE s.name = call_edges.callee_name
                       AND s.kind IN {kinds}
                     ORDER BY s.rowid LIMIT 1)
                ) WHERE callee_symbol_id IS NULL",
                kinds = CALLABLE_KINDS
            ),
        )?;

        let type_relationships_resolved = Self::run_resolution(
            &tx,
            "SELECT COUNT(*) FROM type_relationships WHERE target_symbol_id IS NOT NULL",
            &format!(
                "UPDATE type_relationships SET target_symbol_id = COALESCE(
                    (SELECT s.id FROM symbols s
                     WHERE s.name = type_relationships.target_name
                       AND s.file_path = type_relationships.file_path
                       AND s.kind IN {kinds}
                     ORDER BY s.rowid LIMIT 1),
                    (SELECT s.id FROM symbols s
                     WHERE s.name = type_relationships.target_name
                       AND s.kind IN {kinds}
                     ORDER BY s.rowid LIMIT 1)
                ) WHERE target_symbol_id IS NULL",
                kinds = TYPE_KINDS
            ),
        )?;

        tx.commit()?;
        Ok(ResolutionStats {
            references_resolved,
            calls_resolved,
            type_relationships_resolved,
        })
    }

    fn get_chain_id(&self, chain: ChainKind) -> Option<i64> {
        self.markov_chain_id(chain)
    }

    fn rebuild_chain(
        &mut self,
        chain: ChainKind,
        transitions: &[(String, String, u32)],
    ) -> Result<(), StoreError> {
        self.markov_rebuild_chain(chain, transitions)
    }

    fn get_transitions(&self, chain: ChainKind, from_state: &str) -> Vec<Transition> {
        self.markov_transitions(chain, from_state)
    }

    fn has_chain_support(&self, chain: ChainKind, state: &str) -> bool {
        self.markov_has_support(chain, state)
    }

    fn get_all_chain_stats(&self) -> Vec<ChainStats> {
        self.markov_all_stats()
    }

    fn resolved_call_edges(&self) -> Vec<CallEdge> {
        self.query_calls(
            "SELECT * FROM call_edges WHERE callee_symbol_id IS NOT NULL ORDER BY id",
            &[],
        )
    }

    fn resolved_reference_rows(&self) -> Vec<(String, Option<String>, String)> {
        let mut stmt = match self.conn.prepare(
            "SELECT file_path, referencing_symbol_id, symbol_id FROM symbol_references
             WHERE symbol_id IS NOT NULL ORDER BY id",
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] resolved_reference_rows: prepare failed: {e}");
                return Vec::new();
            }
        };
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    fn type_slot_rows(&self) -> Vec<(String, Language, String, String)> {
        let mut stmt = match self.conn.prepare(
            "SELECT symbol_id, language, slot, raw_type FROM symbol_type_info ORDER BY id",
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] type_slot_rows: prepare failed: {e}");
                return Vec::new();
            }
        };
        stmt.query_map([], |row| {
            let language: String = row.get(1)?;
            Ok((
                row.get(0)?,
                Language::from_str(&language).unwrap_or(Language::JavaScript),
                row.get(2)?,
                row.get(3)?,
            ))
        })
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
    }

    fn import_target_rows(&self) -> Vec<(String, String)> {
        let mut stmt = match self.conn.prepare(
            "SELECT file_path, COALESCE(resolved_path, source) FROM imports ORDER BY id",
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[lazyload] import_target_rows: prepare failed: {e}");
                return Vec::new();
            }
        };
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }
}
