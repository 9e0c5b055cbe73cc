//! Parse → checksum → persist orchestration.
//!
//! The indexer owns the write path: it walks the configured roots, parses
//! candidate files (in parallel), gates writes on content checksums, and
//! triggers the resolution pass and chain rebuilds after each batch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use lazyload_core::config::LazyloadConfig;
use lazyload_core::hash::content_checksum;
use lazyload_core::store::IndexStore;
use lazyload_core::types::{FileIndex, FileRecord, ParseStatus, StoreError};
use lazyload_parsers::imports::{normalize, ImportResolver};
use lazyload_parsers::parser::ParseOutput;
use lazyload_parsers::registry::ParserRegistry;
use lazyload_parsers::walker::FileWalker;

use crate::markov::builders::build_all_chains;

/// A batch touching at least this many files triggers an automatic chain
/// rebuild (when `markov.autoRebuild` is on).
pub const AUTO_REBUILD_THRESHOLD: usize = 5;

/// Warning recorded on files skipped by the size guard.
pub const FILE_TOO_LARGE: &str = "FILE_TOO_LARGE";

#[derive(Debug, Clone, Default)]
pub struct IndexSummary {
    pub total_files: usize,
    pub indexed_files: usize,
    pub skipped_files: usize,
    pub errors: Vec<IndexErrorEntry>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct IndexErrorEntry {
    pub path: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

pub struct Indexer {
    root: PathBuf,
    config: LazyloadConfig,
    registry: ParserRegistry,
    resolver: ImportResolver,
}

impl Indexer {
    pub fn new(root: &Path, config: LazyloadConfig) -> Self {
        let registry = ParserRegistry::with_defaults(&config);
        let mut resolver = ImportResolver::new(root);
        match &config.languages.typescript.ts_config_path {
            Some(explicit) => resolver.load_tsconfig_file(&root.join(explicit)),
            None => resolver.load_tsconfig(root),
        }
        Self {
            root: root.to_path_buf(),
            config,
            registry,
            resolver,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LazyloadConfig {
        &self.config
    }

    /// Walk the configured roots (or one subdirectory) and index every
    /// candidate file. The cancellation flag is honored between files;
    /// in-flight parses complete.
    pub fn index_directory(
        &self,
        store: &mut dyn IndexStore,
        subdir: Option<&Path>,
        cancel: &AtomicBool,
    ) -> Result<IndexSummary, IndexError> {
        let start = Instant::now();
        self.resolver.reset_cache();

        let mut entries = Vec::new();
        let roots: Vec<PathBuf> = match subdir {
            Some(dir) => vec![self.root.join(dir)],
            None => self
                .config
                .directories
                .iter()
                .map(|d| self.root.join(d))
                .collect(),
        };
        for dir in roots {
            let walker =
                FileWalker::new(&dir).with_globs(&self.config.include, &self.config.exclude);
            entries.extend(walker.walk());
        }

        let mut summary = IndexSummary {
            total_files: entries.len(),
            ..IndexSummary::default()
        };

        // Read + checksum-gate serially (storage reads are cheap), collect
        // the files that actually need parsing.
        struct Pending {
            path: String,
            content: String,
            mtime_ms: i64,
        }
        let mut pending: Vec<Pending> = Vec::new();
        for entry in &entries {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let path_str = normalize(&entry.path);
            if !self.registry.can_parse(&entry.path) {
                summary.skipped_files += 1;
                continue;
            }
            let bytes = match std::fs::read(&entry.path) {
                Ok(b) => b,
                Err(e) => {
                    summary.errors.push(IndexErrorEntry {
                        path: path_str,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            let checksum = content_checksum(&bytes);
            if store.get_checksum(&path_str).as_deref() == Some(checksum.as_str()) {
                summary.skipped_files += 1;
                continue;
            }
            let mtime_ms = std::fs::metadata(&entry.path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            pending.push(Pending {
                path: path_str,
                content: String::from_utf8_lossy(&bytes).into_owned(),
                mtime_ms,
            });
        }

        // Parse fan-out; results funnel back into the single writer.
        let parsed: Vec<FileIndex> = pending
            .par_iter()
            .map(|p| self.build_file_index(&p.path, &p.content, p.mtime_ms))
            .collect();

        for index in parsed {
            if let Err(e) = store.put_file(&index) {
                // Storage failures are fatal for the pass.
                return Err(IndexError::Store(e));
            }
            if index.file.parse_status == ParseStatus::Errored {
                summary.errors.push(IndexErrorEntry {
                    path: index.file.path.clone(),
                    message: index
                        .file
                        .warnings
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "parse error".into()),
                });
            }
            summary.indexed_files += 1;
        }

        self.finish_batch(store, summary.indexed_files)?;
        summary.duration_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// Index one file. Returns `false` when the checksum is unchanged or no
    /// parser matches; `true` when the file was (re-)indexed.
    pub fn index_file(&self, store: &mut dyn IndexStore, path: &Path) -> Result<bool, IndexError> {
        let path_str = normalize(path);
        if !self.registry.can_parse(path) {
            return Ok(false);
        }
        let bytes = std::fs::read(path).map_err(|e| IndexError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let checksum = content_checksum(&bytes);
        if store.get_checksum(&path_str).as_deref() == Some(checksum.as_str()) {
            return Ok(false);
        }
        let mtime_ms = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let index = self.build_file_index(&path_str, &content, mtime_ms);
        store.put_file(&index)?;
        Ok(true)
    }

    pub fn remove_file(&self, store: &mut dyn IndexStore, path: &Path) -> Result<bool, IndexError> {
        Ok(store.remove_file(&normalize(path))?)
    }

    /// Re-index changed files among those given (or all indexed files),
    /// dropping entries whose file disappeared. Runs the resolution pass and,
    /// when asked or past the auto threshold, rebuilds the chains.
    pub fn sync(
        &self,
        store: &mut dyn IndexStore,
        files: Option<&[String]>,
        rebuild_chains: bool,
    ) -> Result<IndexSummary, IndexError> {
        let start = Instant::now();
        self.resolver.reset_cache();
        let targets: Vec<String> = match files {
            Some(list) => list.to_vec(),
            None => store.all_file_paths(),
        };

        let mut summary = IndexSummary {
            total_files: targets.len(),
            ..IndexSummary::default()
        };
        for target in &targets {
            let path = Path::new(target);
            if !path.exists() {
                if store.remove_file(target)? {
                    summary.indexed_files += 1;
                }
                continue;
            }
            match self.index_file(store, path) {
                Ok(true) => summary.indexed_files += 1,
                Ok(false) => summary.skipped_files += 1,
                Err(IndexError::Io { path, source }) => summary.errors.push(IndexErrorEntry {
                    path,
                    message: source.to_string(),
                }),
                Err(fatal) => return Err(fatal),
            }
        }

        if rebuild_chains {
            store.resolve_symbol_references()?;
            if self.config.markov.enabled {
                build_all_chains(store, &self.config.markov)?;
            }
        } else {
            self.finish_batch(store, summary.indexed_files)?;
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// Post-batch bookkeeping: resolution pass, then conditional rebuild.
    fn finish_batch(&self, store: &mut dyn IndexStore, changed: usize) -> Result<(), IndexError> {
        if changed == 0 {
            return Ok(());
        }
        store.resolve_symbol_references()?;
        if self.config.markov.enabled
            && self.config.markov.auto_rebuild
            && changed >= AUTO_REBUILD_THRESHOLD
        {
            build_all_chains(store, &self.config.markov)?;
        }
        Ok(())
    }

    /// Parse one file into the storage payload, applying the size guard and
    /// degrading parse failures to warnings.
    fn build_file_index(&self, path: &str, content: &str, mtime_ms: i64) -> FileIndex {
        let byte_size = content.len() as u64;
        let checksum = content_checksum(content.as_bytes());
        let line_count = content.lines().count() as u32;
        let path_buf = PathBuf::from(path);
        let language = lazyload_parsers::treesitter::detect_language(&path_buf)
            .unwrap_or(lazyload_core::types::Language::JavaScript);

        let max = self.config.parser.max_file_size;
        if max > 0 && byte_size > max {
            return FileIndex {
                file: FileRecord {
                    path: path.to_string(),
                    language,
                    checksum,
                    mtime_ms,
                    line_count,
                    byte_size,
                    parse_status: ParseStatus::Skipped,
                    warnings: vec![format!("{}: {} bytes > {} limit", FILE_TOO_LARGE, byte_size, max)],
                },
                symbols: vec![],
                imports: vec![],
                exports: vec![],
                references: vec![],
                calls: vec![],
                type_relationships: vec![],
            };
        }

        let parser = self
            .registry
            .parser_for_path(&path_buf)
            .expect("can_parse checked before build_file_index");
        let (output, status) = match parser.parse(path, content) {
            Ok(output) => (output, ParseStatus::Complete),
            Err(e) => {
                eprintln!("lazyload: warning: failed to parse {}: {}", path, e);
                let mut output = ParseOutput::default();
                output.warnings.push(e.to_string());
                (output, ParseStatus::Errored)
            }
        };

        let mut imports = output.imports;
        for import in &mut imports {
            self.resolver.annotate(import, &path_buf, language);
        }

        FileIndex {
            file: FileRecord {
                path: path.to_string(),
                language,
                checksum,
                mtime_ms,
                line_count,
                byte_size,
                parse_status: status,
                warnings: output.warnings,
            },
            symbols: output.symbols,
            imports,
            exports: output.exports,
            references: output.references,
            calls: output.calls,
            type_relationships: output.type_relationships,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyload_core::sqlite::SqliteIndexStore;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn indexer_for(root: &Path) -> Indexer {
        Indexer::new(root, LazyloadConfig::default())
    }

    #[test]
    fn test_index_directory_and_checksum_gate() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/main.ts",
            "export function greet(name: string): string { return name; }\n",
        );
        write(
            dir.path(),
            "src/utils.py",
            "def greet(name: str) -> str:\n    return name\n",
        );

        let mut store = SqliteIndexStore::in_memory().unwrap();
        let indexer = indexer_for(dir.path());
        let cancel = AtomicBool::new(false);

        let first = indexer
            .index_directory(&mut store, None, &cancel)
            .unwrap();
        assert_eq!(first.indexed_files, 2);
        assert!(first.errors.is_empty());

        // Unchanged files do zero writes on the second pass.
        let second = indexer
            .index_directory(&mut store, None, &cancel)
            .unwrap();
        assert_eq!(second.indexed_files, 0);
        assert_eq!(second.skipped_files, 2);

        // Both greets are in the index, distinguishable by language.
        let symbols = store.get_symbols_by_name("greet", None);
        assert_eq!(symbols.len(), 2);
        let langs: Vec<_> = symbols.iter().map(|s| s.language).collect();
        assert!(langs.contains(&lazyload_core::types::Language::TypeScript));
        assert!(langs.contains(&lazyload_core::types::Language::Python));
    }

    #[test]
    fn test_reindex_on_change_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ts", "export function oldName() {}\n");
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let indexer = indexer_for(dir.path());

        let file = dir.path().join("src/a.ts");
        assert!(indexer.index_file(&mut store, &file).unwrap());
        write(dir.path(), "src/a.ts", "export function newName() {}\n");
        assert!(indexer.index_file(&mut store, &file).unwrap());
        assert!(!indexer.index_file(&mut store, &file).unwrap());

        assert!(store.get_symbols_by_name("oldName", None).is_empty());
        assert_eq!(store.get_symbols_by_name("newName", None).len(), 1);
    }

    #[test]
    fn test_file_size_guard() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/big.ts", &"x".repeat(64));
        let mut config = LazyloadConfig::default();
        config.parser.max_file_size = 16;
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let indexer = Indexer::new(dir.path(), config);

        indexer
            .index_file(&mut store, &dir.path().join("src/big.ts"))
            .unwrap();
        let record = store
            .get_file(&normalize(&dir.path().join("src/big.ts")))
            .unwrap();
        assert_eq!(record.parse_status, ParseStatus::Skipped);
        assert!(record.warnings[0].contains(FILE_TOO_LARGE));
        // Still visible in listings.
        assert_eq!(store.list_files(&Default::default()).len(), 1);
    }

    #[test]
    fn test_unmatched_extension_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.txt", "hello");
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let indexer = indexer_for(dir.path());
        assert!(!indexer
            .index_file(&mut store, &dir.path().join("notes.txt"))
            .unwrap());
    }

    #[test]
    fn test_resolution_runs_after_batch() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/a.ts",
            "import { helper } from './b';\nexport function run() { helper(); }\n",
        );
        write(dir.path(), "src/b.ts", "export function helper() {}\n");
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let indexer = indexer_for(dir.path());
        let cancel = AtomicBool::new(false);
        indexer.index_directory(&mut store, None, &cancel).unwrap();

        let callers = store.get_callers("helper");
        assert_eq!(callers.len(), 1);
        assert!(callers[0].callee_symbol_id.is_some());

        // Import resolution produced a local edge usable for reverse deps.
        let b_path = normalize(&dir.path().join("src/b.ts"));
        let reverse = store.get_reverse_dependencies(&b_path);
        assert_eq!(reverse.len(), 1);
    }

    #[test]
    fn test_sync_drops_deleted_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ts", "export function a() {}\n");
        write(dir.path(), "src/b.ts", "export function b() {}\n");
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let indexer = indexer_for(dir.path());
        let cancel = AtomicBool::new(false);
        indexer.index_directory(&mut store, None, &cancel).unwrap();

        fs::remove_file(dir.path().join("src/b.ts")).unwrap();
        write(dir.path(), "src/a.ts", "export function a2() {}\n");
        let summary = indexer.sync(&mut store, None, false).unwrap();
        assert_eq!(summary.indexed_files, 2); // one re-index + one removal

        assert!(store.get_symbols_by_name("b", None).is_empty());
        assert_eq!(store.get_symbols_by_name("a2", None).len(), 1);
    }

    #[test]
    fn test_auto_rebuild_threshold_builds_chains() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..AUTO_REBUILD_THRESHOLD {
            write(
                dir.path(),
                &format!("src/m{}.ts", i),
                &format!("export function f{i}() {{ g{i}(); }}\nfunction g{i}() {{}}\n"),
            );
        }
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let indexer = indexer_for(dir.path());
        let cancel = AtomicBool::new(false);
        indexer.index_directory(&mut store, None, &cancel).unwrap();

        assert!(store
            .get_chain_id(lazyload_core::types::ChainKind::CallFlow)
            .is_some());
    }

    #[test]
    fn test_cancellation_stops_between_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ts", "export function a() {}\n");
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let indexer = indexer_for(dir.path());
        let cancel = AtomicBool::new(true);
        let summary = indexer.index_directory(&mut store, None, &cancel).unwrap();
        assert_eq!(summary.indexed_files, 0);
    }
}
