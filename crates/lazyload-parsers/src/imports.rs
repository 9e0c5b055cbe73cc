//! Import-source resolution.
//!
//! Annotates parsed imports with `{resolved_path, is_external, is_builtin}`.
//! Resolution order: platform builtins, relative paths, tsconfig path
//! aliases, baseUrl, and finally "external". A per-resolver file-existence
//! cache lives for one indexing pass.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use lazyload_core::types::{Import, Language};

/// Node builtins; the `node:` scheme prefix also marks these.
const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "cluster", "crypto", "dns", "events", "fs", "http",
    "https", "module", "net", "os", "path", "process", "querystring", "readline", "stream",
    "string_decoder", "timers", "tls", "url", "util", "v8", "vm", "worker_threads", "zlib",
];

/// Python standard library, top-level module names.
const PYTHON_BUILTINS: &[&str] = &[
    "abc", "argparse", "array", "asyncio", "base64", "bisect", "collections", "configparser",
    "contextlib", "copy", "csv", "dataclasses", "datetime", "decimal", "enum", "functools",
    "glob", "hashlib", "heapq", "http", "importlib", "inspect", "io", "itertools", "json",
    "logging", "math", "multiprocessing", "os", "pathlib", "pickle", "queue", "random", "re",
    "shutil", "socket", "sqlite3", "statistics", "string", "struct", "subprocess", "sys",
    "tempfile", "textwrap", "threading", "time", "traceback", "types", "typing", "unittest",
    "urllib", "uuid", "warnings", "weakref",
];

/// Extension candidates tried when a path has no match as written.
const TS_EXTENSIONS: &[&str] = &["ts", "tsx", "d.ts", "js", "jsx", "mjs", "cjs"];

pub struct ImportResolver {
    root: PathBuf,
    /// tsconfig path aliases: pattern (single `*` wildcard) -> target pattern.
    aliases: Vec<(String, String)>,
    base_url: Option<PathBuf>,
    exists_cache: Mutex<HashMap<PathBuf, bool>>,
}

impl ImportResolver {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            aliases: Vec::new(),
            base_url: None,
            exists_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loads `compilerOptions.paths` and `baseUrl` from a project's
    /// tsconfig.json, including one level of project `references`.
    pub fn load_tsconfig(&mut self, project_root: &Path) {
        self.load_tsconfig_inner(&project_root.join("tsconfig.json"), project_root, false);
    }

    /// Loads an explicitly configured tsconfig path.
    pub fn load_tsconfig_file(&mut self, tsconfig_path: &Path) {
        let project_root = tsconfig_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.root.clone());
        self.load_tsconfig_inner(tsconfig_path, &project_root, false);
    }

    /// Inner implementation with recursion guard. When `is_ref` is true,
    /// nested `"references"` are not followed, preventing loops.
    fn load_tsconfig_inner(&mut self, tsconfig_path: &Path, project_root: &Path, is_ref: bool) {
        let content = match std::fs::read_to_string(tsconfig_path) {
            Ok(c) => c,
            Err(_) => return,
        };
        let json: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(_) => return,
        };

        let compiler_base = json
            .get("compilerOptions")
            .and_then(|co| co.get("baseUrl"))
            .and_then(|b| b.as_str());
        if let Some(base) = compiler_base {
            self.base_url = Some(project_root.join(base));
        }

        if let Some(paths) = json
            .get("compilerOptions")
            .and_then(|co| co.get("paths"))
            .and_then(|p| p.as_object())
        {
            let base = project_root.join(compiler_base.unwrap_or("."));
            for (alias, targets) in paths {
                if let Some(target) = targets.as_array().and_then(|a| a.first()) {
                    if let Some(target_str) = target.as_str() {
                        let resolved = base.join(target_str).to_string_lossy().to_string();
                        self.aliases.push((alias.clone(), resolved));
                    }
                }
            }
        }

        if !is_ref {
            if let Some(refs) = json.get("references").and_then(|r| r.as_array()) {
                for reference in refs {
                    if let Some(ref_path) = reference.get("path").and_then(|p| p.as_str()) {
                        let ref_root = project_root.join(ref_path);
                        let ref_config = ref_root.join("tsconfig.json");
                        if ref_config.exists() {
                            self.load_tsconfig_inner(&ref_config, &ref_root, true);
                        }
                    }
                }
            }
        }
    }

    /// Clears the file-existence cache between indexing passes.
    pub fn reset_cache(&self) {
        self.exists_cache.lock().unwrap().clear();
    }

    fn exists(&self, path: &Path) -> bool {
        let mut cache = self.exists_cache.lock().unwrap();
        if let Some(&known) = cache.get(path) {
            return known;
        }
        let found = path.is_file();
        cache.insert(path.to_path_buf(), found);
        found
    }

    /// Annotate one import in place.
    pub fn annotate(&self, import: &mut Import, containing_file: &Path, language: Language) {
        let source = import.source.clone();

        // 1. Platform builtins (including scheme prefixes).
        if self.is_builtin(&source, language) {
            import.is_builtin = true;
            import.is_external = true;
            return;
        }

        match language {
            Language::Python => self.annotate_python(import, containing_file),
            _ => self.annotate_js(import, containing_file),
        }
    }

    fn is_builtin(&self, source: &str, language: Language) -> bool {
        match language {
            Language::Python => {
                let top = source.split('.').next().unwrap_or(source);
                PYTHON_BUILTINS.contains(&top)
            }
            _ => {
                let bare = source.strip_prefix("node:").unwrap_or(source);
                let top = bare.split('/').next().unwrap_or(bare);
                // Any scheme-prefixed source is a builtin even off-list.
                source.starts_with("node:") || NODE_BUILTINS.contains(&top)
            }
        }
    }

    fn annotate_js(&self, import: &mut Import, containing_file: &Path) {
        let source = import.source.clone();
        let dir = containing_file.parent().unwrap_or(Path::new("."));

        // 2. Relative / absolute paths.
        if source.starts_with("./") || source.starts_with("../") || source.starts_with('/') {
            let candidate = if source.starts_with('/') {
                PathBuf::from(&source)
            } else {
                dir.join(&source)
            };
            if let Some(found) = self.try_js_candidates(&candidate) {
                import.resolved_path = Some(found);
                return;
            }
            // A relative path that resolves nowhere is still local, just missing.
            return;
        }

        // 3. Path aliases (single-wildcard patterns).
        for (pattern, target) in &self.aliases {
            if let Some(expanded) = expand_alias(pattern, target, &source) {
                if let Some(found) = self.try_js_candidates(Path::new(&expanded)) {
                    import.resolved_path = Some(found);
                    return;
                }
            }
        }

        // 4. baseUrl resolution.
        if let Some(base) = &self.base_url {
            if let Some(found) = self.try_js_candidates(&base.join(&source)) {
                import.resolved_path = Some(found);
                return;
            }
        }

        // 5. External package.
        import.is_external = true;
    }

    fn annotate_python(&self, import: &mut Import, containing_file: &Path) {
        let source = import.source.clone();
        let dir = containing_file.parent().unwrap_or(Path::new("."));

        // Relative imports: leading dots climb the package tree.
        if let Some(stripped) = source.strip_prefix('.') {
            let mut base = dir.to_path_buf();
            let mut rest = stripped;
            while let Some(next) = rest.strip_prefix('.') {
                base = base.parent().map(|p| p.to_path_buf()).unwrap_or(base);
                rest = next;
            }
            let module_path = rest.replace('.', "/");
            if let Some(found) = self.try_python_candidates(&base, &module_path) {
                import.resolved_path = Some(found);
            }
            return;
        }

        // Absolute module paths resolve against the project root.
        let module_path = source.replace('.', "/");
        if let Some(found) = self.try_python_candidates(&self.root, &module_path) {
            import.resolved_path = Some(found);
            return;
        }

        import.is_external = true;
    }

    fn try_js_candidates(&self, candidate: &Path) -> Option<String> {
        // Exact match first (the source may include the extension).
        if self.exists(candidate) {
            return Some(normalize(candidate));
        }
        let text = candidate.to_string_lossy().to_string();
        for ext in TS_EXTENSIONS {
            let with_ext = PathBuf::from(format!("{}.{}", text, ext));
            if self.exists(&with_ext) {
                return Some(normalize(&with_ext));
            }
        }
        // Directory import falls back to index.<ext>.
        for ext in TS_EXTENSIONS {
            let index = candidate.join(format!("index.{}", ext));
            if self.exists(&index) {
                return Some(normalize(&index));
            }
        }
        None
    }

    fn try_python_candidates(&self, base: &Path, module_path: &str) -> Option<String> {
        if module_path.is_empty() {
            let init = base.join("__init__.py");
            return self.exists(&init).then(|| normalize(&init));
        }
        let file = base.join(format!("{}.py", module_path));
        if self.exists(&file) {
            return Some(normalize(&file));
        }
        let package = base.join(module_path).join("__init__.py");
        if self.exists(&package) {
            return Some(normalize(&package));
        }
        None
    }
}

/// Substitute the wildcard of an alias pattern. `@app/*` with target
/// `src/app/*` maps `@app/models/user` to `src/app/models/user`.
fn expand_alias(pattern: &str, target: &str, source: &str) -> Option<String> {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            let matched = source.strip_prefix(prefix)?.strip_suffix(suffix)?;
            Some(match target.split_once('*') {
                Some((t_prefix, t_suffix)) => format!("{}{}{}", t_prefix, matched, t_suffix),
                None => target.to_string(),
            })
        }
        None => (pattern == source).then(|| target.to_string()),
    }
}

/// Lexical path normalization: resolves `.` and `..` components and uses
/// forward slashes, without touching the filesystem.
pub fn normalize(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut prefix = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => prefix = "/".to_string(),
            Component::Prefix(p) => prefix = p.as_os_str().to_string_lossy().to_string(),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(name) => parts.push(name.to_string_lossy().to_string()),
        }
    }
    format!("{}{}", prefix, parts.join("/"))
}
