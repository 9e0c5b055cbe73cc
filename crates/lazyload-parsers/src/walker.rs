use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::treesitter::detect_language;
use lazyload_core::types::Language;

pub struct WalkEntry {
    pub path: PathBuf,
    pub language: Language,
}

/// Walks a source tree honoring gitignore, `.lazyloadignore`, and the config
/// include/exclude glob sets.
pub struct FileWalker {
    root: PathBuf,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    let mut added = false;
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
                added = true;
            }
            Err(e) => eprintln!("lazyload: warning: bad glob pattern {pattern:?}: {e}"),
        }
    }
    if !added {
        return None;
    }
    builder.build().ok()
}

impl FileWalker {
    /// Creates a new file walker rooted at the given directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            include: None,
            exclude: None,
        }
    }

    /// Applies the config include/exclude glob sets. Empty sets mean
    /// "no restriction".
    pub fn with_globs(mut self, include: &[String], exclude: &[String]) -> Self {
        self.include = build_globset(include);
        self.exclude = build_globset(exclude);
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        // Globs match against the path relative to the walk root.
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel) {
                return false;
            }
        }
        if let Some(include) = &self.include {
            return include.is_match(rel);
        }
        true
    }

    /// Walks the root directory and returns all recognized source files,
    /// respecting gitignore and `.lazyloadignore`.
    pub fn walk(&self) -> Vec<WalkEntry> {
        let mut entries = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .add_custom_ignore_filename(".lazyloadignore")
            .build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(_) => continue,
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.into_path();
            if !self.accepts(&path) {
                continue;
            }
            if let Some(language) = detect_language(&path) {
                entries.push(WalkEntry { path, language });
            }
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_walker_finds_source_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.ts"), "export {}").unwrap();
        fs::write(dir.path().join("src/util.py"), "def f(): pass").unwrap();
        fs::write(dir.path().join("README.md"), "# Hello").unwrap();

        let walker = FileWalker::new(dir.path());
        let entries = walker.walk();

        assert_eq!(entries.len(), 2);
        let langs: Vec<Language> = entries.iter().map(|e| e.language).collect();
        assert!(langs.contains(&Language::TypeScript));
        assert!(langs.contains(&Language::Python));
    }

    #[test]
    fn test_walker_respects_lazyloadignore() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("src/app.ts"), "export {}").unwrap();
        fs::write(dir.path().join("vendor/lib.ts"), "export {}").unwrap();
        fs::write(dir.path().join(".lazyloadignore"), "vendor/\n").unwrap();

        let walker = FileWalker::new(dir.path());
        let entries = walker.walk();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.to_str().unwrap().contains("app.ts"));
    }

    #[test]
    fn test_walker_exclude_globs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("generated")).unwrap();
        fs::write(dir.path().join("src/app.ts"), "export {}").unwrap();
        fs::write(dir.path().join("generated/schema.ts"), "export {}").unwrap();

        let walker = FileWalker::new(dir.path())
            .with_globs(&[], &["generated/**".to_string()]);
        let entries = walker.walk();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.to_str().unwrap().contains("src"));
    }

    #[test]
    fn test_walker_include_globs_restrict() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        fs::write(dir.path().join("src/app.ts"), "export {}").unwrap();
        fs::write(dir.path().join("scripts/tool.py"), "x = 1").unwrap();

        let walker = FileWalker::new(dir.path())
            .with_globs(&["src/**".to_string()], &[]);
        let entries = walker.walk();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.to_str().unwrap().contains("app.ts"));
    }
}
