//! Maps user-provided paths onto indexed file entries.
//!
//! Assistants pass paths as they remember them: absolute, relative, a bare
//! filename, or a typo. The resolver runs a strategy ladder (exact, root-
//! relative, stored-relative, suffix, fuzzy) and either picks a single entry
//! or reports suggestions.

use std::collections::HashSet;
use std::path::Path;

/// Score at or above which a single fuzzy candidate is accepted.
const MIN_AUTO_RESOLVE_SCORE: f64 = 80.0;
/// The best candidate must beat the runner-up by this much.
const AUTO_RESOLVE_MARGIN: f64 = 20.0;
const MAX_SUGGESTIONS: usize = 5;
const MAX_DIRECTORY_FILES: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub resolved_path: String,
    pub relative_path: String,
    /// Set when the fuzzy rung picked the match.
    pub auto_resolved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveFailure {
    NotFound {
        suggestions: Vec<String>,
        /// Files in the nearest matching directory, for autocomplete.
        directory_files: Vec<String>,
    },
    Ambiguous {
        suggestions: Vec<String>,
    },
}

impl std::fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveFailure::NotFound { suggestions, .. } => {
                write!(f, "not found")?;
                if !suggestions.is_empty() {
                    write!(f, "; did you mean: {}", suggestions.join(", "))?;
                }
                Ok(())
            }
            ResolveFailure::Ambiguous { suggestions } => {
                write!(f, "ambiguous; candidates: {}", suggestions.join(", "))
            }
        }
    }
}

pub struct PathResolver<'a> {
    root: &'a Path,
    /// Indexed paths, as stored.
    indexed: &'a [String],
}

impl<'a> PathResolver<'a> {
    pub fn new(root: &'a Path, indexed: &'a [String]) -> Self {
        Self { root, indexed }
    }

    fn relative_of(&self, stored: &str) -> String {
        let root = normalize_slashes(&self.root.to_string_lossy());
        let stored_norm = normalize_slashes(stored);
        stored_norm
            .strip_prefix(&format!("{}/", root.trim_end_matches('/')))
            .map(|s| s.to_string())
            .unwrap_or(stored_norm)
    }

    fn success(&self, stored: &str, auto_resolved: bool) -> ResolvedPath {
        ResolvedPath {
            resolved_path: stored.to_string(),
            relative_path: self.relative_of(stored),
            auto_resolved,
        }
    }

    /// Run the strategy ladder; first match wins.
    pub fn resolve(&self, user_path: &str) -> Result<ResolvedPath, ResolveFailure> {
        let user_norm = normalize_slashes(user_path);

        // 1. Exact absolute match.
        if let Some(stored) = self
            .indexed
            .iter()
            .find(|p| normalize_slashes(p) == user_norm)
        {
            return Ok(self.success(stored, false));
        }

        // 2. Absolute match after resolving against the root directory.
        let rooted = normalize_slashes(&self.root.join(user_path).to_string_lossy());
        if let Some(stored) = self
            .indexed
            .iter()
            .find(|p| normalize_slashes(p) == rooted)
        {
            return Ok(self.success(stored, false));
        }

        // 3. Stored relative-path match, after stripping a leading `./`.
        let stripped = user_norm.strip_prefix("./").unwrap_or(&user_norm);
        if let Some(stored) = self
            .indexed
            .iter()
            .find(|p| self.relative_of(p) == stripped)
        {
            return Ok(self.success(stored, false));
        }

        // 4. Suffix match.
        let suffix_hits: Vec<&String> = self
            .indexed
            .iter()
            .filter(|p| {
                let norm = normalize_slashes(p);
                norm.ends_with(&format!("/{}", stripped)) || norm == *stripped
            })
            .collect();
        match suffix_hits.len() {
            1 => return Ok(self.success(suffix_hits[0], false)),
            n if n > 1 => {
                return Err(ResolveFailure::Ambiguous {
                    suggestions: suffix_hits
                        .iter()
                        .take(MAX_SUGGESTIONS)
                        .map(|p| self.relative_of(p))
                        .collect(),
                });
            }
            _ => {}
        }

        // 5. Fuzzy similarity.
        let mut scored: Vec<(f64, &String)> = self
            .indexed
            .iter()
            .map(|p| (similarity(stripped, &self.relative_of(p)), p))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        if let Some(&(best, stored)) = scored.first() {
            let second = scored.get(1).map(|&(s, _)| s).unwrap_or(0.0);
            if best >= MIN_AUTO_RESOLVE_SCORE && best - second >= AUTO_RESOLVE_MARGIN {
                return Ok(self.success(stored, true));
            }
        }

        let suggestions: Vec<String> = scored
            .iter()
            .take(MAX_SUGGESTIONS)
            .filter(|(score, _)| *score > 0.0)
            .map(|(_, p)| self.relative_of(p))
            .collect();
        Err(ResolveFailure::NotFound {
            directory_files: self.nearest_directory_files(stripped),
            suggestions,
        })
    }

    /// Up to 15 files in the deepest indexed directory sharing a prefix with
    /// the requested path.
    fn nearest_directory_files(&self, user_path: &str) -> Vec<String> {
        let user_dir = match user_path.rfind('/') {
            Some(slash) => &user_path[..slash],
            None => "",
        };
        let mut best_dir: Option<String> = None;
        let mut seen: HashSet<String> = HashSet::new();
        for stored in self.indexed {
            let rel = self.relative_of(stored);
            let dir = match rel.rfind('/') {
                Some(slash) => rel[..slash].to_string(),
                None => String::new(),
            };
            if !seen.insert(dir.clone()) {
                continue;
            }
            let matches = dir.ends_with(user_dir) || user_dir.ends_with(&dir) || dir == user_dir;
            if matches {
                let better = match &best_dir {
                    Some(current) => dir.len() > current.len(),
                    None => true,
                };
                if better {
                    best_dir = Some(dir);
                }
            }
        }
        let Some(dir) = best_dir else {
            return Vec::new();
        };
        self.indexed
            .iter()
            .map(|p| self.relative_of(p))
            .filter(|rel| match rel.rfind('/') {
                Some(slash) => rel[..slash] == dir,
                None => dir.is_empty(),
            })
            .take(MAX_DIRECTORY_FILES)
            .collect()
    }
}

fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn char_set(text: &str) -> HashSet<char> {
    text.chars().filter(|c| *c != '/').collect()
}

fn jaccard(a: &str, b: &str) -> f64 {
    let set_a = char_set(a);
    let set_b = char_set(b);
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}

/// 0–100 similarity combining basename match, directory overlap, substring
/// containment, and character-set overlap.
fn similarity(user: &str, stored: &str) -> f64 {
    let user_base = basename(user);
    let stored_base = basename(stored);

    let basename_score = if user_base == stored_base {
        50.0
    } else {
        jaccard(user_base, stored_base) * 45.0
    };

    let user_dirs: Vec<&str> = user
        .rsplit('/')
        .skip(1)
        .filter(|d| !d.is_empty())
        .collect();
    let directory_score = if user_dirs.is_empty() {
        // Bare filenames carry no directory signal; stay neutral.
        25.0
    } else {
        let stored_dirs: HashSet<&str> = stored.rsplit('/').skip(1).collect();
        let shared = user_dirs
            .iter()
            .filter(|d| stored_dirs.contains(**d))
            .count() as f64;
        shared / user_dirs.len() as f64 * 25.0
    };

    let containment_score = if stored.contains(user) || user.contains(stored_base) {
        10.0
    } else {
        0.0
    };

    basename_score + directory_score + containment_score + jaccard(user, stored) * 15.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed() -> Vec<String> {
        vec![
            "/project/src/services/user_service.ts".to_string(),
            "/project/src/services/order_service.ts".to_string(),
            "/project/src/models/user.ts".to_string(),
            "/project/lib/util/helpers.py".to_string(),
            "/project/tests/user_service.test.ts".to_string(),
        ]
    }

    fn resolver(paths: &[String]) -> PathResolver {
        PathResolver::new(Path::new("/project"), paths)
    }

    #[test]
    fn test_exact_absolute() {
        let paths = indexed();
        let r = resolver(&paths);
        let hit = r.resolve("/project/src/models/user.ts").unwrap();
        assert_eq!(hit.resolved_path, "/project/src/models/user.ts");
        assert_eq!(hit.relative_path, "src/models/user.ts");
        assert!(!hit.auto_resolved);
    }

    #[test]
    fn test_root_relative() {
        let paths = indexed();
        let r = resolver(&paths);
        let hit = r.resolve("src/models/user.ts").unwrap();
        assert_eq!(hit.resolved_path, "/project/src/models/user.ts");
    }

    #[test]
    fn test_leading_dot_slash() {
        let paths = indexed();
        let r = resolver(&paths);
        let hit = r.resolve("./src/models/user.ts").unwrap();
        assert_eq!(hit.resolved_path, "/project/src/models/user.ts");
    }

    #[test]
    fn test_suffix_unique() {
        let paths = indexed();
        let r = resolver(&paths);
        let hit = r.resolve("helpers.py").unwrap();
        assert_eq!(hit.resolved_path, "/project/lib/util/helpers.py");
        assert!(!hit.auto_resolved);
    }

    #[test]
    fn test_suffix_ambiguous() {
        let paths = vec![
            "/project/src/a/config.ts".to_string(),
            "/project/src/b/config.ts".to_string(),
        ];
        let r = resolver(&paths);
        match r.resolve("config.ts") {
            Err(ResolveFailure::Ambiguous { suggestions }) => {
                assert_eq!(suggestions.len(), 2);
            }
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_fuzzy_auto_resolve_typo() {
        let paths = vec![
            "/project/src/services/user_service.ts".to_string(),
            "/project/lib/other/completely_different.py".to_string(),
        ];
        let r = resolver(&paths);
        let hit = r.resolve("usr_service.ts").unwrap();
        assert_eq!(hit.resolved_path, "/project/src/services/user_service.ts");
        assert!(hit.auto_resolved);
    }

    #[test]
    fn test_not_found_carries_suggestions() {
        let paths = indexed();
        let r = resolver(&paths);
        match r.resolve("src/services/nothing_like_it.xyz") {
            Err(ResolveFailure::NotFound {
                suggestions,
                directory_files,
            }) => {
                assert!(suggestions.len() <= 5);
                assert!(!directory_files.is_empty());
                assert!(directory_files
                    .iter()
                    .all(|f| f.starts_with("src/services/")));
            }
            other => panic!("expected not_found, got {:?}", other),
        }
    }

    #[test]
    fn test_similarity_orders_sensibly() {
        let exact = similarity("user_service.ts", "src/services/user_service.ts");
        let near = similarity("usr_service.ts", "src/services/user_service.ts");
        let far = similarity("usr_service.ts", "lib/other/completely_different.py");
        assert!(exact >= MIN_AUTO_RESOLVE_SCORE);
        assert!(near >= MIN_AUTO_RESOLVE_SCORE);
        assert!(near > far + AUTO_RESOLVE_MARGIN);
    }
}
