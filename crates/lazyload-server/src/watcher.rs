//! File watcher that feeds debounced change batches into the indexer.
//!
//! Uses the `notify` crate; events are coalesced per 250ms window before a
//! batch is emitted, so editor save storms trigger one re-index.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Directories never worth watching.
const IGNORED_DIRS: &[&str] = &[
    ".lazyload",
    ".git",
    "node_modules",
    "__pycache__",
    "dist",
    "build",
    ".next",
    "target",
];

/// Extensions the indexer can parse.
const WATCHED_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "py"];

/// Debounce window for coalescing change bursts per batch.
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Start watching the given root directory for file changes.
///
/// Returns the watcher (keep it alive) and a channel receiver that emits
/// batches of changed file paths, debounced.
pub fn start_watching(
    root: &Path,
) -> Result<(RecommendedWatcher, mpsc::Receiver<Vec<PathBuf>>), notify::Error> {
    let (tx, rx) = mpsc::channel::<Vec<PathBuf>>(64);
    let root = root.to_path_buf();

    // Debounce: collect events for the window, then flush
    let (event_tx, mut event_rx) = mpsc::channel::<PathBuf>(256);

    tokio::spawn(async move {
        let mut batch: Vec<PathBuf> = Vec::new();

        loop {
            match tokio::time::timeout(DEBOUNCE, event_rx.recv()).await {
                Ok(Some(path)) => {
                    if !batch.contains(&path) {
                        batch.push(path);
                    }
                }
                Ok(None) => break, // channel closed
                Err(_) => {
                    // Timeout — flush batch
                    if !batch.is_empty() {
                        let flushed = std::mem::take(&mut batch);
                        if tx.send(flushed).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            if matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                for path in event.paths {
                    if should_watch(&path) {
                        let _ = event_tx.blocking_send(path);
                    }
                }
            }
        }
    })?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    Ok((watcher, rx))
}

/// Whether a changed path is a source file the indexer cares about.
fn should_watch(path: &Path) -> bool {
    let in_ignored_dir = path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|name| IGNORED_DIRS.contains(&name))
            .unwrap_or(false)
    });
    if in_ignored_dir {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| WATCHED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_watch_extensions() {
        assert!(should_watch(Path::new("/p/src/app.ts")));
        assert!(should_watch(Path::new("/p/src/app.PY")));
        assert!(!should_watch(Path::new("/p/README.md")));
        assert!(!should_watch(Path::new("/p/src/app")));
    }

    #[test]
    fn test_should_watch_ignores_directories() {
        assert!(!should_watch(Path::new("/p/node_modules/lib/index.js")));
        assert!(!should_watch(Path::new("/p/.lazyload/index.db")));
        assert!(!should_watch(Path::new("/p/__pycache__/mod.py")));
        assert!(should_watch(Path::new("/p/src/deep/mod.py")));
    }
}
