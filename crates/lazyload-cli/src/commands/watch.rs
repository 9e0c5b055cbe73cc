use std::path::Path;

use lazyload_engine::indexer::Indexer;
use lazyload_server::watcher;

/// Run `lazyload watch` — re-index debounced change batches until Ctrl-C.
pub fn run(root: &Path, verbose: bool) -> i32 {
    let config = super::load_config(root);
    let mut store = match super::open_store(root, &config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let indexer = Indexer::new(root, config);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("lazyload watch: failed to create runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let (_watcher, mut rx) = match watcher::start_watching(root) {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("lazyload watch: {}", e);
                return 1;
            }
        };
        if verbose {
            eprintln!("lazyload watch: watching {}", root.display());
        }

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("lazyload watch: stopping");
                    return 0;
                }
                batch = rx.recv() => {
                    let Some(changed) = batch else { return 0 };
                    let files: Vec<String> = changed
                        .iter()
                        .map(|p| lazyload_parsers::imports::normalize(p))
                        .collect();
                    if verbose {
                        eprintln!("lazyload: {} file(s) changed", files.len());
                    }
                    match indexer.sync(&mut store, Some(&files), false) {
                        Ok(summary) => {
                            if summary.indexed_files > 0 {
                                eprintln!(
                                    "lazyload: re-indexed {} file(s)",
                                    summary.indexed_files
                                );
                            }
                        }
                        Err(e) => {
                            eprintln!("lazyload: sync failed: {}", e);
                            return 1;
                        }
                    }
                }
            }
        }
    })
}
