use std::path::Path;
use std::sync::atomic::AtomicBool;

use lazyload_engine::indexer::Indexer;

pub fn run(root: &Path, directory: Option<&str>, verbose: bool) -> i32 {
    let config = super::load_config(root);
    let mut store = match super::open_store(root, &config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let indexer = Indexer::new(root, config);
    let cancel = AtomicBool::new(false);

    let summary = match indexer.index_directory(&mut store, directory.map(Path::new), &cancel) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("lazyload: indexing failed: {}", e);
            return 1;
        }
    };

    println!(
        "Indexed {} of {} files ({} unchanged) in {} ms",
        summary.indexed_files, summary.total_files, summary.skipped_files, summary.duration_ms
    );
    if !summary.errors.is_empty() {
        println!("{} files had parse problems:", summary.errors.len());
        for error in summary.errors.iter().take(if verbose { usize::MAX } else { 10 }) {
            println!("  {}: {}", error.path, error.message);
        }
    }
    0
}
