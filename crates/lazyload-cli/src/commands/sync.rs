use std::path::Path;

use lazyload_engine::indexer::Indexer;

pub fn run(root: &Path, files: &[String], rebuild_chains: bool) -> i32 {
    let config = super::load_config(root);
    let mut store = match super::open_store(root, &config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let indexer = Indexer::new(root, config);

    let file_list = (!files.is_empty()).then_some(files);
    match indexer.sync(&mut store, file_list, rebuild_chains) {
        Ok(summary) => {
            println!(
                "Checked {} files: {} updated, {} unchanged ({} ms)",
                summary.total_files,
                summary.indexed_files,
                summary.skipped_files,
                summary.duration_ms
            );
            for error in &summary.errors {
                eprintln!("  {}: {}", error.path, error.message);
            }
            0
        }
        Err(e) => {
            eprintln!("lazyload: sync failed: {}", e);
            1
        }
    }
}
