pub mod index;
pub mod init;
pub mod remove;
pub mod search;
pub mod serve;
pub mod stats;
pub mod sync;
pub mod watch;

use std::path::Path;

use lazyload_core::config::LazyloadConfig;
use lazyload_core::sqlite::SqliteIndexStore;

/// Load the project config from `<root>/.lazyload/config.json` (defaults
/// when absent).
pub(crate) fn load_config(root: &Path) -> LazyloadConfig {
    LazyloadConfig::load(&root.join(".lazyload"))
}

/// Open the index database configured for this root.
pub(crate) fn open_store(root: &Path, config: &LazyloadConfig) -> Result<SqliteIndexStore, i32> {
    let db_path = root.join(&config.output.database);
    SqliteIndexStore::open(&db_path).map_err(|e| {
        eprintln!("lazyload: failed to open index at {}: {}", db_path.display(), e);
        1
    })
}
