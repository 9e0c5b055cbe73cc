use std::path::Path;

use lazyload_core::store::IndexStore;

pub fn run(root: &Path, path: &str) -> i32 {
    let config = super::load_config(root);
    let mut store = match super::open_store(root, &config) {
        Ok(s) => s,
        Err(code) => return code,
    };

    // Accept either the stored form or a root-relative spelling.
    let normalized = lazyload_parsers::imports::normalize(&root.join(path));
    let removed = match store.remove_file(&normalized) {
        Ok(true) => true,
        Ok(false) => match store.remove_file(path) {
            Ok(flag) => flag,
            Err(e) => {
                eprintln!("lazyload: remove failed: {}", e);
                return 1;
            }
        },
        Err(e) => {
            eprintln!("lazyload: remove failed: {}", e);
            return 1;
        }
    };

    if removed {
        println!("Removed {} from the index", path);
        0
    } else {
        eprintln!("lazyload: {} is not in the index", path);
        1
    }
}
