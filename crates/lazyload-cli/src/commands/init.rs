use std::path::Path;

use lazyload_core::config::LazyloadConfig;

/// Write a default config file. Non-interactive: edit the JSON afterwards.
pub fn run(root: &Path, force: bool) -> i32 {
    let dir = root.join(".lazyload");
    let config_path = dir.join("config.json");
    if config_path.exists() && !force {
        eprintln!(
            "lazyload: {} already exists (use --force to overwrite)",
            config_path.display()
        );
        return 1;
    }
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("lazyload: failed to create {}: {}", dir.display(), e);
        return 1;
    }
    let config = LazyloadConfig::default();
    let json = match serde_json::to_string_pretty(&config) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("lazyload: failed to render config: {}", e);
            return 1;
        }
    };
    if let Err(e) = std::fs::write(&config_path, json) {
        eprintln!("lazyload: failed to write {}: {}", config_path.display(), e);
        return 1;
    }
    println!("Wrote {}", config_path.display());
    0
}
