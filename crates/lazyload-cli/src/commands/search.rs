use std::path::Path;

use lazyload_engine::tools::search::SearchSymbolsInput;
use lazyload_engine::tools::QueryTools;

#[allow(clippy::too_many_arguments)]
pub fn run(
    root: &Path,
    query: Option<&str>,
    kind: Option<&str>,
    return_type: Option<&str>,
    param_type: Option<&str>,
    limit: usize,
    compact: bool,
) -> i32 {
    let config = super::load_config(root);
    let store = match super::open_store(root, &config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let tools = QueryTools::new(root, config);

    let input = SearchSymbolsInput {
        query: query.map(str::to_string),
        kind: kind.map(str::to_string),
        return_type: return_type.map(str::to_string),
        param_type: param_type.map(str::to_string),
        limit: Some(limit),
        format: compact.then(|| "compact".to_string()),
        ..SearchSymbolsInput::default()
    };

    match tools.search_symbols(&store, &input) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("lazyload: {}", e);
            1
        }
    }
}
