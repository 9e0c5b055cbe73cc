use std::path::Path;

use lazyload_core::store::IndexStore;

pub fn run(root: &Path) -> i32 {
    let config = super::load_config(root);
    let store = match super::open_store(root, &config) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let stats = store.stats();
    println!("Files:      {}", stats.file_count);
    println!("Symbols:    {}", stats.symbol_count);
    println!(
        "References: {} ({} resolved)",
        stats.reference_count, stats.resolved_references
    );
    println!("Call edges: {}", stats.call_count);

    let chains = store.get_all_chain_stats();
    if chains.is_empty() {
        println!("Chains:     not built");
    } else {
        for chain in chains {
            println!(
                "Chain {}: {} states, {} transitions",
                chain.chain, chain.state_count, chain.transition_count
            );
        }
    }
    0
}
