use clap::{Parser, Subcommand};

/// Token-economical code intelligence for AI coding assistants.
#[derive(Parser)]
#[command(name = "lazyload", version, about)]
pub struct Cli {
    /// Project root (defaults to the current directory).
    #[arg(long, global = true)]
    pub root: Option<String>,

    /// Verbose diagnostics on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default .lazyload/config.json.
    Init {
        /// Overwrite an existing config.
        #[arg(long)]
        force: bool,
    },

    /// Index the configured source tree.
    Index {
        /// Restrict the scan to one subdirectory.
        directory: Option<String>,
    },

    /// Search indexed symbols by name and/or type.
    Search {
        /// The name query.
        query: Option<String>,
        /// Filter by symbol kind (function, class, ...).
        #[arg(long)]
        kind: Option<String>,
        /// Filter by return type.
        #[arg(long)]
        return_type: Option<String>,
        /// Filter by parameter type.
        #[arg(long)]
        param_type: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Compact tab-separated output.
        #[arg(long)]
        compact: bool,
    },

    /// Serve the MCP stdio protocol.
    Serve,

    /// Re-index changed files.
    Sync {
        /// Specific files; all indexed files when omitted.
        files: Vec<String>,
        /// Rebuild the relationship chains afterwards.
        #[arg(long)]
        rebuild_chains: bool,
    },

    /// Watch the tree and re-index on change.
    Watch,

    /// Index and chain statistics.
    Stats,

    /// Remove a file from the index.
    Remove {
        path: String,
    },

    /// Generate shell completions.
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
