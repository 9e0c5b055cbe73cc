//! lazyload CLI — local code intelligence for AI coding assistants.
//!
//! This binary provides the `lazyload` command with subcommands for
//! initialization, indexing, searching, serving MCP, watching, and index
//! maintenance. See `lazyload --help` for usage.

use std::path::PathBuf;

use clap::Parser;

mod cli_args;
mod commands;

use cli_args::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let root = cli
        .root
        .as_deref()
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let exit_code = match cli.command {
        Commands::Init { force } => commands::init::run(&root, force),
        Commands::Index { directory } => {
            commands::index::run(&root, directory.as_deref(), cli.verbose)
        }
        Commands::Search {
            query,
            kind,
            return_type,
            param_type,
            limit,
            compact,
        } => commands::search::run(
            &root,
            query.as_deref(),
            kind.as_deref(),
            return_type.as_deref(),
            param_type.as_deref(),
            limit,
            compact,
        ),
        Commands::Serve => commands::serve::run(&root, cli.verbose),
        Commands::Sync {
            files,
            rebuild_chains,
        } => commands::sync::run(&root, &files, rebuild_chains),
        Commands::Watch => commands::watch::run(&root, cli.verbose),
        Commands::Stats => commands::stats::run(&root),
        Commands::Remove { path } => commands::remove::run(&root, &path),
        Commands::Completion { shell } => {
            use clap::CommandFactory;
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "lazyload",
                &mut std::io::stdout(),
            );
            0
        }
    };

    std::process::exit(exit_code);
}
