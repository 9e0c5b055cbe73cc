//! MCP stdio loop with per-connection session state.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{mcp, SharedState};

/// Run the MCP server loop, reading JSON-RPC from stdin and writing to
/// stdout. Returns on stdin EOF or when the shutdown flag is raised: new
/// requests stop being accepted, the in-flight one finishes, and the caller
/// closes the storage connection by dropping the state.
pub fn run_stdio(state: SharedState, shutdown: Arc<AtomicBool>) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();

    for line in stdin.lock().lines() {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = mcp::process_line(&state, &line);
        if response.is_empty() {
            continue;
        }

        let mut out = stdout.lock();
        writeln!(out, "{}", response)?;
        out.flush()?;
    }

    Ok(())
}
