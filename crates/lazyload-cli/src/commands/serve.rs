use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lazyload_server::{mcp_stdio, LazyloadServer};

/// Run `lazyload serve` — the MCP stdio server.
///
/// The loop ends on stdin EOF (client disconnect) or SIGINT/SIGTERM; either
/// way in-flight work finishes and the store closes cleanly on drop.
pub fn run(root: &Path, verbose: bool) -> i32 {
    let config = super::load_config(root);
    let server = match LazyloadServer::open(root, config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("lazyload serve: failed to open store: {}", e);
            return 1;
        }
    };

    if verbose {
        eprintln!("lazyload serve: MCP stdio on {}", root.display());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    install_signal_handlers(shutdown.clone());

    match mcp_stdio::run_stdio(server.state, shutdown) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("lazyload serve: MCP error: {}", e);
            1
        }
    }
}

#[cfg(unix)]
fn install_signal_handlers(shutdown: Arc<AtomicBool>) {
    // Flag-only handlers: the stdio loop observes the flag between requests.
    let term = shutdown.clone();
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(_) => return,
        };
        rt.block_on(async move {
            let mut sigterm = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(s) => s,
                Err(_) => return,
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
            term.store(true, Ordering::Relaxed);
        });
    });
}

#[cfg(not(unix))]
fn install_signal_handlers(shutdown: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(_) => return,
        };
        rt.block_on(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.store(true, Ordering::Relaxed);
            }
        });
    });
}
