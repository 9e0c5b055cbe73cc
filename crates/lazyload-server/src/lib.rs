//! MCP server and file watcher for lazyload.
//!
//! The server speaks JSON-RPC over newline-delimited stdio, advertises the
//! thirteen query tools, and routes every call through the per-session
//! governor. The watcher debounces filesystem events into re-index batches.

pub mod mcp;
pub mod mcp_stdio;
pub mod watcher;

use std::path::Path;
use std::sync::{Arc, Mutex};

use lazyload_core::config::LazyloadConfig;
use lazyload_core::sqlite::SqliteIndexStore;
use lazyload_core::types::StoreError;
use lazyload_engine::governor::SessionGovernor;
use lazyload_engine::tools::QueryTools;

/// Everything one MCP connection operates on. The store is the single
/// writer; the governor is per-session state.
pub struct ServerState {
    pub store: SqliteIndexStore,
    pub tools: QueryTools,
    pub governor: SessionGovernor,
}

pub type SharedState = Arc<Mutex<ServerState>>;

pub struct LazyloadServer {
    pub state: SharedState,
}

impl LazyloadServer {
    /// Open the index database and wire up the query tools for `root`.
    pub fn open(root: &Path, config: LazyloadConfig) -> Result<Self, StoreError> {
        let db_path = root.join(&config.output.database);
        let store = SqliteIndexStore::open(&db_path)?;
        let tools = QueryTools::new(root, config);
        Ok(Self {
            state: Arc::new(Mutex::new(ServerState {
                store,
                tools,
                governor: SessionGovernor::default(),
            })),
        })
    }

    /// In-memory variant for tests.
    pub fn in_memory(root: &Path, config: LazyloadConfig) -> Result<Self, StoreError> {
        let store = SqliteIndexStore::in_memory()?;
        let tools = QueryTools::new(root, config);
        Ok(Self {
            state: Arc::new(Mutex::new(ServerState {
                store,
                tools,
                governor: SessionGovernor::default(),
            })),
        })
    }
}
