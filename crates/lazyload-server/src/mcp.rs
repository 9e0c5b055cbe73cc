//! MCP (Model Context Protocol) JSON-RPC server over stdin/stdout.
//!
//! Requests are newline-delimited JSON objects. Tool calls arrive via
//! `tools/call` (or directly by tool name) and are routed through the
//! session governor before any handler runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lazyload_engine::governor::{GovernorDecision, SessionPhase, SYNTHESIZE_NOTE};
use lazyload_engine::tools;

use crate::{ServerState, SharedState};

#[derive(Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

#[derive(Serialize, Debug)]
pub(crate) struct JsonRpcError {
    pub(crate) code: i64,
    pub(crate) message: String,
}

#[derive(Serialize, Deserialize)]
struct ToolInfo {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

pub(crate) const TOOL_NAMES: &[&str] = &[
    "list_files",
    "list_functions",
    "search_symbols",
    "get_function",
    "get_class",
    "get_related_context",
    "find_references",
    "trace_calls",
    "trace_types",
    "get_module_dependencies",
    "get_architecture_overview",
    "suggest_related",
    "sync_index",
];

fn tool_list() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            name: "list_files".into(),
            description: "List indexed files with per-directory aggregates".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "directory": { "type": "string" },
                    "recursive": { "type": "boolean", "default": true },
                    "language": { "type": "string", "enum": ["typescript", "javascript", "python"] },
                    "limit": { "type": "integer" },
                    "offset": { "type": "integer" },
                    "exclude_patterns": { "type": "array", "items": { "type": "string" } },
                    "include_tests": { "type": "boolean", "default": false },
                    "summary_only": { "type": "boolean", "default": false },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "list_functions".into(),
            description: "List all function signatures in a file".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["filePath"],
                "properties": {
                    "filePath": { "type": "string" },
                    "include_source": { "type": "boolean", "default": false },
                    "limit": { "type": "integer" },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "search_symbols".into(),
            description: "Search symbols by name (with synonym expansion) and/or type signature".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "type": { "type": "string", "enum": ["function", "method", "constructor", "callback", "class", "interface", "type_alias", "variable"] },
                    "language": { "type": "string", "enum": ["typescript", "javascript", "python"] },
                    "limit": { "type": "integer", "default": 20 },
                    "expand_synonyms": { "type": "boolean", "default": true },
                    "return_type": { "type": "string" },
                    "param_type": { "type": "string" },
                    "match_mode": { "type": "string", "enum": ["exact", "base", "inner", "partial"] },
                    "verbose": { "type": "boolean", "default": false },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "get_function".into(),
            description: "Return a function's full source and metadata".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["functionName"],
                "properties": {
                    "functionName": { "type": "string" },
                    "filePath": { "type": "string" },
                    "includeContext": { "type": "boolean", "default": false },
                    "contextLines": { "type": "integer", "default": 5 },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "get_class".into(),
            description: "Return a class's full source and metadata".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["className"],
                "properties": {
                    "className": { "type": "string" },
                    "filePath": { "type": "string" },
                    "includeContext": { "type": "boolean", "default": false },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "get_related_context".into(),
            description: "Bundle a symbol with its types, callees, and related tests under a token budget".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["symbolName"],
                "properties": {
                    "symbolName": { "type": "string" },
                    "filePath": { "type": "string" },
                    "includeTypes": { "type": "boolean", "default": true },
                    "includeCallees": { "type": "boolean", "default": true },
                    "includeTests": { "type": "boolean", "default": false },
                    "calleeDepth": { "type": "integer", "minimum": 1, "maximum": 2 },
                    "maxTokens": { "type": "integer", "default": 2000 },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "find_references".into(),
            description: "Find references to a symbol, grouped by file".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["symbolName"],
                "properties": {
                    "symbolName": { "type": "string" },
                    "filePath": { "type": "string" },
                    "limit": { "type": "integer", "default": 50 },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "trace_calls".into(),
            description: "Trace callers and/or callees of a function".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["functionName"],
                "properties": {
                    "functionName": { "type": "string" },
                    "direction": { "type": "string", "enum": ["callers", "callees", "both"] },
                    "depth": { "type": "integer", "minimum": 1, "maximum": 3 },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "trace_types".into(),
            description: "Show a type's inheritance hierarchy or implementations".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["className"],
                "properties": {
                    "className": { "type": "string" },
                    "mode": { "type": "string", "enum": ["hierarchy", "implementations"] },
                    "direction": { "type": "string", "enum": ["up", "down", "both"] },
                    "limit": { "type": "integer" },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "get_module_dependencies".into(),
            description: "Show a file's imports, reverse dependencies, transitive tree, and cycles".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["filePath"],
                "properties": {
                    "filePath": { "type": "string" },
                    "depth": { "type": "integer", "minimum": 1, "maximum": 5 },
                    "includeReverse": { "type": "boolean", "default": true },
                    "includeExternal": { "type": "boolean", "default": false },
                    "includeTypeOnly": { "type": "boolean", "default": true },
                    "detectCycles": { "type": "boolean", "default": false },
                    "outputFormat": { "type": "string", "enum": ["tree", "list"] },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "get_architecture_overview".into(),
            description: "Module map, entry points, and public API".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "focus": { "type": "string" },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "suggest_related".into(),
            description: "Suggest related symbols via the relationship chains".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["symbol_name"],
                "properties": {
                    "symbol_name": { "type": "string" },
                    "file_path": { "type": "string" },
                    "chain_types": { "type": "array", "items": { "type": "string", "enum": ["call_flow", "cooccurrence", "type_affinity", "import_cluster"] } },
                    "depth": { "type": "integer", "minimum": 1, "maximum": 5 },
                    "min_probability": { "type": "number", "minimum": 0, "maximum": 1 },
                    "limit": { "type": "integer", "default": 10 },
                    "explain": { "type": "boolean", "default": false },
                    "format": { "type": "string", "enum": ["markdown", "compact"] }
                }
            }),
        },
        ToolInfo {
            name: "sync_index".into(),
            description: "Re-index changed files; optionally rebuild the relationship chains".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "files": { "type": "array", "items": { "type": "string" } },
                    "rebuild_chains": { "type": "boolean", "default": false }
                }
            }),
        },
    ]
}

fn dispatch(state: &SharedState, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
    match method {
        "initialize" => Ok(serde_json::json!({
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "lazyload",
                "version": env!("CARGO_PKG_VERSION")
            }
        })),
        "tools/list" => serde_json::to_value(serde_json::json!({ "tools": tool_list() }))
            .map_err(internal_err),
        "tools/call" => {
            let params = params.unwrap_or(Value::Null);
            let name = params
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| missing_param("name"))?
                .to_string();
            let arguments = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            call_tool(state, &name, arguments)
        }
        // Tool names also dispatch directly, with params as the arguments.
        name if TOOL_NAMES.contains(&name) => {
            let arguments = params.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            call_tool(state, name, arguments)
        }
        _ => Err(JsonRpcError {
            code: -32601,
            message: format!("Method not found: {}", method),
        }),
    }
}

/// Run one governed tool call and wrap the text into the MCP content shape.
fn call_tool(state: &SharedState, name: &str, arguments: Value) -> Result<Value, JsonRpcError> {
    if !TOOL_NAMES.contains(&name) {
        return Err(JsonRpcError {
            code: -32602,
            message: format!("Unknown tool: {}", name),
        });
    }

    let mut guard = lock_state(state)?;
    let decision = guard.governor.admit(name, &arguments);
    let text = match decision {
        GovernorDecision::Cached(text) => text,
        GovernorDecision::Finalized(message) => message,
        GovernorDecision::Proceed { phase } => {
            let outcome = {
                let ServerState { store, tools, .. } = &mut *guard;
                run_handler(tools, store, name, &arguments)
            };
            match outcome {
                Ok(response) => {
                    guard.governor.record_response(name, &arguments, &response);
                    if name == "sync_index" {
                        guard.governor.invalidate_cache();
                    }
                    if phase == SessionPhase::Synthesize {
                        format!("{}{}", response, SYNTHESIZE_NOTE)
                    } else {
                        response
                    }
                }
                // Handler failures come back as text, never a crash.
                Err(message) => format!("Error: {}", message),
            }
        }
    };

    Ok(serde_json::json!({
        "content": [{ "type": "text", "text": text }]
    }))
}

fn parse_input<T: serde::de::DeserializeOwned>(arguments: &Value) -> Result<T, String> {
    serde_json::from_value(arguments.clone()).map_err(|e| format!("invalid params: {}", e))
}

fn run_handler(
    tools_ctx: &tools::QueryTools,
    store: &mut lazyload_core::sqlite::SqliteIndexStore,
    name: &str,
    arguments: &Value,
) -> Result<String, String> {
    let run = |r: Result<String, tools::ToolError>| r.map_err(|e| e.to_string());
    match name {
        "list_files" => run(tools_ctx.list_files(store, &parse_input(arguments)?)),
        "list_functions" => run(tools_ctx.list_functions(store, &parse_input(arguments)?)),
        "search_symbols" => run(tools_ctx.search_symbols(store, &parse_input(arguments)?)),
        "get_function" => run(tools_ctx.get_function(store, &parse_input(arguments)?)),
        "get_class" => run(tools_ctx.get_class(store, &parse_input(arguments)?)),
        "get_related_context" => {
            run(tools_ctx.get_related_context(store, &parse_input(arguments)?))
        }
        "find_references" => run(tools_ctx.find_references(store, &parse_input(arguments)?)),
        "trace_calls" => run(tools_ctx.trace_calls(store, &parse_input(arguments)?)),
        "trace_types" => run(tools_ctx.trace_types(store, &parse_input(arguments)?)),
        "get_module_dependencies" => {
            run(tools_ctx.get_module_dependencies(store, &parse_input(arguments)?))
        }
        "get_architecture_overview" => {
            run(tools_ctx.get_architecture_overview(store, &parse_input(arguments)?))
        }
        "suggest_related" => run(tools_ctx.suggest_related(store, &parse_input(arguments)?)),
        "sync_index" => run(tools_ctx.sync_index(store, &parse_input(arguments)?)),
        _ => Err(format!("Unknown tool: {}", name)),
    }
}

/// Process a single JSON-RPC line and return the response JSON string.
pub fn process_line(state: &SharedState, line: &str) -> String {
    if line.trim().is_empty() {
        return String::new();
    }

    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            let err_resp = JsonRpcResponse {
                jsonrpc: "2.0".into(),
                result: None,
                error: Some(JsonRpcError {
                    code: -32700,
                    message: format!("Parse error: {}", e),
                }),
                id: Value::Null,
            };
            return serde_json::to_string(&err_resp).unwrap_or_default();
        }
    };

    // Notifications (no id) get no response.
    let is_notification = request.id.is_none() && request.method.starts_with("notifications/");
    if is_notification {
        return String::new();
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    let response = match dispatch(state, &request.method, request.params) {
        Ok(result) => JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        },
    };

    serde_json::to_string(&response).unwrap_or_default()
}

pub(crate) fn internal_err(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError {
        code: -32603,
        message: e.to_string(),
    }
}

fn missing_param(name: &str) -> JsonRpcError {
    JsonRpcError {
        code: -32602,
        message: format!("Missing '{}' parameter", name),
    }
}

pub(crate) fn lock_state(
    state: &SharedState,
) -> Result<std::sync::MutexGuard<'_, ServerState>, JsonRpcError> {
    state.lock().map_err(|_| JsonRpcError {
        code: -32603,
        message: "State lock poisoned".into(),
    })
}

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;
