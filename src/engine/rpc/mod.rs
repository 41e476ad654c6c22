//! JSON-RPC transport (C13, §4.11): a line-delimited loop over stdin/stdout.
//! Requests are read on a dedicated task and dispatched onto the shared
//! Tokio runtime so a slow query never stalls the read loop; the logging
//! subsystem never writes to stdout, since that stream is the protocol.

pub mod methods;
pub mod types;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

pub use methods::Engine;
use types::{JsonRpcRequest, JsonRpcResponse};

use crate::crawler::ProgressEvent;

/// Reads JSON-RPC requests from `stdin`, dispatches each on its own task,
/// and writes responses to `stdout` as they complete — concurrent dispatch
/// is allowed; id correlation on the client side is what keeps replies
/// matched to requests, not response order.
pub async fn run_stdio_loop(engine: Arc<Engine>, mut progress_rx: UnboundedReceiver<ProgressEvent>) {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let stdout = Arc::new(tokio::sync::Mutex::new(tokio::io::stdout()));

    let progress_stdout = stdout.clone();
    tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            let notification = types::ProgressNotification::new(serde_json::json!(event));
            if let Ok(line) = serde_json::to_string(&notification) {
                let mut out = progress_stdout.lock().await;
                let _ = out.write_all(line.as_bytes()).await;
                let _ = out.write_all(b"\n").await;
                let _ = out.flush().await;
            }
        }
    });

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(target: "engine::rpc", error = %e, "stdin read error, shutting down transport");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let engine = engine.clone();
        let stdout = stdout.clone();
        tokio::spawn(async move {
            let response = handle_line(&engine, &line).await;
            if let Ok(text) = serde_json::to_string(&response) {
                let mut out = stdout.lock().await;
                let _ = out.write_all(text.as_bytes()).await;
                let _ = out.write_all(b"\n").await;
                let _ = out.flush().await;
            }
        });
    }
}

async fn handle_line(engine: &Engine, line: &str) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return JsonRpcResponse::failure(None, -32700, format!("parse error: {e}")),
    };
    let id = request.id.clone();
    match methods::dispatch(engine, &request.method, request.params).await {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(e) => JsonRpcResponse::failure(id, e.rpc_code(), e.message),
    }
}
