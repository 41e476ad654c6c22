//! JSON-RPC 2.0 line-delimited envelope types (C13, §4.11).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        JsonRpcResponse { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    pub fn failure(id: Option<Value>, code: i64, message: String) -> Self {
        JsonRpcResponse { jsonrpc: "2.0", id, result: None, error: Some(JsonRpcErrorBody { code, message, data: None }) }
    }
}

/// An unsolicited `{"jsonrpc":"2.0","method":"progress","params":…}` frame
/// (§4.11), carrying no `id`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressNotification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Value,
}

impl ProgressNotification {
    pub fn new(params: Value) -> Self {
        ProgressNotification { jsonrpc: "2.0", method: "progress", params }
    }
}
