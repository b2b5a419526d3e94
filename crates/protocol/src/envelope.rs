use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::JSON_RPC_VERSION;

/// A JSON-RPC 2.0 request as posted to the storage service.
///
/// `params` is always an object so the session token can be injected next to
/// the method's own parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Map<String, Value>,
    pub id: u64,
}

impl RpcRequest {
    /// Creates a request for `method` with the given parameters.
    pub fn new(id: u64, method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 response envelope.
///
/// The service does not always echo `id` or include `error`, so both are
/// optional. `result` is optional here because its absence is a protocol
/// failure the caller must be able to observe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl RpcResponse {
    /// Returns the error payload as text, if the envelope carries a non-null one.
    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(obj)) => Some(
                obj.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
            ),
            Some(other) => Some(other.to_string()),
        }
    }
}
