//! JSON-RPC 2.0 frames exchanged between the page and the observer.
//!
//! Every frame travels inside an [`Envelope`] naming the channel scope and
//! the sender's origin; receivers drop envelopes that do not match their own.

use serde::{Deserialize, Serialize};

use crate::error::{DebuggerError, DebuggerResult};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    Number(i64),
    String(String),
}

impl From<i64> for JsonRpcId {
    fn from(n: i64) -> Self {
        JsonRpcId::Number(n)
    }
}

impl From<&str> for JsonRpcId {
    fn from(s: &str) -> Self {
        JsonRpcId::String(s.to_string())
    }
}

/// A call that expects an acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: JsonRpcId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<JsonRpcId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: Option<serde_json::Value>) -> Self {
        self.params = params;
        self
    }
}

/// Acknowledgment of a [`JsonRpcRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: JsonRpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: JsonRpcId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: JsonRpcId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Result value, or the remote error as a [`DebuggerError::JsonRpc`].
    pub fn into_result(self) -> DebuggerResult<serde_json::Value> {
        match self.error {
            Some(error) => Err(DebuggerError::JsonRpc {
                code: error.code,
                message: error.message,
            }),
            None => Ok(self.result.unwrap_or(serde_json::Value::Null)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

pub mod error_codes {
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Fire-and-forget call; never acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
        }
    }
}

/// Any JSON-RPC frame. Variant order matters for untagged decoding: a
/// request has both `id` and `method`, a response only `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

/// Scoped, origin-stamped frame as it goes over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub scope: String,
    pub origin: String,
    pub frame: Frame,
}

impl Envelope {
    pub fn new(scope: &str, origin: &str, frame: Frame) -> Self {
        Self {
            scope: scope.to_string(),
            origin: origin.to_string(),
            frame,
        }
    }

    pub fn encode(&self) -> DebuggerResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> DebuggerResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reject envelopes from another channel scope or another origin.
    pub fn verify(&self, scope: &str, origin: &str) -> DebuggerResult<()> {
        if self.scope != scope {
            return Err(DebuggerError::Channel {
                scope: scope.to_string(),
                message: format!("frame addressed to scope '{}'", self.scope),
            });
        }
        if self.origin != origin {
            return Err(DebuggerError::OriginMismatch {
                expected: origin.to_string(),
                actual: self.origin.clone(),
            });
        }
        Ok(())
    }
}
