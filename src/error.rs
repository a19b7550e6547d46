use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebuggerError {
    #[error("Invalid array path: {0}")]
    InvalidArrayPath(String),

    #[error("No trace node at array path '{path}'")]
    NodeNotFound { path: String },

    #[error("HTML parse error: {0}")]
    HtmlParse(String),

    #[error("Channel error: scope={scope}, {message}")]
    Channel { scope: String, message: String },

    #[error("Origin mismatch: expected {expected}, got {actual}")]
    OriginMismatch { expected: String, actual: String },

    #[error("JSON-RPC error: code={code}, {message}")]
    JsonRpc { code: i32, message: String },

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params for {method}: {message}")]
    InvalidParams { method: String, message: String },

    #[error("Expression evaluation failed: {0}")]
    Expression(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type DebuggerResult<T> = Result<T, DebuggerError>;
