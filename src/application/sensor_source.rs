// Source trait for raw sensor payloads
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Why a payload could not be retrieved or decoded.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("HTTP error from {url}: status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON payload: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("invalid data format: expected an array or a single object, got {0}")]
    WrongShape(&'static str),
    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Short description for logs (URL or file path).
    fn describe(&self) -> String;

    /// Fetch and decode the current payload
    async fn fetch(&self) -> Result<Value, RetrievalError>;
}

/// Name of a JSON value's type, for shape errors.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
