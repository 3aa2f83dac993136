//! Tool call envelopes shared across unibio crates

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Expected latency of a tool, used to pick the dispatch timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LatencyClass {
    /// Local deterministic computation
    #[default]
    Fast,
    /// Calls out to an external service (NCBI, PubMed)
    Slow,
}

impl fmt::Display for LatencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencyClass::Fast => write!(f, "fast"),
            LatencyClass::Slow => write!(f, "slow"),
        }
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Build a request from a loosely typed argument value.
    ///
    /// Anything that is not a JSON object (including `null`) becomes an
    /// empty argument map.
    pub fn from_value(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(name, arguments)
    }
}

/// Uniform result envelope for a tool execution
///
/// Always well-formed: a failed handler produces `success = false` with an
/// error message and an empty payload object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default = "empty_object")]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub execution_time_ms: u64,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl ToolResult {
    pub fn success(payload: Value, exec_time: u64) -> Self {
        Self {
            success: true,
            payload: into_object(payload),
            error: None,
            execution_time_ms: exec_time,
        }
    }

    pub fn error(error: impl Into<String>, exec_time: u64) -> Self {
        Self {
            success: false,
            payload: empty_object(),
            error: Some(error.into()),
            execution_time_ms: exec_time,
        }
    }

    /// Normalize a raw handler payload.
    ///
    /// Tools report logical failures (e.g. "no primers found") with
    /// `"success": false` inside their payload; those become failed results
    /// carrying the payload's `message` as the error, while keeping the
    /// payload itself so the model can still read it.
    pub fn from_payload(payload: Value, exec_time: u64) -> Self {
        let payload = into_object(payload);
        let reported = payload.get("success").and_then(Value::as_bool);

        if reported == Some(false) {
            let error = payload
                .get("message")
                .or_else(|| payload.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("tool reported failure")
                .to_string();
            return Self {
                success: false,
                payload,
                error: Some(error),
                execution_time_ms: exec_time,
            };
        }

        Self::success(payload, exec_time)
    }

    /// Value handed back to the model as a function response.
    pub fn to_model_response(&self) -> Value {
        json!({ "result": self })
    }
}

fn into_object(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        Value::Null => empty_object(),
        other => json!({ "result": other }),
    }
}

/// One executed call, kept for the lifetime of a single `send_message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(rename = "function")]
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    pub result: ToolResult,
}

impl CallRecord {
    pub fn new(request: &ToolCallRequest, result: ToolResult) -> Self {
        Self {
            tool_name: request.name.clone(),
            arguments: request.arguments.clone(),
            result,
        }
    }
}
