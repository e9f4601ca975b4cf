//! Tool-result envelope shared by every vendor module
//!
//! Argument problems become protocol errors (`invalid_params`). Failures while
//! talking to a chain come back as a normal tool result with `is_error` set and a
//! single `Error <action>: <cause>` text block. Successes are one text block of
//! pretty-printed JSON.

use rmcp::model::{CallToolResult, Content, Tool};
use rmcp::ErrorData as McpError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub type JsonObject = serde_json::Map<String, Value>;

/// Build a tool whose input schema is derived from its parameter type.
pub fn tool<P: JsonSchema>(name: &'static str, description: &'static str) -> Tool {
    Tool::new(name, description, Arc::new(input_schema::<P>()))
}

/// JSON schema object for a parameter struct, always with `type` and `properties`.
pub fn input_schema<P: JsonSchema>() -> JsonObject {
    let schema = schemars::schema_for!(P);
    let mut object = match serde_json::to_value(&schema) {
        Ok(Value::Object(map)) => map,
        _ => JsonObject::new(),
    };

    object.remove("$schema");
    object.remove("title");
    object.insert("type".to_string(), Value::String("object".to_string()));
    object
        .entry("properties")
        .or_insert_with(|| Value::Object(JsonObject::new()));
    object
}

/// Deserialize tool arguments, treating absent arguments as an empty object.
pub fn parse_args<P: DeserializeOwned>(args: Option<&JsonObject>) -> Result<P, McpError> {
    let value = Value::Object(args.cloned().unwrap_or_default());
    serde_json::from_value(value)
        .map_err(|e| McpError::invalid_params(format!("Invalid arguments: {}", e), None))
}

/// Successful result carrying `value` as indented JSON.
pub fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize result: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Error result for a failed chain query.
pub fn error_result(action: &str, err: &anyhow::Error) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("Error {}: {:#}", action, err))])
}

/// Run a chain query and wrap its outcome in the envelope.
pub async fn run<T, F>(action: &str, query: F) -> Result<CallToolResult, McpError>
where
    T: Serialize,
    F: Future<Output = anyhow::Result<T>>,
{
    match query.await {
        Ok(value) => json_result(&value),
        Err(e) => {
            tracing::warn!(action, error = %format!("{:#}", e), "tool call failed");
            Ok(error_result(action, &e))
        }
    }
}

/// Text of the first content block, if it is text
pub fn first_text(result: &CallToolResult) -> Option<&str> {
    result
        .content
        .first()
        .and_then(|content| content.raw.as_text())
        .map(|text| text.text.as_str())
}
