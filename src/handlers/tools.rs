use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::services::validation::CALL_SID_KEYS;
use crate::state::AppState;
use crate::tools::ToolDefinition;

/// Headers the voice platform uses to pass the call SID, in priority order.
const CALL_SID_HEADERS: &[&str] = &["x-twilio-callsid", "callsid", "call-sid"];

// GET /tools
#[derive(Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
}

pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.tools.definitions(),
    })
}

// POST /tools/:name
#[derive(Serialize)]
pub struct InvokeResponse {
    pub tool: String,
    pub result: String,
}

pub async fn invoke_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InvokeResponse>, AppError> {
    let mut args = match parse_arguments(&body)? {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        _ => {
            return Err(AppError::BadRequest(
                "tool arguments must be a JSON object".to_string(),
            ))
        }
    };

    if state.tools.get(&name).is_none() {
        tracing::warn!(tool = %name, "invoke for unknown tool");
        return Err(AppError::NotFound(name));
    }

    if !has_call_sid(&args) {
        if let Some(sid) = call_sid_from_headers(&headers) {
            tracing::debug!(tool = %name, "using call SID from request headers");
            // blank aliases would collide with the inserted key
            for key in CALL_SID_KEYS {
                args.remove(*key);
            }
            args.insert("callSid".to_string(), Value::String(sid));
        }
    }

    let result = state
        .tools
        .invoke(&name, Value::Object(args))
        .await
        .ok_or_else(|| AppError::NotFound(name.clone()))?;

    Ok(Json(InvokeResponse { tool: name, result }))
}

/// An empty body means no arguments. Content type is not checked so a bare
/// `POST` works for tools that take none.
fn parse_arguments(body: &[u8]) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("tool arguments are not valid JSON: {e}")))
}

fn has_call_sid(args: &serde_json::Map<String, Value>) -> bool {
    CALL_SID_KEYS
        .iter()
        .any(|k| matches!(args.get(*k), Some(Value::String(s)) if !s.trim().is_empty()))
}

fn call_sid_from_headers(headers: &HeaderMap) -> Option<String> {
    CALL_SID_HEADERS
        .iter()
        .filter_map(|h| headers.get(*h))
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}
