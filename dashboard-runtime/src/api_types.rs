//! Serde request/response types for the dashboard HTTP API.
//!
//! Field names follow the JSON the frontend already speaks (camelCase where
//! the UI expects it).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{DashboardError, Result};
use crate::gateway::ToolCall;

// ─────────────────────────────────────────────────────────────────────────────
// Tool invocation
// ─────────────────────────────────────────────────────────────────────────────

/// `{tool, args}` with `input` accepted as an alias for `args`.
#[derive(Debug, Default, Deserialize)]
pub struct ToolInvokeRequest {
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(default)]
    pub input: Option<Value>,
}

impl ToolInvokeRequest {
    /// `args` wins over `input`; neither present means `{}`. The tool name
    /// is forwarded exactly as given; only a blank one is refused.
    pub fn into_call(self) -> Result<ToolCall> {
        if self.tool.trim().is_empty() {
            return Err(DashboardError::Validation("tool is required".into()));
        }
        let args = self.args.or(self.input).unwrap_or_else(|| json!({}));
        Ok(ToolCall::new(self.tool, args))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Files
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct FilesQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteFileRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct WriteFileResponse {
    pub ok: bool,
    pub path: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// AI transform
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransformRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, rename = "maxTokens")]
    pub max_tokens: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct TransformResponse {
    pub ok: bool,
    pub result: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Keys and usage
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PutKeysRequest {
    #[serde(default)]
    pub keys: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct TrackUsageRequest {
    #[serde(default)]
    pub tool: String,
    /// Any JSON number; `null` or missing counts as 0.
    #[serde(default)]
    pub tokens: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health / status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub env: String,
    pub gateway: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    pub gateway: String,
    pub env: String,
    pub timestamp: String,
}
