//! Client for the remote Gateway agent runtime.
//!
//! Every tool-backed endpoint funnels through [`GatewayClient::invoke`]:
//! routes only decide which [`ToolCall`] to send. The gateway wraps results
//! in an `{ok, result, error}` envelope which [`normalize_envelope`] flattens.

use reqwest::{Client, Method};
use serde_json::{Value, json};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::http::{auth_headers, build_url, parse_json, send_json};
use crate::util::{http_client, truncate_chars};

const TOOLS_INVOKE_PATH: &str = "/tools/invoke";
const STATUS_PATH: &str = "/status";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Characters of serialized args included in invocation logs.
const ARGS_LOG_PREVIEW: usize = 100;

/// A single `{tool, args}` call against the gateway.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub args: Value,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }

    /// All cron jobs, disabled ones included.
    pub fn cron_list() -> Self {
        Self::new("cron", json!({ "action": "list", "includeDisabled": true }))
    }

    /// Wake the scheduler immediately with a heartbeat message.
    pub fn cron_wake(text: &str) -> Self {
        Self::new("cron", json!({ "action": "wake", "text": text, "mode": "now" }))
    }

    /// Scheduler status (next wake, enabled job count).
    pub fn cron_status() -> Self {
        Self::new("cron", json!({ "action": "status" }))
    }

    fn payload(&self) -> Value {
        json!({ "tool": self.tool, "args": self.args })
    }
}

/// Flatten a gateway envelope.
///
/// 1. `ok == true` with a non-null `result.details` yields `details`.
/// 2. `ok == true` otherwise yields `result` (null when absent).
/// 3. Anything else is an [`DashboardError::Upstream`] carrying the envelope.
pub fn normalize_envelope(envelope: Value) -> Result<Value> {
    if envelope.get("ok") != Some(&Value::Bool(true)) {
        return Err(DashboardError::Upstream(envelope));
    }

    let mut envelope = envelope;
    let mut result = envelope
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null);

    match result.get_mut("details").map(Value::take) {
        Some(details) if !details.is_null() => Ok(details),
        _ => Ok(result),
    }
}

#[derive(Clone, Debug)]
pub struct GatewayClient {
    base_url: String,
    token: String,
    ai_model: String,
    client: Client,
}

impl GatewayClient {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.gateway_url.clone(),
            token: config.gateway_token.clone(),
            ai_model: config.ai_model.clone(),
            client: http_client(config.request_timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward a tool call and return the raw envelope. The envelope is
    /// parsed regardless of HTTP status; the gateway reports failures in it.
    pub async fn invoke_raw(&self, call: &ToolCall) -> Result<Value> {
        let payload = call.payload();
        tracing::info!(
            tool = %call.tool,
            args = %truncate_chars(&call.args.to_string(), ARGS_LOG_PREVIEW),
            "invoking gateway tool"
        );

        let url = build_url(&self.base_url, TOOLS_INVOKE_PATH)?;
        let headers = auth_headers(&self.token)?;
        let (status, body) = send_json(&self.client, Method::POST, url, Some(&payload), headers)
            .await
            .inspect_err(|err| tracing::error!(tool = %call.tool, "gateway request failed: {err}"))?;

        let envelope = parse_json(&body)?;
        if !status.is_success() {
            tracing::debug!(tool = %call.tool, %status, "gateway returned non-2xx status");
        }
        Ok(envelope)
    }

    /// Forward a tool call and flatten the envelope.
    pub async fn invoke(&self, call: &ToolCall) -> Result<Value> {
        let envelope = self.invoke_raw(call).await?;
        normalize_envelope(envelope)
            .inspect_err(|err| tracing::warn!(tool = %call.tool, "tool invocation failed: {err}"))
    }

    /// Raw gateway status document.
    pub async fn status(&self) -> Result<Value> {
        let url = build_url(&self.base_url, STATUS_PATH)?;
        let headers = auth_headers(&self.token)?;
        let (_, body) = send_json(&self.client, Method::GET, url, None, headers).await?;
        parse_json(&body)
    }

    /// Single-turn chat completion. Returns the first choice's content, or an
    /// empty string when the reply has none.
    pub async fn chat_completion(&self, prompt: &str, max_tokens: u64) -> Result<String> {
        let url = build_url(&self.base_url, CHAT_COMPLETIONS_PATH)?;
        let headers = auth_headers(&self.token)?;
        let payload = json!({
            "model": self.ai_model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let (status, body) = send_json(&self.client, Method::POST, url, Some(&payload), headers).await?;
        if !status.is_success() {
            return Err(DashboardError::Network(format!("AI request failed: {body}")));
        }

        let reply = parse_json(&body)?;
        Ok(reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}
