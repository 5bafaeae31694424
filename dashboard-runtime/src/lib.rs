//! Runtime for the agent gateway dashboard.
//!
//! This crate provides the pieces the dashboard server is assembled from:
//! a workspace-scoped file gate, a proxy that forwards tool calls to the
//! remote Gateway and flattens its response envelope, small JSON stores for
//! API keys and tool usage, and the axum router that exposes them.

pub mod api;
pub mod api_types;
pub mod config;
pub mod error;
pub mod gateway;
pub mod heartbeat;
pub mod http;
pub mod skills;
pub mod store;
pub mod util;
pub mod workspace;

pub use config::{DashboardConfig, DeploymentMode};
pub use error::DashboardError;
pub use gateway::{GatewayClient, ToolCall, normalize_envelope};
pub use workspace::Workspace;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:18789";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AI_MODEL: &str = "anthropic/claude-sonnet-4-20250514";
pub const DEFAULT_AI_MAX_TOKENS: u64 = 1000;
/// Request bodies above this size are rejected before reaching a handler.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
