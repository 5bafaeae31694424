use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    DEFAULT_AI_MAX_TOKENS, DEFAULT_AI_MODEL, DEFAULT_GATEWAY_URL, DEFAULT_PORT,
    DEFAULT_TIMEOUT_SECS,
};

/// Which route set the server exposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Full dashboard backend with workspace file access.
    #[default]
    Local,
    /// Gateway-only proxy for hosted deployments with no local workspace.
    Hosted,
}

impl DeploymentMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "hosted" => Some(Self::Hosted),
            _ => None,
        }
    }
}

/// Server configuration, built once at startup and handed to every component.
#[derive(Clone, Debug)]
pub struct DashboardConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub workspace: PathBuf,
    pub gateway_url: String,
    pub gateway_token: String,
    /// Deployment environment label (`development`, `production`, ...).
    pub env: String,
    pub mode: DeploymentMode,
    pub request_timeout: Duration,
    /// When set, `/api/*` (except health) requires this bearer token.
    pub api_token: Option<String>,
    /// Allowed CORS origins. Empty mirrors the request origin.
    pub cors_origins: Vec<String>,
    pub static_dir: PathBuf,
    pub ai_model: String,
    pub ai_max_tokens: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            workspace: default_workspace(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            gateway_token: String::new(),
            env: "development".to_string(),
            mode: DeploymentMode::Local,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_token: None,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
            static_dir: PathBuf::from("dist"),
            ai_model: DEFAULT_AI_MODEL.to_string(),
            ai_max_tokens: DEFAULT_AI_MAX_TOKENS,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse::<IpAddr>().ok())
            .unwrap_or(defaults.bind_addr);
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults.port);
        let workspace = env::var("WORKSPACE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.workspace);
        let gateway_url = env::var("GATEWAY_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.gateway_url);
        let gateway_token = env::var("GATEWAY_TOKEN").unwrap_or_default();
        let env_name = env::var("NODE_ENV")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.env);
        let mode = env::var("DASHBOARD_MODE")
            .ok()
            .and_then(|v| DeploymentMode::parse(&v))
            .unwrap_or(defaults.mode);
        let timeout = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let api_token = env::var("DASHBOARD_API_TOKEN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or(defaults.cors_origins);
        let static_dir = env::var("STATIC_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);
        let ai_model = env::var("AI_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.ai_model);

        DashboardConfig {
            bind_addr,
            port,
            workspace,
            gateway_url,
            gateway_token,
            env: env_name,
            mode,
            request_timeout: Duration::from_secs(timeout),
            api_token,
            cors_origins,
            static_dir,
            ai_model,
            ai_max_tokens: defaults.ai_max_tokens,
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn keys_file(&self) -> PathBuf {
        self.workspace.join("config").join("keys.json")
    }

    pub fn usage_file(&self) -> PathBuf {
        self.workspace.join("config").join("tool-usage.json")
    }

    pub fn heartbeat_log_file(&self) -> PathBuf {
        self.workspace.join("memory").join("heartbeat.log")
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.workspace.join("skills")
    }
}

fn default_workspace() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".openclaw").join("workspace"))
        .unwrap_or_else(|| PathBuf::from("workspace"))
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
