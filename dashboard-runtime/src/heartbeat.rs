//! Heartbeat log reader.
//!
//! The log is line-oriented. Canonical lines are JSON objects:
//!
//! ```text
//! {"timestamp":"2026-03-01T10:00:00Z","status":"success","message":"inbox clear","action":"Heartbeat","durationMs":812}
//! ```
//!
//! Older free-text lines of the form `2026-03-01T10:00:00Z SUCCESS: inbox clear`
//! are still understood. Anything else is surfaced as an `info` entry.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::util::now_iso;

/// Newest entries returned by [`read_logs`].
pub const MAX_LOG_ENTRIES: usize = 50;

static LEGACY_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2}T[\d:]+Z?)\s+(SUCCESS|ERROR|INFO):\s+(.+)").expect("valid regex")
});
static LEGACY_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)duration:\s*(\d+\.?\d*)").expect("valid regex"));

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatStatus {
    Success,
    Error,
    #[default]
    Info,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatEntry {
    pub timestamp: String,
    #[serde(default)]
    pub status: HeartbeatStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatLogs {
    pub logs: Vec<HeartbeatEntry>,
    pub last_run: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatStats {
    pub success_count: u64,
    pub error_count: u64,
    /// Mean duration over entries that report one, two decimals; 0 when none do.
    pub avg_duration: f64,
}

/// Parse one log line. Never fails: unrecognized text becomes an `info`
/// entry stamped with the current time.
pub fn parse_line(line: &str) -> HeartbeatEntry {
    if let Ok(entry) = serde_json::from_str::<HeartbeatEntry>(line) {
        return entry;
    }

    if let Some(caps) = LEGACY_LINE_RE.captures(line) {
        let status = match &caps[2] {
            "SUCCESS" => HeartbeatStatus::Success,
            "ERROR" => HeartbeatStatus::Error,
            _ => HeartbeatStatus::Info,
        };
        let message = caps[3].to_string();
        return HeartbeatEntry {
            timestamp: caps[1].to_string(),
            status,
            duration_ms: legacy_duration(&message),
            message,
            action: Some("Heartbeat".to_string()),
        };
    }

    HeartbeatEntry {
        timestamp: now_iso(),
        status: HeartbeatStatus::Info,
        message: line.to_string(),
        action: None,
        duration_ms: legacy_duration(line),
    }
}

fn legacy_duration(text: &str) -> Option<f64> {
    LEGACY_DURATION_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

fn non_empty_lines(content: &str) -> impl DoubleEndedIterator<Item = &str> {
    content.lines().filter(|line| !line.trim().is_empty())
}

/// Newest [`MAX_LOG_ENTRIES`] entries, newest first.
pub fn summarize_logs(content: &str) -> HeartbeatLogs {
    let logs: Vec<HeartbeatEntry> = non_empty_lines(content)
        .rev()
        .take(MAX_LOG_ENTRIES)
        .map(parse_line)
        .collect();
    let last_run = logs.first().map(|entry| entry.timestamp.clone());
    HeartbeatLogs { logs, last_run }
}

pub fn summarize_stats(content: &str) -> HeartbeatStats {
    let mut stats = HeartbeatStats::default();
    let mut total_duration = 0.0;
    let mut duration_count = 0u64;

    for entry in non_empty_lines(content).map(parse_line) {
        match entry.status {
            HeartbeatStatus::Success => stats.success_count += 1,
            HeartbeatStatus::Error => stats.error_count += 1,
            HeartbeatStatus::Info => {}
        }
        if let Some(duration) = entry.duration_ms {
            total_duration += duration;
            duration_count += 1;
        }
    }

    if duration_count > 0 {
        let mean = total_duration / duration_count as f64;
        stats.avg_duration = (mean * 100.0).round() / 100.0;
    }
    stats
}

/// Missing or unreadable logs read as empty; the heartbeat page is advisory.
async fn read_log(path: &Path) -> String {
    match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), "failed to read heartbeat log: {err}");
            }
            String::new()
        }
    }
}

pub async fn read_logs(path: &Path) -> HeartbeatLogs {
    summarize_logs(&read_log(path).await)
}

pub async fn read_stats(path: &Path) -> HeartbeatStats {
    summarize_stats(&read_log(path).await)
}
