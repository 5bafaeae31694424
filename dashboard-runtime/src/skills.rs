//! Inventory of workspace skills.
//!
//! A skill is a directory under `<workspace>/skills`. When it carries a
//! `SKILL.md` manifest, description, triggers and category are lifted from
//! the text with a few loose patterns; manifests have no fixed schema.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::util::{iso_timestamp, truncate_chars};

const MANIFEST: &str = "SKILL.md";
const MAX_DESCRIPTION_CHARS: usize = 200;
const DEFAULT_DESCRIPTION: &str = "No description available";
const DEFAULT_ICON: &str = "⚡";

static DESCRIPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\n)(?:#[^\n]+\n+)?([^\n#]+)").expect("valid regex"));
static TRIGGERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:triggers?|keywords?|usage):\s*([^\n]+)").expect("valid regex")
});
static TRIGGER_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;]").expect("valid regex"));

/// Category rules, checked in order; first match wins.
static CATEGORY_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)security|audit|firewall", "security"),
        (r"(?i)design|ui|ux|interface", "design"),
        (r"(?i)deploy|build|infrastructure", "infrastructure"),
        (r"(?i)cron|schedule|automat", "automation"),
    ]
    .into_iter()
    .map(|(pattern, category)| (Regex::new(pattern).expect("valid regex"), category))
    .collect()
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    Active,
    Inactive,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInfo {
    pub name: String,
    pub location: String,
    pub description: String,
    pub triggers: Vec<String>,
    pub category: String,
    pub status: SkillStatus,
    pub last_modified: Option<String>,
    pub icon: String,
}

/// Fields lifted from a `SKILL.md` body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestSummary {
    pub description: String,
    pub triggers: Vec<String>,
    pub category: String,
}

impl Default for ManifestSummary {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            triggers: Vec::new(),
            category: "utility".to_string(),
        }
    }
}

pub fn summarize_manifest(content: &str) -> ManifestSummary {
    let mut summary = ManifestSummary::default();

    if let Some(caps) = DESCRIPTION_RE.captures(content) {
        summary.description = truncate_chars(caps[1].trim(), MAX_DESCRIPTION_CHARS);
    }

    if let Some(caps) = TRIGGERS_RE.captures(content) {
        summary.triggers = TRIGGER_SPLIT_RE
            .split(&caps[1])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Some((_, category)) = CATEGORY_RULES.iter().find(|(re, _)| re.is_match(content)) {
        summary.category = (*category).to_string();
    }

    summary
}

pub fn skill_icon(name: &str) -> &'static str {
    match name {
        "culture-radar" => "📡",
        "prd-designer" => "📋",
        "healthcheck" => "🔒",
        "weather" => "🌤️",
        "firebase-deploy" => "🔥",
        "cloudflare-browser" => "☁️",
        "liquid-glass" => "💎",
        "firebase-security-infrastructure" => "🛡️",
        _ => DEFAULT_ICON,
    }
}

/// Every skill directory under `skills_dir`, sorted by name. A missing
/// directory yields an empty list.
pub async fn list_skills(skills_dir: &Path) -> Result<Vec<SkillInfo>> {
    let mut entries = match tokio::fs::read_dir(skills_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut skills = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = match tokio::fs::metadata(entry.path()).await {
            Ok(m) if m.is_dir() => m,
            _ => continue,
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        let manifest = entry.path().join(MANIFEST);
        let (summary, status) = match tokio::fs::read(&manifest).await {
            Ok(bytes) => (
                summarize_manifest(&String::from_utf8_lossy(&bytes)),
                SkillStatus::Active,
            ),
            Err(_) => (ManifestSummary::default(), SkillStatus::Inactive),
        };

        skills.push(SkillInfo {
            location: format!("skills/{name}"),
            icon: skill_icon(&name).to_string(),
            name,
            description: summary.description,
            triggers: summary.triggers,
            category: summary.category,
            status,
            last_modified: metadata.modified().ok().map(iso_timestamp),
        });
    }

    skills.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(skills)
}
