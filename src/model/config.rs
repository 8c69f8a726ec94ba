//! Generation settings the user edits between calls.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Playful,
    Professional,
    Minimal,
    Inspirational,
    Funny,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Playful,
        Tone::Professional,
        Tone::Minimal,
        Tone::Inspirational,
        Tone::Funny,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Playful => "playful",
            Tone::Professional => "professional",
            Tone::Minimal => "minimal",
            Tone::Inspirational => "inspirational",
            Tone::Funny => "funny",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::InvalidConfig(format!("unknown tone '{}'", s)))
    }
}

/// Settings captured by value at the moment `generate` is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub tone: Tone,
    pub platforms: Vec<String>,
    pub include_emoji: bool,
    pub language: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            tone: Tone::Playful,
            platforms: ["Instagram", "TikTok", "LinkedIn", "Twitter"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            include_emoji: true,
            language: "English".to_string(),
        }
    }
}

/// Partial update applied by `set_config`; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    pub tone: Option<Tone>,
    pub platforms: Option<Vec<String>>,
    pub include_emoji: Option<bool>,
    pub language: Option<String>,
}

impl GenerationConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.platforms.is_empty() {
            return Err(AppError::InvalidConfig("at least one platform is required".to_string()));
        }
        if self.platforms.iter().any(|p| p.trim().is_empty()) {
            return Err(AppError::InvalidConfig("platform names must not be blank".to_string()));
        }
        if self.language.trim().is_empty() {
            return Err(AppError::InvalidConfig("language must not be empty".to_string()));
        }
        Ok(())
    }

    /// Merge `patch` into a copy and commit it only if the result is valid.
    pub fn apply(&mut self, patch: ConfigPatch) -> AppResult<()> {
        let mut next = self.clone();
        if let Some(tone) = patch.tone {
            next.tone = tone;
        }
        if let Some(platforms) = patch.platforms {
            next.platforms = dedup_platforms(platforms);
        }
        if let Some(include_emoji) = patch.include_emoji {
            next.include_emoji = include_emoji;
        }
        if let Some(language) = patch.language {
            next.language = language.trim().to_string();
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Add `name` if missing, remove it if present. The last platform stays.
    pub fn toggle_platform(&mut self, name: &str) -> AppResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidConfig("platform names must not be blank".to_string()));
        }
        if let Some(idx) = self.platforms.iter().position(|p| p.eq_ignore_ascii_case(name)) {
            if self.platforms.len() == 1 {
                return Err(AppError::InvalidConfig("at least one platform is required".to_string()));
            }
            self.platforms.remove(idx);
        } else {
            self.platforms.push(name.to_string());
        }
        Ok(())
    }
}

fn dedup_platforms(platforms: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(platforms.len());
    for p in platforms {
        let p = p.trim().to_string();
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(&p)) {
            out.push(p);
        }
    }
    out
}
