//! Data carried through the generation workflow.
pub mod config;
pub mod image;
pub mod session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use config::{ConfigPatch, GenerationConfig, Tone};
pub use image::{InlineImage, PendingImage};
pub use session::{Identity, Session};

/// Structured captions/hashtags/scripts from the content generator.
///
/// Stored and displayed as-is; the workflow never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocialKitResult(pub Value);

impl From<Value> for SocialKitResult {
    fn from(v: Value) -> Self {
        SocialKitResult(v)
    }
}

/// Durable location of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    pub url: String,
    pub public_id: String,
}

/// One past generation, as listed in the history sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub image_url: String,
    pub image_public_id: String,
    pub config: Value,
    pub result: SocialKitResult,
}
