//! The photo waiting to be turned into a social kit.
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Image bytes held between file selection and generation.
///
/// Never persisted directly; only the uploader's URL and id are stored.
#[derive(Debug, Clone)]
pub struct PendingImage {
    bytes: Arc<[u8]>,
    media_type: String,
    file_name: Option<String>,
    preview: String,
}

/// Base64 payload in the shape the content generator consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl PendingImage {
    /// Wrap selected file bytes. Falls back to sniffing when no media type is given.
    pub fn new(bytes: Vec<u8>, media_type: Option<String>, file_name: Option<String>) -> AppResult<Self> {
        if bytes.is_empty() {
            return Err(AppError::Encoding("selected file is empty".to_string()));
        }
        let media_type = media_type
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty() && m != "application/octet-stream")
            .unwrap_or_else(|| sniff_media_type(&bytes).to_string());
        Ok(PendingImage {
            bytes: bytes.into(),
            media_type,
            file_name,
            preview: format!("preview://{}", Uuid::new_v4()),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Local handle the presentation layer shows before anything is uploaded.
    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn encode(&self) -> InlineImage {
        InlineImage {
            mime_type: self.media_type.clone(),
            data: STANDARD.encode(&self.bytes),
        }
    }
}

pub fn sniff_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}
