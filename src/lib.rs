//! SnapKit generation service library
//!
//! Modules:
//! - `orchestrator`: the upload → encode → generate → persist workflow and its state machine.
//! - `services`: collaborator traits plus Cloudinary, Gemini and Supabase clients.
//! - `model`: generation config, pending image, session and result types.
//! - `prompt`: instruction prompt templating with `{{placeholder}}` replacement.
//! - `api`: Axum handlers and router used by the server binary.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `Orchestrator`,
//! `GenerationConfig` and `PendingImage`.
pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod prompt;
pub mod services;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use model::{GenerationConfig, PendingImage};
pub use orchestrator::Orchestrator;

use services::{cloudinary::CloudinaryUploader, gemini::GeminiClient, supabase::SupabaseClient};

/// Wire an orchestrator to the real collaborators described by `config`.
pub fn connect(config: &Config) -> AppResult<Orchestrator> {
    let uploader = CloudinaryUploader::new(
        config.cloudinary_url.clone(),
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_upload_preset.clone(),
        config.request_timeout,
    )?;
    let generator = GeminiClient::new(
        config.gemini_url.clone(),
        config.gemini_model.clone(),
        config.request_timeout,
    )?;
    let supabase = Arc::new(SupabaseClient::new(
        config.supabase_url.clone(),
        config.supabase_anon_key.clone(),
        config.request_timeout,
    )?);
    Ok(Orchestrator::new(
        supabase.clone(),
        Arc::new(uploader),
        Arc::new(generator),
        supabase,
    ))
}
