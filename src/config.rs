//! Env-driven configuration for the service and library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Service endpoints have defaults, credentials do not.
use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub struct Config {
    pub cloudinary_url: String,
    pub cloudinary_cloud_name: String,
    pub cloudinary_upload_preset: String,
    pub gemini_url: String,
    pub gemini_model: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub request_timeout: Duration,
    pub api_host: String,
    pub api_port: String,
}

const SECRET_VARS: &[&str] = &["SUPABASE_ANON_KEY"];

const ALL_VARS: &[&str] = &[
    "CLOUDINARY_URL",
    "CLOUDINARY_CLOUD_NAME",
    "CLOUDINARY_UPLOAD_PRESET",
    "GEMINI_URL",
    "GEMINI_MODEL",
    "SUPABASE_URL",
    "SUPABASE_ANON_KEY",
    "REQUEST_TIMEOUT_SECS",
    "API_HOST",
    "API_PORT",
];

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> AppResult<Self> {
        let timeout_secs = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!("REQUEST_TIMEOUT_SECS must be a whole number, got '{}'", raw))
            })?,
            Err(_) => 60,
        };
        Ok(Config {
            cloudinary_url: env::var("CLOUDINARY_URL").unwrap_or_else(|_| "https://api.cloudinary.com".to_string()),
            cloudinary_cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            cloudinary_upload_preset: required("CLOUDINARY_UPLOAD_PRESET")?,
            gemini_url: env::var("GEMINI_URL").unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            supabase_url: required("SUPABASE_URL")?,
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            request_timeout: Duration::from_secs(timeout_secs),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: env::var("API_PORT").unwrap_or_else(|_| "8190".to_string()),
        })
    }

    pub fn log_env_vars() {
        for name in ALL_VARS {
            let shown = match env::var(name) {
                Ok(_) if SECRET_VARS.contains(name) => "<redacted>".to_string(),
                Ok(v) => v,
                Err(_) => "<unset>".to_string(),
            };
            tracing::info!("{}: {}", name, shown);
        }
    }
}

fn required(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} must be set", name)))
}
