//! Common error type and alias.
//!
//! Every collaborator failure is folded into `AppError`. The orchestrator
//! turns it into a readable sentence with [`AppError::user_message`] before
//! it reaches the presentation layer.
use serde::Serialize;
use thiserror::Error;

/// Corrective UI the caller should open instead of starting a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    Authenticate,
    ConfigureCredential,
}

impl std::fmt::Display for Redirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Redirect::Authenticate => f.write_str("sign in required"),
            Redirect::ConfigureCredential => f.write_str("Gemini API key required"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid API key: {0}")]
    InvalidCredential(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("credential store error: {0}")]
    Credential(String),
    #[error("image encoding failed: {0}")]
    Encoding(String),
    #[error("prompt construction error: {0}")]
    PromptConstruction(String),
    #[error("invalid generation config: {0}")]
    InvalidConfig(String),
    #[error("precondition not met: {0}")]
    Precondition(Redirect),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("generation task failed: {0}")]
    Task(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Normalize the failure into a sentence fit for the error banner.
    ///
    /// Invalid-key, quota and transport failures get distinct wording so the
    /// user can tell "fix your key" from "try again later".
    pub fn user_message(&self) -> String {
        match self {
            AppError::Upload(detail) => with_detail("Image upload failed", detail),
            AppError::Generation(GenerationError::InvalidCredential(_)) => {
                "Your Gemini API key was rejected. Update it in settings and try again.".to_string()
            }
            AppError::Generation(GenerationError::QuotaExceeded(_)) => {
                "The AI service quota was exceeded or rate limited. Wait a moment and try again."
                    .to_string()
            }
            AppError::Generation(GenerationError::MalformedResponse(_)) => {
                "The AI service returned an unexpected response. Please try again.".to_string()
            }
            AppError::Generation(GenerationError::Transport(detail)) => {
                with_detail("Could not reach the AI service", detail)
            }
            AppError::Generation(GenerationError::Rejected { body, .. }) => {
                with_detail("The AI service rejected the request", body)
            }
            AppError::Persistence(detail) => {
                with_detail("Your kit was generated but could not be saved", detail)
            }
            AppError::Precondition(redirect) => format!("Cannot generate yet: {}", redirect),
            other => other.to_string(),
        }
    }

    /// Corrective UI this failure should send the user to, if any.
    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            AppError::Generation(GenerationError::InvalidCredential(_)) => {
                Some(Redirect::ConfigureCredential)
            }
            AppError::Precondition(redirect) => Some(*redirect),
            _ => None,
        }
    }
}

fn with_detail(prefix: &str, detail: &str) -> String {
    let detail = detail.trim();
    if detail.is_empty() {
        format!("{}.", prefix)
    } else {
        format!("{}: {}", prefix, detail)
    }
}
