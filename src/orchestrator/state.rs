//! Workflow state machine and the view of it handed to the presentation layer.
use serde::Serialize;

use crate::error::Redirect;
use crate::model::{GenerationConfig, SocialKitResult};

/// Exactly one is active. A result exists only in `Complete`, a message only in `Error`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Generating,
    Complete(SocialKitResult),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Generating,
    Complete,
    Error,
}

impl WorkflowState {
    pub fn status(&self) -> Status {
        match self {
            WorkflowState::Idle => Status::Idle,
            WorkflowState::Generating => Status::Generating,
            WorkflowState::Complete(_) => Status::Complete,
            WorkflowState::Error(_) => Status::Error,
        }
    }

    pub fn result(&self) -> Option<&SocialKitResult> {
        match self {
            WorkflowState::Complete(r) => Some(r),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            WorkflowState::Error(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub status: Status,
    pub result: Option<SocialKitResult>,
    pub error: Option<String>,
    pub image_preview: Option<String>,
    pub has_pending_image: bool,
    pub config: GenerationConfig,
    pub signed_in: bool,
    pub has_credential: bool,
}

/// What a `generate` call did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerateOutcome {
    /// Nothing selected; state untouched.
    NoImage,
    /// A pipeline is already in flight; state untouched.
    AlreadyGenerating,
    /// A precondition failed; the caller should open the corrective UI.
    Redirected { redirect: Redirect },
    Completed { result: SocialKitResult },
    Failed { message: String, redirect: Option<Redirect> },
    /// The pipeline finished after a clear, new selection or history load; its result was dropped.
    Superseded,
}
