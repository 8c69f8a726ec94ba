//! Axum request handlers exposing the orchestrator over HTTP.
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::error::{AppError, Redirect};
use crate::model::{ConfigPatch, GenerationConfig, HistoryRecord, Identity, PendingImage, SocialKitResult};
use crate::orchestrator::{GenerateOutcome, WorkflowSnapshot};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Precondition(Redirect::Authenticate) => StatusCode::UNAUTHORIZED,
            AppError::Precondition(Redirect::ConfigureCredential) => StatusCode::PRECONDITION_REQUIRED,
            AppError::InvalidConfig(_) | AppError::Encoding(_) => StatusCode::BAD_REQUEST,
            AppError::Upload(_)
            | AppError::Generation(_)
            | AppError::Persistence(_)
            | AppError::Credential(_) => StatusCode::BAD_GATEWAY,
            AppError::PromptConstruction(_)
            | AppError::Config(_)
            | AppError::Io(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.user_message(), "redirect": self.redirect() });
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBody {
    pub api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLoad {
    pub result: SocialKitResult,
    pub image_url: String,
}

pub async fn root() -> &'static str {
    "SnapKit API"
}

pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<WorkflowSnapshot> {
    Json(state.orchestrator.snapshot())
}

/// Raw image body; `content-type` and `x-file-name` are optional hints.
pub async fn select_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WorkflowSnapshot>, AppError> {
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let file_name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let image = PendingImage::new(body.to_vec(), media_type, file_name)?;
    state.orchestrator.select_image(image);
    Ok(Json(state.orchestrator.snapshot()))
}

pub async fn clear(State(state): State<Arc<AppState>>) -> Json<WorkflowSnapshot> {
    state.orchestrator.clear();
    Json(state.orchestrator.snapshot())
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<GenerationConfig> {
    Json(state.orchestrator.config())
}

pub async fn set_config(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<GenerationConfig>, AppError> {
    state.orchestrator.set_config(patch).map(Json)
}

pub async fn toggle_platform(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<GenerationConfig>, AppError> {
    state.orchestrator.toggle_platform(&name).map(Json)
}

pub async fn generate(State(state): State<Arc<AppState>>) -> Json<GenerateOutcome> {
    Json(state.orchestrator.generate().await)
}

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(identity): Json<Identity>,
) -> Json<WorkflowSnapshot> {
    // Key loading continues in the background.
    let _ = state.orchestrator.acquire_session(identity);
    Json(state.orchestrator.snapshot())
}

pub async fn end_session(State(state): State<Arc<AppState>>) -> Json<WorkflowSnapshot> {
    state.orchestrator.sign_out();
    Json(state.orchestrator.snapshot())
}

pub async fn save_credential(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialBody>,
) -> Result<Json<Value>, AppError> {
    state.orchestrator.save_credential(&body.api_key).await?;
    Ok(Json(json!({ "status": "success" })))
}

pub async fn list_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryRecord>>, AppError> {
    state.orchestrator.history().await.map(Json)
}

pub async fn delete_history_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.orchestrator.delete_history_entry(&id).await?;
    Ok(Json(json!({ "status": "success" })))
}

pub async fn load_from_history(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<HistoryLoad>,
) -> Json<WorkflowSnapshot> {
    state.orchestrator.load_from_history(entry.result, entry.image_url);
    Json(state.orchestrator.snapshot())
}
