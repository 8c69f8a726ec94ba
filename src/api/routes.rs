//! Router setup shared by the server binary and the router tests.
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::orchestrator::Orchestrator;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/state", get(handlers::get_state))
        .route("/image", post(handlers::select_image))
        .route("/clear", post(handlers::clear))
        .route("/config", get(handlers::get_config).post(handlers::set_config))
        .route("/config/platforms/:name", post(handlers::toggle_platform))
        .route("/generate", post(handlers::generate))
        .route("/session", post(handlers::start_session).delete(handlers::end_session))
        .route("/credential", put(handlers::save_credential))
        .route("/history", get(handlers::list_history))
        .route("/history/load", post(handlers::load_from_history))
        .route("/history/:id", delete(handlers::delete_history_entry))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
