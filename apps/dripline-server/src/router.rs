use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::{chat, AppState};

pub mod paths {
    pub const HEALTHZ: &str = "/healthz";
    pub const CHAT: &str = "/chat";
    pub const CHAT_HISTORY: &str = "/chat/history";
    pub const CHAT_CLEAR: &str = "/chat/clear";
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Meta",
    responses((status = 200, description = "OK", body = serde_json::Value))
)]
pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"ok": true}))
}

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route(paths::HEALTHZ, get(healthz))
        .route(paths::CHAT, post(chat::chat_send))
        .route(paths::CHAT_HISTORY, get(chat::chat_history))
        .route(paths::CHAT_CLEAR, post(chat::chat_clear))
}
