use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dripline_protocol::ChatReply;
use uuid::Uuid;

/// Terminal reply for the emergency gate. Deterministic, produced without
/// any outbound call.
pub const EMERGENCY_REPLY: &str = "If you're experiencing a medical emergency, please call \
911 immediately. Do not wait for online assistance.\n\nDripline provides wellness services \
but cannot help with medical emergencies. Once you're safe and have received proper \
medical attention, we're here to support your recovery with our hydration and wellness \
services.\n\nIs there anything else I can help you with regarding our wellness services?";

/// Fixed apology for unhandled failures. Directs to the business, exposes
/// no internal detail.
pub const FALLBACK_REPLY: &str = "I'm having trouble connecting right now. Please try \
again in a moment, or contact Dripline directly at hello@driplinewellness.com or call \
(555) 014-0199.";

/// 400 with a user-facing corrective message.
pub fn corrective(text: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ChatReply::text(text))).into_response()
}

/// 500 with the fixed apology and a fresh correlation id. Returns the id
/// so the caller can log it alongside the error category.
pub fn internal_fallback() -> (String, Response) {
    let error_id = Uuid::new_v4().to_string();
    let reply = ChatReply {
        response: FALLBACK_REPLY.to_string(),
        session_id: None,
        is_emergency: None,
        error_id: Some(error_id.clone()),
    };
    (
        error_id,
        (StatusCode::INTERNAL_SERVER_ERROR, Json(reply)).into_response(),
    )
}
