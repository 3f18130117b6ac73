use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{error, warn};

use dripline_protocol::{ChatMessage, ChatReply, Role};
use dripline_triage::GuardError;

use crate::responder::playbook;
use crate::{responses, AppState};

const HISTORY_LIMIT: usize = 48;

/// In-memory conversation transcript. Messages are immutable once
/// appended; the oldest are pruned past the history limit.
#[derive(Clone)]
pub struct ChatState {
    inner: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn history(&self) -> Vec<ChatMessage> {
        self.inner.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    pub async fn append(&self, message: ChatMessage) {
        let mut guard = self.inner.lock().await;
        guard.push(message);
        if guard.len() > HISTORY_LIMIT {
            let drop_count = guard.len() - HISTORY_LIMIT;
            guard.drain(0..drop_count);
        }
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

/// One conversational exchange: guard, emergency gate, resolver, session
/// carry-through. Every handled outcome is JSON; the status code separates
/// caller mistakes (400) and unhandled failures (500) from the rest (200).
#[utoipa::path(
    post,
    path = "/chat",
    tag = "Chat",
    request_body = dripline_protocol::ChatRequest,
    responses(
        (status = 200, description = "Handled exchange", body = dripline_protocol::ChatReply),
        (status = 400, description = "Rejected input", body = dripline_protocol::ChatReply),
        (status = 500, description = "Unhandled failure", body = dripline_protocol::ChatReply)
    )
)]
pub async fn chat_send(State(state): State<AppState>, body: Bytes) -> Response {
    // Malformed bodies are an unhandled failure at the outer boundary,
    // not a guard rejection.
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(err) => {
            let (error_id, response) = responses::internal_fallback();
            // Log the parse failure shape only; the raw body stays out of
            // the logs.
            error!(
                target: "dripline::chat",
                error_id = %error_id,
                category = "body",
                error = %err.classify_str(),
                "rejected unreadable request body"
            );
            return response;
        }
    };

    let session_id = value
        .get("sessionId")
        .and_then(|s| s.as_str())
        .map(|s| s.to_string());

    let raw = match value.get("message").and_then(|m| m.as_str()) {
        Some(m) => m,
        None => return responses::corrective(guard_message(&GuardError::InvalidInput)),
    };

    let limit = state.config().max_message_chars;
    let message = match dripline_triage::screen(raw, limit) {
        Ok(clean) => clean,
        Err(err) => return responses::corrective(guard_message(&err)),
    };

    state
        .chat()
        .append(ChatMessage::new(Role::User, &message))
        .await;

    // The emergency gate is decisive: no resolver call happens after a hit.
    if dripline_triage::is_emergency(&message) {
        state
            .chat()
            .append(ChatMessage::emergency(responses::EMERGENCY_REPLY))
            .await;
        let reply = ChatReply {
            response: responses::EMERGENCY_REPLY.to_string(),
            session_id,
            is_emergency: Some(true),
            error_id: None,
        };
        return Json(reply).into_response();
    }

    match state.responder().respond(&message, session_id.as_deref()).await {
        Ok(resolved) => {
            state
                .chat()
                .append(ChatMessage::new(Role::Assistant, &resolved.text))
                .await;
            // A resolver-produced token wins; otherwise echo the caller's.
            let reply = ChatReply::text(resolved.text)
                .with_session(resolved.session_id.or(session_id));
            Json(reply).into_response()
        }
        Err(err) => {
            let (error_id, response) = responses::internal_fallback();
            warn!(
                target: "dripline::chat",
                error_id = %error_id,
                category = err.category(),
                "responder failed, returning fallback reply"
            );
            state
                .chat()
                .append(ChatMessage::new(Role::Assistant, responses::FALLBACK_REPLY))
                .await;
            response
        }
    }
}

fn guard_message(err: &GuardError) -> String {
    match err {
        GuardError::InvalidInput => {
            "Please provide a message to continue our conversation.".to_string()
        }
        GuardError::TooLong { limit } => {
            format!("Message too long. Please keep it under {limit} characters.")
        }
    }
}

/// Transcript snapshot plus the greeting clients show before the first
/// exchange.
#[utoipa::path(
    get,
    path = "/chat/history",
    tag = "Chat",
    responses((status = 200, description = "Transcript", body = serde_json::Value))
)]
pub async fn chat_history(State(state): State<AppState>) -> impl IntoResponse {
    let messages = state.chat().history().await;
    let count = messages.len();
    Json(json!({
        "messages": messages,
        "count": count,
        "welcome": playbook::WELCOME,
    }))
}

/// Drop the transcript and any session association.
#[utoipa::path(
    post,
    path = "/chat/clear",
    tag = "Chat",
    responses((status = 200, description = "Cleared", body = serde_json::Value))
)]
pub async fn chat_clear(State(state): State<AppState>) -> impl IntoResponse {
    state.chat().clear().await;
    Json(json!({"ok": true}))
}

trait ClassifyExt {
    fn classify_str(&self) -> &'static str;
}

impl ClassifyExt for serde_json::Error {
    fn classify_str(&self) -> &'static str {
        match self.classify() {
            serde_json::error::Category::Io => "io",
            serde_json::error::Category::Syntax => "syntax",
            serde_json::error::Category::Data => "data",
            serde_json::error::Category::Eof => "eof",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::{Resolved, Responder, ResponderError};
    use crate::router;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tower::util::ServiceExt;

    /// Records every prompt it sees and answers with a fixed resolution.
    struct StubResponder {
        calls: AtomicUsize,
        seen: StdMutex<Vec<String>>,
        result: Result<Resolved, &'static str>,
    }

    impl StubResponder {
        fn ok(text: &str, session_id: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: StdMutex::new(Vec::new()),
                result: Ok(Resolved {
                    text: text.to_string(),
                    session_id: session_id.map(|s| s.to_string()),
                }),
            })
        }

        fn failing(detail: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: StdMutex::new(Vec::new()),
                result: Err(detail),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Responder for StubResponder {
        async fn respond(
            &self,
            message: &str,
            _session_id: Option<&str>,
        ) -> Result<Resolved, ResponderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(message.to_string());
            match &self.result {
                Ok(resolved) => Ok(resolved.clone()),
                Err(detail) => Err(ResponderError::Model((*detail).to_string())),
            }
        }
    }

    fn app(responder: Arc<dyn Responder>) -> (Router, AppState) {
        let state = AppState::new(Arc::new(crate::test_support::chat_config()), responder);
        (
            router::build_router().with_state(state.clone()),
            state,
        )
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(router::paths::CHAT)
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("chat request")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn emergency_input_short_circuits() {
        let stub = StubResponder::ok("should never appear", None);
        let (app, _state) = app(stub.clone());

        let body = json!({"message": "I think I'm having a heart attack"}).to_string();
        let response = app.oneshot(chat_request(&body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert!(payload["response"].as_str().unwrap().contains("911"));
        assert_eq!(payload["isEmergency"], json!(true));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn emergency_matches_any_case_and_echoes_session() {
        let stub = StubResponder::ok("unused", None);
        let (app, _state) = app(stub.clone());

        let body = json!({"message": "CHEST PAIN right now", "sessionId": "s-7"}).to_string();
        let response = app.oneshot(chat_request(&body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["isEmergency"], json!(true));
        assert_eq!(payload["sessionId"], json!("s-7"));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn empty_message_rejected_before_anything_runs() {
        let stub = StubResponder::ok("unused", None);
        let (app, state) = app(stub.clone());

        for raw in ["", "   ", "\t\n"] {
            let body = json!({ "message": raw }).to_string();
            let response = app
                .clone()
                .oneshot(chat_request(&body))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(stub.calls(), 0);
        assert!(state.chat().history().await.is_empty());
    }

    #[tokio::test]
    async fn missing_or_nonstring_message_rejected() {
        let stub = StubResponder::ok("unused", None);
        let (app, _state) = app(stub.clone());

        for body in [json!({}), json!({"message": 42}), json!({"message": null})] {
            let response = app
                .clone()
                .oneshot(chat_request(&body.to_string()))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let payload = body_json(response).await;
            assert!(payload["response"]
                .as_str()
                .unwrap()
                .contains("provide a message"));
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn over_limit_message_names_the_ceiling() {
        let stub = StubResponder::ok("unused", None);
        let (app, _state) = app(stub.clone());

        let body = json!({ "message": "x".repeat(2001) }).to_string();
        let response = app.oneshot(chat_request(&body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = body_json(response).await;
        assert!(payload["response"].as_str().unwrap().contains("2000"));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_a_500_with_error_id() {
        let stub = StubResponder::ok("unused", None);
        let (app, _state) = app(stub.clone());

        let response = app
            .oneshot(chat_request("{not json"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload = body_json(response).await;
        assert!(payload["errorId"].as_str().is_some());
        assert_eq!(payload["response"], json!(responses::FALLBACK_REPLY));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn resolver_text_and_minted_session_reach_the_caller() {
        let stub = StubResponder::ok("Hello!", Some("gateway-session"));
        let (app, _state) = app(stub.clone());

        let body = json!({"message": "tell me about your services", "sessionId": "old"})
            .to_string();
        let response = app.oneshot(chat_request(&body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["response"], json!("Hello!"));
        // Resolver-minted token takes precedence over the caller's.
        assert_eq!(payload["sessionId"], json!("gateway-session"));
        assert!(payload.get("isEmergency").is_none());
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn caller_session_is_echoed_when_resolver_mints_none() {
        let stub = StubResponder::ok("Sure!", None);
        let (app, _state) = app(stub.clone());

        let body = json!({"message": "hi", "sessionId": "keep-me"}).to_string();
        let response = app.oneshot(chat_request(&body)).await.expect("response");
        let payload = body_json(response).await;
        assert_eq!(payload["sessionId"], json!("keep-me"));
    }

    #[tokio::test]
    async fn session_field_absent_when_nobody_produced_one() {
        let stub = StubResponder::ok("Sure!", None);
        let (app, _state) = app(stub.clone());

        let body = json!({"message": "hi"}).to_string();
        let response = app.oneshot(chat_request(&body)).await.expect("response");
        let payload = body_json(response).await;
        assert!(payload.get("sessionId").is_none());
    }

    #[tokio::test]
    async fn resolver_failure_returns_fallback_never_the_detail() {
        let stub = StubResponder::failing("upstream exploded spectacularly");
        let (app, _state) = app(stub.clone());

        let body = json!({"message": "hi there"}).to_string();
        let response = app.oneshot(chat_request(&body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload = body_json(response).await;
        assert_eq!(payload["response"], json!(responses::FALLBACK_REPLY));
        assert!(payload["errorId"].as_str().is_some());
        let raw = payload.to_string();
        assert!(!raw.contains("exploded"));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn control_characters_are_stripped_before_the_resolver() {
        let stub = StubResponder::ok("ok", None);
        let (app, _state) = app(stub.clone());

        let body = json!({"message": "  hi\u{0001}\u{007f} there  "}).to_string();
        let response = app.oneshot(chat_request(&body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let seen = stub.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["hi there".to_string()]);
    }

    #[tokio::test]
    async fn transcript_records_and_clears_exchanges() {
        let stub = StubResponder::ok("answer", None);
        let (app, state) = app(stub.clone());

        let body = json!({"message": "a question"}).to_string();
        let _ = app
            .clone()
            .oneshot(chat_request(&body))
            .await
            .expect("response");

        let history = state.chat().history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "a question");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "answer");

        let history_resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(router::paths::CHAT_HISTORY)
                    .body(Body::empty())
                    .expect("history request"),
            )
            .await
            .expect("history response");
        assert_eq!(history_resp.status(), StatusCode::OK);
        let payload = body_json(history_resp).await;
        assert_eq!(payload["count"], json!(2));
        assert!(payload["welcome"].as_str().unwrap().contains("Dripline"));

        let clear_resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(router::paths::CHAT_CLEAR)
                    .body(Body::empty())
                    .expect("clear request"),
            )
            .await
            .expect("clear response");
        assert_eq!(clear_resp.status(), StatusCode::OK);
        assert!(state.chat().history().await.is_empty());
    }

    #[tokio::test]
    async fn emergency_marks_only_the_assistant_message() {
        let stub = StubResponder::ok("unused", None);
        let (app, state) = app(stub);

        let body = json!({"message": "someone is unconscious"}).to_string();
        let _ = app.oneshot(chat_request(&body)).await.expect("response");
        let history = state.chat().history().await;
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_emergency);
        assert!(history[1].is_emergency);
    }

    #[tokio::test]
    async fn transcript_prunes_oldest_past_the_limit() {
        let state = ChatState::new();
        for i in 0..(HISTORY_LIMIT + 5) {
            state
                .append(ChatMessage::new(Role::User, &format!("m{i}")))
                .await;
        }
        let history = state.history().await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].content, "m5");
    }
}
