use std::sync::Arc;

use crate::config::ChatConfig;
use crate::{responder, router, security, AppState};

pub(crate) struct BootstrapOutput {
    pub router: axum::Router<AppState>,
    pub state: AppState,
}

pub(crate) fn build(config: ChatConfig) -> BootstrapOutput {
    let config = Arc::new(config);
    let responder = responder::from_config(&config);
    let state = AppState::new(config, responder);
    BootstrapOutput {
        router: router::build_router(),
        state,
    }
}

pub(crate) fn attach_http_layers(
    router: axum::Router<()>,
    config: &ChatConfig,
    concurrency_limit: usize,
) -> axum::Router<()> {
    use tower::limit::ConcurrencyLimitLayer;
    use tower_http::trace::TraceLayer;

    router
        .layer(security::cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum HttpConfigError {
    #[error("invalid DRIPLINE_HTTP_MAX_CONC: {0}")]
    InvalidConcurrency(String),
    #[error("invalid DRIPLINE_PORT: {0}")]
    InvalidPort(String),
    #[error("invalid DRIPLINE_BIND: {0}")]
    InvalidBind(String),
}

#[derive(Debug)]
pub(crate) struct HttpConfig {
    pub addr: std::net::SocketAddr,
    pub concurrency_limit: usize,
}

pub(crate) fn http_config_from_env() -> Result<HttpConfig, HttpConfigError> {
    let concurrency_limit = std::env::var("DRIPLINE_HTTP_MAX_CONC")
        .ok()
        .map(|raw| {
            raw.parse()
                .map_err(|_| HttpConfigError::InvalidConcurrency(raw))
        })
        .transpose()?
        .unwrap_or(1024);

    let bind = std::env::var("DRIPLINE_BIND").unwrap_or_else(|_| "127.0.0.1".into());
    let port_raw = std::env::var("DRIPLINE_PORT").unwrap_or_else(|_| "8080".into());
    let port: u16 = port_raw
        .parse()
        .map_err(|_| HttpConfigError::InvalidPort(port_raw))?;

    let addr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|_| HttpConfigError::InvalidBind(bind.clone()))?;

    Ok(HttpConfig {
        addr,
        concurrency_limit,
    })
}

/// When `OPENAPI_OUT` is set, write the API document (plus the protocol
/// JSON schemas next to it) and exit instead of serving.
pub(crate) fn ensure_openapi_export() -> Result<Option<String>, std::io::Error> {
    if let Ok(path) = std::env::var("OPENAPI_OUT") {
        export_openapi(&path)?;
        export_protocol_schemas()?;
        return Ok(Some(path));
    }
    Ok(None)
}

fn export_openapi(path: &str) -> Result<(), std::io::Error> {
    use utoipa::OpenApi;

    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = crate::openapi::ApiDoc::openapi()
        .to_yaml()
        .unwrap_or_else(|_| "openapi: 3.0.3".into());
    std::fs::write(path, yaml)
}

fn export_protocol_schemas() -> Result<(), std::io::Error> {
    use schemars::schema_for;

    let dir = std::path::Path::new("spec/schemas");
    std::fs::create_dir_all(dir)?;
    let request_schema = schema_for!(dripline_protocol::ChatRequest);
    let reply_schema = schema_for!(dripline_protocol::ChatReply);
    let request_bytes =
        serde_json::to_vec_pretty(&request_schema).map_err(std::io::Error::other)?;
    let reply_bytes = serde_json::to_vec_pretty(&reply_schema).map_err(std::io::Error::other)?;
    std::fs::write(dir.join("chat_request.json"), request_bytes)?;
    std::fs::write(dir.join("chat_reply.json"), reply_bytes)
}
