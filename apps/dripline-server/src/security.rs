use axum::http::request::Parts;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ChatConfig;

/// Cross-origin policy for the chat surface: the fixed production
/// allow-list plus preview-deployment subdomains, credentials allowed,
/// POST and OPTIONS only. Preflights are answered by the layer itself.
pub fn cors_layer(config: &ChatConfig) -> CorsLayer {
    let config = config.clone();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|o| config.origin_allowed(o))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
