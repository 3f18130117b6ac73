use std::time::Duration;

/// Which response resolver backs the chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderKind {
    /// Hosted model gateway over HTTPS (retrieval-augmented, then direct).
    Gateway,
    /// Canned playbook replies with a simulated delay; no backend needed.
    Scripted,
}

/// Startup configuration for the chat pipeline. Loaded once from the
/// environment before the first request and immutable thereafter.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub responder: ResponderKind,
    pub model_id: String,
    /// Empty or unset disables the retrieval-augmented step.
    pub knowledge_base_id: Option<String>,
    pub gateway_url: String,
    pub gateway_api_key: Option<String>,
    pub max_message_chars: usize,
    pub allowed_origins: Vec<String>,
    /// Preview deployments are allowed by origin suffix.
    pub preview_origin_suffix: String,
    /// Simulated latency for the scripted responder.
    pub scripted_delay: Duration,
    /// Per-call timeout for outbound gateway requests.
    pub http_timeout: Duration,
}

const DEFAULT_MODEL_ID: &str = "anthropic.claude-sonnet-4-20250514";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_GATEWAY_URL: &str = "https://models.driplinewellness.com";
const DEFAULT_PREVIEW_SUFFIX: &str = ".driplinepreview.app";

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ChatConfig {
    pub fn from_env() -> Self {
        let gateway_api_key = env_nonempty("DRIPLINE_GATEWAY_API_KEY");
        let responder = match env_nonempty("DRIPLINE_RESPONDER").as_deref() {
            Some("gateway") => ResponderKind::Gateway,
            Some("scripted") => ResponderKind::Scripted,
            // Without a key the gateway cannot be reached; fall back to the
            // offline playbook so the service stays exercisable.
            _ if gateway_api_key.is_some() => ResponderKind::Gateway,
            _ => ResponderKind::Scripted,
        };
        let max_message_chars = env_nonempty("DRIPLINE_MAX_MESSAGE_CHARS")
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(dripline_triage::DEFAULT_MAX_MESSAGE_CHARS);
        let allowed_origins = env_nonempty("DRIPLINE_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().trim_end_matches('/').to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "https://driplinewellness.com".to_string(),
                    "https://www.driplinewellness.com".to_string(),
                ]
            });
        Self {
            responder,
            model_id: env_nonempty("DRIPLINE_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            knowledge_base_id: env_nonempty("DRIPLINE_KNOWLEDGE_BASE_ID"),
            gateway_url: env_nonempty("DRIPLINE_GATEWAY_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
            gateway_api_key,
            max_message_chars,
            allowed_origins,
            preview_origin_suffix: env_nonempty("DRIPLINE_PREVIEW_ORIGIN_SUFFIX")
                .unwrap_or_else(|| DEFAULT_PREVIEW_SUFFIX.to_string()),
            scripted_delay: Duration::from_millis(1000),
            http_timeout: Duration::from_secs(
                env_nonempty("DRIPLINE_HTTP_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .filter(|v| *v > 0)
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
        }
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        if self.allowed_origins.iter().any(|o| o == origin) {
            return true;
        }
        // Origins look like scheme://host[:port]; suffix-match the host.
        origin
            .split("://")
            .nth(1)
            .map(|host| host.ends_with(&self.preview_origin_suffix))
            .unwrap_or(false)
    }
}
