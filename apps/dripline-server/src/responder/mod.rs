use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ChatConfig, ResponderKind};

pub mod gateway;
pub mod playbook;

/// What a resolver strategy produced for one screened message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    /// Continuation token minted or echoed by the upstream service.
    /// `None` when the strategy has no notion of a session.
    pub session_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("model invocation failed: {0}")]
    Model(String),
}

impl ResponderError {
    /// Stable category label, safe to log. Never carries message content.
    pub fn category(&self) -> &'static str {
        match self {
            ResponderError::Retrieval(_) => "retrieval",
            ResponderError::Model(_) => "model",
        }
    }
}

/// One interchangeable response-resolver strategy. The chat pipeline only
/// ever sees this trait; remote and scripted variants are selected at
/// startup.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<Resolved, ResponderError>;
}

pub fn from_config(config: &ChatConfig) -> Arc<dyn Responder> {
    match config.responder {
        ResponderKind::Gateway => Arc::new(gateway::GatewayResponder::new(config)),
        ResponderKind::Scripted => {
            Arc::new(playbook::ScriptedResponder::new(config.scripted_delay))
        }
    }
}
