use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::ChatConfig;

use super::{Resolved, Responder, ResponderError};

/// Safety-constrained system prompt sent on every generation request.
pub const SYSTEM_PROMPT: &str = "You are the Dripline Wellness Assistant, a friendly and \
knowledgeable guide for Dripline Hydration & Wellness, a mobile IV therapy service.\n\n\
CRITICAL SAFETY RULES - ALWAYS FOLLOW:\n\
1. For ANY emergency medical situation, IMMEDIATELY respond: \"If you're experiencing a \
medical emergency, please call 911 immediately. Do not wait for online assistance.\"\n\
2. You are NOT a medical professional and cannot provide medical advice, diagnoses, or \
treatment recommendations\n\
3. Always recommend consulting with healthcare providers for medical decisions\n\
4. Never suggest specific dosages or treatment protocols\n\n\
You CAN help with: information about Dripline services (IV therapy, vitamin injections, \
wellness consultations, event services), general benefits of hydration and wellness \
treatments, scheduling and booking questions, service-area coverage, pricing and package \
information, and general wellness education.\n\n\
You CANNOT help with: medical diagnoses or treatment advice, drug interactions or \
medication questions, emergency medical situations (direct to 911), services not offered \
by Dripline, or specific health conditions requiring medical expertise.\n\n\
Keep responses friendly, concise, and helpful. When discussing services, be informative \
but always recommend booking a consultation for personalized recommendations.";

/// Template for knowledge-base-grounded generation. `$search_results$` and
/// `$query$` are substituted by the gateway.
const RAG_TEMPLATE_SUFFIX: &str = "\n\nContext from the Dripline knowledge base:\n\
$search_results$\n\nUser question: $query$\n\n\
Provide a helpful, friendly response based on the context. If the context doesn't \
contain relevant information, use your general knowledge about IV therapy and wellness \
services while staying within the safety guidelines.";

const RAG_RESULT_COUNT: u32 = 5;
const MAX_TOKENS: u32 = 1024;

/// Resolver backed by the hosted model gateway: one retrieval-augmented
/// attempt when a knowledge base is configured, then one direct model
/// invocation. Each attempted exactly once, sequentially.
pub struct GatewayResponder {
    base_url: String,
    api_key: Option<String>,
    model_id: String,
    knowledge_base_id: Option<String>,
    timeout: Duration,
}

impl GatewayResponder {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            base_url: config.gateway_url.clone(),
            api_key: config.gateway_api_key.clone(),
            model_id: config.model_id.clone(),
            knowledge_base_id: config.knowledge_base_id.clone(),
            timeout: config.http_timeout,
        }
    }

    async fn retrieve_and_generate(
        &self,
        knowledge_base_id: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<Resolved, ResponderError> {
        let url = format!(
            "{}/knowledge-bases/{}/retrieve-and-generate",
            self.base_url, knowledge_base_id
        );
        let mut body = json!({
            "input": { "text": message },
            "modelId": self.model_id,
            "promptTemplate": format!("{}{}", SYSTEM_PROMPT, RAG_TEMPLATE_SUFFIX),
            "numberOfResults": RAG_RESULT_COUNT,
        });
        if let Some(session) = session_id {
            body["sessionId"] = json!(session);
        }

        let payload = self
            .request_json(&url, &body)
            .await
            .map_err(ResponderError::Retrieval)?;
        let text = payload
            .get("output")
            .and_then(|o| o.get("text"))
            .and_then(|t| t.as_str())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ResponderError::Retrieval("empty generation output".into()))?
            .to_string();
        let session_id = payload
            .get("sessionId")
            .and_then(|s| s.as_str())
            .map(|s| s.to_string());
        Ok(Resolved { text, session_id })
    }

    async fn invoke(&self, message: &str) -> Result<String, ResponderError> {
        let url = format!("{}/model/{}/invoke", self.base_url, self.model_id);
        let body = json!({
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": message }
            ],
        });

        let payload = self
            .request_json(&url, &body)
            .await
            .map_err(ResponderError::Model)?;
        payload
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|block| block.get("text"))
            .and_then(|t| t.as_str())
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.to_string())
            .ok_or_else(|| ResponderError::Model("empty completion".into()))
    }

    /// One POST to the gateway. Error strings carry only transport or
    /// status detail, never the user's message.
    async fn request_json(&self, url: &str, body: &Value) -> Result<Value, String> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| format!("client: {e}"))?;
        let mut request = client.post(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = request
            .json(body)
            .send()
            .await
            .map_err(|e| format!("network: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("status: {status}"));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| format!("decode: {e}"))
    }
}

#[async_trait]
impl Responder for GatewayResponder {
    async fn respond(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<Resolved, ResponderError> {
        if let Some(kb) = self.knowledge_base_id.as_deref() {
            match self.retrieve_and_generate(kb, message, session_id).await {
                Ok(resolved) => return Ok(resolved),
                Err(err) => {
                    warn!(
                        target: "dripline::responder",
                        category = err.category(),
                        "retrieval failed, falling back to direct invoke"
                    );
                }
            }
        }

        let text = self.invoke(message).await?;
        // The direct path mints no continuation token; keep the caller's.
        Ok(Resolved {
            text,
            session_id: session_id.map(|s| s.to_string()),
        })
    }
}
