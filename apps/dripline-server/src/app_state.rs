use std::sync::Arc;

use crate::chat::ChatState;
use crate::config::ChatConfig;
use crate::responder::Responder;

#[derive(Clone)]
pub struct AppState {
    config: Arc<ChatConfig>,
    responder: Arc<dyn Responder>,
    chat: ChatState,
}

impl AppState {
    pub fn new(config: Arc<ChatConfig>, responder: Arc<dyn Responder>) -> Self {
        Self {
            config,
            responder,
            chat: ChatState::new(),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn responder(&self) -> &Arc<dyn Responder> {
        &self.responder
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }
}
