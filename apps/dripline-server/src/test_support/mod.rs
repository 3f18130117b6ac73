use once_cell::sync::Lazy;
use std::time::Duration;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use crate::config::{ChatConfig, ResponderKind};

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Baseline configuration shared by the handler and CORS suites so the
/// origin defaults cannot drift between them.
pub(crate) fn chat_config() -> ChatConfig {
    ChatConfig {
        responder: ResponderKind::Scripted,
        model_id: "test-model".into(),
        knowledge_base_id: None,
        gateway_url: "http://127.0.0.1:1".into(),
        gateway_api_key: None,
        max_message_chars: 2000,
        allowed_origins: vec!["https://driplinewellness.com".into()],
        preview_origin_suffix: ".driplinepreview.app".into(),
        scripted_delay: Duration::ZERO,
        http_timeout: Duration::from_secs(5),
    }
}

pub(crate) mod env {
    use super::*;

    /// Serializes env-var mutation across tests and restores prior values
    /// on drop.
    pub(crate) struct EnvGuard {
        _lock: MutexGuard<'static, ()>,
        saved: HashMap<String, Option<String>>,
    }

    pub(crate) fn guard() -> EnvGuard {
        EnvGuard {
            _lock: ENV_LOCK.lock().expect("env lock poisoned"),
            saved: HashMap::new(),
        }
    }

    impl EnvGuard {
        fn remember(&mut self, key: &str) {
            self.saved
                .entry(key.to_string())
                .or_insert_with(|| std::env::var(key).ok());
        }

        pub(crate) fn set(&mut self, key: &str, value: impl AsRef<str>) {
            self.remember(key);
            std::env::set_var(key, value.as_ref());
        }

        pub(crate) fn remove(&mut self, key: &str) {
            self.remember(key);
            std::env::remove_var(key);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain() {
                match value {
                    Some(val) => std::env::set_var(&key, val),
                    None => std::env::remove_var(&key),
                }
            }
        }
    }
}
