use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use super::{Resolved, Responder, ResponderError};

/// Canned reply categories, first match wins. Kept as plain data so tests
/// can enumerate the table.
pub const PLAYBOOK: &[(&[&str], &str)] = &[
    (
        &["price", "cost", "how much"],
        "Our IV therapy services range from $125 for basic Hydration Therapy to $225 for \
         specialty treatments like Beauty Glow. Vitamin injections start at just $35 for a \
         B12 boost. Would you like details about a specific treatment?",
    ),
    (
        &["myers", "cocktail"],
        "The Myers Cocktail is our signature IV blend at $175. It includes Vitamin C, \
         B-Complex, Magnesium, and Calcium for overall wellness, energy, and immune support. \
         It takes about 45-60 minutes and is great for general wellness maintenance. Would \
         you like to book this treatment?",
    ),
    (
        &["hangover", "dehydrated"],
        "For recovery from dehydration or hangovers, I'd recommend our Hydration Therapy \
         ($125) for pure rehydration, or the Myers Cocktail ($175) for hydration plus \
         vitamins and energy support. Both can help you feel better quickly! Which interests \
         you?",
    ),
    (
        &["immune", "sick", "cold", "flu"],
        "Our Immunity Drip ($195) is perfect for boosting your immune system! It features \
         high-dose Vitamin C, Zinc, and Glutathione. Great for when you're feeling under the \
         weather or want to strengthen your defenses during cold and flu season.",
    ),
    (
        &["book", "appointment", "schedule"],
        "Great! You can book an appointment through our booking page. We offer mobile \
         services across our whole coverage area - we come to your home, office, or event \
         venue! Would you like me to direct you to our booking page?",
    ),
    (
        &["location", "where", "area"],
        "Dripline is a mobile IV therapy service - we come to you! We serve the entire \
         metro area and surrounding communities. Just let us know your location when you \
         book!",
    ),
];

pub const GENERIC_REPLY: &str = "Thanks for your question! I can help you with information \
about our IV therapy treatments, vitamin injections, pricing, or booking. What would you \
like to know more about?";

/// Greeting clients show before the first exchange.
pub const WELCOME: &str = "Hi! I'm the Dripline Wellness Assistant. I can help you learn \
about our IV therapy and vitamin injection services, answer questions about treatments, \
or help you decide which service might be right for you. How can I help you today?";

const JITTER_MS: u64 = 500;

/// Pure lookup half of the scripted responder.
pub fn canned_reply(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    PLAYBOOK
        .iter()
        .find(|(patterns, _)| patterns.iter().any(|p| lower.contains(p)))
        .map(|(_, reply)| *reply)
        .unwrap_or(GENERIC_REPLY)
}

/// Offline resolver: simulated latency followed by a playbook lookup.
/// Exists so the service is exercisable without a live gateway.
pub struct ScriptedResponder {
    base_delay: Duration,
}

impl ScriptedResponder {
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn respond(
        &self,
        message: &str,
        _session_id: Option<&str>,
    ) -> Result<Resolved, ResponderError> {
        if !self.base_delay.is_zero() {
            let jitter = rand::rng().random_range(0..=JITTER_MS);
            tokio::time::sleep(self.base_delay + Duration::from_millis(jitter)).await;
        }
        Ok(Resolved {
            text: canned_reply(message).to_string(),
            // The playbook has no upstream session to continue.
            session_id: None,
        })
    }
}
