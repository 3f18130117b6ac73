//! Input screening and emergency triage for inbound chat messages.
//!
//! Everything here is deterministic and runs before any outbound call: a
//! hosted model cannot be trusted to prioritize safety instructions, so the
//! emergency gate is enforced outside the model as plain data plus a
//! substring scan.

use thiserror::Error;

/// Default ceiling on message length, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 2000;

/// Single authoritative emergency lexicon. The upstream client and server
/// lists drifted apart; this is their union.
pub const EMERGENCY_TERMS: &[&str] = &[
    "emergency",
    "heart attack",
    "stroke",
    "can't breathe",
    "cannot breathe",
    "severe pain",
    "unconscious",
    "bleeding heavily",
    "chest pain",
    "overdose",
    "seizure",
    "anaphylaxis",
    "allergic reaction severe",
    "passing out",
    "fainted",
    "911",
    "dying",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("message is required")]
    InvalidInput,
    #[error("message too long; the limit is {limit} characters")]
    TooLong { limit: usize },
}

/// Strip ASCII control characters (0x00-0x08, 0x0B-0x0C, 0x0E-0x1F, 0x7F)
/// and trim. Stripping happens first so a control character can never
/// shield surrounding whitespace; that keeps the whole pass idempotent.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !is_stripped_control(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\x00'..='\x08' | '\x0B' | '\x0C' | '\x0E'..='\x1F' | '\x7F')
}

/// Validate and sanitize raw user text.
pub fn screen(raw: &str, limit: usize) -> Result<String, GuardError> {
    if raw.chars().count() > limit {
        return Err(GuardError::TooLong { limit });
    }
    let clean = sanitize(raw);
    if clean.is_empty() {
        return Err(GuardError::InvalidInput);
    }
    Ok(clean)
}

/// Case-insensitive substring match against the emergency lexicon.
pub fn is_emergency(message: &str) -> bool {
    let lower = message.to_lowercase();
    EMERGENCY_TERMS.iter().any(|term| lower.contains(term))
}
