//! Canned replies for small talk.
//!
//! A fixed table keyed by normalized text. Matching is exact equality after
//! [`normalize`]; there is no partial or fuzzy matching.

/// Reply for any text that has no catalog entry.
pub const FALLBACK_REPLY: &str =
    "Sorry, I didn't understand that. Try asking \"what can you do\".";

const ENTRIES: &[(&str, &str)] = &[
    ("hi", "Hello! How can I help you today?"),
    ("hello", "Hi there! Nice to hear from you."),
    (
        "how are you",
        "I'm just a bot, but I'm running smoothly. Thanks for asking!",
    ),
    (
        "what can you do",
        "I can chat a little, and once you're authorized with /auth I unlock /services.",
    ),
    (
        "who are you",
        "I'm porter, a small assistant that keeps the door to the advanced services.",
    ),
];

/// Lowercase and trim `text` into a catalog key.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Look up an already-normalized key, falling back to [`FALLBACK_REPLY`].
pub fn lookup(normalized: &str) -> &'static str {
    ENTRIES
        .iter()
        .find(|(key, _)| *key == normalized)
        .map_or(FALLBACK_REPLY, |(_, reply)| reply)
}

/// Normalize then look up.
pub fn reply_for(text: &str) -> &'static str {
    lookup(&normalize(text))
}

/// All catalog keys, in table order.
pub fn keys() -> impl Iterator<Item = &'static str> {
    ENTRIES.iter().map(|(key, _)| *key)
}
