use porter_common::ParticipantId;

use crate::plugin::ChannelReplyTarget;

/// Whether an inbound message is a bot command or free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// `/name [args]`. `name` is lowercased with any `@botname` suffix removed.
    Command { name: String },
    Text,
}

/// A transport-neutral inbound message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub participant: ParticipantId,
    /// Where a reply to this message should be delivered.
    pub reply_to: ChannelReplyTarget,
    pub kind: InboundKind,
    /// Trimmed text. For commands this is whatever followed the command token.
    pub body: String,
}

impl InboundMessage {
    /// Build a message from raw chat text, classifying `/commands`.
    pub fn from_text(participant: ParticipantId, reply_to: ChannelReplyTarget, raw: &str) -> Self {
        let trimmed = raw.trim();
        let (kind, body) = match parse_command(trimmed) {
            Some((name, rest)) => (InboundKind::Command { name }, rest.to_string()),
            None => (InboundKind::Text, trimmed.to_string()),
        };
        Self {
            participant,
            reply_to,
            kind,
            body,
        }
    }

    pub fn command_name(&self) -> Option<&str> {
        match &self.kind {
            InboundKind::Command { name } => Some(name),
            InboundKind::Text => None,
        }
    }
}

/// Split `/name@bot rest` into (`name`, `rest`).
///
/// Only a leading token made of ASCII letters, digits and `_` counts as a
/// command, matching what Telegram marks as a `bot_command` entity.
fn parse_command(text: &str) -> Option<(String, &str)> {
    let after_slash = text.strip_prefix('/')?;
    let token_end = after_slash
        .find(char::is_whitespace)
        .unwrap_or(after_slash.len());
    let (token, rest) = after_slash.split_at(token_end);
    let name = token.split('@').next().unwrap_or_default();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name.to_ascii_lowercase(), rest.trim()))
}
