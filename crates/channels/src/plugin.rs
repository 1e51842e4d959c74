use {async_trait::async_trait, serde::Serialize, tracing::warn};

use crate::Result;

/// Messaging platforms porter can front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Telegram,
}

impl ChannelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to send a reply back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelReplyTarget {
    pub channel_type: ChannelType,
    pub account_id: String,
    /// Chat/peer ID to send the reply to.
    pub chat_id: String,
}

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, account_id: &str, to: &str, text: &str) -> Result<()>;
}

/// Result of a fire-and-forget delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

/// Send `text` to `target`, logging (not returning) any failure.
///
/// Failures stop here: callers only learn the outcome, never the error.
pub async fn deliver(
    outbound: &dyn ChannelOutbound,
    target: &ChannelReplyTarget,
    text: &str,
) -> DeliveryOutcome {
    match outbound
        .send_text(&target.account_id, &target.chat_id, text)
        .await
    {
        Ok(()) => DeliveryOutcome::Sent,
        Err(e) => {
            warn!(
                channel = %target.channel_type,
                account_id = target.account_id,
                chat_id = target.chat_id,
                error = %e,
                "failed to deliver reply"
            );
            DeliveryOutcome::Failed
        },
    }
}
