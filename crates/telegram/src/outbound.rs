use {
    async_trait::async_trait,
    std::{future::Future, time::Duration},
    teloxide::{
        RequestError,
        prelude::*,
        types::ChatId,
    },
    tracing::{debug, warn},
};

use porter_channels::{ChannelOutbound, Error, Result};

#[cfg(feature = "metrics")]
use porter_metrics::{counter, telegram as tg_metrics};

use crate::state::AccountStateMap;

/// Outbound message sender for Telegram.
pub struct TelegramOutbound {
    pub(crate) accounts: AccountStateMap,
}

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

impl TelegramOutbound {
    fn get_bot(&self, account_id: &str) -> Result<Bot> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts
            .get(account_id)
            .map(|s| s.bot.clone())
            .ok_or_else(|| Error::unknown_account(account_id))
    }

    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        account_id: &str,
        to: &str,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            account_id,
                            chat_id = to,
                            operation,
                            retries,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        account_id,
                        chat_id = to,
                        operation,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

fn parse_chat_id(to: &str) -> Result<ChatId> {
    to.parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::invalid_input(format!("invalid telegram chat id: {to}")))
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

#[async_trait]
impl ChannelOutbound for TelegramOutbound {
    async fn send_text(&self, account_id: &str, to: &str, text: &str) -> Result<()> {
        let bot = self.get_bot(account_id)?;
        let chat_id = parse_chat_id(to)?;

        let sent = self
            .run_telegram_request_with_retry(account_id, to, "send_message", || {
                bot.send_message(chat_id, text).send()
            })
            .await;

        match sent {
            Ok(_) => {
                #[cfg(feature = "metrics")]
                counter!(tg_metrics::MESSAGES_SENT_TOTAL).increment(1);
                debug!(
                    account_id,
                    chat_id = to,
                    text_len = text.len(),
                    "telegram outbound text sent"
                );
                Ok(())
            },
            Err(e) => {
                #[cfg(feature = "metrics")]
                counter!(tg_metrics::MESSAGE_SEND_ERRORS_TOTAL).increment(1);
                Err(Error::external("telegram sendMessage", e))
            },
        }
    }
}
