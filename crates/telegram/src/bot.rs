use std::{sync::Arc, time::Duration};

use {
    porter_auto_reply::{SessionStore, dispatch::commands},
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use porter_metrics::{counter, telegram as tg_metrics};

use crate::{
    config::TelegramAccountConfig,
    error::Result,
    handlers,
    outbound::TelegramOutbound,
    state::{AccountState, AccountStateMap},
};

/// Extra headroom on top of the long-poll timeout for the HTTP client.
const CLIENT_TIMEOUT_SLACK_SECS: u64 = 15;
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// A running polling loop.
pub struct PollingHandle {
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

/// Start polling for a single bot account.
///
/// Verifies the token with `getMe`, clears any webhook, registers the
/// command list, then spawns a background task that processes updates one
/// at a time until the returned token is cancelled.
pub async fn start_polling(
    account_id: String,
    config: TelegramAccountConfig,
    accounts: AccountStateMap,
    sessions: Arc<SessionStore>,
) -> Result<PollingHandle> {
    // The client timeout must exceed the long-poll timeout so the HTTP
    // client doesn't abort the request before Telegram responds.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(
            u64::from(config.poll_timeout_secs) + CLIENT_TIMEOUT_SLACK_SECS,
        ))
        .build()?;
    let bot = Bot::with_client(config.token.expose_secret(), client);
    start_polling_with_bot(account_id, bot, config, accounts, sessions).await
}

async fn start_polling_with_bot(
    account_id: String,
    bot: Bot,
    config: TelegramAccountConfig,
    accounts: AccountStateMap,
    sessions: Arc<SessionStore>,
) -> Result<PollingHandle> {
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    if config.register_commands {
        let commands: Vec<BotCommand> = commands::ALL
            .iter()
            .map(|(name, description)| BotCommand::new(*name, *description))
            .collect();
        if let Err(e) = bot.set_my_commands(commands).await {
            warn!(account_id, "failed to register bot commands: {e}");
        }
    }

    info!(
        account_id,
        username = ?bot_username,
        "telegram bot connected (webhook cleared)"
    );

    let cancel = CancellationToken::new();
    let outbound = Arc::new(TelegramOutbound {
        accounts: Arc::clone(&accounts),
    });
    let state = AccountState {
        bot: bot.clone(),
        bot_username,
        outbound,
        sessions,
    };
    accounts
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(account_id.clone(), state);

    let poll_timeout = config.poll_timeout_secs;
    let cancel_clone = cancel.clone();
    let task = tokio::spawn(async move {
        poll_loop(bot, account_id, poll_timeout, accounts, cancel_clone).await;
    });

    Ok(PollingHandle { cancel, task })
}

async fn poll_loop(
    bot: Bot,
    aid: String,
    poll_timeout: u32,
    accounts: AccountStateMap,
    cancel: CancellationToken,
) {
    info!(account_id = aid, "starting telegram polling loop");
    let mut offset: i32 = 0;

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = bot
                .get_updates()
                .offset(offset)
                .timeout(poll_timeout)
                .allowed_updates(vec![AllowedUpdate::Message])
                .send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(
                    account_id = aid,
                    count = updates.len(),
                    "got telegram updates"
                );
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(msg) => {
                            if let Err(e) =
                                handlers::handle_message_direct(msg, &aid, &accounts).await
                            {
                                error!(
                                    account_id = aid,
                                    error = %e,
                                    "error handling telegram message"
                                );
                            }
                        },
                        other => {
                            debug!(account_id = aid, "ignoring non-message update: {other:?}");
                        },
                    }
                }
            },
            Err(e) => {
                #[cfg(feature = "metrics")]
                counter!(tg_metrics::POLLING_ERRORS_TOTAL).increment(1);

                // Another instance is polling with the same token.
                if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                    warn!(
                        account_id = aid,
                        "telegram polling stopped: another instance is already running with this token"
                    );
                    cancel.cancel();
                    break;
                }

                warn!(account_id = aid, error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                }
            },
        }
    }

    accounts
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .remove(&aid);
    info!(account_id = aid, "telegram polling stopped");
}
