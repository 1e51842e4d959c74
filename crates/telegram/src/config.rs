use secrecy::Secret;

/// Configuration for a single Telegram bot account.
#[derive(Clone)]
pub struct TelegramAccountConfig {
    /// Bot token from @BotFather.
    pub token: Secret<String>,

    /// Long-poll timeout for `getUpdates` (seconds).
    pub poll_timeout_secs: u32,

    /// Publish the command list with `setMyCommands` on startup.
    pub register_commands: bool,
}

impl TelegramAccountConfig {
    pub fn new(token: Secret<String>) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for TelegramAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAccountConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Default for TelegramAccountConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
            register_commands: true,
        }
    }
}
