/// Config schema types.
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PorterConfig {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub access: AccessConfig,
    pub metrics: MetricsConfig,
}

/// Liveness HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

/// Telegram bot connection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,

    /// Label used in logs and reply targets.
    pub account_id: String,

    /// Long-poll timeout passed to `getUpdates` (seconds).
    pub poll_timeout_secs: u32,

    /// Register the bot commands with Telegram for client autocomplete.
    pub register_commands: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            account_id: "default".into(),
            poll_timeout_secs: 30,
            register_commands: true,
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("account_id", &self.account_id)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("register_commands", &self.register_commands)
            .finish()
    }
}

/// Shared-secret access to gated features.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<Secret<String>>,
}

impl std::fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessConfig")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_str(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
