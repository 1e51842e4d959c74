//! Startup validation.
//!
//! [`validate`] collects every problem at once for `porter config check`;
//! [`credentials`] is the fail-fast gate used on startup.

use std::path::PathBuf;

use secrecy::{ExposeSecret, Secret};

use crate::{
    error::{Error, Result},
    schema::PorterConfig,
};

/// Passwords shorter than this get a warning.
const MIN_PASSWORD_LEN: usize = 8;

/// Telegram rejects long-poll timeouts above this.
const MAX_POLL_TIMEOUT_SECS: u32 = 50;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "missing-secret", "format", "security", "range"
    pub category: &'static str,
    /// Dotted path, e.g. "telegram.token"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.category, self.path, self.message
        )
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// The two secrets porter cannot start without.
pub struct Credentials {
    pub bot_token: Secret<String>,
    pub password: Secret<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Check `config` and report every finding.
#[must_use]
pub fn validate(config: &PorterConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    match present(config.telegram.token.as_ref()) {
        None => result.push(
            Severity::Error,
            "missing-secret",
            "telegram.token",
            "bot token is required (set TELEGRAM_BOT_TOKEN)",
        ),
        Some(token) if !looks_like_bot_token(token) => result.push(
            Severity::Warning,
            "format",
            "telegram.token",
            "token does not look like `<bot id>:<secret>` from @BotFather",
        ),
        Some(_) => {},
    }

    match present(config.access.password.as_ref()) {
        None => result.push(
            Severity::Error,
            "missing-secret",
            "access.password",
            "access password is required (set BOT_PASSWORD)",
        ),
        Some(password) => {
            if password.trim() != password {
                result.push(
                    Severity::Error,
                    "format",
                    "access.password",
                    "password has surrounding whitespace; replies are trimmed before comparison so it can never match",
                );
            }
            if password.trim_start().starts_with('/') {
                result.push(
                    Severity::Error,
                    "format",
                    "access.password",
                    "password starts with `/`; it would be read as a command and never reach the password check",
                );
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                result.push(
                    Severity::Warning,
                    "security",
                    "access.password",
                    format!(
                        "password is shorter than {MIN_PASSWORD_LEN} characters and attempts are unlimited"
                    ),
                );
            }
        },
    }

    if config.telegram.poll_timeout_secs > MAX_POLL_TIMEOUT_SECS {
        result.push(
            Severity::Warning,
            "range",
            "telegram.poll_timeout_secs",
            format!("Telegram caps long polling at {MAX_POLL_TIMEOUT_SECS}s"),
        );
    }

    if config.telegram.account_id.trim().is_empty() {
        result.push(
            Severity::Warning,
            "format",
            "telegram.account_id",
            "empty account id makes log lines hard to attribute",
        );
    }

    if config.server.port == 0 {
        result.push(
            Severity::Info,
            "range",
            "server.port",
            "port 0 binds an ephemeral port",
        );
    }

    result
}

/// Extract the required secrets, refusing to continue if either is missing.
pub fn credentials(config: &PorterConfig) -> Result<Credentials> {
    let problems: Vec<String> = validate(config)
        .diagnostics
        .into_iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| format!("{}: {}", d.path, d.message))
        .collect();

    match (
        present(config.telegram.token.as_ref()),
        present(config.access.password.as_ref()),
    ) {
        (Some(token), Some(password)) if problems.is_empty() => Ok(Credentials {
            bot_token: Secret::new(token.to_string()),
            password: Secret::new(password.to_string()),
        }),
        _ => Err(Error::Invalid { problems }),
    }
}

fn present(secret: Option<&Secret<String>>) -> Option<&str> {
    secret
        .map(|s| s.expose_secret().as_str())
        .filter(|s| !s.trim().is_empty())
}

fn looks_like_bot_token(token: &str) -> bool {
    token.split_once(':').is_some_and(|(id, rest)| {
        !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty()
    })
}
