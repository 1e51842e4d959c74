use thiserror::Error;

/// Errors raised while bringing a bot account online.
#[derive(Debug, Error)]
pub enum Error {
    #[error("telegram API request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("failed to build HTTP client: {0}")]
    Reqwest(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
