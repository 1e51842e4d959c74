//! Telegram transport for porter.
//!
//! Long-polls the Bot API with teloxide, turns text messages into
//! [`porter_channels::InboundMessage`] values for the reply core, and sends
//! replies back through [`TelegramOutbound`].

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod state;

pub use {
    bot::{PollingHandle, start_polling},
    config::TelegramAccountConfig,
    error::{Error, Result},
    outbound::TelegramOutbound,
    state::{AccountState, AccountStateMap},
};
