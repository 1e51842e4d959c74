use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use porter_auto_reply::SessionStore;

use crate::outbound::TelegramOutbound;

/// Shared account state map.
pub type AccountStateMap = Arc<RwLock<HashMap<String, AccountState>>>;

/// Per-account runtime state.
pub struct AccountState {
    pub bot: teloxide::Bot,
    pub bot_username: Option<String>,
    pub outbound: Arc<TelegramOutbound>,
    /// Activation and authorization state shared with every other account.
    pub sessions: Arc<SessionStore>,
}
