//! Inbound message processing: the glue between channels and replies.
//!
//! Flow: channel message → [`dispatch`] against the shared [`SessionStore`]
//! (activation gate, password prompts, canned replies) → at most one reply
//! delivered via the channel outbound.

pub mod catalog;
pub mod dispatch;
pub mod reply;
pub mod session;

pub use {
    dispatch::{Decision, Intent, dispatch},
    reply::handle_inbound,
    session::{AuthAttempt, AuthRequest, SessionSnapshot, SessionStore},
};
