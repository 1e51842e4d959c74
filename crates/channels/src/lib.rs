//! Delivery boundary between messaging transports and the reply core.
//!
//! Transports (Telegram today) turn their wire envelopes into
//! [`InboundMessage`] values and implement [`ChannelOutbound`] so replies can
//! be sent back without the core knowing anything about the wire.

pub mod error;
pub mod inbound;
pub mod plugin;

pub use {
    error::{Error, Result},
    inbound::{InboundKind, InboundMessage},
    plugin::{ChannelOutbound, ChannelReplyTarget, ChannelType, DeliveryOutcome, deliver},
};
