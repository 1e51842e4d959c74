//! HTTP liveness endpoint for porter.
//!
//! A tiny axum server that answers uptime probes while the bot polls
//! Telegram in the background. It carries no bot state.

#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod server;

pub use server::{AppState, build_gateway_app, serve, start_gateway};
