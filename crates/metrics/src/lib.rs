//! Metrics collection and export for porter.
//!
//! Crates record through the `metrics` facade macros re-exported here, always
//! behind their own `metrics` feature. When the `prometheus` feature is
//! enabled the recorder can be rendered for a `/metrics` endpoint.
//!
//! ```rust,ignore
//! use porter_metrics::{counter, dispatch};
//!
//! counter!(dispatch::INTENTS_TOTAL, "intent" => "chat_text").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
