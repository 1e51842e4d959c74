//! Metric name and label definitions.
//!
//! Every metric porter records is named here so the exported set is
//! documented in one place.

/// Reply core metrics
pub mod dispatch {
    /// Inbound messages that reached the dispatcher
    pub const MESSAGES_TOTAL: &str = "porter_dispatch_messages_total";
    /// Classified intents (labelled by `intent`)
    pub const INTENTS_TOTAL: &str = "porter_dispatch_intents_total";
    /// Password attempts (labelled by `result`: granted, rejected)
    pub const PASSWORD_ATTEMPTS_TOTAL: &str = "porter_dispatch_password_attempts_total";
    /// Participants currently holding access
    pub const AUTHORIZED_PARTICIPANTS: &str = "porter_dispatch_authorized_participants";
    /// Time spent deciding and delivering a reply
    pub const HANDLE_DURATION_SECONDS: &str = "porter_dispatch_handle_duration_seconds";
}

/// Telegram transport metrics
pub mod telegram {
    /// Messages received from Telegram
    pub const MESSAGES_RECEIVED_TOTAL: &str = "porter_telegram_messages_received_total";
    /// Messages sent to Telegram
    pub const MESSAGES_SENT_TOTAL: &str = "porter_telegram_messages_sent_total";
    /// Message send errors
    pub const MESSAGE_SEND_ERRORS_TOTAL: &str = "porter_telegram_message_send_errors_total";
    /// getUpdates failures
    pub const POLLING_ERRORS_TOTAL: &str = "porter_telegram_polling_errors_total";
}

/// Liveness HTTP metrics
pub mod http {
    /// Liveness probes served
    pub const PROBES_TOTAL: &str = "porter_http_probes_total";
}

/// Common label keys
pub mod labels {
    pub const INTENT: &str = "intent";
    pub const RESULT: &str = "result";
    pub const ENDPOINT: &str = "endpoint";
}

/// Histogram bucket definitions for different metric types
pub mod buckets {
    /// Dispatch duration buckets (in seconds), 1ms to 30s. Dominated by the
    /// Telegram round trip for the reply.
    pub const HANDLE_DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];
}
