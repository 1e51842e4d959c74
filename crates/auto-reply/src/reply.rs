use {
    porter_channels::{ChannelOutbound, DeliveryOutcome, InboundMessage, deliver},
    tracing::info,
};

#[cfg(feature = "metrics")]
use porter_metrics::{counter, dispatch as dispatch_metrics, gauge, histogram, labels};

use crate::{
    dispatch::{Decision, Intent, dispatch},
    session::{AuthAttempt, SessionStore},
};

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handled {
    pub decision: Decision,
    /// `None` when the decision was to stay silent.
    pub delivery: Option<DeliveryOutcome>,
}

/// Main entry point: dispatch an inbound message and send the reply, if any.
///
/// Delivery is fire-and-forget. A failed send is logged by [`deliver`] and
/// has no effect on the session.
pub async fn handle_inbound(
    store: &SessionStore,
    outbound: &dyn ChannelOutbound,
    msg: &InboundMessage,
) -> Handled {
    #[cfg(feature = "metrics")]
    let start = std::time::Instant::now();

    #[cfg(feature = "metrics")]
    counter!(dispatch_metrics::MESSAGES_TOTAL).increment(1);

    let decision = dispatch(store, msg);

    #[cfg(feature = "metrics")]
    counter!(
        dispatch_metrics::INTENTS_TOTAL,
        labels::INTENT => decision.intent.as_str()
    )
    .increment(1);

    match decision.auth_attempt {
        Some(AuthAttempt::Granted) => {
            info!(
                peer_id = %msg.participant,
                account_id = msg.reply_to.account_id,
                "participant authorized"
            );
            #[cfg(feature = "metrics")]
            {
                counter!(dispatch_metrics::PASSWORD_ATTEMPTS_TOTAL, labels::RESULT => "granted")
                    .increment(1);
                gauge!(dispatch_metrics::AUTHORIZED_PARTICIPANTS)
                    .set(store.snapshot().authorized as f64);
            }
        },
        Some(AuthAttempt::Rejected) => {
            info!(peer_id = %msg.participant, "incorrect password attempt");
            #[cfg(feature = "metrics")]
            counter!(dispatch_metrics::PASSWORD_ATTEMPTS_TOTAL, labels::RESULT => "rejected")
                .increment(1);
        },
        Some(AuthAttempt::NotPending) | None => {},
    }

    if matches!(decision.intent, Intent::Activation | Intent::Deactivation) {
        info!(
            peer_id = %msg.participant,
            active = store.is_active(),
            "activation toggled"
        );
    }

    let delivery = match decision.reply {
        Some(text) => Some(deliver(outbound, &msg.reply_to, text).await),
        None => None,
    };

    #[cfg(feature = "metrics")]
    histogram!(dispatch_metrics::HANDLE_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

    Handled { decision, delivery }
}
