//! Routing of one inbound message to exactly one outcome.
//!
//! Dispatch runs in two steps under a single session lock:
//!
//! 1. [`classify`] looks at the message and the current session and picks an
//!    [`Intent`]. The order of checks in that function *is* the precedence
//!    order: activation commands first, then the activation gate, then
//!    commands, then pending password prompts, then small talk.
//! 2. [`apply`] performs the state change for that intent and picks the reply.
//!
//! Holding the lock across both steps means a password attempt is checked,
//! compared and applied without another message for the same participant
//! slipping in between.

use {
    porter_channels::{InboundKind, InboundMessage},
    tracing::debug,
};

use crate::{
    catalog,
    session::{AuthAttempt, AuthRequest, Session, SessionStore},
};

/// Command names porter understands. Matched after lowercasing.
pub mod commands {
    pub const START: &str = "startbot";
    pub const STOP: &str = "stopbot";
    pub const AUTH: &str = "auth";
    pub const SERVICES: &str = "services";

    /// All commands with a short description, for client autocomplete.
    pub const ALL: &[(&str, &str)] = &[
        (START, "Activate the bot"),
        (STOP, "Deactivate the bot"),
        (AUTH, "Unlock advanced services with the password"),
        (SERVICES, "Show the advanced services menu"),
    ];
}

/// User-facing reply texts.
pub mod replies {
    pub const ACTIVATED: &str = "Bot activated. I'm active and listening now.";
    pub const DEACTIVATED: &str = "Bot deactivated. Send /startbot to wake me up again.";
    pub const ALREADY_AUTHORIZED: &str = "You are already authorized. Try /services.";
    pub const ENTER_PASSWORD: &str = "Please enter the password.";
    pub const ACCESS_GRANTED: &str = "Access granted! Use /services to open the advanced menu.";
    pub const INCORRECT_PASSWORD: &str = "Incorrect password. Please try again.";
    pub const AUTHORIZATION_REQUIRED: &str =
        "Authorization required. Use /auth and enter the password first.";
    pub const SERVICES_MENU: &str = "Advanced services menu:\n\
        1. System status report\n\
        2. Scheduled announcements\n\
        3. Priority support line";
}

/// What an inbound message means given the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Activation,
    Deactivation,
    AuthRequest,
    /// Free text from a participant with a pending password prompt.
    PasswordAttempt,
    ServiceRequest,
    ChatText,
    /// Nothing to do: the bot is inactive, or the command is unknown.
    Unrouted,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Deactivation => "deactivation",
            Self::AuthRequest => "auth_request",
            Self::PasswordAttempt => "password_attempt",
            Self::ServiceRequest => "service_request",
            Self::ChatText => "chat_text",
            Self::Unrouted => "unrouted",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of dispatching one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub intent: Intent,
    /// `None` means stay silent.
    pub reply: Option<&'static str>,
    /// Set only for [`Intent::PasswordAttempt`].
    pub auth_attempt: Option<AuthAttempt>,
}

/// Decide what `msg` means. Read-only.
pub fn classify(session: &Session, msg: &InboundMessage) -> Intent {
    match &msg.kind {
        InboundKind::Command { name } if name == commands::START => Intent::Activation,
        InboundKind::Command { name } if name == commands::STOP => Intent::Deactivation,
        _ if !session.is_active() => Intent::Unrouted,
        InboundKind::Command { name } => match name.as_str() {
            commands::AUTH => Intent::AuthRequest,
            commands::SERVICES => Intent::ServiceRequest,
            _ => Intent::Unrouted,
        },
        // Pending prompts win over small talk: "hi" typed while a password is
        // expected is a password attempt.
        InboundKind::Text if session.is_pending(&msg.participant) => Intent::PasswordAttempt,
        InboundKind::Text => Intent::ChatText,
    }
}

/// Carry out `intent` against the session and choose the reply.
pub fn apply(session: &mut Session, intent: Intent, msg: &InboundMessage) -> Decision {
    let pid = &msg.participant;
    let mut auth_attempt = None;
    let reply = match intent {
        Intent::Activation => {
            session.activate();
            Some(replies::ACTIVATED)
        },
        Intent::Deactivation => {
            session.deactivate();
            Some(replies::DEACTIVATED)
        },
        Intent::AuthRequest => match session.begin_auth_request(pid) {
            AuthRequest::AlreadyAuthorized => Some(replies::ALREADY_AUTHORIZED),
            AuthRequest::Pending => Some(replies::ENTER_PASSWORD),
        },
        Intent::PasswordAttempt => {
            let attempt = session.resolve_auth_request(pid, &msg.body);
            auth_attempt = Some(attempt);
            match attempt {
                AuthAttempt::Granted => Some(replies::ACCESS_GRANTED),
                AuthAttempt::Rejected => Some(replies::INCORRECT_PASSWORD),
                // Only reachable if `apply` is called with a stale intent.
                AuthAttempt::NotPending => Some(catalog::reply_for(&msg.body)),
            }
        },
        Intent::ServiceRequest => {
            if session.is_authorized(pid) {
                Some(replies::SERVICES_MENU)
            } else {
                Some(replies::AUTHORIZATION_REQUIRED)
            }
        },
        Intent::ChatText => Some(catalog::reply_for(&msg.body)),
        Intent::Unrouted => None,
    };
    Decision {
        intent,
        reply,
        auth_attempt,
    }
}

/// Classify and apply `msg` atomically.
pub fn dispatch(store: &SessionStore, msg: &InboundMessage) -> Decision {
    let decision = store.with_session(|session| {
        let intent = classify(session, msg);
        apply(session, intent, msg)
    });
    // The message body is deliberately absent: it may be a password.
    debug!(
        peer_id = %msg.participant,
        command = msg.command_name(),
        intent = %decision.intent,
        auth_attempt = ?decision.auth_attempt,
        replied = decision.reply.is_some(),
        "dispatched inbound message"
    );
    decision
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        porter_channels::{ChannelReplyTarget, ChannelType},
        porter_common::ParticipantId,
        rstest::rstest,
        secrecy::Secret,
    };

    const SECRET: &str = "hunter2-Correct";

    fn store() -> SessionStore {
        SessionStore::new(Secret::new(SECRET.to_string()))
    }

    fn active_store() -> SessionStore {
        let s = store();
        s.activate();
        s
    }

    fn pid(raw: &str) -> ParticipantId {
        raw.parse().unwrap()
    }

    fn msg_from(p: &ParticipantId, raw: &str) -> InboundMessage {
        InboundMessage::from_text(
            p.clone(),
            ChannelReplyTarget {
                channel_type: ChannelType::Telegram,
                account_id: "test".into(),
                chat_id: p.to_string(),
            },
            raw,
        )
    }

    /// Send `raw` as participant `p` and return the reply.
    fn send(s: &SessionStore, p: &ParticipantId, raw: &str) -> Option<&'static str> {
        let reply = dispatch(s, &msg_from(p, raw)).reply;
        assert!(
            !(s.is_pending(p) && s.is_authorized(p)),
            "pending and authorized overlap after {raw:?}"
        );
        reply
    }

    #[test]
    fn scenario_activate_then_greet() {
        let s = store();
        let p = pid("100");
        let reply = send(&s, &p, "/startbot").unwrap();
        assert!(reply.contains("active"));
        assert_eq!(send(&s, &p, "hi"), Some(catalog::reply_for("hi")));
    }

    #[test]
    fn scenario_authorize_and_open_services() {
        let s = active_store();
        let p = pid("100");
        assert_eq!(
            send(&s, &p, "/services"),
            Some(replies::AUTHORIZATION_REQUIRED)
        );
        assert_eq!(send(&s, &p, "/auth"), Some(replies::ENTER_PASSWORD));
        assert_eq!(send(&s, &p, SECRET), Some(replies::ACCESS_GRANTED));
        assert_eq!(send(&s, &p, "/services"), Some(replies::SERVICES_MENU));
        assert!(s.is_authorized(&p));
    }

    #[test]
    fn scenario_wrong_passwords_never_lock_out() {
        let s = active_store();
        let p = pid("100");
        send(&s, &p, "/auth");
        for _ in 0..2 {
            assert_eq!(send(&s, &p, "guess"), Some(replies::INCORRECT_PASSWORD));
            assert!(s.is_pending(&p));
        }
        assert_eq!(send(&s, &p, SECRET), Some(replies::ACCESS_GRANTED));
    }

    #[test]
    fn scenario_stop_silences_chat() {
        let s = active_store();
        let p = pid("100");
        assert_eq!(send(&s, &p, "/stopbot"), Some(replies::DEACTIVATED));
        assert_eq!(send(&s, &p, "hello"), None);
    }

    #[test]
    fn pending_prompt_consumes_catalog_keys() {
        let s = active_store();
        let p = pid("100");
        send(&s, &p, "/auth");
        let decision = dispatch(&s, &msg_from(&p, "hi"));
        assert_eq!(decision.intent, Intent::PasswordAttempt);
        assert_eq!(decision.reply, Some(replies::INCORRECT_PASSWORD));
        assert_eq!(decision.auth_attempt, Some(AuthAttempt::Rejected));
    }

    #[test]
    fn password_is_compared_after_trimming() {
        let s = active_store();
        let p = pid("100");
        send(&s, &p, "/auth");
        assert_eq!(
            send(&s, &p, &format!("  {SECRET}\n")),
            Some(replies::ACCESS_GRANTED)
        );
    }

    #[test]
    fn start_twice_matches_start_once() {
        let s = store();
        let p = pid("100");
        assert_eq!(send(&s, &p, "/startbot"), Some(replies::ACTIVATED));
        let after_first = s.snapshot();
        assert_eq!(send(&s, &p, "/startbot"), Some(replies::ACTIVATED));
        assert_eq!(s.snapshot(), after_first);
    }

    #[rstest]
    #[case("hello")]
    #[case("hi")]
    #[case("/auth")]
    #[case("/services")]
    #[case("/unknown")]
    #[case("some password")]
    fn inactive_bot_is_silent(#[case] raw: &str) {
        let s = store();
        let p = pid("100");
        let before = s.snapshot();
        let decision = dispatch(&s, &msg_from(&p, raw));
        assert_eq!(decision.intent, Intent::Unrouted);
        assert_eq!(decision.reply, None);
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn inactive_bot_ignores_password_of_pending_participant() {
        let s = active_store();
        let p = pid("100");
        send(&s, &p, "/auth");
        send(&s, &p, "/stopbot");
        assert_eq!(send(&s, &p, SECRET), None);
        assert!(s.is_pending(&p));
        assert!(!s.is_authorized(&p));
    }

    #[test]
    fn stopbot_replies_even_when_inactive() {
        let s = store();
        assert_eq!(send(&s, &pid("1"), "/stopbot"), Some(replies::DEACTIVATED));
        assert!(!s.is_active());
    }

    #[test]
    fn unknown_command_is_unrouted_while_active() {
        let s = active_store();
        let decision = dispatch(&s, &msg_from(&pid("1"), "/start"));
        assert_eq!(decision.intent, Intent::Unrouted);
        assert_eq!(decision.reply, None);
    }

    #[test]
    fn commands_while_pending_are_not_password_attempts() {
        let s = active_store();
        let p = pid("100");
        send(&s, &p, "/auth");
        assert_eq!(
            send(&s, &p, "/services"),
            Some(replies::AUTHORIZATION_REQUIRED)
        );
        assert_eq!(send(&s, &p, "/auth"), Some(replies::ENTER_PASSWORD));
        assert!(s.is_pending(&p));
    }

    #[test]
    fn auth_after_access_reports_already_authorized() {
        let s = active_store();
        let p = pid("100");
        send(&s, &p, "/auth");
        send(&s, &p, SECRET);
        assert_eq!(send(&s, &p, "/auth"), Some(replies::ALREADY_AUTHORIZED));
        assert!(!s.is_pending(&p));
        // Chat goes back to the catalog once authorized.
        assert_eq!(send(&s, &p, "hi"), Some(catalog::reply_for("hi")));
    }

    #[test]
    fn authorization_survives_stop_and_start() {
        let s = active_store();
        let p = pid("100");
        send(&s, &p, "/auth");
        send(&s, &p, SECRET);
        send(&s, &p, "/stopbot");
        send(&s, &p, "/startbot");
        assert_eq!(send(&s, &p, "/services"), Some(replies::SERVICES_MENU));
    }

    #[test]
    fn authorization_is_per_participant() {
        let s = active_store();
        let (alice, bob) = (pid("1"), pid("2"));
        send(&s, &alice, "/auth");
        send(&s, &alice, SECRET);
        assert_eq!(
            send(&s, &bob, "/services"),
            Some(replies::AUTHORIZATION_REQUIRED)
        );
        // Bob is not pending, so the secret is just chat text to him.
        assert_eq!(send(&s, &bob, SECRET), Some(catalog::FALLBACK_REPLY));
    }

    #[test]
    fn unknown_text_gets_fallback() {
        let s = active_store();
        assert_eq!(
            send(&s, &pid("1"), "tell me a joke"),
            Some(catalog::FALLBACK_REPLY)
        );
    }

    #[test]
    fn stale_password_intent_falls_back_to_catalog() {
        let s = active_store();
        let p = pid("1");
        let decision =
            s.with_session(|session| apply(session, Intent::PasswordAttempt, &msg_from(&p, "hi")));
        assert_eq!(decision.auth_attempt, Some(AuthAttempt::NotPending));
        assert_eq!(decision.reply, Some(catalog::reply_for("hi")));
    }

    #[test]
    fn every_command_is_routable_when_active() {
        for (name, _) in commands::ALL {
            let s = active_store();
            let decision = dispatch(&s, &msg_from(&pid("9"), &format!("/{name}")));
            assert_ne!(decision.intent, Intent::Unrouted, "/{name}");
            assert!(decision.reply.is_some());
        }
    }
}
