use std::sync::Arc;

use {
    teloxide::types::{ChatKind, Message, PublicChatKind},
    tracing::{debug, warn},
};

use {
    porter_auto_reply::handle_inbound,
    porter_channels::{ChannelReplyTarget, ChannelType, InboundMessage},
    porter_common::{ChatType, ParticipantId},
};

#[cfg(feature = "metrics")]
use porter_metrics::{counter, telegram as tg_metrics};

use crate::state::AccountStateMap;

/// Handle a single inbound Telegram message (called from the polling loop).
pub async fn handle_message_direct(
    msg: Message,
    account_id: &str,
    accounts: &AccountStateMap,
) -> anyhow::Result<()> {
    #[cfg(feature = "metrics")]
    counter!(tg_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);

    let Some(text) = msg.text() else {
        debug!(account_id, "ignoring non-text message");
        return Ok(());
    };

    let (bot_username, outbound, sessions) = {
        let accts = accounts.read().unwrap_or_else(|e| e.into_inner());
        let Some(state) = accts.get(account_id) else {
            warn!(account_id, "handler: account not found in state map");
            return Ok(());
        };
        (
            state.bot_username.clone(),
            Arc::clone(&state.outbound),
            Arc::clone(&state.sessions),
        )
    };

    if addressed_to_other_bot(text, bot_username.as_deref()) {
        debug!(account_id, "ignoring command addressed to another bot");
        return Ok(());
    }

    let participant = participant_of(&msg);
    let chat_type = classify_chat(&msg);
    debug!(
        account_id,
        peer_id = %participant,
        chat_type = chat_type.as_str(),
        chat_id = msg.chat.id.0,
        "handling telegram message"
    );

    let reply_to = ChannelReplyTarget {
        channel_type: ChannelType::Telegram,
        account_id: account_id.to_string(),
        chat_id: msg.chat.id.0.to_string(),
    };
    let inbound = InboundMessage::from_text(participant, reply_to, text);
    let handled = handle_inbound(&sessions, outbound.as_ref(), &inbound).await;

    debug!(
        account_id,
        intent = %handled.decision.intent,
        delivery = ?handled.delivery,
        "telegram message handled"
    );
    Ok(())
}

/// The sender's user ID, falling back to the chat ID for anonymous posts.
fn participant_of(msg: &Message) -> ParticipantId {
    match msg.from.as_ref() {
        Some(user) => ParticipantId::from(user.id.0),
        None => ParticipantId::from(msg.chat.id.0),
    }
}

fn classify_chat(msg: &Message) -> ChatType {
    match msg.chat.kind {
        ChatKind::Private(_) => ChatType::Dm,
        ChatKind::Public(ref p) => match p.kind {
            PublicChatKind::Channel(_) => ChatType::Channel,
            _ => ChatType::Group,
        },
    }
}

/// True for `/command@name` where `name` is not this bot.
///
/// Group chats deliver every bot's commands to every bot.
fn addressed_to_other_bot(text: &str, bot_username: Option<&str>) -> bool {
    let Some(rest) = text.trim_start().strip_prefix('/') else {
        return false;
    };
    let head = rest.split_whitespace().next().unwrap_or_default();
    match (head.split_once('@'), bot_username) {
        (Some((_, target)), Some(me)) => !target.eq_ignore_ascii_case(me),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{
            collections::HashMap,
            sync::{Arc, Mutex},
        },
    };

    use {
        axum::{Json, Router, body::Bytes, extract::State, http::Uri, routing::post},
        porter_auto_reply::{
            SessionStore,
            catalog,
            dispatch::replies,
        },
        secrecy::Secret,
        serde::Deserialize,
        serde_json::{Value, json},
        tokio::sync::oneshot,
    };

    use crate::{
        outbound::TelegramOutbound,
        state::{AccountState, AccountStateMap},
    };

    const ACCOUNT_ID: &str = "test-account";
    const PASSWORD: &str = "open-sesame";

    #[derive(Debug, Clone, Deserialize)]
    struct SendMessageRequest {
        chat_id: i64,
        text: String,
    }

    #[derive(Clone)]
    struct MockTelegramApi {
        sent: Arc<Mutex<Vec<SendMessageRequest>>>,
    }

    async fn telegram_api_handler(
        State(state): State<MockTelegramApi>,
        uri: Uri,
        body: Bytes,
    ) -> Json<Value> {
        let method = uri.path().rsplit('/').next().unwrap_or_default();
        if method == "SendMessage" {
            if let Ok(req) = serde_json::from_slice::<SendMessageRequest>(&body) {
                let chat_id = req.chat_id;
                state.sent.lock().expect("lock sent").push(req);
                return Json(json!({
                    "ok": true,
                    "result": {
                        "message_id": 1,
                        "date": 0,
                        "chat": { "id": chat_id, "type": "private", "first_name": "Alice" },
                        "text": "ok"
                    }
                }));
            }
        }
        Json(json!({ "ok": true, "result": true }))
    }

    struct Harness {
        accounts: AccountStateMap,
        sent: Arc<Mutex<Vec<SendMessageRequest>>>,
        shutdown: Option<oneshot::Sender<()>>,
        server: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        async fn start() -> Self {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let app = Router::new()
                .route("/{*path}", post(telegram_api_handler))
                .with_state(MockTelegramApi {
                    sent: Arc::clone(&sent),
                });

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind test listener");
            let addr = listener.local_addr().expect("local addr");
            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
            let server = tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("serve mock telegram api");
            });

            let api_url = reqwest::Url::parse(&format!("http://{addr}/")).expect("parse api url");
            let bot = teloxide::Bot::new("test-token").set_api_url(api_url);

            let accounts: AccountStateMap = Arc::new(std::sync::RwLock::new(HashMap::new()));
            let outbound = Arc::new(TelegramOutbound {
                accounts: Arc::clone(&accounts),
            });
            accounts
                .write()
                .expect("accounts write lock")
                .insert(ACCOUNT_ID.to_string(), AccountState {
                    bot,
                    bot_username: Some("porter_bot".into()),
                    outbound,
                    sessions: Arc::new(SessionStore::new(Secret::new(PASSWORD.into()))),
                });

            Self {
                accounts,
                sent,
                shutdown: Some(shutdown_tx),
                server,
            }
        }

        async fn send(&self, user_id: u64, chat_id: i64, text: &str) {
            let msg = text_message(user_id, chat_id, text);
            handle_message_direct(msg, ACCOUNT_ID, &self.accounts)
                .await
                .expect("handle message");
        }

        fn sent_texts(&self) -> Vec<(i64, String)> {
            self.sent
                .lock()
                .expect("lock sent")
                .iter()
                .map(|r| (r.chat_id, r.text.clone()))
                .collect()
        }

        async fn stop(mut self) {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
            self.server.await.expect("join mock server");
        }
    }

    fn text_message(user_id: u64, chat_id: i64, text: &str) -> Message {
        serde_json::from_value(json!({
            "message_id": 1,
            "date": 1,
            "chat": { "id": chat_id, "type": "private", "first_name": "Alice" },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Alice",
                "username": "alice"
            },
            "text": text
        }))
        .expect("deserialize text message")
    }

    #[tokio::test]
    async fn inactive_bot_stays_silent_until_started() {
        let h = Harness::start().await;

        h.send(1001, 42, "hi").await;
        assert!(h.sent_texts().is_empty());

        h.send(1001, 42, "/startbot").await;
        h.send(1001, 42, "Hi").await;
        assert_eq!(h.sent_texts(), vec![
            (42, replies::ACTIVATED.to_string()),
            (42, catalog::reply_for("hi").to_string()),
        ]);

        h.stop().await;
    }

    #[tokio::test]
    async fn password_flow_over_telegram() {
        let h = Harness::start().await;

        h.send(1001, 42, "/startbot").await;
        h.send(1001, 42, "/services").await;
        h.send(1001, 42, "/auth").await;
        h.send(1001, 42, "wrong").await;
        h.send(1001, 42, "/auth").await;
        h.send(1001, 42, PASSWORD).await;
        h.send(1001, 42, "/services").await;

        let texts: Vec<String> = h.sent_texts().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec![
            replies::ACTIVATED,
            replies::AUTHORIZATION_REQUIRED,
            replies::ENTER_PASSWORD,
            replies::INCORRECT_PASSWORD,
            replies::ENTER_PASSWORD,
            replies::ACCESS_GRANTED,
            replies::SERVICES_MENU,
        ]);

        h.stop().await;
    }

    #[tokio::test]
    async fn authorization_is_per_user_but_activation_is_shared() {
        let h = Harness::start().await;

        h.send(1001, 42, "/startbot").await;
        h.send(1001, 42, "/auth").await;
        h.send(1001, 42, PASSWORD).await;
        h.send(2002, 77, "/services").await;

        let sent = h.sent_texts();
        assert_eq!(
            sent.last(),
            Some(&(77, replies::AUTHORIZATION_REQUIRED.to_string()))
        );

        h.stop().await;
    }

    #[tokio::test]
    async fn stopbot_silences_everyone() {
        let h = Harness::start().await;

        h.send(1001, 42, "/startbot").await;
        h.send(2002, 77, "/stopbot").await;
        h.send(1001, 42, "hello").await;

        assert_eq!(h.sent_texts(), vec![
            (42, replies::ACTIVATED.to_string()),
            (77, replies::DEACTIVATED.to_string()),
        ]);

        h.stop().await;
    }

    #[tokio::test]
    async fn commands_for_other_bots_are_ignored() {
        let h = Harness::start().await;

        h.send(1001, -100, "/startbot@someone_else_bot").await;
        assert!(h.sent_texts().is_empty());

        h.send(1001, -100, "/startbot@porter_bot").await;
        assert_eq!(h.sent_texts(), vec![(-100, replies::ACTIVATED.to_string())]);

        h.stop().await;
    }

    #[tokio::test]
    async fn non_text_messages_are_ignored() {
        let h = Harness::start().await;
        h.send(1001, 42, "/startbot").await;

        let sticker: Message = serde_json::from_value(json!({
            "message_id": 2,
            "date": 1,
            "chat": { "id": 42, "type": "private", "first_name": "Alice" },
            "from": { "id": 1001, "is_bot": false, "first_name": "Alice" },
            "location": { "latitude": 1.0, "longitude": 2.0 }
        }))
        .expect("deserialize location message");
        handle_message_direct(sticker, ACCOUNT_ID, &h.accounts)
            .await
            .expect("handle message");

        assert_eq!(h.sent_texts().len(), 1);
        h.stop().await;
    }

    #[test]
    fn participant_prefers_sender_id() {
        let msg = text_message(1001, 42, "hi");
        assert_eq!(participant_of(&msg).as_str(), "1001");
        assert_eq!(classify_chat(&msg), ChatType::Dm);
    }

    #[test]
    fn other_bot_detection() {
        assert!(addressed_to_other_bot("/auth@other_bot", Some("porter_bot")));
        assert!(!addressed_to_other_bot("/auth@Porter_Bot", Some("porter_bot")));
        assert!(!addressed_to_other_bot("/auth", Some("porter_bot")));
        assert!(!addressed_to_other_bot("mail me @ home", Some("porter_bot")));
        assert!(!addressed_to_other_bot("/auth@other_bot", None));
    }
}
