// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the conversation engine and gateway.
//!
//! Each test creates an isolated EngineHarness with temp SQLite and mock
//! collaborators. Tests are independent and order-insensitive.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use solace_core::{ConversationStatus, ConversationStore, MessageRole, SolaceError};
use solace_engine::events::{ClientEvent, ServerEvent};
use solace_gateway::GatewayState;
use solace_test_utils::{EngineHarness, MockAnalysis};
use tokio_util::sync::CancellationToken;

// ---- Message pipeline happy path ----

#[tokio::test]
async fn pipeline_broadcasts_user_message_then_reply() {
    let harness = EngineHarness::builder()
        .with_replies(vec!["Hello from Solace".to_string()])
        .build()
        .await
        .unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();
    let mut conn = harness.connect(&identity);

    harness.join(&conn, &conversation.id).await;
    assert!(matches!(
        conn.recv().await.unwrap(),
        ServerEvent::JoinedConversation { conversation_id } if conversation_id == conversation.id
    ));

    harness.send_text(&conn, &conversation.id, "Hi").await;

    // Exact order: user message, typing on, typing off, reply.
    match conn.recv().await.unwrap() {
        ServerEvent::NewMessage { message } => {
            assert_eq!(message.role, MessageRole::User);
            assert_eq!(message.content, "Hi");
            assert!(message.sentiment.is_some(), "default mock sentiment attached");
        }
        other => panic!("expected user new-message, got {other:?}"),
    }
    assert!(matches!(
        conn.recv().await.unwrap(),
        ServerEvent::AiTyping { is_typing: true }
    ));
    assert!(matches!(
        conn.recv().await.unwrap(),
        ServerEvent::AiTyping { is_typing: false }
    ));
    match conn.recv().await.unwrap() {
        ServerEvent::NewMessage { message } => {
            assert_eq!(message.role, MessageRole::Assistant);
            assert_eq!(message.content, "Hello from Solace");
            let meta = message.reply_meta.expect("reply metadata attached");
            assert_eq!(meta.tone, "supportive");
        }
        other => panic!("expected reply new-message, got {other:?}"),
    }

    // Greeting + user + assistant persisted, in replay order.
    let messages = harness.store.list_messages(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, MessageRole::System);
    assert_eq!(messages[1].role, MessageRole::User);
    assert_eq!(messages[2].role, MessageRole::Assistant);
}

// ---- Ordering invariant under concurrent admission ----

#[tokio::test]
async fn broadcast_order_equals_admission_order_under_concurrent_sends() {
    let harness = EngineHarness::builder().echoing().build().await.unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();

    let sender = harness.connect(&identity);
    let mut observer = harness.connect(&identity); // second device
    harness.join(&sender, &conversation.id).await;
    harness.join(&observer, &conversation.id).await;
    assert!(matches!(
        observer.recv().await.unwrap(),
        ServerEvent::JoinedConversation { .. }
    ));

    // Admit five messages from concurrent tasks.
    let mut tasks = Vec::new();
    for i in 0..5 {
        let engine = harness.engine.clone();
        let connection_id = sender.id.clone();
        let conversation_id = conversation.id.clone();
        tasks.push(tokio::spawn(async move {
            engine
                .handle_event(
                    &connection_id,
                    ClientEvent::SendMessage {
                        conversation_id,
                        content: format!("message {i}"),
                        content_type: solace_core::ContentType::Text,
                        audio_url: None,
                    },
                )
                .await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Ten message events: strict user/reply alternation, each reply quoting
    // the user message admitted immediately before it. Message N's reply is
    // never broadcast after message N+1's user event.
    let mut events = Vec::new();
    for _ in 0..10 {
        events.push(observer.recv_new_message().await.unwrap());
    }

    let mut seen = std::collections::HashSet::new();
    for pair in events.chunks(2) {
        assert_eq!(pair[0].role, MessageRole::User);
        assert_eq!(pair[1].role, MessageRole::Assistant);
        assert_eq!(pair[1].content, format!("re: {}", pair[0].content));
        seen.insert(pair[0].content.clone());
    }
    assert_eq!(seen.len(), 5, "each admitted message broadcast exactly once");
}

// ---- Authorization ----

#[tokio::test]
async fn join_is_denied_for_foreign_and_missing_conversations() {
    let harness = EngineHarness::builder().build().await.unwrap();
    let alice = harness.create_user("alice").await.unwrap();
    let bob = harness.create_user("bob").await.unwrap();
    let conversation = harness.start_conversation(&alice).await.unwrap();

    let mut bob_conn = harness.connect(&bob);
    harness.join(&bob_conn, &conversation.id).await;
    let (code, _) = bob_conn.recv_error().await.unwrap();
    assert_eq!(code, "authorization-denied");
    assert!(
        harness.engine.registry().room_of(&bob_conn.id).is_none(),
        "denied join must not record membership"
    );

    harness.join(&bob_conn, "no-such-conversation").await;
    let (code, _) = bob_conn.recv_error().await.unwrap();
    assert_eq!(code, "not-found");
}

#[tokio::test]
async fn send_without_joining_the_room_is_denied() {
    let harness = EngineHarness::builder().build().await.unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();
    let mut conn = harness.connect(&identity);

    // No join-conversation first.
    harness.send_text(&conn, &conversation.id, "hello?").await;
    let (code, _) = conn.recv_error().await.unwrap();
    assert_eq!(code, "authorization-denied");

    // Nothing beyond the greeting was persisted.
    let messages = harness.store.list_messages(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 1);
}

// ---- Crisis escalation ----

#[tokio::test]
async fn crisis_flag_survives_generator_failure() {
    let harness = EngineHarness::builder().build().await.unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();

    let mut sender = harness.connect(&identity);
    let mut observer = harness.connect(&identity);
    harness.join(&sender, &conversation.id).await;
    harness.join(&observer, &conversation.id).await;
    sender.recv().await.unwrap(); // joined-conversation
    observer.recv().await.unwrap();

    harness.analysis.queue_crisis(MockAnalysis::crisis_assessment()).await;
    harness.responder.fail(true);

    harness
        .send_text(&sender, &conversation.id, "I don't want to be here anymore")
        .await;

    // The sender sees the persisted user message, then the distinct
    // generation failure.
    let message = sender.recv_new_message().await.unwrap();
    assert!(message.crisis.as_ref().is_some_and(|c| c.is_crisis));
    let (code, _) = sender.recv_error().await.unwrap();
    assert_eq!(code, "generation-failed");

    // The flag was committed before the generator ran and stays set.
    let flagged = harness
        .store
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(flagged.crisis);

    // No reply was persisted or broadcast.
    let messages = harness.store.list_messages(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 2, "greeting + user message only");
    assert!(observer.recv_new_message().await.is_some(), "user message fans out");
    assert!(matches!(
        observer.recv().await.unwrap(),
        ServerEvent::AiTyping { is_typing: true }
    ));
    assert!(matches!(
        observer.recv().await.unwrap(),
        ServerEvent::AiTyping { is_typing: false }
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        observer.try_recv().is_none(),
        "other members receive nothing for the failed reply"
    );
}

// ---- Degrade-gracefully analysis ----

#[tokio::test]
async fn sentiment_failure_degrades_without_losing_the_message() {
    let harness = EngineHarness::builder()
        .with_replies(vec!["Still here with you.".to_string()])
        .build()
        .await
        .unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();
    let mut conn = harness.connect(&identity);
    harness.join(&conn, &conversation.id).await;
    conn.recv().await.unwrap();

    harness.analysis.fail_sentiment(true);
    harness.send_text(&conn, &conversation.id, "rough week").await;

    let user_message = conn.recv_new_message().await.unwrap();
    assert_eq!(user_message.content, "rough week");
    assert!(user_message.sentiment.is_none(), "degraded, not rejected");

    let reply = conn.recv_new_message().await.unwrap();
    assert_eq!(reply.role, MessageRole::Assistant);

    let messages = harness.store.list_messages(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages[1].sentiment.is_none());
}

// ---- Admission control ----

#[tokio::test]
async fn message_rate_limit_denies_with_bounded_retry_hint() {
    let harness = EngineHarness::builder()
        .message_limit(2, 60)
        .build()
        .await
        .unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();
    let mut conn = harness.connect(&identity);
    harness.join(&conn, &conversation.id).await;
    conn.recv().await.unwrap();

    harness.send_text(&conn, &conversation.id, "one").await;
    harness.send_text(&conn, &conversation.id, "two").await;
    harness.send_text(&conn, &conversation.id, "three").await;

    let (code, retry_after) = conn.recv_error().await.unwrap();
    assert_eq!(code, "rate-limited");
    let retry_after = retry_after.expect("denial carries a retry-after hint");
    assert!(retry_after <= 60, "hint must be <= the window, got {retry_after}");

    // The denied message never reached the pipeline.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let messages = harness.store.list_messages(&conversation.id).await.unwrap();
    let user_messages: Vec<_> = messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .collect();
    assert_eq!(user_messages.len(), 2);
}

#[tokio::test]
async fn message_rate_limit_re_admits_after_the_window() {
    let harness = EngineHarness::builder()
        .message_limit(1, 1)
        .build()
        .await
        .unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();
    let mut conn = harness.connect(&identity);
    harness.join(&conn, &conversation.id).await;
    conn.recv().await.unwrap();

    harness.send_text(&conn, &conversation.id, "first").await;
    harness.send_text(&conn, &conversation.id, "denied").await;
    let (code, _) = conn.recv_error().await.unwrap();
    assert_eq!(code, "rate-limited");

    tokio::time::sleep(Duration::from_millis(1100)).await;
    harness.send_text(&conn, &conversation.id, "second").await;

    // Drain until the second user message shows up.
    let mut seen_second = false;
    for _ in 0..10 {
        match conn.recv().await {
            Some(ServerEvent::NewMessage { message })
                if message.role == MessageRole::User && message.content == "second" =>
            {
                seen_second = true;
                break;
            }
            Some(_) => continue,
            None => break,
        }
    }
    assert!(seen_second, "a fresh window admits again");
}

// ---- Conversation lifecycle ----

#[tokio::test]
async fn ended_conversation_rejects_subsequent_sends() {
    let harness = EngineHarness::builder().build().await.unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();
    let mut conn = harness.connect(&identity);
    harness.join(&conn, &conversation.id).await;
    conn.recv().await.unwrap();

    let ended = harness
        .engine
        .end_conversation(&identity, &conversation.id, Some("calmer"))
        .await
        .unwrap();
    assert_eq!(ended.status, ConversationStatus::Completed);
    assert_eq!(ended.mood_end.as_deref(), Some("calmer"));
    assert!(ended.summary.is_some());
    assert!(ended.ended_at.is_some());

    harness.send_text(&conn, &conversation.id, "still there?").await;
    let (code, _) = conn.recv_error().await.unwrap();
    assert_eq!(code, "authorization-denied");

    // Nothing persisted after the transition.
    let messages = harness.store.list_messages(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 1, "greeting only");
}

#[tokio::test]
async fn ending_a_foreign_conversation_is_denied() {
    let harness = EngineHarness::builder().build().await.unwrap();
    let alice = harness.create_user("alice").await.unwrap();
    let bob = harness.create_user("bob").await.unwrap();
    let conversation = harness.start_conversation(&alice).await.unwrap();

    let err = harness
        .engine
        .end_conversation(&bob, &conversation.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SolaceError::AuthorizationDenied(_)));
}

// ---- Cancellation / disconnect ----

#[tokio::test]
async fn disconnect_mid_pipeline_persists_without_broadcast_errors() {
    let harness = EngineHarness::builder()
        .with_replies(vec!["Take your time.".to_string()])
        .build()
        .await
        .unwrap();
    harness.responder.set_delay(Duration::from_millis(300)).await;

    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();

    let sender = harness.connect(&identity);
    let mut observer = harness.connect(&identity);
    harness.join(&sender, &conversation.id).await;
    harness.join(&observer, &conversation.id).await;
    observer.recv().await.unwrap();

    harness.send_text(&sender, &conversation.id, "are you there?").await;

    // Disconnect the sender while reply generation is still in flight.
    tokio::time::sleep(Duration::from_millis(100)).await;
    harness.engine.disconnect(&sender.id);
    drop(sender);

    // The in-flight message completes: both messages persist and the
    // remaining room member receives both events.
    let user_message = observer.recv_new_message().await.unwrap();
    assert_eq!(user_message.content, "are you there?");
    let reply = observer.recv_new_message().await.unwrap();
    assert_eq!(reply.content, "Take your time.");

    let messages = harness.store.list_messages(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 3);
}

// ---- Identity teardown ----

#[tokio::test]
async fn deactivated_identity_is_torn_down_on_send() {
    let harness = EngineHarness::builder().build().await.unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&identity).await.unwrap();
    let mut conn = harness.connect(&identity);
    harness.join(&conn, &conversation.id).await;
    conn.recv().await.unwrap();

    harness.store.set_user_active("alice", false).await.unwrap();
    harness.send_text(&conn, &conversation.id, "hello").await;

    let (code, _) = conn.recv_error().await.unwrap();
    assert_eq!(code, "authentication-failed");
    // The registry dropped the connection: the event channel closes.
    assert!(conn.recv().await.is_none());
    assert!(!harness.engine.registry().is_online("alice"));

    let messages = harness.store.list_messages(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 1, "nothing persisted for the rejected send");
}

// ---- Typing relay ----

#[tokio::test]
async fn typing_relays_to_other_members_only() {
    let harness = EngineHarness::builder().build().await.unwrap();
    let alice = harness.create_user("alice").await.unwrap();
    let conversation = harness.start_conversation(&alice).await.unwrap();

    let mut typist = harness.connect(&alice);
    let mut observer = harness.connect(&alice);
    harness.join(&typist, &conversation.id).await;
    harness.join(&observer, &conversation.id).await;
    typist.recv().await.unwrap();
    observer.recv().await.unwrap();

    harness
        .engine
        .handle_event(
            &typist.id,
            ClientEvent::Typing {
                conversation_id: conversation.id.clone(),
                is_typing: true,
            },
        )
        .await;

    match observer.recv().await.unwrap() {
        ServerEvent::UserTyping { user_id, is_typing } => {
            assert_eq!(user_id, "alice");
            assert!(is_typing);
        }
        other => panic!("expected user-typing, got {other:?}"),
    }
    assert!(typist.try_recv().is_none(), "typist gets no echo");
}

// ---- WebSocket gateway end-to-end ----

async fn next_ws_json(
    socket: &mut (impl futures::Stream<
        Item = Result<tokio_tungstenite::tungstenite::Message, tokio_tungstenite::tungstenite::Error>,
    > + Unpin),
) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for ws frame")
            .expect("socket closed")
            .expect("ws error");
        if let tokio_tungstenite::tungstenite::Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("server frames are JSON");
        }
    }
}

#[tokio::test]
async fn websocket_gateway_end_to_end() {
    let harness = EngineHarness::builder()
        .with_replies(vec!["I hear you.".to_string()])
        .build()
        .await
        .unwrap();
    let identity = harness.create_user("alice").await.unwrap();
    harness.verifier.allow("tok-alice", "alice");
    let conversation = harness.start_conversation(&identity).await.unwrap();

    let state = GatewayState::new(harness.engine.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let server = tokio::spawn(solace_gateway::serve_with_listener(
        listener,
        state,
        cancel.clone(),
    ));

    // A failed handshake is rejected before the upgrade: the client sees an
    // HTTP error, not a half-open socket.
    let rejected = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?token=wrong")).await;
    assert!(rejected.is_err(), "bad credential must refuse the upgrade");

    let (mut socket, _response) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/ws?token=tok-alice"))
            .await
            .expect("valid credential upgrades");

    socket
        .send(tokio_tungstenite::tungstenite::Message::text(
            serde_json::json!({"type": "join-conversation", "conversationId": conversation.id})
                .to_string(),
        ))
        .await
        .unwrap();
    let joined = next_ws_json(&mut socket).await;
    assert_eq!(joined["type"], "joined-conversation");
    assert_eq!(joined["conversationId"], conversation.id.as_str());

    socket
        .send(tokio_tungstenite::tungstenite::Message::text(
            serde_json::json!({
                "type": "send-message",
                "conversationId": conversation.id,
                "content": "Hi from the wire"
            })
            .to_string(),
        ))
        .await
        .unwrap();

    let user_event = next_ws_json(&mut socket).await;
    assert_eq!(user_event["type"], "new-message");
    assert_eq!(user_event["message"]["content"], "Hi from the wire");
    assert_eq!(user_event["message"]["role"], "user");

    let typing_on = next_ws_json(&mut socket).await;
    assert_eq!(typing_on["type"], "ai-typing");
    assert_eq!(typing_on["isTyping"], true);

    let typing_off = next_ws_json(&mut socket).await;
    assert_eq!(typing_off["type"], "ai-typing");
    assert_eq!(typing_off["isTyping"], false);

    let reply_event = next_ws_json(&mut socket).await;
    assert_eq!(reply_event["type"], "new-message");
    assert_eq!(reply_event["message"]["role"], "assistant");
    assert_eq!(reply_event["message"]["content"], "I hear you.");

    socket
        .close(None)
        .await
        .expect("clean close");
    cancel.cancel();
    let _ = server.await;
}
