mod common;

use client::chat::ChatRelay;
use client::{ApiClient, ReqwestTransport, Session};
use shared::{ChatMessage, User};

#[tokio::test]
async fn conversation_is_established_then_reused() {
    let api = common::api().await;
    let session = common::signed_in(&api, "ada").await;
    let mut relay = ChatRelay::new();

    relay.send(&api, &session, "add task buy milk").await.unwrap();
    let conversation = relay.conversation_id().expect("first reply sets the conversation");

    relay.send(&api, &session, "list tasks").await.unwrap();
    assert_eq!(relay.conversation_id(), Some(conversation));

    let transcript = relay.transcript();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[0], ChatMessage::user("add task buy milk"));
    assert!(!transcript[1].is_user());
    assert_eq!(transcript[2], ChatMessage::user("list tasks"));
    assert!(transcript[3].content().contains("buy milk"));

    let tasks = api.list_tasks(&session).await.unwrap();
    assert_eq!(tasks[0].title, "buy milk");
}

#[tokio::test]
async fn unreachable_assistant_leaves_turn_unanswered() {
    let api = ApiClient::new(ReqwestTransport::new("http://127.0.0.1:9"));
    let session = Session {
        token: String::new(),
        user: User {
            id: 1,
            username: "ghost".into(),
            email: "ghost@example.com".into(),
        },
    };
    let mut relay = ChatRelay::new();

    let err = relay.send(&api, &session, "hello?").await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(relay.transcript(), &[ChatMessage::user("hello?")]);
}
