use shared::{ChatMessage, ChatRequest, ChatResponse, ConversationId};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::Session;
use crate::transport::Transport;

/// Relays free-text messages to the assistant endpoint and keeps an
/// append-only transcript of the exchange.
#[derive(Debug, Clone, Default)]
pub struct ChatRelay {
    conversation_id: Option<ConversationId>,
    transcript: Vec<ChatMessage>,
}

impl ChatRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Records the user's message and builds the request for it. Blank input
    /// is ignored.
    pub fn begin_turn(&mut self, message: &str, session: &Session) -> Option<ChatRequest> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }
        self.transcript.push(ChatMessage::user(message));
        Some(ChatRequest {
            message: message.to_string(),
            conversation_id: self.conversation_id,
            user_id: session.user.id,
        })
    }

    /// The first reply of a session fixes the conversation; later replies
    /// never replace it.
    pub fn complete_turn(&mut self, response: ChatResponse) {
        if self.conversation_id.is_none() {
            tracing::debug!(conversation = response.conversation_id, "conversation established");
            self.conversation_id = Some(response.conversation_id);
        }
        self.transcript.push(ChatMessage::assistant(response.response));
    }

    /// One full turn. A failure is logged and the transcript keeps the user's
    /// message without a reply.
    pub async fn send<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        session: &Session,
        message: &str,
    ) -> Result<Option<&ChatMessage>, ApiError> {
        let Some(request) = self.begin_turn(message, session) else {
            return Ok(None);
        };
        match api.chat(&request).await {
            Ok(response) => {
                self.complete_turn(response);
                Ok(self.transcript.last())
            }
            Err(e) => {
                tracing::error!("Chat error: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{session, Scripted};

    #[tokio::test]
    async fn threads_one_conversation() {
        let api = ApiClient::new(
            Scripted::default()
                .reply(200, r#"{"conversation_id":12,"response":"Hello!"}"#)
                .reply(200, r#"{"conversation_id":99,"response":"Done."}"#),
        );
        let mut relay = ChatRelay::new();
        relay.send(&api, &session(), "hi").await.unwrap();
        relay.send(&api, &session(), "add task milk").await.unwrap();

        assert_eq!(relay.conversation_id(), Some(12));
        let sent = api.transport().sent.borrow();
        assert!(sent[0].body.as_deref().unwrap().contains(r#""conversation_id":null"#));
        assert!(sent[1].body.as_deref().unwrap().contains(r#""conversation_id":12"#));
        assert!(sent.iter().all(|r| r.bearer.is_none()));
        assert_eq!(
            relay.transcript(),
            &[
                ChatMessage::user("hi"),
                ChatMessage::assistant("Hello!"),
                ChatMessage::user("add task milk"),
                ChatMessage::assistant("Done."),
            ]
        );
    }

    #[tokio::test]
    async fn failure_leaves_only_the_user_message() {
        let api = ApiClient::new(Scripted::default().offline());
        let mut relay = ChatRelay::new();
        assert!(relay.send(&api, &session(), "anyone?").await.is_err());

        assert_eq!(relay.transcript(), &[ChatMessage::user("anyone?")]);
        assert_eq!(relay.conversation_id(), None);
    }

    #[tokio::test]
    async fn blank_message_is_not_sent() {
        let api = ApiClient::new(Scripted::default());
        let mut relay = ChatRelay::new();
        assert_eq!(relay.send(&api, &session(), "   ").await.unwrap(), None);
        assert!(api.transport().sent.borrow().is_empty());
    }
}
