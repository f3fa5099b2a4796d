use thiserror::Error;
use tracing::{info, warn};

use super::assemble::{assemble, ExcerptPolicy};
use super::conversation_state::{ConversationState, Message};
use super::ingest::{FormatRegistry, Upload};
use crate::openai_client::CompletionBackend;

/// Prefix of the assistant turn stored when the completion call fails.
pub const API_ERROR_TAG: &str = "[API error]";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter a message or attach a file.")]
    Empty,
}

/// One user's conversation with the assistant.
///
/// Owns its history; nothing is shared between sessions. Each call to
/// [`ChatSession::send`] runs a whole turn before returning, so a session never
/// has more than one request in flight.
pub struct ChatSession {
    conversation: ConversationState,
    backend: Box<dyn CompletionBackend>,
    formats: FormatRegistry,
    system_prompt: String,
    excerpt: ExcerptPolicy,
}

impl ChatSession {
    pub fn new(
        backend: Box<dyn CompletionBackend>,
        system_prompt: impl Into<String>,
        excerpt: ExcerptPolicy,
    ) -> Self {
        Self {
            conversation: ConversationState::new(),
            backend,
            formats: FormatRegistry::default(),
            system_prompt: system_prompt.into(),
            excerpt,
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Drop the history and start over with an empty one.
    pub fn reset(&mut self) {
        self.conversation = ConversationState::new();
    }

    /// Run one turn and return the assistant's reply.
    ///
    /// Once the user turn is stored an assistant turn always follows it: a
    /// failed completion is stored as an `[API error] ...` reply.
    pub async fn send(
        &mut self,
        user_text: &str,
        upload: Option<&Upload>,
    ) -> Result<Message, InputError> {
        if user_text.trim().is_empty() && upload.is_none() {
            return Err(InputError::Empty);
        }

        let excerpt = upload.map(|upload| self.formats.extract_or_placeholder(upload));
        let content = assemble(user_text, excerpt.as_deref(), self.excerpt);
        self.conversation.append(Message::user(content));

        info!(turn = self.conversation.len() / 2 + 1, "Requesting completion");
        let history = self.conversation.snapshot();
        let reply = match self.backend.complete(&self.system_prompt, &history).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Completion failed");
                format!("{} {}", API_ERROR_TAG, e)
            }
        };

        let reply = Message::assistant(reply);
        self.conversation.append(reply.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::cli::chat::assemble::EXCERPT_SEPARATOR;
    use crate::cli::chat::conversation_state::Role;
    use crate::config::Settings;
    use crate::openai_client::{CompletionError, OpenAiClient};

    /// Records every request and answers with a fixed reply.
    #[derive(Clone, Default)]
    struct Recorder {
        requests: Arc<Mutex<Vec<(String, Vec<Message>)>>>,
    }

    #[async_trait]
    impl CompletionBackend for Recorder {
        async fn complete(
            &self,
            system_prompt: &str,
            history: &[Message],
        ) -> Result<String, CompletionError> {
            self.requests
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), history.to_vec()));
            Ok("EOQ balances ordering and holding costs.".to_string())
        }
    }

    struct Unauthorized;

    #[async_trait]
    impl CompletionBackend for Unauthorized {
        async fn complete(&self, _: &str, _: &[Message]) -> Result<String, CompletionError> {
            Err(CompletionError::Api {
                status: 401,
                body: "invalid key".to_string(),
            })
        }
    }

    fn session(backend: impl CompletionBackend + 'static) -> ChatSession {
        ChatSession::new(Box::new(backend), "You are VERTEX.", ExcerptPolicy::default())
    }

    #[tokio::test]
    async fn test_plain_question_is_stored_verbatim() {
        let recorder = Recorder::default();
        let mut chat = session(recorder.clone());

        chat.send("What is EOQ?", None).await.unwrap();

        let history = chat.conversation().snapshot();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], Message::user("What is EOQ?"));
        assert_eq!(history[1].role(), Role::Assistant);

        let requests = recorder.requests.lock().unwrap();
        assert_eq!(requests[0].0, "You are VERTEX.");
        assert_eq!(requests[0].1, vec![Message::user("What is EOQ?")]);
    }

    #[tokio::test]
    async fn test_empty_input_without_file_is_rejected() {
        let recorder = Recorder::default();
        let mut chat = session(recorder.clone());

        let err = chat.send("   ", None).await.unwrap_err();

        assert_eq!(err, InputError::Empty);
        assert!(chat.conversation().is_empty());
        assert!(recorder.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_without_text_is_accepted() {
        let mut chat = session(Recorder::default());
        let upload = Upload::new("stock.txt", b"SKU,Qty\n1,5".to_vec());

        chat.send("", Some(&upload)).await.unwrap();

        let history = chat.conversation().snapshot();
        assert_eq!(
            history[0].content(),
            format!("{}SKU,Qty\n1,5", EXCERPT_SEPARATOR)
        );
    }

    #[tokio::test]
    async fn test_long_file_is_cut_to_thirty_thousand_chars() {
        let mut chat = session(Recorder::default());
        let upload = Upload::new("big.txt", "A".repeat(50_000).into_bytes());

        chat.send("Summarize", Some(&upload)).await.unwrap();

        let history = chat.conversation().snapshot();
        let excerpt = history[0]
            .content()
            .strip_prefix("Summarize")
            .and_then(|rest| rest.strip_prefix(EXCERPT_SEPARATOR))
            .unwrap();
        assert_eq!(excerpt, "A".repeat(30_000));
    }

    #[tokio::test]
    async fn test_unreadable_file_degrades_to_placeholder() {
        let mut chat = session(Recorder::default());
        let upload = Upload::new("broken.pdf", b"not a pdf".to_vec());

        chat.send("Read this", Some(&upload)).await.unwrap();

        let history = chat.conversation().snapshot();
        assert!(history[0]
            .content()
            .starts_with(&format!("Read this{}[Error while reading file:", EXCERPT_SEPARATOR)));
    }

    #[tokio::test]
    async fn test_api_failure_becomes_assistant_turn() {
        let mut chat = session(Unauthorized);

        let reply = chat.send("What is EOQ?", None).await.unwrap();

        assert_eq!(reply.role(), Role::Assistant);
        assert_eq!(reply.content(), "[API error] Error code: 401 - invalid key");
        assert_eq!(chat.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_network_failure_becomes_assistant_turn() {
        let mut settings = Settings::new("test-key");
        settings.base_url = "http://127.0.0.1:9/v1".to_string();
        let client = OpenAiClient::new(&settings).unwrap();
        let mut chat = session(client);

        let reply = chat.send("What is EOQ?", None).await.unwrap();

        assert!(reply.content().starts_with(API_ERROR_TAG));
        assert!(reply.content().len() > API_ERROR_TAG.len());
        assert_eq!(chat.conversation().snapshot().last(), Some(&reply));
    }

    #[tokio::test]
    async fn test_every_turn_resends_full_history() {
        let recorder = Recorder::default();
        let mut chat = session(recorder.clone());

        chat.send("first", None).await.unwrap();
        chat.send("second", None).await.unwrap();

        let requests = recorder.requests.lock().unwrap();
        assert_eq!(requests[0].1.len(), 1);
        assert_eq!(requests[1].1.len(), 3);
        assert_eq!(requests[1].1[0], Message::user("first"));
        assert_eq!(requests[1].1[2], Message::user("second"));
    }

    #[tokio::test]
    async fn test_reset_starts_empty() {
        let mut chat = session(Recorder::default());
        chat.send("first", None).await.unwrap();

        chat.reset();

        assert!(chat.conversation().is_empty());
    }
}
