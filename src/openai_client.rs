use std::iter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::cli::chat::conversation_state::Message;
use crate::config::{ConfigError, Settings};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Error code: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("The response did not contain a reply")]
    EmptyResponse,
}

/// A remote chat-completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send `[system_prompt] + history` and return the reply text.
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<&'a Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
///
/// One blocking request per call; no streaming, no retry, and the transport's
/// default timeout.
pub struct OpenAiClient {
    api_key: String,
    endpoint: Url,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: settings.api_key.clone(),
            endpoint: completions_endpoint(&settings.base_url)?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            client: reqwest::Client::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// `https://host/v1` and `https://host/v1/` both become
/// `https://host/v1/chat/completions`.
fn completions_endpoint(base_url: &str) -> Result<Url, ConfigError> {
    let invalid = |source| ConfigError::BaseUrl {
        url: base_url.to_string(),
        source,
    };

    let mut base = Url::parse(base_url).map_err(invalid)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("chat/completions").map_err(invalid)
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<String, CompletionError> {
        let system = Message::system(system_prompt);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: iter::once(&system).chain(history).collect(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            messages = request.messages.len(),
            chars = request.messages.iter().map(|m| m.content().len()).sum::<usize>(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("API request failed with status {}: {}", status, body);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatCompletionResponse = response.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}
