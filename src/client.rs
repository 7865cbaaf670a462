use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::config::Config;

// Body of POST {apiBaseUrl}/chat
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    pub celebrity_name: String,
}

#[derive(Deserialize, Debug)]
struct ChatReply {
    reply: String,
}

/// Every way a send can fail. Callers treat them all as one "send failed" outcome.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no API base URL configured")]
    MissingBaseUrl,
    #[error("failed to reach chat backend: {0}")]
    Network(#[source] reqwest::Error),
    #[error("chat backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed chat response: {0}")]
    MalformedBody(#[source] reqwest::Error),
}

/// The remote side of a conversation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one user message and returns the assistant's reply text.
    async fn chat(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

/// `ChatBackend` over HTTP. No auth headers, retries or timeout.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: Client,
    chat_url: Option<String>,
}

impl HttpChatClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            chat_url: config.chat_url(),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    async fn chat(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let url = self.chat_url.as_deref().ok_or(ChatError::MissingBaseUrl)?;
        debug!(?request, %url, "Sending chat request");

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(ChatError::Network)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Chat backend request failed");
            return Err(ChatError::Status { status, body });
        }

        let reply = response
            .json::<ChatReply>()
            .await
            .map_err(ChatError::MalformedBody)?;

        debug!(reply = ?reply.reply, "Received chat reply");
        Ok(reply.reply)
    }
}
