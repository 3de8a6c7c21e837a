//! Backend Client
//!
//! Talks to the Rafiki backend over HTTP. Every chat turn is one
//! `POST <base>/chat` carrying the full running history.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::state::Turn;

/// Body of `POST <base>/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<Turn>,
}

/// Successful reply from `POST <base>/chat`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Reply from `GET <base>/health`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub chatbot_mode: String,
}

impl HealthStatus {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }

    /// The backend answers from canned responses instead of the AI service
    pub fn is_limited(&self) -> bool {
        self.chatbot_mode == "builtin"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Positive,
    Negative,
}

/// Body of `POST <base>/feedback`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub message_index: usize,
    pub message_content: Option<String>,
    pub feedback_type: FeedbackKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_reason: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedbackAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum BackendError {
    /// A response arrived but its status was not a success
    #[error("backend rejected the request with status {status}")]
    Rejected { status: u16 },
    /// A success response arrived but its body was unusable
    #[error("backend reply was malformed: {0}")]
    Malformed(String),
    /// No response was obtained at all
    #[error("could not reach backend: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }

    fn transport(err: reqwest::Error) -> Self {
        // reqwest's Display hides the cause (DNS, refused, ...)
        let mut detail = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        BackendError::Transport(detail)
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one chat turn and wait for the assistant's reply
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, BackendError>;

    async fn health(&self) -> Result<HealthStatus, BackendError>;

    async fn send_feedback(&self, feedback: &Feedback) -> Result<FeedbackAck, BackendError>;
}

#[derive(Clone)]
pub struct RafikiClient {
    client: Client,
    base_url: String,
}

impl RafikiClient {
    /// An empty base URL is allowed; paths are then used as given.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Rejected { status: status.as_u16() });
        }

        // The response exists, so a failed body read is the server's fault too
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Malformed(format!("reading body: {}", e)))?;

        serde_json::from_slice(&body).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for RafikiClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        let url = self.endpoint("chat");
        tracing::debug!(%url, history_len = request.history.len(), "sending chat turn");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(BackendError::transport)?;

        Self::read_json(response).await
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(BackendError::transport)?;

        Self::read_json(response).await
    }

    async fn send_feedback(&self, feedback: &Feedback) -> Result<FeedbackAck, BackendError> {
        let response = self
            .client
            .post(self.endpoint("feedback"))
            .json(feedback)
            .send()
            .await
            .map_err(BackendError::transport)?;

        Self::read_json(response).await
    }
}
