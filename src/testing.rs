//! Scripted backend for tests
//!
//! Lets the controller and the terminal surface be exercised without a
//! real server.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::backend::{
    BackendError, ChatBackend, ChatReply, ChatRequest, Feedback, FeedbackAck, HealthStatus,
};

/// Backend that answers from a queue and records every request
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ChatReply, BackendError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    feedback: Mutex<Vec<Feedback>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, response: &str) {
        lock(&self.replies).push_back(Ok(ChatReply {
            response: response.to_string(),
        }));
    }

    /// Queue an error
    pub fn queue_error(&self, error: BackendError) {
        lock(&self.replies).push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    pub fn recorded_feedback(&self) -> Vec<Feedback> {
        lock(&self.feedback).clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        lock(&self.requests).push(request.clone());
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Transport("no scripted reply queued".into())))
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus {
            status: "online".into(),
            service: "Rafiki IT Backend".into(),
            chatbot_mode: "builtin".into(),
        })
    }

    async fn send_feedback(&self, feedback: &Feedback) -> Result<FeedbackAck, BackendError> {
        lock(&self.feedback).push(feedback.clone());
        Ok(FeedbackAck {
            success: true,
            message: "Thank you for your feedback!".into(),
        })
    }
}
