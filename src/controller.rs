//! Conversation controller
//!
//! Owns the session state (panel visibility, theme, draft input, transcript
//! and history) and runs the request/response cycle against a `ChatBackend`.
//!
//! The transcript is what the user sees; the history is what the backend is
//! sent. They are kept as two append-only logs because fallback turns must be
//! shown but never replayed to the backend. When the controller is `Idle`,
//! the history equals the transcript with fallback turns removed.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::{AbortHandle, JoinHandle};

use crate::backend::{BackendError, ChatBackend, ChatReply, ChatRequest, Feedback, FeedbackKind};
use crate::quick_actions::QuickAction;
use crate::state::{ChatRole, Turn, TurnLog};
use crate::store::PreferenceStore;
use crate::theme::{Theme, THEME_KEY};

/// Shown when the backend answered but not with a usable reply
pub const SERVER_REJECTED_FALLBACK: &str = "I'm having trouble connecting right now. Please try again in a moment, or contact the IT office directly if this persists. God bless!";

/// Shown when no response could be obtained at all
pub const TRANSPORT_FALLBACK: &str = "I couldn't reach the server. Please check your connection or contact the IT Department if this continues.";

/// Delay between opening the panel and focusing the input
pub const FOCUS_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a reply is already pending")]
    Busy,
}

/// How a submitted turn was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Replied,
    Rejected,
    Unreachable,
}

/// An in-flight chat request running on the tokio runtime.
///
/// Dropping it does not cancel the request; `abort` does.
pub struct PendingReply {
    handle: JoinHandle<Result<ChatReply, BackendError>>,
}

impl PendingReply {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }

    /// Wait for the request. A panicked or aborted task counts as a
    /// transport failure.
    pub async fn wait(self) -> Result<ChatReply, BackendError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(BackendError::Transport(format!("request task failed: {}", e))),
        }
    }
}

pub struct ConversationController {
    backend: Arc<dyn ChatBackend>,
    store: Box<dyn PreferenceStore>,

    transcript: TurnLog,
    history: TurnLog,
    phase: Phase,

    is_open: bool,
    input: String,
    theme: Theme,
    focus_due: Option<Instant>,
}

impl ConversationController {
    pub fn new(backend: Arc<dyn ChatBackend>, store: Box<dyn PreferenceStore>) -> Self {
        let theme = Theme::load(store.as_ref());
        tracing::debug!(theme = theme.as_str(), "restored theme preference");

        Self {
            backend,
            store,
            transcript: TurnLog::new(),
            history: TurnLog::new(),
            phase: Phase::Idle,
            is_open: false,
            input: String::new(),
            theme,
            focus_due: None,
        }
    }

    // Accessors
    pub fn transcript(&self) -> &TurnLog {
        &self.transcript
    }

    pub fn history(&self) -> &TurnLog {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_typing(&self) -> bool {
        self.phase == Phase::AwaitingResponse
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn store(&self) -> &dyn PreferenceStore {
        self.store.as_ref()
    }

    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.backend)
    }

    // Panel visibility
    pub fn open(&mut self) {
        self.open_at(Instant::now());
    }

    pub fn open_at(&mut self, now: Instant) {
        if !self.is_open {
            self.is_open = true;
            self.focus_due = Some(now + FOCUS_DELAY);
        }
    }

    pub fn close(&mut self) {
        self.is_open = false;
        self.focus_due = None;
    }

    pub fn toggle_open(&mut self) {
        if self.is_open {
            self.close();
        } else {
            self.open();
        }
    }

    /// True once, when the post-open focus delay has elapsed.
    pub fn take_focus_request(&mut self, now: Instant) -> bool {
        match self.focus_due {
            Some(due) if self.is_open && now >= due => {
                self.focus_due = None;
                true
            }
            _ => false,
        }
    }

    // Theme
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        if let Err(e) = self.store.set(THEME_KEY, self.theme.as_str()) {
            tracing::warn!(error = %e, "could not persist theme preference");
        }
        self.theme
    }

    // Request lifecycle

    /// Synchronous half of a submission: validate, record the user turn in
    /// both logs and build the request payload.
    pub fn begin_submit(&mut self, text: &str) -> Result<ChatRequest, SubmitError> {
        let message = text.trim();
        if message.is_empty() {
            return Err(SubmitError::EmptyMessage);
        }
        if self.phase == Phase::AwaitingResponse {
            return Err(SubmitError::Busy);
        }

        let turn = Turn::user(message);
        self.transcript.push(turn.clone());
        self.input.clear();
        self.phase = Phase::AwaitingResponse;
        self.history.push(turn);

        Ok(ChatRequest {
            message: message.to_string(),
            history: self.history.to_vec(),
        })
    }

    /// Start a submission and run its request on the tokio runtime.
    pub fn dispatch(&mut self, text: &str) -> Result<PendingReply, SubmitError> {
        let request = self.begin_submit(text)?;
        let backend = Arc::clone(&self.backend);
        let handle = tokio::spawn(async move { backend.send(&request).await });
        Ok(PendingReply { handle })
    }

    /// Completion half of a submission. Returns `None` if nothing was in
    /// flight.
    pub fn settle(&mut self, result: Result<ChatReply, BackendError>) -> Option<Outcome> {
        if self.phase != Phase::AwaitingResponse {
            tracing::warn!("reply settled with no request in flight; ignoring");
            return None;
        }
        Some(self.apply_result(result))
    }

    fn apply_result(&mut self, result: Result<ChatReply, BackendError>) -> Outcome {
        let outcome = match result {
            Ok(reply) => {
                let turn = Turn::assistant(reply.response);
                self.transcript.push(turn.clone());
                self.history.push(turn);
                Outcome::Replied
            }
            Err(e) if e.is_transport() => {
                tracing::debug!(error = %e, "chat request failed before a response arrived");
                self.transcript.push(Turn::assistant(TRANSPORT_FALLBACK));
                Outcome::Unreachable
            }
            Err(e) => {
                tracing::warn!(error = %e, "backend did not return a usable reply");
                self.transcript.push(Turn::assistant(SERVER_REJECTED_FALLBACK));
                Outcome::Rejected
            }
        };
        self.phase = Phase::Idle;
        outcome
    }

    /// Submit `text` and wait for the reply.
    ///
    /// If this future is dropped before the reply arrives, the request is
    /// aborted and the turn settles as a transport failure, so the
    /// controller is back to `Idle` either way.
    pub async fn submit(&mut self, text: &str) -> Result<Outcome, SubmitError> {
        let pending = self.dispatch(text)?;
        let guard = SettleOnDrop {
            abort: pending.abort_handle(),
            controller: self,
        };
        let result = pending.wait().await;
        Ok(guard.controller.apply_result(result))
    }

    pub async fn select_quick_action(&mut self, action: &QuickAction) -> Result<Outcome, SubmitError> {
        self.submit(action.message).await
    }

    /// Feedback payload for the most recent assistant turn, if there is one.
    pub fn feedback_for_last_reply(&self, kind: FeedbackKind) -> Option<Feedback> {
        let (index, turn) = self
            .transcript
            .iter()
            .enumerate()
            .rev()
            .find(|(_, turn)| turn.role == ChatRole::Assistant)?;

        Some(Feedback {
            message_index: index,
            message_content: Some(turn.content.clone()),
            feedback_type: kind,
            feedback_reason: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Settles a `submit` whose future was dropped mid-request.
struct SettleOnDrop<'a> {
    controller: &'a mut ConversationController,
    abort: AbortHandle,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if self.controller.phase == Phase::AwaitingResponse {
            self.abort.abort();
            tracing::debug!("submit dropped while awaiting a reply");
            self.controller
                .apply_result(Err(BackendError::Transport("request abandoned".into())));
        }
    }
}
