use std::time::Instant;

use ratatui::layout::Rect;
use tokio::task::JoinHandle;

use rafiki::backend::{BackendError, FeedbackAck, FeedbackKind, HealthStatus};
use rafiki::{ConversationController, Outcome, PendingReply, QuickAction, SubmitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// What the header shows about the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Unknown,
    Online { limited: bool },
    Offline,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub controller: ConversationController,
    pub input_mode: InputMode,
    pub input_cursor: usize, // cursor position in the draft, in chars

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_tail: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for typing dots

    // Background work
    pub pending: Option<PendingReply>,
    pub health: BackendStatus,
    pub health_task: Option<JoinHandle<Result<HealthStatus, BackendError>>>,
    pub feedback_task: Option<JoinHandle<Result<FeedbackAck, BackendError>>>,
    pub notice: Option<String>,

    // Areas for mouse hit-testing (updated during render)
    pub launcher_area: Option<Rect>,
    pub chat_area: Option<Rect>,
    pub quick_action_areas: Vec<(Rect, usize)>,
}

impl App {
    pub fn new(controller: ConversationController) -> Self {
        Self {
            should_quit: false,
            controller,
            input_mode: InputMode::Normal,
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,

            animation_frame: 0,

            pending: None,
            health: BackendStatus::Unknown,
            health_task: None,
            feedback_task: None,
            notice: None,

            launcher_area: None,
            chat_area: None,
            quick_action_areas: Vec::new(),
        }
    }

    // Panel
    pub fn close_panel(&mut self) {
        self.controller.close();
        self.input_mode = InputMode::Normal;
    }

    pub fn toggle_panel(&mut self) {
        self.controller.toggle_open();
        if !self.controller.is_open() {
            self.input_mode = InputMode::Normal;
        }
    }

    // Submission

    /// Send the current draft. Refused quietly when empty or while a reply
    /// is pending; the draft is left untouched in that case.
    pub fn submit_input(&mut self) {
        let draft = self.controller.input().to_string();
        self.dispatch(&draft);
    }

    pub fn run_quick_action(&mut self, index: usize) {
        if let Some(action) = QuickAction::by_index(index) {
            tracing::info!(action = action.id, "quick action selected");
            self.dispatch(action.message);
        }
    }

    fn dispatch(&mut self, text: &str) {
        match self.controller.dispatch(text) {
            Ok(pending) => {
                self.pending = Some(pending);
                self.input_cursor = 0;
                self.notice = None;
                self.follow_tail = true;
                self.scroll_chat_to_bottom();
            }
            Err(SubmitError::EmptyMessage) => {}
            Err(SubmitError::Busy) => {
                tracing::debug!("submit ignored while a reply is pending");
            }
        }
    }

    /// Collect finished background work. Called after every event.
    pub async fn poll_tasks(&mut self) {
        if self.pending.as_ref().is_some_and(|p| p.is_finished()) {
            if let Some(pending) = self.pending.take() {
                let result = pending.wait().await;
                if let Some(outcome) = self.controller.settle(result) {
                    if outcome != Outcome::Replied {
                        self.health = BackendStatus::Unknown;
                    }
                }
                self.scroll_chat_to_bottom();
            }
        }

        if self.health_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.health_task.take() {
                self.health = match task.await {
                    Ok(Ok(status)) if status.is_online() => BackendStatus::Online {
                        limited: status.is_limited(),
                    },
                    Ok(Ok(_)) => BackendStatus::Offline,
                    Ok(Err(e)) => {
                        tracing::debug!(error = %e, "health check failed");
                        BackendStatus::Offline
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "health check task failed");
                        BackendStatus::Offline
                    }
                };
            }
        }

        if self.feedback_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.feedback_task.take() {
                self.notice = Some(match task.await {
                    Ok(Ok(ack)) => ack.message,
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "feedback was not delivered");
                        "Feedback could not be sent".to_string()
                    }
                    Err(_) => "Feedback could not be sent".to_string(),
                });
            }
        }
    }

    pub fn refresh_health(&mut self) {
        if self.health_task.is_some() {
            return;
        }
        let backend = self.controller.backend();
        self.health_task = Some(tokio::spawn(async move { backend.health().await }));
    }

    pub fn send_feedback(&mut self, kind: FeedbackKind) {
        if self.feedback_task.is_some() {
            return;
        }
        let Some(feedback) = self.controller.feedback_for_last_reply(kind) else {
            return;
        };
        let backend = self.controller.backend();
        self.feedback_task = Some(tokio::spawn(async move { backend.send_feedback(&feedback).await }));
    }

    /// Tick: animation and the delayed input focus after opening
    pub fn on_tick(&mut self) {
        self.on_tick_at(Instant::now());
    }

    pub fn on_tick_at(&mut self, now: Instant) {
        if self.controller.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.controller.take_focus_request(now) {
            self.input_mode = InputMode::Editing;
            self.input_cursor = self.controller.input().chars().count();
        }
    }

    // Scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_chat_lines().saturating_sub(self.visible_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        if self.chat_scroll == max {
            self.follow_tail = true;
        }
    }

    /// Scroll chat to bottom so the newest turn (or typing dots) is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        if !self.follow_tail {
            return;
        }
        self.chat_scroll = self.total_chat_lines().saturating_sub(self.visible_height());
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rendered line count of the transcript at the current width
    pub fn total_chat_lines(&self) -> u16 {
        let transcript = self.controller.transcript();
        if transcript.is_empty() && !self.controller.is_typing() {
            return 0;
        }

        // Bubbles are indented by two columns on one side
        let wrap_width = if self.chat_width > 2 {
            (self.chat_width - 2) as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for turn in transcript {
            total_lines += 1; // Speaker line
            for line in turn.content.lines() {
                let char_count = line.chars().count();
                total_lines += char_count / wrap_width + 1;
            }
            total_lines += 1; // Blank line after bubble
        }

        if self.controller.is_typing() {
            total_lines += 2; // Speaker line + dots
        }

        // Scroll offsets are u16 in ratatui; clamp rather than wrap
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rafiki::testing::ScriptedBackend;
    use rafiki::controller::FOCUS_DELAY;
    use rafiki::{ChatRole, MemoryStore};
    use std::sync::Arc;

    fn app_with(backend: Arc<ScriptedBackend>) -> App {
        App::new(ConversationController::new(backend, Box::new(MemoryStore::new())))
    }

    async fn settle_pending(app: &mut App) {
        while app.pending.as_ref().is_some_and(|p| !p.is_finished()) {
            tokio::task::yield_now().await;
        }
        app.poll_tasks().await;
    }

    #[tokio::test]
    async fn submit_input_round_trip() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.queue_reply("Pangani Head Office, ext 303");
        let mut app = app_with(backend.clone());

        app.controller.input_mut().push_str("  where is IT?  ");
        app.submit_input();
        assert!(app.controller.is_typing());
        assert_eq!(app.controller.input(), "");

        settle_pending(&mut app).await;
        assert!(!app.controller.is_typing());
        let last = app.controller.transcript().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, "Pangani Head Office, ext 303");
        assert_eq!(backend.recorded_requests()[0].message, "where is IT?");
    }

    #[tokio::test]
    async fn busy_submit_keeps_draft() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut app = app_with(backend);

        app.run_quick_action(0);
        app.controller.input_mut().push_str("second question");
        app.submit_input();

        assert_eq!(app.controller.input(), "second question");
        assert_eq!(app.controller.transcript().len(), 1);
        settle_pending(&mut app).await;
    }

    #[tokio::test]
    async fn focus_arrives_after_delay() {
        let mut app = app_with(Arc::new(ScriptedBackend::new()));
        let t0 = Instant::now();
        app.controller.open_at(t0);

        app.on_tick_at(t0);
        assert_eq!(app.input_mode, InputMode::Normal);
        app.on_tick_at(t0 + FOCUS_DELAY);
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn feedback_is_sent_for_last_reply() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.queue_reply("Try resetting via IT");
        let mut app = app_with(backend.clone());

        app.run_quick_action(1);
        settle_pending(&mut app).await;

        app.send_feedback(FeedbackKind::Positive);
        while app.feedback_task.as_ref().is_some_and(|t| !t.is_finished()) {
            tokio::task::yield_now().await;
        }
        app.poll_tasks().await;

        assert_eq!(app.notice.as_deref(), Some("Thank you for your feedback!"));
        let sent = backend.recorded_feedback();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_index, 1);
    }

    #[tokio::test]
    async fn long_replies_are_counted_without_wrapping() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut app = app_with(backend.clone());
        app.chat_width = 62; // wraps at 60
        app.chat_height = 20;

        backend.queue_reply(&"x".repeat(60 * 1000));
        app.controller.submit("question").await.unwrap();
        // user: speaker + 1 + blank, assistant: speaker + 1001 + blank
        assert_eq!(app.total_chat_lines(), 1006);

        backend.queue_reply(&"x".repeat(60 * 70_000));
        app.controller.submit("question").await.unwrap();
        assert_eq!(app.total_chat_lines(), u16::MAX);

        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 20);
        app.scroll_down(10);
        assert_eq!(app.chat_scroll, u16::MAX - 20);
    }
}
