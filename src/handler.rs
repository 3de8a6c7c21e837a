use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use rafiki::backend::FeedbackKind;
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.on_tick(),
    }
    app.poll_tasks().await;
    Ok(())
}

pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('t') => {
                app.controller.toggle_theme();
                return;
            }
            KeyCode::Char('o') => {
                app.toggle_panel();
                return;
            }
            _ => {}
        }
    }

    if !app.controller.is_open() {
        handle_launcher(app, key);
        return;
    }

    // Quick actions are always reachable while the panel is open
    if let KeyCode::F(n @ 1..=3) = key.code {
        app.run_quick_action((n - 1) as usize);
        return;
    }

    match key.code {
        KeyCode::PageUp => {
            let page = app.chat_height.max(2) / 2;
            app.scroll_up(page);
            return;
        }
        KeyCode::PageDown => {
            let page = app.chat_height.max(2) / 2;
            app.scroll_down(page);
            return;
        }
        _ => {}
    }

    match app.input_mode {
        InputMode::Normal => handle_panel_normal(app, key),
        InputMode::Editing => handle_panel_editing(app, key),
    }
}

fn handle_launcher(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char('o') | KeyCode::Char(' ') => app.toggle_panel(),
        KeyCode::Char('t') => {
            app.controller.toggle_theme();
        }
        KeyCode::Char('q') => app.should_quit = true,
        _ => {}
    }
}

fn handle_panel_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('x') => app.close_panel(),

        // Focus the input
        KeyCode::Char('i') | KeyCode::Enter | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.controller.input().chars().count();
        }

        KeyCode::Char('t') => {
            app.controller.toggle_theme();
        }
        KeyCode::Char(c @ '1'..='3') => {
            app.run_quick_action(c as usize - '1' as usize);
        }
        KeyCode::Char('+') => app.send_feedback(FeedbackKind::Positive),
        KeyCode::Char('-') => app.send_feedback(FeedbackKind::Negative),
        KeyCode::Char('r') => app.refresh_health(),

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('G') | KeyCode::End => {
            app.follow_tail = true;
            app.scroll_chat_to_bottom();
        }
        _ => {}
    }
}

fn handle_panel_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            return;
        }
        KeyCode::Enter => {
            app.submit_input();
            return;
        }
        _ => {}
    }

    // The input is disabled while a reply is pending
    if app.controller.is_typing() {
        return;
    }

    let cursor = app.input_cursor;
    let input = app.controller.input_mut();
    match key.code {
        KeyCode::Backspace => {
            if cursor > 0 {
                let byte_pos = char_to_byte_index(input, cursor - 1);
                input.remove(byte_pos);
                app.input_cursor -= 1;
            }
        }
        KeyCode::Delete => {
            if cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            app.input_cursor = (cursor + 1).min(input.chars().count());
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(input, cursor);
            input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if !app.controller.is_open() {
                if app.launcher_area.is_some_and(|r| point_in_rect(x, y, r)) {
                    app.toggle_panel();
                }
                return;
            }

            let clicked = app
                .quick_action_areas
                .iter()
                .find(|(rect, _)| point_in_rect(x, y, *rect))
                .map(|(_, index)| *index);
            if let Some(index) = clicked {
                app.run_quick_action(index);
            }
        }
        MouseEventKind::ScrollDown => {
            if app.chat_area.is_some_and(|r| point_in_rect(x, y, r)) {
                app.scroll_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if app.chat_area.is_some_and(|r| point_in_rect(x, y, r)) {
                app.scroll_up(3);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rafiki::testing::ScriptedBackend;
    use rafiki::theme::THEME_KEY;
    use rafiki::{ConversationController, MemoryStore, Theme};
    use std::sync::Arc;

    fn app() -> App {
        let controller = ConversationController::new(
            Arc::new(ScriptedBackend::new()),
            Box::new(MemoryStore::new()),
        );
        App::new(controller)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn utf8_cursor_editing() {
        let mut app = app();
        press(&mut app, KeyCode::Enter); // open
        press(&mut app, KeyCode::Char('i')); // focus
        type_text(&mut app, "héllo");
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.controller.input(), "hélo");
        press(&mut app, KeyCode::Home);
        press(&mut app, KeyCode::Delete);
        assert_eq!(app.controller.input(), "élo");
    }

    #[test]
    fn launcher_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.controller.theme(), Theme::Dark);
        assert_eq!(app.controller.store().get(THEME_KEY).as_deref(), Some("dark"));

        press(&mut app, KeyCode::Char('o'));
        assert!(app.controller.is_open());

        press(&mut app, KeyCode::Esc);
        assert!(!app.controller.is_open());
        assert!(!app.should_quit);

        // A second Esc lands on the launcher and must not exit
        press(&mut app, KeyCode::Esc);
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn ctrl_o_toggles_panel_from_any_mode() {
        let mut app = app();
        let ctrl_o = KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL);

        handle_key(&mut app, ctrl_o);
        assert!(app.controller.is_open());

        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.input_mode, InputMode::Editing);

        handle_key(&mut app, ctrl_o);
        assert!(!app.controller.is_open());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.controller.input(), "");
    }

    #[test]
    fn typing_while_closed_does_not_edit() {
        let mut app = app();
        type_text(&mut app, "abc");
        assert_eq!(app.controller.input(), "");
    }

    #[tokio::test]
    async fn enter_on_blank_draft_sends_nothing() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('i'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);

        assert!(app.pending.is_none());
        assert!(app.controller.transcript().is_empty());
    }

    #[tokio::test]
    async fn function_key_runs_quick_action() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::F(3));

        let first = app.controller.transcript().iter().next().unwrap();
        assert_eq!(first.content, "Show me the steps to apply for employee leave.");
        assert!(app.controller.is_typing());
    }
}
