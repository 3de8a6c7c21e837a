use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use rafiki::{ChatRole, Palette, QUICK_ACTIONS};
use crate::app::{App, BackendStatus, InputMode};

const PANEL_MAX_WIDTH: u16 = 64;
const PANEL_MAX_HEIGHT: u16 = 32;
const LAUNCHER_WIDTH: u16 = 14;
const LAUNCHER_HEIGHT: u16 = 3;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(len) = after.find("**") else {
            break;
        };
        if start > 0 {
            spans.push(Span::styled(rest[..start].to_string(), base));
        }
        if len > 0 {
            spans.push(Span::styled(after[..len].to_string(), base.add_modifier(Modifier::BOLD)));
        }
        rest = &after[len + 2..];
    }

    // Anything left, including an unclosed `**`, is literal
    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), base));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = Palette::for_theme(app.controller.theme());

    frame.render_widget(Block::default().style(Style::default().bg(palette.background)), area);
    render_page(frame, area, &palette);

    if app.controller.is_open() {
        app.launcher_area = None;
        render_panel(app, frame, area, &palette);
    } else {
        app.chat_area = None;
        app.quick_action_areas.clear();
        render_launcher(app, frame, area, &palette);
    }
}

/// Host page behind the client
fn render_page(frame: &mut Frame, area: Rect, palette: &Palette) {
    let text = Text::from(vec![
        Line::default(),
        Line::from(Span::styled("MISSIONS OF HOPE INTERNATIONAL", Style::default().fg(palette.text).bold())),
        Line::from(Span::styled("IT Support", Style::default().fg(palette.accent).italic())),
        Line::default(),
        Line::from(Span::styled(
            "Rafiki can help you with portal access, IT policies, and general support questions.",
            Style::default().fg(palette.muted),
        )),
    ])
    .alignment(Alignment::Center);

    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), area);
}

/// Bottom-right corner rect of at most `width` x `height`
fn corner_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + area.width - width,
        y: area.y + area.height - height,
        width,
        height,
    }
}

fn render_launcher(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let rect = corner_rect(area, LAUNCHER_WIDTH, LAUNCHER_HEIGHT);
    app.launcher_area = Some(rect);

    let button = Paragraph::new(Line::from(" 💬 Rafiki ").bold())
        .alignment(Alignment::Center)
        .style(Style::default().bg(palette.accent).fg(palette.header_fg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(palette.accent)),
        );
    frame.render_widget(button, rect);
}

fn render_panel(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let panel = corner_rect(area, PANEL_MAX_WIDTH, PANEL_MAX_HEIGHT);
    frame.render_widget(Clear, panel);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.border))
        .style(Style::default().bg(palette.surface));
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    let has_turns = !app.controller.transcript().is_empty();
    let [header_area, chat_area, actions_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(if has_turns { 1 } else { 0 }),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(inner);

    app.quick_action_areas.clear();
    render_header(app, frame, header_area, palette);

    // Store chat area for mouse hit-testing and dimensions for scrolling
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height;
    app.chat_width = chat_area.width;

    if has_turns || app.controller.is_typing() {
        render_transcript(app, frame, chat_area, palette);
    } else {
        render_welcome(app, frame, chat_area, palette);
    }

    if has_turns {
        render_action_bar(app, frame, actions_area, palette);
    }
    render_input(app, frame, input_area, palette);
    render_footer(app, frame, footer_area, palette);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let (status_text, status_color) = match app.health {
        BackendStatus::Online { limited: false } => ("● Online", palette.accent),
        BackendStatus::Online { limited: true } => ("● Limited mode", palette.muted),
        BackendStatus::Offline => ("● Offline", palette.muted),
        BackendStatus::Unknown => ("", palette.muted),
    };

    let header_style = Style::default().bg(palette.header_bg).fg(palette.header_fg);
    let lines = vec![
        Line::from(vec![
            Span::styled(" Rafiki IT ", header_style.bold()),
            Span::styled(status_text, header_style.fg(status_color)),
        ]),
        Line::from(Span::styled(" Your friendly IT assistant", header_style.italic())),
    ];
    frame.render_widget(Paragraph::new(lines).style(header_style), area);

    // Theme toggle and close hints on the right
    let controls = Paragraph::new(Line::from(format!(
        "{} ^T  ✕ Esc ",
        app.controller.theme().toggle_icon()
    )))
    .alignment(Alignment::Right)
    .style(header_style);
    frame.render_widget(controls, Rect { height: 1, ..area });
}

fn render_welcome(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let intro = Text::from(vec![
        Line::default(),
        Line::from(Span::styled("Hello! I'm Rafiki", Style::default().fg(palette.text).bold())),
        Line::from(Span::styled(
            "Your friendly IT assistant. How can I help you today?",
            Style::default().fg(palette.muted),
        )),
        Line::default(),
    ])
    .alignment(Alignment::Center);

    let [intro_area, buttons_area] =
        Layout::vertical([Constraint::Length(4), Constraint::Min(0)]).areas(area);
    frame.render_widget(Paragraph::new(intro).wrap(Wrap { trim: true }), intro_area);

    for (index, action) in QUICK_ACTIONS.iter().enumerate() {
        let row_y = buttons_area.y + (index as u16) * 2;
        if row_y >= buttons_area.y + buttons_area.height {
            break;
        }
        let label = Line::from(format!(" {} ", action.button_text()));
        let width = (label.width() as u16).min(buttons_area.width);
        let rect = Rect {
            x: buttons_area.x + (buttons_area.width - width) / 2,
            y: row_y,
            width,
            height: 1,
        };
        render_quick_action_button(frame, rect, label, palette);
        app.quick_action_areas.push((rect, index));
    }
}

fn render_action_bar(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let mut x = area.x;
    let right = area.x + area.width;

    for (index, action) in QUICK_ACTIONS.iter().enumerate() {
        if x >= right {
            break;
        }
        let label = Line::from(format!(" F{} {} ", index + 1, action.label));
        let width = (label.width() as u16).min(right - x);
        let rect = Rect { x, y: area.y, width, height: 1 };
        render_quick_action_button(frame, rect, label, palette);
        app.quick_action_areas.push((rect, index));
        x += width + 1;
    }
}

fn render_quick_action_button(frame: &mut Frame, rect: Rect, label: Line<'static>, palette: &Palette) {
    let button = Paragraph::new(label)
        .style(Style::default().bg(palette.button_bg).fg(palette.button_fg));
    frame.render_widget(button, rect);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let mut lines: Vec<Line> = Vec::new();

    for turn in app.controller.transcript() {
        match turn.role {
            ChatRole::User => {
                lines.push(
                    Line::from(Span::styled("You", Style::default().fg(palette.muted).bold()))
                        .alignment(Alignment::Right),
                );
                for line in turn.content.lines() {
                    lines.push(
                        Line::from(Span::styled(
                            line.to_string(),
                            Style::default().fg(palette.user_bubble_fg),
                        ))
                        .alignment(Alignment::Right),
                    );
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Rafiki",
                    Style::default().fg(palette.accent).bold(),
                )));
                let base = Style::default().fg(palette.assistant_bubble_fg);
                for line in turn.content.lines() {
                    lines.push(parse_markdown_line(line, base));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.controller.is_typing() {
        lines.push(Line::from(Span::styled(
            "Rafiki",
            Style::default().fg(palette.accent).bold(),
        )));
        lines.push(typing_indicator(app.animation_frame, palette));
    }

    // Keep the tail pinned as the width changes
    app.scroll_chat_to_bottom();

    let chat = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

/// Three dots, the current one lit
fn typing_indicator(frame_index: u8, palette: &Palette) -> Line<'static> {
    let spans: Vec<Span<'static>> = (0..3u8)
        .map(|i| {
            let color = if i == frame_index { palette.accent } else { palette.muted };
            Span::styled("● ", Style::default().fg(color))
        })
        .collect();
    Line::from(spans)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let editing = app.input_mode == InputMode::Editing;
    let typing = app.controller.is_typing();

    let border_color = if editing && !typing { palette.accent } else { palette.border };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));

    let draft = app.controller.input();

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let content = if draft.is_empty() {
        Span::styled("Ask Rafiki about IT support...", Style::default().fg(palette.muted))
    } else {
        let visible: String = draft.chars().skip(scroll_offset).take(inner_width).collect();
        let fg = if typing { palette.muted } else { palette.text };
        Span::styled(visible, Style::default().fg(fg))
    };

    frame.render_widget(Paragraph::new(Line::from(content)).block(input_block), area);

    // Show cursor when editing
    if editing && !typing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    if let Some(notice) = &app.notice {
        let line = Line::from(Span::styled(format!(" {}", notice), Style::default().fg(palette.accent)));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let key_style = Style::default().bg(palette.button_bg).fg(palette.button_fg);
    let label_style = Style::default().fg(palette.muted);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" done ", label_style),
            Span::styled(" F1-3 ", key_style),
            Span::styled(" quick ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" +/- ", key_style),
            Span::styled(" rate ", label_style),
            Span::styled(" t ", key_style),
            Span::styled(" theme ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_markdown_becomes_bold_span() {
        let line = parse_markdown_line("Call **Extension 303** now", Style::default());
        let texts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts, ["Call ", "Extension 303", " now"]);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unclosed_markdown_stays_literal() {
        let line = parse_markdown_line("a **b", Style::default());
        let texts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts, ["a **b"]);
    }

    #[test]
    fn corner_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(corner_rect(area, 64, 32), area);
        assert_eq!(corner_rect(area, 14, 3), Rect::new(26, 7, 14, 3));
    }
}
