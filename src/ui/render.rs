use crate::format::{format_cost, format_date_time, format_duration, short_id};
use crate::settings::UiPreferences;
use crate::state::{Notification, NotificationLevel};
use crate::tool_preview::{preview_tool_input, ToolDetail};
use crate::transcript::{
    render_entry, ContentView, EntryKind, GroupKind, MessageGroup, ResultFormat,
    TranscriptEntry, REDACTED_NOTICE,
};
use crate::types::PermissionRequest;
use crate::ui::layout::centered_rect;
use crate::ui::metrics::{truncate_line, visual_line_count};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub text: Style,
    pub muted: Style,
    pub accent: Style,
    pub user: Style,
    pub code: Style,
    pub added: Style,
    pub removed: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            text: Style::default().fg(Color::White),
            muted: Style::default().fg(Color::DarkGray),
            accent: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            user: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            code: Style::default().fg(Color::Gray).bg(Color::Rgb(24, 24, 24)),
            added: Style::default().fg(Color::Green),
            removed: Style::default().fg(Color::Red),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        }
    }

    pub fn light() -> Self {
        Self {
            text: Style::default().fg(Color::Black),
            muted: Style::default().fg(Color::Gray),
            accent: Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            user: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            code: Style::default().fg(Color::Black).bg(Color::Rgb(235, 235, 235)),
            ..Self::dark()
        }
    }

    pub fn for_preferences(preferences: UiPreferences) -> Self {
        if preferences.dark_mode {
            Self::dark()
        } else {
            Self::light()
        }
    }

    fn level(&self, level: NotificationLevel) -> Style {
        match level {
            NotificationLevel::Success => self.success,
            NotificationLevel::Info => self.accent,
            NotificationLevel::Warning => self.warning,
            NotificationLevel::Error => self.error,
        }
    }
}

fn push_text(out: &mut Vec<Line<'static>>, indent: &str, text: &str, style: Style) {
    if text.is_empty() {
        out.push(Line::styled(indent.to_string(), style));
        return;
    }
    for line in text.lines() {
        out.push(Line::styled(format!("{indent}{line}"), style));
    }
}

fn entry_label(entry: &TranscriptEntry<'_>) -> String {
    match entry.kind {
        EntryKind::Event => entry.tag().replace('_', " "),
        kind => kind.label().to_string(),
    }
}

fn group_header_line(group: &MessageGroup<'_>, theme: &Theme) -> Line<'static> {
    let header = &group.header;
    let (title, style) = match header.kind {
        GroupKind::User => ("You", theme.user),
        GroupKind::Agent => ("Assistant", theme.accent),
    };
    let mut spans = vec![Span::styled(format!("▌ {title}"), style)];
    if let Some(cost) = header.total_cost {
        spans.push(Span::styled(format!(" · {}", format_cost(cost)), theme.muted));
    }
    if let Some(duration) = header.total_duration_ms {
        spans.push(Span::styled(
            format!(" · {}", format_duration(duration)),
            theme.muted,
        ));
    }
    spans.push(Span::styled(
        format!(" · {}", format_date_time(&header.latest_timestamp)),
        theme.muted,
    ));
    Line::from(spans)
}

/// Flattens grouped entries into styled lines. `expanded` shows collapsible
/// bodies in full.
pub fn transcript_lines(
    groups: &[MessageGroup<'_>],
    theme: &Theme,
    expanded: bool,
) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    for group in groups {
        out.push(group_header_line(group, theme));
        let labelled = group.entries.len() > 1;
        for entry in &group.entries {
            if labelled {
                out.push(Line::styled(
                    format!("{INDENT}{}", entry_label(entry)),
                    theme.muted.add_modifier(Modifier::ITALIC),
                ));
            }
            view_lines(&render_entry(entry), theme, expanded, INDENT, &mut out);
        }
        out.push(Line::from(""));
    }
    out
}

pub fn detail_lines(details: &[ToolDetail], theme: &Theme, indent: &str, out: &mut Vec<Line<'static>>) {
    for detail in details {
        match detail {
            ToolDetail::Field { label, value } => out.push(Line::from(vec![
                Span::styled(format!("{indent}{label}: "), theme.muted),
                Span::styled(value.clone(), theme.text),
            ])),
            ToolDetail::Heading(text) => {
                push_text(out, indent, text, theme.text.add_modifier(Modifier::BOLD))
            }
            ToolDetail::Note(text) => push_text(out, indent, text, theme.muted),
            ToolDetail::Code(command) => push_text(out, indent, &format!("$ {command}"), theme.code),
            ToolDetail::Removed(text) => push_text(out, indent, &format!("- {text}"), theme.removed),
            ToolDetail::Added(text) => push_text(out, indent, &format!("+ {text}"), theme.added),
            ToolDetail::Todo { status, content } => {
                let marker = match status.as_str() {
                    "completed" => "x",
                    "in_progress" => "~",
                    _ => " ",
                };
                push_text(out, indent, &format!("[{marker}] {content}"), theme.text);
            }
            ToolDetail::Block { label, text } => {
                out.push(Line::styled(format!("{indent}{label}:"), theme.muted));
                push_text(out, &format!("{indent}{INDENT}"), text, theme.text);
            }
            ToolDetail::Lines(text) | ToolDetail::Json(text) => push_text(out, indent, text, theme.muted),
        }
    }
}

fn toggle_hint(long: bool, expanded: bool) -> &'static str {
    match (long, expanded) {
        (true, false) => " (show more)",
        _ => "",
    }
}

fn view_lines(
    view: &ContentView,
    theme: &Theme,
    expanded: bool,
    indent: &str,
    out: &mut Vec<Line<'static>>,
) {
    let nested = format!("{indent}{INDENT}");
    match view {
        ContentView::Empty => push_text(out, indent, "No content", theme.muted.add_modifier(Modifier::ITALIC)),
        ContentView::EmptySequence => {
            push_text(out, indent, "Empty content", theme.muted.add_modifier(Modifier::ITALIC))
        }
        ContentView::Paragraph(text) => push_text(out, indent, text, theme.text),
        ContentView::Sequence(items) => {
            for item in items {
                view_lines(item, theme, expanded, indent, out);
            }
        }
        ContentView::ToolUse(tool) => {
            out.push(Line::from(vec![
                Span::styled(format!("{indent}⚙ {}", tool.title()), theme.accent),
                Span::styled(format!(" {}", tool.short_id()), theme.muted),
            ]));
            detail_lines(&tool.details, theme, &nested, out);
        }
        ContentView::ToolResult(result) => {
            let title_style = if result.is_error { theme.error } else { theme.success };
            out.push(Line::from(vec![
                Span::styled(format!("{indent}{}", result.title()), title_style),
                Span::styled(
                    format!(" {}{}", short_id(&result.tool_use_id), toggle_hint(result.body.is_long(), expanded)),
                    theme.muted,
                ),
            ]));
            let style = match result.format {
                ResultFormat::Json => theme.muted,
                ResultFormat::Terminal => theme.code,
                ResultFormat::Text => theme.text,
            };
            push_text(out, &nested, &result.body.display(expanded), style);
        }
        ContentView::Thinking(thinking) => {
            let mut spans = vec![Span::styled(
                format!("{indent}✻ {}", thinking.title()),
                theme.muted.add_modifier(Modifier::BOLD),
            )];
            if let Some(tail) = &thinking.signature_tail {
                spans.push(Span::styled(format!(" {tail}"), theme.muted));
            }
            spans.push(Span::styled(
                toggle_hint(thinking.body.is_long(), expanded),
                theme.muted,
            ));
            out.push(Line::from(spans));
            if thinking.redacted {
                push_text(out, &nested, REDACTED_NOTICE, theme.warning.add_modifier(Modifier::ITALIC));
            }
            push_text(
                out,
                &nested,
                &thinking.body.display(expanded),
                theme.muted.add_modifier(Modifier::ITALIC),
            );
        }
        ContentView::WebSearch(search) => {
            let id = search.tool_use_id.as_deref().map(short_id).unwrap_or_default();
            out.push(Line::from(vec![
                Span::styled(format!("{indent}Web Search Results"), theme.accent),
                Span::styled(format!(" {id} · {} results", search.results.len()), theme.muted),
            ]));
            for result in search.visible(expanded) {
                push_text(out, &nested, &format!("• {}", result.title.as_deref().unwrap_or("(untitled)")), theme.text);
                push_text(out, &format!("{nested}{INDENT}"), result.url.as_deref().unwrap_or(""), theme.muted);
                if result.encrypted_content {
                    push_text(
                        out,
                        &format!("{nested}{INDENT}"),
                        "Content available (encrypted)",
                        theme.muted.add_modifier(Modifier::ITALIC),
                    );
                }
            }
            if !expanded && search.hidden_count() > 0 {
                push_text(out, &nested, &format!("... and {} more results", search.hidden_count()), theme.muted);
            }
        }
        ContentView::Generic { label, json, .. } => {
            out.push(Line::styled(format!("{indent}● {label}"), theme.text.add_modifier(Modifier::BOLD)));
            push_text(out, &nested, json, theme.muted);
        }
        ContentView::Raw { title, json } => {
            out.push(Line::styled(format!("{indent}{title}"), theme.warning));
            push_text(out, &nested, json, theme.muted);
        }
        ContentView::RenderError { index, message, json } => {
            out.push(Line::styled(format!("{indent}Rendering Error at block {index}"), theme.error));
            push_text(out, &nested, message, theme.removed);
            push_text(out, &nested, json, theme.muted);
        }
    }
}

pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

/// Unstyled rendering, one line per row, for non-interactive output.
pub fn plain_text(lines: &[Line<'_>]) -> String {
    lines.iter().map(line_text).collect::<Vec<_>>().join("\n")
}

pub fn transcript_visual_rows(lines: &[Line<'_>], width: usize) -> usize {
    let texts: Vec<String> = lines.iter().map(line_text).collect();
    visual_line_count(texts.iter().map(String::as_str), width)
}

pub fn render_messages(frame: &mut Frame<'_>, area: Rect, lines: Vec<Line<'static>>, scroll: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let paragraph = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, area);
}

pub fn render_header(frame: &mut Frame<'_>, area: Rect, title: &str, theme: &Theme) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    frame.render_widget(
        Paragraph::new(truncate_line(title, area.width as usize)).style(theme.accent),
        area,
    );
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str, theme: &Theme) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    frame.render_widget(
        Paragraph::new(truncate_line(status, area.width as usize)).style(theme.muted),
        area,
    );
}

/// Session facts on top, live notifications below.
pub fn render_sidebar(
    frame: &mut Frame<'_>,
    area: Rect,
    facts: &[(&str, String)],
    notifications: &[Notification],
    theme: &Theme,
) {
    let block = Block::default().borders(Borders::LEFT).title("Session");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width as usize;
    let mut lines = Vec::new();
    for (label, value) in facts {
        lines.push(Line::styled(label.to_string(), theme.muted));
        lines.push(Line::styled(truncate_line(&format!("{INDENT}{value}"), width), theme.text));
    }
    if !notifications.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::styled("Notifications", theme.text.add_modifier(Modifier::BOLD)));
    }
    for notification in notifications.iter().rev() {
        lines.push(Line::styled(
            truncate_line(&notification.title, width),
            theme.level(notification.level),
        ));
        if let Some(description) = &notification.description {
            lines.push(Line::styled(format!("{INDENT}{description}"), theme.muted));
        }
    }

    frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }), inner);
}

/// Latest notification as a single line, for when the sidebar is hidden.
pub fn notification_line(notification: &Notification, theme: &Theme) -> Line<'static> {
    let mut text = format!("[{}] {}", notification.level.label(), notification.title);
    if let Some(description) = &notification.description {
        text.push_str(": ");
        text.push_str(description);
    }
    Line::styled(text, theme.level(notification.level))
}

pub fn render_permission_modal(frame: &mut Frame<'_>, request: &PermissionRequest, theme: &Theme) {
    let area = centered_rect(frame.area(), 44, 96, 10, 18);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Permission Required: {}", request.tool_name))
        .style(theme.warning);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        Line::from("y approve   n deny"),
        Line::from(""),
        Line::styled("Preview", Style::default().add_modifier(Modifier::BOLD)),
    ];
    let mut preview = Vec::new();
    detail_lines(
        &preview_tool_input(&request.tool_name, &request.tool_input),
        theme,
        "",
        &mut preview,
    );
    lines.extend(preview.into_iter().take(inner.height.saturating_sub(3) as usize));

    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        inner,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{group_entries_at, merge_transcript};
    use crate::types::ConversationMessage;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;

    fn messages() -> Vec<ConversationMessage> {
        serde_json::from_value(json!([
            { "uuid": "1", "type": "user", "message": "list files", "timestamp": "2025-01-01T00:00:00Z", "sessionId": "s" },
            { "uuid": "2", "type": "assistant", "timestamp": "2025-01-01T00:00:05Z", "sessionId": "s", "costUSD": 0.02,
              "message": { "content": [
                { "type": "text", "text": "Running ls" },
                { "type": "tool_use", "id": "toolu_0123456789", "name": "Bash", "input": { "command": "ls" } }
              ] } }
        ]))
        .expect("messages")
    }

    #[test]
    fn test_transcript_lines_show_headers_and_tool_panels() {
        let history = messages();
        let entries = merge_transcript(&history, &[], "s", None);
        let groups = group_entries_at(&entries, chrono::Utc::now());
        let text = plain_text(&transcript_lines(&groups, &Theme::dark(), false));

        assert!(text.contains("▌ You"));
        assert!(text.contains("▌ Assistant · $0.0200"));
        assert!(text.contains("  Running ls"));
        assert!(text.contains("  ⚙ Bash 23456789"));
        assert!(text.contains("    $ ls"));
    }

    #[test]
    fn test_long_tool_result_is_collapsed_until_expanded() {
        let mut out = Vec::new();
        let view = crate::transcript::render_content(&json!({
            "type": "tool_result", "tool_use_id": "t", "content": "y".repeat(300)
        }));
        view_lines(&view, &Theme::dark(), false, "", &mut out);
        let collapsed = plain_text(&out);
        assert!(collapsed.contains("(show more)"));
        assert!(collapsed.ends_with(&format!("{}...", "y".repeat(200))));

        out.clear();
        view_lines(&view, &Theme::dark(), true, "", &mut out);
        assert!(plain_text(&out).ends_with(&"y".repeat(300)));
    }

    #[test]
    fn test_redacted_thinking_shows_notice() {
        let mut out = Vec::new();
        let view = crate::transcript::render_content(&json!({
            "type": "redacted_thinking", "data": "opaque"
        }));
        view_lines(&view, &Theme::dark(), false, "", &mut out);
        let text = plain_text(&out);
        assert!(text.starts_with("✻ Redacted Thinking"));
        assert!(text.contains(REDACTED_NOTICE));
    }

    #[test]
    fn test_permission_modal_renders_tool_preview() {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).expect("terminal");
        let request: PermissionRequest = serde_json::from_value(json!({
            "id": "p-1", "streamingId": "s", "toolName": "Bash", "toolInput": { "command": "rm -rf target" }
        }))
        .expect("request");

        terminal
            .draw(|frame| render_permission_modal(frame, &request, &Theme::dark()))
            .expect("draw");

        let buffer = terminal.backend().buffer().clone();
        let rendered: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(rendered.contains("Permission Required: Bash"));
        assert!(rendered.contains("$ rm -rf target"));
    }

    #[test]
    fn test_visual_rows_account_for_wrapping() {
        let lines = vec![Line::from("abcdefgh"), Line::from("ab")];
        assert_eq!(transcript_visual_rows(&lines, 4), 3);
    }
}
