//! Full-screen `watch` view: live transcript of one streaming conversation.

use crate::api::{ApiClient, HttpStreamOpener};
use crate::config::Config;
use crate::format::{format_cost, format_session_id};
use crate::settings::{SettingsStore, UiPreferences};
use crate::state::{lock_state, shared, AppState, NotificationLevel, StreamSession, UiState};
use crate::terminal::{TerminalSession, TerminalType};
use crate::transcript::{filter_visible, group_entries, merge_transcript};
use crate::types::{ConversationMessage, PermissionAction, PermissionDecisionRequest};
use crate::ui::layout::split_watch_layout;
use crate::ui::render::{
    notification_line, render_header, render_messages, render_permission_modal, render_sidebar,
    render_status_line, transcript_lines, transcript_visual_rows, Theme,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::Paragraph;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const TUI_TICK_INTERVAL: Duration = Duration::from_millis(50);
const ACTION_TOAST: Duration = Duration::from_millis(3000);
const FAILURE_TOAST: Duration = Duration::from_millis(6000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub streaming_id: String,
    /// Persisted conversation shown above the live stream.
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    Quit,
    ToggleToolResults,
    ToggleExpanded,
    ToggleSidebar,
    ToggleTheme,
    Approve,
    Deny,
    Stop,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    Home,
    End,
}

/// Maps a key press to an action. `y`/`n` only mean something while a
/// permission prompt is open.
pub fn action_for_key(key: KeyEvent, permission_open: bool) -> Option<WatchAction> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(WatchAction::Quit)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(WatchAction::Quit),
        KeyCode::Char('y') if permission_open => Some(WatchAction::Approve),
        KeyCode::Char('n') if permission_open => Some(WatchAction::Deny),
        KeyCode::Char('t') => Some(WatchAction::ToggleToolResults),
        KeyCode::Char('e') => Some(WatchAction::ToggleExpanded),
        KeyCode::Char('b') => Some(WatchAction::ToggleSidebar),
        KeyCode::Char('d') => Some(WatchAction::ToggleTheme),
        KeyCode::Char('s') => Some(WatchAction::Stop),
        KeyCode::Up => Some(WatchAction::ScrollUp),
        KeyCode::Down => Some(WatchAction::ScrollDown),
        KeyCode::PageUp => Some(WatchAction::PageUp),
        KeyCode::PageDown => Some(WatchAction::PageDown),
        KeyCode::Home => Some(WatchAction::Home),
        KeyCode::End => Some(WatchAction::End),
        _ => None,
    }
}

/// Transcript scroll position. Follows the bottom until the user scrolls up,
/// and resumes following once they scroll back down to it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScrollState {
    offset: usize,
    auto_follow: bool,
    content_rows: usize,
    viewport_rows: usize,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            auto_follow: true,
            content_rows: 0,
            viewport_rows: 1,
        }
    }
}

impl ScrollState {
    fn max_offset(&self) -> usize {
        self.content_rows.saturating_sub(self.viewport_rows)
    }

    fn set_content(&mut self, content_rows: usize, viewport_rows: usize) {
        self.content_rows = content_rows;
        self.viewport_rows = viewport_rows.max(1);
        if self.auto_follow {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    fn page_step(&self) -> usize {
        self.viewport_rows.saturating_sub(1).max(1)
    }

    fn up(&mut self, step: usize) {
        self.offset = self.offset.saturating_sub(step.max(1));
        self.auto_follow = false;
    }

    fn down(&mut self, step: usize) {
        let max = self.max_offset();
        self.offset = self.offset.saturating_add(step.max(1)).min(max);
        self.auto_follow = self.offset >= max;
    }

    fn home(&mut self) {
        self.offset = 0;
        self.auto_follow = false;
    }

    fn end(&mut self) {
        self.offset = self.max_offset();
        self.auto_follow = true;
    }
}

fn status_text(state: &AppState, streaming_id: &str) -> String {
    let conversations = &state.conversations;
    if let Some(error) = conversations.error() {
        return format!("error: {error}");
    }
    let activity = if conversations.is_streaming() {
        "streaming"
    } else if conversations.current_streaming_id().is_some() {
        "idle"
    } else {
        "stopped"
    };
    let tools = if state.ui.show_tool_results() {
        "shown"
    } else {
        "hidden"
    };
    format!(
        "{} {activity} · cost {} · tool results {tools} · q quit  t tools  e expand  b sidebar  d theme  s stop",
        format_session_id(streaming_id),
        format_cost(conversations.current_session_cost()),
    )
}

fn session_facts(state: &AppState, options: &WatchOptions) -> Vec<(&'static str, String)> {
    let conversations = &state.conversations;
    vec![
        ("Streaming id", options.streaming_id.clone()),
        (
            "Session",
            options.session_id.clone().unwrap_or_else(|| "-".to_string()),
        ),
        (
            "State",
            if conversations.is_streaming() {
                "streaming".to_string()
            } else {
                "idle".to_string()
            },
        ),
        (
            "Session cost",
            format_cost(conversations.current_session_cost()),
        ),
        (
            "Live events",
            conversations.stream_messages().len().to_string(),
        ),
        (
            "Permission",
            state
                .ui
                .current_permission_request()
                .map(|request| request.tool_name.clone())
                .unwrap_or_else(|| "none".to_string()),
        ),
    ]
}

pub struct WatchApp {
    client: ApiClient,
    session: StreamSession,
    settings: Arc<dyn SettingsStore>,
    options: WatchOptions,
    history: Vec<ConversationMessage>,
    title: String,
    scroll: ScrollState,
    expanded: bool,
    should_quit: bool,
}

impl WatchApp {
    pub fn new(
        config: &Config,
        client: ApiClient,
        settings: Arc<dyn SettingsStore>,
        options: WatchOptions,
    ) -> Result<Self> {
        let preferences = UiPreferences::load(settings.as_ref()).unwrap_or_else(|error| {
            warn!(%error, "falling back to default preferences");
            UiPreferences::default()
        });
        let state = shared(AppState::new(UiState::new(
            config.show_tool_results,
            preferences,
        )));
        let opener = Arc::new(HttpStreamOpener::new(config)?);

        Ok(Self {
            client,
            session: StreamSession::new(state, opener),
            settings,
            title: format!("ccui · watching {}", options.streaming_id),
            options,
            history: Vec::new(),
            scroll: ScrollState::default(),
            expanded: false,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.reload_history().await?;
        let streaming_id = self.options.streaming_id.clone();
        if let Err(error) = self.session.select(Some(&streaming_id)).await {
            // Already surfaced through the error handlers.
            warn!(%error, "initial stream connect failed");
        }

        let mut terminal = TerminalSession::enter()?;
        let mut tick = tokio::time::interval(TUI_TICK_INTERVAL);
        while !self.should_quit {
            self.draw(terminal.terminal_mut())?;
            self.process_events().await?;

            tokio::select! {
                _ = tick.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
            }
        }

        self.session.disconnect().await?;
        Ok(())
    }

    fn notify(&self, level: NotificationLevel, title: &str, description: String, duration: Duration) -> Result<()> {
        lock_state(self.session.state())?
            .ui
            .notify(level, title, Some(description), duration);
        Ok(())
    }

    async fn reload_history(&mut self) -> Result<()> {
        let Some(session_id) = self.options.session_id.clone() else {
            return Ok(());
        };
        match self.client.get_conversation(&session_id).await {
            Ok(details) => {
                if !details.summary.is_empty() {
                    self.title = format!("ccui · {}", details.summary);
                }
                self.history = details.messages;
            }
            Err(error) => self.notify(
                NotificationLevel::Error,
                "Failed to Load Conversation",
                error.to_string(),
                FAILURE_TOAST,
            )?,
        }
        Ok(())
    }

    fn draw(&mut self, terminal: &mut TerminalType) -> Result<()> {
        let theme;
        let lines;
        let status;
        let facts;
        let notifications;
        let permission;
        let sidebar_open;
        {
            let mut state = lock_state(self.session.state())?;
            state.ui.expire(Instant::now());

            let preferences = state.ui.preferences();
            theme = Theme::for_preferences(preferences);
            sidebar_open = preferences.sidebar_open;

            let entries = merge_transcript(
                &self.history,
                state.conversations.stream_messages(),
                &self.options.streaming_id,
                state.conversations.current_streaming_id(),
            );
            let visible = filter_visible(entries, state.ui.show_tool_results());
            lines = transcript_lines(&group_entries(&visible), &theme, self.expanded);

            status = status_text(&state, &self.options.streaming_id);
            facts = session_facts(&state, &self.options);
            notifications = state.ui.notifications().to_vec();
            permission = state
                .ui
                .permission_dialog_open()
                .then(|| state.ui.current_permission_request().cloned())
                .flatten();
        }

        let title = self.title.clone();
        let scroll = &mut self.scroll;
        terminal.draw(|frame| {
            let layout = split_watch_layout(frame.area(), sidebar_open);
            match (layout.sidebar, notifications.last()) {
                (None, Some(latest)) => frame.render_widget(
                    Paragraph::new(notification_line(latest, &theme)),
                    layout.header,
                ),
                _ => render_header(frame, layout.header, &title, &theme),
            }

            let rows = transcript_visual_rows(&lines, layout.transcript.width as usize);
            scroll.set_content(rows, layout.transcript.height as usize);
            render_messages(frame, layout.transcript, lines, scroll.offset);

            if let Some(sidebar) = layout.sidebar {
                render_sidebar(frame, sidebar, &facts, &notifications, &theme);
            }
            render_status_line(frame, layout.status, &status, &theme);

            if let Some(request) = &permission {
                render_permission_modal(frame, request, &theme);
            }
        })?;
        Ok(())
    }

    async fn process_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
                continue;
            }
            let permission_open = lock_state(self.session.state())?.ui.permission_dialog_open();
            if let Some(action) = action_for_key(key, permission_open) {
                self.apply(action).await?;
            }
        }
        Ok(())
    }

    async fn apply(&mut self, action: WatchAction) -> Result<()> {
        match action {
            WatchAction::Quit => self.should_quit = true,
            WatchAction::ToggleToolResults => {
                lock_state(self.session.state())?.ui.toggle_tool_results()
            }
            WatchAction::ToggleExpanded => self.expanded = !self.expanded,
            WatchAction::ToggleSidebar => self.update_preferences(UiPreferences::toggle_sidebar)?,
            WatchAction::ToggleTheme => self.update_preferences(UiPreferences::toggle_dark_mode)?,
            WatchAction::Approve => self.decide(PermissionAction::Approve).await?,
            WatchAction::Deny => self.decide(PermissionAction::Deny).await?,
            WatchAction::Stop => self.stop().await?,
            WatchAction::ScrollUp => self.scroll.up(1),
            WatchAction::ScrollDown => self.scroll.down(1),
            WatchAction::PageUp => self.scroll.up(self.scroll.page_step()),
            WatchAction::PageDown => self.scroll.down(self.scroll.page_step()),
            WatchAction::Home => self.scroll.home(),
            WatchAction::End => self.scroll.end(),
        }
        Ok(())
    }

    /// Applies a preference change and persists it.
    fn update_preferences(&mut self, change: fn(&mut UiPreferences)) -> Result<()> {
        let preferences = {
            let mut state = lock_state(self.session.state())?;
            change(state.ui.preferences_mut());
            state.ui.preferences()
        };
        if let Err(error) = preferences.save(self.settings.as_ref()) {
            self.notify(
                NotificationLevel::Error,
                "Settings Error",
                error.to_string(),
                FAILURE_TOAST,
            )?;
        }
        Ok(())
    }

    async fn decide(&mut self, action: PermissionAction) -> Result<()> {
        let Some(request) = lock_state(self.session.state())?
            .ui
            .current_permission_request()
            .cloned()
        else {
            return Ok(());
        };

        let decision = PermissionDecisionRequest {
            action,
            modified_input: None,
        };
        match self.client.decide_permission(&request.id, &decision).await {
            Ok(_) => {
                info!(request_id = %request.id, ?action, "permission decided");
                let title = match action {
                    PermissionAction::Approve => "Permission Approved",
                    PermissionAction::Deny => "Permission Denied",
                };
                let mut state = lock_state(self.session.state())?;
                state.ui.set_permission_dialog(false, None);
                state.ui.notify(
                    NotificationLevel::Success,
                    title,
                    Some(request.tool_name.clone()),
                    ACTION_TOAST,
                );
            }
            Err(error) => self.notify(
                NotificationLevel::Error,
                "Permission Error",
                error.to_string(),
                FAILURE_TOAST,
            )?,
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        match self.client.stop_conversation(&self.options.streaming_id).await {
            Ok(_) => {
                self.session.disconnect().await?;
                self.notify(
                    NotificationLevel::Info,
                    "Conversation Stopped",
                    self.options.streaming_id.clone(),
                    ACTION_TOAST,
                )?;
                self.reload_history().await?;
            }
            Err(error) => self.notify(
                NotificationLevel::Error,
                "Failed to Stop Conversation",
                error.to_string(),
                FAILURE_TOAST,
            )?,
        }
        Ok(())
    }
}
