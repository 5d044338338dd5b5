use crate::settings::UiPreferences;
use crate::types::PermissionRequest;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NotificationLevel {
    pub fn label(self) -> &'static str {
        match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        }
    }
}

/// A transient toast shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub title: String,
    pub description: Option<String>,
    pub duration: Duration,
    pub created_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.duration
    }
}

pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(5000);

/// Presentation state: toasts, the permission prompt, tool-result visibility
/// and persisted preferences.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    notifications: Vec<Notification>,
    next_notification_id: u64,
    permission_dialog_open: bool,
    current_permission_request: Option<PermissionRequest>,
    show_tool_results: bool,
    preferences: UiPreferences,
}

impl UiState {
    pub fn new(show_tool_results: bool, preferences: UiPreferences) -> Self {
        Self {
            show_tool_results,
            preferences,
            ..Self::default()
        }
    }

    pub fn notify(
        &mut self,
        level: NotificationLevel,
        title: impl Into<String>,
        description: Option<String>,
        duration: Duration,
    ) -> u64 {
        self.next_notification_id += 1;
        let id = self.next_notification_id;
        self.notifications.push(Notification {
            id,
            level,
            title: title.into(),
            description,
            duration,
            created_at: Instant::now(),
        });
        id
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn dismiss(&mut self, id: u64) {
        self.notifications.retain(|notification| notification.id != id);
    }

    /// Drops every notification whose duration has elapsed at `now`.
    pub fn expire(&mut self, now: Instant) {
        self.notifications
            .retain(|notification| !notification.is_expired(now));
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    /// Opening with a request shows it; closing always clears the request.
    pub fn set_permission_dialog(&mut self, open: bool, request: Option<PermissionRequest>) {
        self.permission_dialog_open = open;
        self.current_permission_request = if open { request } else { None };
    }

    pub fn permission_dialog_open(&self) -> bool {
        self.permission_dialog_open
    }

    pub fn current_permission_request(&self) -> Option<&PermissionRequest> {
        self.current_permission_request.as_ref()
    }

    pub fn show_tool_results(&self) -> bool {
        self.show_tool_results
    }

    pub fn set_show_tool_results(&mut self, show: bool) {
        self.show_tool_results = show;
    }

    pub fn toggle_tool_results(&mut self) {
        self.show_tool_results = !self.show_tool_results;
    }

    pub fn preferences(&self) -> UiPreferences {
        self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut UiPreferences {
        &mut self.preferences
    }
}
