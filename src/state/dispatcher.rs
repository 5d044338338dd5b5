use super::{lock_state, AppState, NotificationLevel, SharedState};
use crate::api::StreamConnection;
use crate::format::result_summary;
use crate::types::StreamEvent;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONNECTED_TOAST: Duration = Duration::from_millis(3000);
const INIT_TOAST: Duration = Duration::from_millis(4000);
const COMPLETE_TOAST: Duration = Duration::from_millis(5000);
const ERROR_TOAST: Duration = Duration::from_millis(6000);
const PERMISSION_TOAST: Duration = Duration::from_millis(10000);
const CLOSED_TOAST: Duration = Duration::from_millis(3000);

/// Applies one stream event. The event is buffered before anything else so
/// the transcript never misses a line, whatever its tag.
pub fn apply_event(state: &mut AppState, event: &StreamEvent) {
    state.conversations.add_stream_message(event.clone());

    match event {
        StreamEvent::Connected(connected) => {
            debug!(streaming_id = %connected.streaming_id, "stream connected event");
            state.conversations.set_is_streaming(true);
            state.conversations.set_error(None);
            state.ui.notify(
                NotificationLevel::Success,
                "Connected",
                Some("Stream connection established".to_string()),
                CONNECTED_TOAST,
            );
        }
        StreamEvent::System(system) => {
            if system.is_init() {
                info!(cwd = ?system.cwd, model = ?system.model, "assistant initialized");
                state.ui.notify(
                    NotificationLevel::Info,
                    "Assistant Initialized",
                    Some(format!("Working in {}", system.cwd.as_deref().unwrap_or(""))),
                    INIT_TOAST,
                );
            } else {
                debug!(subtype = %system.subtype, "system event");
            }
        }
        StreamEvent::Assistant(assistant) => {
            debug!(blocks = assistant.message.content.len(), "assistant message");
        }
        StreamEvent::User(_) => {
            debug!("user message");
        }
        StreamEvent::Result(result) => {
            state.conversations.set_is_streaming(false);
            if let Some(cost) = result.cost_usd.filter(|cost| *cost != 0.0) {
                state.conversations.add_to_session_cost(cost);
            }

            if result.is_error {
                state.ui.notify(
                    NotificationLevel::Error,
                    "Conversation Error",
                    Some(
                        result
                            .result
                            .clone()
                            .filter(|text| !text.is_empty())
                            .unwrap_or_else(|| "An error occurred".to_string()),
                    ),
                    ERROR_TOAST,
                );
            } else {
                state.ui.notify(
                    NotificationLevel::Success,
                    "Conversation Complete",
                    Some(result_summary(result.cost_usd, result.duration_ms)),
                    COMPLETE_TOAST,
                );
            }
        }
        StreamEvent::PermissionRequest(request) => {
            let tool_name = request.data.tool_name.clone();
            state
                .ui
                .set_permission_dialog(true, Some(request.data.clone()));
            state.ui.notify(
                NotificationLevel::Warning,
                "Permission Required",
                Some(format!("Assistant wants to use: {tool_name}")),
                PERMISSION_TOAST,
            );
        }
        StreamEvent::Error(error) => {
            state.conversations.set_error(Some(error.error.clone()));
            state.conversations.set_is_streaming(false);
            state.ui.notify(
                NotificationLevel::Error,
                "Stream Error",
                Some(error.error.clone()),
                ERROR_TOAST,
            );
        }
        StreamEvent::Closed(_) => {
            state.conversations.set_is_streaming(false);
            state.ui.notify(
                NotificationLevel::Info,
                "Connection Closed",
                Some("Stream connection ended".to_string()),
                CLOSED_TOAST,
            );
        }
        StreamEvent::Unrecognized(raw) => {
            warn!(tag = event.tag(), "unrecognized stream event: {raw}");
        }
    }
}

/// Transport-level failure reported by the connection.
pub fn apply_transport_error(state: &mut AppState, message: &str) {
    warn!("stream error: {message}");
    state.conversations.set_error(Some(message.to_string()));
    state.conversations.set_is_streaming(false);
    state.ui.notify(
        NotificationLevel::Error,
        "Connection Error",
        Some(message.to_string()),
        ERROR_TOAST,
    );
}

pub fn apply_transport_close(state: &mut AppState) {
    debug!("stream connection closed");
    state.conversations.set_is_streaming(false);
}

/// Routes connection callbacks into the shared application state.
#[derive(Clone)]
pub struct StreamDispatcher {
    state: SharedState,
}

impl StreamDispatcher {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub fn handle_event(&self, event: &StreamEvent) -> anyhow::Result<()> {
        apply_event(&mut *lock_state(&self.state)?, event);
        Ok(())
    }

    pub fn handle_error(&self, message: &str) -> anyhow::Result<()> {
        apply_transport_error(&mut *lock_state(&self.state)?, message);
        Ok(())
    }

    pub fn handle_close(&self) -> anyhow::Result<()> {
        apply_transport_close(&mut *lock_state(&self.state)?);
        Ok(())
    }

    /// Subscribes this dispatcher to all three handler lists.
    pub fn attach(&self, connection: &mut StreamConnection) {
        let dispatcher = self.clone();
        connection.on_message(move |event| dispatcher.handle_event(event));
        let dispatcher = self.clone();
        connection.on_error(move |message| dispatcher.handle_error(message));
        let dispatcher = self.clone();
        connection.on_close(move || dispatcher.handle_close());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectedEvent, ResultEvent};
    use serde_json::json;

    fn event(value: serde_json::Value) -> StreamEvent {
        StreamEvent::from_value(value)
    }

    #[test]
    fn test_connected_turns_streaming_on_and_clears_error() {
        let mut state = AppState::default();
        state.conversations.set_error(Some("stale".to_string()));

        apply_event(
            &mut state,
            &StreamEvent::Connected(ConnectedEvent {
                streaming_id: "s-1".to_string(),
                timestamp: None,
            }),
        );

        assert!(state.conversations.is_streaming());
        assert_eq!(state.conversations.error(), None);
        assert_eq!(state.conversations.stream_messages().len(), 1);
        let toast = &state.ui.notifications()[0];
        assert_eq!(toast.level, NotificationLevel::Success);
        assert_eq!(toast.title, "Connected");
        assert_eq!(toast.duration, Duration::from_millis(3000));
    }

    #[test]
    fn test_result_adds_cost_and_summarizes() {
        let mut state = AppState::default();
        state.conversations.set_is_streaming(true);

        apply_event(
            &mut state,
            &StreamEvent::Result(ResultEvent {
                cost_usd: Some(0.05),
                duration_ms: Some(2000.0),
                ..Default::default()
            }),
        );

        assert!(!state.conversations.is_streaming());
        assert!((state.conversations.current_session_cost() - 0.05).abs() < 1e-12);
        let toast = &state.ui.notifications()[0];
        assert_eq!(toast.title, "Conversation Complete");
        assert_eq!(
            toast.description.as_deref(),
            Some("Cost: $0.0500 | Duration: 2s")
        );
    }

    #[test]
    fn test_error_result_without_text_uses_fallback() {
        let mut state = AppState::default();
        apply_event(
            &mut state,
            &event(json!({ "type": "result", "is_error": true, "cost_usd": 0 })),
        );

        assert_eq!(state.conversations.current_session_cost(), 0.0);
        let toast = &state.ui.notifications()[0];
        assert_eq!(toast.level, NotificationLevel::Error);
        assert_eq!(toast.description.as_deref(), Some("An error occurred"));
    }

    #[test]
    fn test_permission_request_opens_prompt() {
        let mut state = AppState::default();
        apply_event(
            &mut state,
            &event(json!({
                "type": "permission_request",
                "data": { "id": "p-1", "streamingId": "s-1", "toolName": "Bash", "toolInput": {} },
                "streamingId": "s-1"
            })),
        );

        assert!(state.ui.permission_dialog_open());
        assert_eq!(
            state.ui.current_permission_request().map(|r| r.tool_name.as_str()),
            Some("Bash")
        );
        let toast = &state.ui.notifications()[0];
        assert_eq!(toast.description.as_deref(), Some("Assistant wants to use: Bash"));
        assert_eq!(toast.duration, Duration::from_secs(10));
    }

    #[test]
    fn test_stream_error_event_sets_error_slot() {
        let mut state = AppState::default();
        state.conversations.set_is_streaming(true);
        apply_event(
            &mut state,
            &event(json!({ "type": "error", "error": "process exited", "streamingId": "s-1" })),
        );

        assert_eq!(state.conversations.error(), Some("process exited"));
        assert!(!state.conversations.is_streaming());
        assert_eq!(state.ui.notifications()[0].title, "Stream Error");
    }

    #[test]
    fn test_unrecognized_event_is_buffered_without_side_effects() {
        let mut state = AppState::default();
        state.conversations.set_is_streaming(true);
        apply_event(&mut state, &event(json!({ "type": "heartbeat" })));

        assert_eq!(state.conversations.stream_messages().len(), 1);
        assert!(state.conversations.is_streaming());
        assert!(state.ui.notifications().is_empty());
    }

    #[test]
    fn test_transport_error_and_close() {
        let mut state = AppState::default();
        state.conversations.set_is_streaming(true);
        apply_transport_error(&mut state, "Stream read error: reset");
        assert_eq!(state.conversations.error(), Some("Stream read error: reset"));
        assert_eq!(state.ui.notifications()[0].title, "Connection Error");

        state.conversations.set_is_streaming(true);
        apply_transport_close(&mut state);
        assert!(!state.conversations.is_streaming());
        assert!(state.conversations.stream_messages().is_empty());
    }

    #[test]
    fn test_system_init_only_notifies() {
        let mut state = AppState::default();
        state.conversations.set_is_streaming(true);
        apply_event(
            &mut state,
            &event(json!({
                "type": "system",
                "subtype": "init",
                "cwd": "/work/repo",
                "session_id": "abc",
                "model": "claude-sonnet"
            })),
        );

        assert!(state.conversations.is_streaming());
        assert_eq!(state.conversations.error(), None);
        assert_eq!(state.conversations.stream_messages().len(), 1);
        assert_eq!(state.ui.notifications().len(), 1);
        let toast = &state.ui.notifications()[0];
        assert_eq!(toast.level, NotificationLevel::Info);
        assert_eq!(toast.title, "Assistant Initialized");
        assert_eq!(toast.description.as_deref(), Some("Working in /work/repo"));
    }

    #[test]
    fn test_closed_event_stops_streaming() {
        let mut state = AppState::default();
        state.conversations.set_is_streaming(true);
        apply_event(&mut state, &event(json!({ "type": "closed", "streamingId": "s-1" })));

        assert!(!state.conversations.is_streaming());
        assert_eq!(state.conversations.stream_messages().len(), 1);
        assert!(matches!(
            state.conversations.stream_messages()[0],
            StreamEvent::Closed(_)
        ));
        let toast = &state.ui.notifications()[0];
        assert_eq!(toast.level, NotificationLevel::Info);
        assert_eq!(toast.title, "Connection Closed");
    }
}
