//! Turns fetched history plus the live stream buffer into grouped,
//! renderable transcript entries.

mod group;
mod reconcile;
mod render;

pub use group::{group_entries, group_entries_at, GroupHeader, GroupKind, MessageGroup};
pub use reconcile::{
    body_has_tool_result, filter_visible, merge_transcript, EntryKind, EntrySource,
    TranscriptEntry,
};
pub use render::{
    classify_tool_result, render_block, render_content, BlockRenderError, Collapsible,
    ContentView, ResultFormat, ThinkingView, ToolResultView, ToolUseView, WebSearchView,
    REDACTED_NOTICE, THINKING_PREVIEW_CHARS, TOOL_RESULT_PREVIEW_CHARS,
    WEB_SEARCH_PREVIEW_COUNT,
};

use crate::types::StreamEvent;
use render::{humanize_kind, pretty};
use serde_json::Value;

/// Render tree for one transcript entry. Message bodies go through
/// [`render_content`]; other live events show as labeled JSON panels.
pub fn render_entry(entry: &TranscriptEntry<'_>) -> ContentView {
    match entry.source {
        EntrySource::Persisted(message) => match &message.message {
            Value::Object(body) => match body.get("content") {
                Some(content) => render_content(content),
                None => ContentView::Generic {
                    kind: entry.tag().to_string(),
                    label: humanize_kind(entry.tag()),
                    json: pretty(&message.message),
                },
            },
            other => render_content(other),
        },
        EntrySource::Live(StreamEvent::Assistant(assistant)) => {
            render_content(&Value::Array(assistant.message.content.clone()))
        }
        EntrySource::Live(StreamEvent::User(user)) => {
            render_content(&user.message.content)
        }
        EntrySource::Live(event) => ContentView::Generic {
            kind: event.tag().to_string(),
            label: humanize_kind(event.tag()),
            json: pretty(&event.to_json()),
        },
    }
}
