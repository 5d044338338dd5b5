use crate::types::{ConversationMessage, Role, StreamEvent};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    System,
    /// A user-role message that only carries tool output back to the model.
    ToolResult,
    /// Live stream events other than messages (connected, result, ...).
    Event,
}

impl EntryKind {
    pub fn is_user(self) -> bool {
        self == EntryKind::User
    }

    pub fn label(self) -> &'static str {
        match self {
            EntryKind::User => "User",
            EntryKind::Assistant => "Assistant",
            EntryKind::System => "System",
            EntryKind::ToolResult => "Tool Result",
            EntryKind::Event => "Event",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntrySource<'a> {
    Persisted(&'a ConversationMessage),
    Live(&'a StreamEvent),
}

/// One classified line of the merged transcript. Borrows from the fetched
/// history and the live buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscriptEntry<'a> {
    pub kind: EntryKind,
    pub source: EntrySource<'a>,
}

impl<'a> TranscriptEntry<'a> {
    pub fn persisted(message: &'a ConversationMessage) -> Self {
        let kind = match message.role {
            Role::User if body_has_tool_result(&message.message) => EntryKind::ToolResult,
            Role::User => EntryKind::User,
            Role::Assistant => EntryKind::Assistant,
            Role::System => EntryKind::System,
        };
        Self {
            kind,
            source: EntrySource::Persisted(message),
        }
    }

    pub fn live(event: &'a StreamEvent) -> Self {
        let kind = match event {
            StreamEvent::User(user) if content_has_tool_result(&user.message.content) => {
                EntryKind::ToolResult
            }
            StreamEvent::User(_) => EntryKind::User,
            StreamEvent::Assistant(_) => EntryKind::Assistant,
            StreamEvent::System(_) => EntryKind::System,
            _ => EntryKind::Event,
        };
        Self {
            kind,
            source: EntrySource::Live(event),
        }
    }

    pub fn cost_usd(&self) -> Option<f64> {
        match self.source {
            EntrySource::Persisted(message) => message.cost_usd,
            EntrySource::Live(StreamEvent::Result(result)) => result.cost_usd,
            EntrySource::Live(_) => None,
        }
    }

    pub fn duration_ms(&self) -> Option<f64> {
        match self.source {
            EntrySource::Persisted(message) => message.duration_ms,
            EntrySource::Live(StreamEvent::Result(result)) => result.duration_ms,
            EntrySource::Live(_) => None,
        }
    }

    pub fn timestamp(&self) -> Option<&'a str> {
        match self.source {
            EntrySource::Persisted(message) => message.timestamp.as_deref(),
            EntrySource::Live(event) => event.timestamp(),
        }
    }

    /// Stable label for live events (`connected`, `result`, ...); the role
    /// for persisted messages.
    pub fn tag(&self) -> &'a str {
        match self.source {
            EntrySource::Persisted(message) => message.role.as_str(),
            EntrySource::Live(event) => event.tag(),
        }
    }
}

fn content_has_tool_result(content: &Value) -> bool {
    content.as_array().is_some_and(|blocks| {
        blocks
            .iter()
            .any(|block| block.get("type").and_then(Value::as_str) == Some("tool_result"))
    })
}

/// True when a message body is an object whose `content` list holds at least
/// one `tool_result` block.
pub fn body_has_tool_result(body: &Value) -> bool {
    body.get("content").is_some_and(content_has_tool_result)
}

/// Persisted history followed by the live buffer. The live part is only
/// appended while the viewed conversation is the one being streamed and
/// something has arrived.
pub fn merge_transcript<'a>(
    persisted: &'a [ConversationMessage],
    live: &'a [StreamEvent],
    viewed_session: &str,
    streaming_id: Option<&str>,
) -> Vec<TranscriptEntry<'a>> {
    let mut entries: Vec<_> = persisted.iter().map(TranscriptEntry::persisted).collect();
    if streaming_id == Some(viewed_session) && !live.is_empty() {
        entries.extend(live.iter().map(TranscriptEntry::live));
    }
    entries
}

/// Drops tool-result entries unless they are switched on.
pub fn filter_visible<'a>(
    entries: Vec<TranscriptEntry<'a>>,
    show_tool_results: bool,
) -> Vec<TranscriptEntry<'a>> {
    if show_tool_results {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| entry.kind != EntryKind::ToolResult)
        .collect()
}
