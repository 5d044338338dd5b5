use crate::types::{ConversationSummary, ConversationSummaryUpdate, StreamEvent};

/// Conversation-level state: the summary list, what is being viewed, and the
/// live buffer of the one active stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationStore {
    conversations: Vec<ConversationSummary>,
    active_conversation: Option<String>,
    current_streaming_id: Option<String>,
    stream_messages: Vec<StreamEvent>,
    is_streaming: bool,
    error: Option<String>,
    current_session_cost: f64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn set_conversations(&mut self, conversations: Vec<ConversationSummary>) {
        self.conversations = conversations;
    }

    /// Applies `update` to the summary with this session id, if present.
    pub fn update_conversation(&mut self, session_id: &str, update: &ConversationSummaryUpdate) {
        for conversation in self
            .conversations
            .iter_mut()
            .filter(|conversation| conversation.session_id == session_id)
        {
            update.apply(conversation);
        }
    }

    /// Prepends; newest first.
    pub fn add_conversation(&mut self, conversation: ConversationSummary) {
        self.conversations.insert(0, conversation);
    }

    pub fn remove_conversation(&mut self, session_id: &str) {
        self.conversations
            .retain(|conversation| conversation.session_id != session_id);
    }

    pub fn active_conversation(&self) -> Option<&str> {
        self.active_conversation.as_deref()
    }

    pub fn set_active_conversation(&mut self, session_id: Option<String>) {
        self.active_conversation = session_id;
    }

    pub fn current_streaming_id(&self) -> Option<&str> {
        self.current_streaming_id.as_deref()
    }

    pub fn set_current_streaming_id(&mut self, streaming_id: Option<String>) {
        self.current_streaming_id = streaming_id;
    }

    /// Points the store at a new stream: sets the id, clears the live buffer,
    /// and drops the streaming flag, in that order.
    pub fn switch_streaming_id(&mut self, streaming_id: Option<String>) {
        self.set_current_streaming_id(streaming_id);
        self.clear_stream_messages();
        self.set_is_streaming(false);
    }

    pub fn stream_messages(&self) -> &[StreamEvent] {
        &self.stream_messages
    }

    pub fn add_stream_message(&mut self, event: StreamEvent) {
        self.stream_messages.push(event);
    }

    pub fn clear_stream_messages(&mut self) {
        self.stream_messages.clear();
    }

    pub fn set_stream_messages(&mut self, events: Vec<StreamEvent>) {
        self.stream_messages = events;
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn set_is_streaming(&mut self, streaming: bool) {
        self.is_streaming = streaming;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn current_session_cost(&self) -> f64 {
        self.current_session_cost
    }

    pub fn add_to_session_cost(&mut self, cost: f64) {
        self.current_session_cost += cost;
    }

    pub fn reset_session_cost(&mut self) {
        self.current_session_cost = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClosedEvent;

    fn summary(session_id: &str) -> ConversationSummary {
        ConversationSummary {
            session_id: session_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_conversation_prepends_and_remove_filters() {
        let mut store = ConversationStore::new();
        store.set_conversations(vec![summary("a"), summary("b")]);
        store.add_conversation(summary("c"));

        let ids: Vec<_> = store
            .conversations()
            .iter()
            .map(|conversation| conversation.session_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        store.remove_conversation("a");
        assert_eq!(store.conversations().len(), 2);
        store.remove_conversation("missing");
        assert_eq!(store.conversations().len(), 2);
    }

    #[test]
    fn test_update_conversation_merges_patch() {
        let mut store = ConversationStore::new();
        store.set_conversations(vec![summary("a"), summary("b")]);
        store.update_conversation(
            "b",
            &ConversationSummaryUpdate {
                summary: Some("Fix the parser".to_string()),
                message_count: Some(7),
                ..Default::default()
            },
        );

        assert_eq!(store.conversations()[0].summary, "");
        assert_eq!(store.conversations()[1].summary, "Fix the parser");
        assert_eq!(store.conversations()[1].message_count, 7);
    }

    #[test]
    fn test_switch_streaming_id_clears_buffer_and_flag() {
        let mut store = ConversationStore::new();
        store.set_current_streaming_id(Some("old".to_string()));
        store.add_stream_message(StreamEvent::Closed(ClosedEvent::default()));
        store.set_is_streaming(true);
        store.set_error(Some("Connection failed".to_string()));

        store.switch_streaming_id(Some("new".to_string()));

        assert_eq!(store.current_streaming_id(), Some("new"));
        assert!(store.stream_messages().is_empty());
        assert!(!store.is_streaming());
        // Cleared by the next `connected` event, not by the switch.
        assert_eq!(store.error(), Some("Connection failed"));
    }

    #[test]
    fn test_session_cost_accumulates_and_resets() {
        let mut store = ConversationStore::new();
        store.add_to_session_cost(0.02);
        store.add_to_session_cost(0.03);
        assert!((store.current_session_cost() - 0.05).abs() < 1e-12);
        store.reset_session_cost();
        assert_eq!(store.current_session_cost(), 0.0);
    }
}
