use crate::format::short_id;
use crate::tool_preview::{clip, preview_tool_input, ToolDetail};
use crate::types::{ContentBlock, WebSearchResult};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::warn;

pub const TOOL_RESULT_PREVIEW_CHARS: usize = 200;
pub const THINKING_PREVIEW_CHARS: usize = 300;
pub const WEB_SEARCH_PREVIEW_COUNT: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockRenderError {
    #[error("web search results must be a list, got {0}")]
    WebSearchNotAList(&'static str),
    #[error("renderer panicked: {0}")]
    Panicked(String),
}

/// Text that shows a shortened preview until expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collapsible {
    pub text: String,
    pub limit: usize,
}

impl Collapsible {
    pub fn new(text: String, limit: usize) -> Self {
        Self { text, limit }
    }

    pub fn is_long(&self) -> bool {
        self.text.chars().count() > self.limit
    }

    pub fn display(&self, expanded: bool) -> String {
        if expanded {
            self.text.clone()
        } else {
            clip(&self.text, self.limit)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolUseView {
    pub id: String,
    pub name: String,
    pub server: bool,
    pub details: Vec<ToolDetail>,
}

impl ToolUseView {
    pub fn title(&self) -> String {
        if self.server {
            format!("{} (server)", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Json,
    Terminal,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResultView {
    pub tool_use_id: String,
    pub is_error: bool,
    pub format: ResultFormat,
    pub body: Collapsible,
}

impl ToolResultView {
    pub fn title(&self) -> &'static str {
        if self.is_error {
            "Tool Error"
        } else {
            "Tool Result"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkingView {
    pub redacted: bool,
    pub signature_tail: Option<String>,
    pub body: Collapsible,
}

impl ThinkingView {
    pub fn title(&self) -> &'static str {
        if self.redacted {
            "Redacted Thinking"
        } else {
            "Thinking"
        }
    }
}

pub const REDACTED_NOTICE: &str = "Content is encrypted/redacted";

#[derive(Debug, Clone, PartialEq)]
pub struct WebSearchView {
    pub tool_use_id: Option<String>,
    pub results: Vec<WebSearchResult>,
}

impl WebSearchView {
    pub fn visible(&self, expanded: bool) -> &[WebSearchResult] {
        if expanded {
            &self.results
        } else {
            &self.results[..self.results.len().min(WEB_SEARCH_PREVIEW_COUNT)]
        }
    }

    pub fn hidden_count(&self) -> usize {
        self.results.len().saturating_sub(WEB_SEARCH_PREVIEW_COUNT)
    }
}

/// Render tree for one message body.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentView {
    /// Null body.
    Empty,
    /// Empty block list.
    EmptySequence,
    Paragraph(String),
    Sequence(Vec<ContentView>),
    ToolUse(ToolUseView),
    ToolResult(ToolResultView),
    Thinking(ThinkingView),
    WebSearch(WebSearchView),
    /// Block of a type with no dedicated layout.
    Generic {
        kind: String,
        label: String,
        json: String,
    },
    /// Block that failed validation, shown as its raw JSON.
    Raw { title: String, json: String },
    RenderError {
        index: usize,
        message: String,
        json: String,
    },
}

pub(crate) fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub(crate) fn humanize_kind(kind: &str) -> String {
    kind.replace('_', " ")
}

/// Renders a message body: null, a string, one block or a list of blocks.
/// A block that fails to render is replaced by a `RenderError` panel and its
/// siblings are unaffected.
pub fn render_content(content: &Value) -> ContentView {
    match content {
        Value::Null => ContentView::Empty,
        Value::String(text) => ContentView::Paragraph(text.clone()),
        Value::Array(blocks) if blocks.is_empty() => ContentView::EmptySequence,
        Value::Array(blocks) => ContentView::Sequence(
            blocks
                .iter()
                .enumerate()
                .map(|(index, block)| render_guarded(index, block))
                .collect(),
        ),
        Value::Object(_) => render_guarded(0, content),
        other => ContentView::Raw {
            title: "Content".to_string(),
            json: pretty(other),
        },
    }
}

fn render_guarded(index: usize, block: &Value) -> ContentView {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| render_block(index, block)))
        .unwrap_or_else(|payload| Err(BlockRenderError::Panicked(panic_message(payload))));

    outcome.unwrap_or_else(|error| {
        warn!(index, %error, "content block failed to render");
        ContentView::RenderError {
            index,
            message: error.to_string(),
            json: pretty(block),
        }
    })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub fn render_block(index: usize, block: &Value) -> Result<ContentView, BlockRenderError> {
    let view = match ContentBlock::from_value(block) {
        ContentBlock::Text { text } => ContentView::Paragraph(text),
        ContentBlock::ToolUse { id, name, input } => ContentView::ToolUse(ToolUseView {
            details: preview_tool_input(&name, &input),
            id,
            name,
            server: false,
        }),
        ContentBlock::ServerToolUse { id, name, input } => ContentView::ToolUse(ToolUseView {
            details: preview_tool_input(&name, &input),
            id,
            name,
            server: true,
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            let (format, text) = classify_tool_result(&content);
            ContentView::ToolResult(ToolResultView {
                tool_use_id,
                is_error,
                format,
                body: Collapsible::new(text, TOOL_RESULT_PREVIEW_CHARS),
            })
        }
        ContentBlock::Thinking {
            thinking,
            signature,
        } => ContentView::Thinking(ThinkingView {
            redacted: false,
            signature_tail: signature
                .filter(|signature| !signature.is_empty())
                .map(|signature| short_id(&signature)),
            body: Collapsible::new(thinking, THINKING_PREVIEW_CHARS),
        }),
        ContentBlock::RedactedThinking { data } => ContentView::Thinking(ThinkingView {
            redacted: true,
            signature_tail: None,
            body: Collapsible::new(data, THINKING_PREVIEW_CHARS),
        }),
        ContentBlock::WebSearchToolResult {
            tool_use_id,
            content,
        } => {
            let results = match &content {
                Value::Null => Vec::new(),
                Value::Array(items) => items.iter().map(WebSearchResult::from_value).collect(),
                other => return Err(BlockRenderError::WebSearchNotAList(json_type_name(other))),
            };
            ContentView::WebSearch(WebSearchView {
                tool_use_id,
                results,
            })
        }
        ContentBlock::Unknown { kind, raw } => ContentView::Generic {
            label: humanize_kind(&kind),
            kind,
            json: pretty(&raw),
        },
        ContentBlock::Invalid { kind, raw, .. } => ContentView::Raw {
            title: match (kind, &raw) {
                (Some(kind), _) => format!("Invalid {kind} block {index}"),
                (None, Value::Object(_)) => format!("Untyped block {index}"),
                (None, Value::Null) => format!("Empty block at position {index}"),
                (None, _) => format!("Block {index}"),
            },
            json: pretty(&raw),
        },
    };
    Ok(view)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Display text and format for a tool result body. Non-string content and
/// strings holding valid JSON are pretty-printed; multi-line text with a
/// prompt character reads as terminal output.
pub fn classify_tool_result(content: &Value) -> (ResultFormat, String) {
    let text = match content {
        Value::String(text) => text,
        other => return (ResultFormat::Json, pretty(other)),
    };
    if let Ok(parsed) = serde_json::from_str::<Value>(text) {
        return (ResultFormat::Json, pretty(&parsed));
    }
    if text.contains('\n') && (text.contains('$') || text.contains('>')) {
        (ResultFormat::Terminal, text.clone())
    } else {
        (ResultFormat::Text, text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_string_and_empty_list() {
        assert_eq!(render_content(&Value::Null), ContentView::Empty);
        assert_eq!(
            render_content(&json!("hello")),
            ContentView::Paragraph("hello".to_string())
        );
        assert_eq!(render_content(&json!([])), ContentView::EmptySequence);
    }

    #[test]
    fn test_tool_result_json_string_is_pretty_printed() {
        let view = render_content(&json!({
            "type": "tool_result", "tool_use_id": "t1", "content": "{\"a\":1}"
        }));
        let ContentView::ToolResult(result) = view else {
            panic!("expected tool result, got {view:?}");
        };
        assert_eq!(result.format, ResultFormat::Json);
        assert_eq!(result.body.text, "{\n  \"a\": 1\n}");
        assert_eq!(result.title(), "Tool Result");
    }

    #[test]
    fn test_tool_result_plain_and_terminal_text() {
        let (format, text) = classify_tool_result(&json!("hello world"));
        assert_eq!(format, ResultFormat::Text);
        assert_eq!(text, "hello world");

        let (format, _) = classify_tool_result(&json!("$ ls\nsrc"));
        assert_eq!(format, ResultFormat::Terminal);

        let (format, text) = classify_tool_result(&json!([{ "type": "text", "text": "x" }]));
        assert_eq!(format, ResultFormat::Json);
        assert!(text.starts_with("[\n"));
    }

    #[test]
    fn test_tool_result_preview_truncates_at_limit() {
        let long = "x".repeat(250);
        let view = render_content(&json!({
            "type": "tool_result", "tool_use_id": "t1", "content": long, "is_error": true
        }));
        let ContentView::ToolResult(result) = view else {
            panic!("expected tool result");
        };
        assert!(result.body.is_long());
        assert_eq!(result.body.display(false), format!("{}...", "x".repeat(200)));
        assert_eq!(result.body.display(true).len(), 250);
        assert_eq!(result.title(), "Tool Error");
    }

    #[test]
    fn test_unknown_block_renders_generic_panel() {
        let view = render_content(&json!([{ "type": "image_ref", "x": 1 }]));
        let ContentView::Sequence(items) = view else {
            panic!("expected sequence");
        };
        let ContentView::Generic { kind, label, json } = &items[0] else {
            panic!("expected generic panel, got {:?}", items[0]);
        };
        assert_eq!(kind, "image_ref");
        assert_eq!(label, "image ref");
        assert!(json.contains("\"x\": 1"));
    }

    #[test]
    fn test_invalid_blocks_fall_back_to_raw_json() {
        let view = render_content(&json!([
            { "type": "tool_use", "name": "Read" },
            { "text": "untagged" },
            { "type": "text", "text": "ok" }
        ]));
        let ContentView::Sequence(items) = view else {
            panic!("expected sequence");
        };
        assert!(matches!(&items[0], ContentView::Raw { title, .. } if title == "Invalid tool_use block 0"));
        assert!(matches!(&items[1], ContentView::Raw { title, .. } if title == "Untyped block 1"));
        assert_eq!(items[2], ContentView::Paragraph("ok".to_string()));
    }

    #[test]
    fn test_bad_web_search_block_is_isolated() {
        let view = render_content(&json!([
            { "type": "web_search_tool_result", "tool_use_id": "srvtoolu_1", "content": "oops" },
            { "type": "text", "text": "after" }
        ]));
        let ContentView::Sequence(items) = view else {
            panic!("expected sequence");
        };
        assert!(matches!(
            &items[0],
            ContentView::RenderError { index: 0, message, .. } if message.contains("a string")
        ));
        assert_eq!(items[1], ContentView::Paragraph("after".to_string()));
    }

    #[test]
    fn test_web_search_preview_shows_three() {
        let results: Vec<_> = (0..5)
            .map(|i| json!({ "type": "web_search_result", "title": format!("r{i}"), "url": "https://example.com" }))
            .collect();
        let view = render_content(&json!({
            "type": "web_search_tool_result", "tool_use_id": "srvtoolu_1", "content": results
        }));
        let ContentView::WebSearch(search) = view else {
            panic!("expected web search");
        };
        assert_eq!(search.visible(false).len(), 3);
        assert_eq!(search.visible(true).len(), 5);
        assert_eq!(search.hidden_count(), 2);
    }

    #[test]
    fn test_thinking_keeps_signature_tail() {
        let view = render_content(&json!({
            "type": "thinking", "thinking": "hmm", "signature": "sig_0123456789"
        }));
        let ContentView::Thinking(thinking) = view else {
            panic!("expected thinking");
        };
        assert_eq!(thinking.signature_tail.as_deref(), Some("23456789"));
        assert!(!thinking.body.is_long());
        assert_eq!(thinking.title(), "Thinking");
    }

    #[test]
    fn test_long_thinking_collapses_at_limit() {
        let text = "z".repeat(400);
        let view = render_content(&json!({ "type": "thinking", "thinking": text }));
        let ContentView::Thinking(thinking) = view else {
            panic!("expected thinking");
        };
        assert!(thinking.body.is_long());
        assert_eq!(thinking.body.display(false), format!("{}...", "z".repeat(300)));
        assert_eq!(thinking.body.display(true), text);
        assert_eq!(thinking.signature_tail, None);
    }

    #[test]
    fn test_redacted_thinking_is_flagged() {
        let view = render_content(&json!([
            { "type": "redacted_thinking", "data": "EqoBCkgIARABGAIiQ" }
        ]));
        let ContentView::Sequence(items) = view else {
            panic!("expected sequence");
        };
        let ContentView::Thinking(thinking) = &items[0] else {
            panic!("expected thinking, got {:?}", items[0]);
        };
        assert!(thinking.redacted);
        assert_eq!(thinking.title(), "Redacted Thinking");
        assert_eq!(thinking.body.display(true), "EqoBCkgIARABGAIiQ");
        assert!(!thinking.body.is_long());
    }

    #[test]
    fn test_server_tool_use_title() {
        let view = render_content(&json!({
            "type": "server_tool_use", "id": "srvtoolu_abcdefgh12", "name": "web_search", "input": { "query": "rust" }
        }));
        let ContentView::ToolUse(tool) = view else {
            panic!("expected tool use");
        };
        assert_eq!(tool.title(), "web_search (server)");
        assert_eq!(tool.short_id(), "cdefgh12");
        assert!(matches!(tool.details[0], ToolDetail::Json(_)));
    }
}
