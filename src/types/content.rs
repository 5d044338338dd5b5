use serde_json::{Map, Value};

/// A validated content block. Built from raw JSON by [`ContentBlock::from_value`],
/// which never fails: shapes it cannot accept become `Invalid` or `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ServerToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
        is_error: bool,
    },
    Thinking {
        thinking: String,
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
    WebSearchToolResult {
        tool_use_id: Option<String>,
        content: Value,
    },
    /// Tagged, but with a tag this client does not know.
    Unknown {
        kind: String,
        raw: Value,
    },
    /// Known tag with missing or mistyped required fields, or no tag at all.
    Invalid {
        kind: Option<String>,
        reason: String,
        raw: Value,
    },
}

/// One entry of a web search result list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebSearchResult {
    pub title: Option<String>,
    pub url: Option<String>,
    pub encrypted_content: bool,
    pub page_age: Option<String>,
}

impl WebSearchResult {
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            title: text("title"),
            url: text("url"),
            encrypted_content: value
                .get("encrypted_content")
                .and_then(Value::as_str)
                .is_some_and(|content| !content.is_empty()),
            page_age: text("page_age"),
        }
    }
}

fn required_str(map: &Map<String, Value>, key: &str) -> Result<String, String> {
    match map.get(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
        Some(Value::String(_)) => Err(format!("`{key}` is empty")),
        Some(_) => Err(format!("`{key}` is not a string")),
        None => Err(format!("missing `{key}`")),
    }
}

fn optional_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

impl ContentBlock {
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return ContentBlock::Invalid {
                kind: None,
                reason: "block is not an object".to_string(),
                raw: value.clone(),
            };
        };
        let Some(kind) = map.get("type").and_then(Value::as_str) else {
            return ContentBlock::Invalid {
                kind: None,
                reason: "missing `type`".to_string(),
                raw: value.clone(),
            };
        };

        let parsed = match kind {
            "text" => match map.get("text") {
                Some(Value::String(text)) => Ok(ContentBlock::Text { text: text.clone() }),
                Some(_) => Err("`text` is not a string".to_string()),
                None => Err("missing `text`".to_string()),
            },
            "tool_use" | "server_tool_use" => {
                let id = required_str(map, "id");
                let name = required_str(map, "name");
                match (id, name) {
                    (Ok(id), Ok(name)) => {
                        let input = map
                            .get("input")
                            .cloned()
                            .unwrap_or_else(|| Value::Object(Map::new()));
                        if kind == "tool_use" {
                            Ok(ContentBlock::ToolUse { id, name, input })
                        } else {
                            Ok(ContentBlock::ServerToolUse { id, name, input })
                        }
                    }
                    (Err(reason), _) | (_, Err(reason)) => Err(reason),
                }
            }
            "tool_result" => required_str(map, "tool_use_id").and_then(|tool_use_id| {
                let content = map
                    .get("content")
                    .cloned()
                    .ok_or_else(|| "missing `content`".to_string())?;
                Ok(ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error: map
                        .get("is_error")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                })
            }),
            "thinking" => match map.get("thinking") {
                Some(Value::String(thinking)) => Ok(ContentBlock::Thinking {
                    thinking: thinking.clone(),
                    signature: optional_str(map, "signature"),
                }),
                _ => Err("missing `thinking`".to_string()),
            },
            "redacted_thinking" => Ok(ContentBlock::RedactedThinking {
                data: optional_str(map, "data").unwrap_or_default(),
            }),
            "web_search_tool_result" => Ok(ContentBlock::WebSearchToolResult {
                tool_use_id: optional_str(map, "tool_use_id"),
                content: map.get("content").cloned().unwrap_or(Value::Null),
            }),
            other => Ok(ContentBlock::Unknown {
                kind: other.to_string(),
                raw: value.clone(),
            }),
        };

        parsed.unwrap_or_else(|reason| ContentBlock::Invalid {
            kind: Some(kind.to_string()),
            reason,
            raw: value.clone(),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::ToolUse { .. } => "tool_use",
            ContentBlock::ServerToolUse { .. } => "server_tool_use",
            ContentBlock::ToolResult { .. } => "tool_result",
            ContentBlock::Thinking { .. } => "thinking",
            ContentBlock::RedactedThinking { .. } => "redacted_thinking",
            ContentBlock::WebSearchToolResult { .. } => "web_search_tool_result",
            ContentBlock::Unknown { kind, .. } => kind,
            ContentBlock::Invalid { kind, .. } => kind.as_deref().unwrap_or("untyped"),
        }
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, ContentBlock::ToolResult { .. })
    }
}
