use super::PermissionRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const KNOWN_TAGS: [&str; 8] = [
    "connected",
    "error",
    "closed",
    "system",
    "assistant",
    "user",
    "result",
    "permission_request",
];

/// One line of the live stream, classified by its `type` tag.
///
/// Lines whose tag is unknown, or whose payload does not fit the shape of a
/// known tag, become [`StreamEvent::Unrecognized`] with the raw JSON kept
/// intact so the transcript can still show them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Connected(ConnectedEvent),
    Error(ErrorEvent),
    Closed(ClosedEvent),
    System(SystemEvent),
    Assistant(AssistantEvent),
    User(UserEvent),
    Result(ResultEvent),
    PermissionRequest(PermissionRequestEvent),
    #[serde(skip)]
    Unrecognized(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectedEvent {
    #[serde(default)]
    pub streaming_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error: String,
    #[serde(rename = "streamingId", default)]
    pub streaming_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosedEvent {
    #[serde(rename = "streamingId", default)]
    pub streaming_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerStatus {
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub subtype: String,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub mcp_servers: Vec<McpServerStatus>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(rename = "permissionMode", default)]
    pub permission_mode: Option<String>,
    #[serde(rename = "apiKeySource", default)]
    pub api_key_source: Option<String>,
}

impl SystemEvent {
    pub fn is_init(&self) -> bool {
        self.subtype == "init"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerToolUsage {
    #[serde(default)]
    pub web_search_requests: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    pub server_tool_use: Option<ServerToolUsage>,
    #[serde(default)]
    pub service_tier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub content: Vec<Value>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantEvent {
    pub message: AssistantMessage,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    pub message: UserMessage,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEvent {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub duration_api_ms: Option<f64>,
    #[serde(default)]
    pub num_turns: Option<u32>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default)]
    pub usage: Option<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequestEvent {
    pub data: PermissionRequest,
    #[serde(rename = "streamingId", default)]
    pub streaming_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl StreamEvent {
    /// Classifies one decoded JSON line. Never fails: anything that does not
    /// validate against its tag is kept as `Unrecognized`.
    pub fn from_value(value: Value) -> Self {
        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return StreamEvent::Unrecognized(value);
        };
        if !KNOWN_TAGS.contains(&tag) {
            return StreamEvent::Unrecognized(value);
        }

        match serde_json::from_value::<StreamEvent>(value.clone()) {
            Ok(event) => event,
            Err(error) => {
                warn!(tag, %error, "stream event failed validation; keeping raw payload");
                StreamEvent::Unrecognized(value)
            }
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            StreamEvent::Connected(_) => "connected",
            StreamEvent::Error(_) => "error",
            StreamEvent::Closed(_) => "closed",
            StreamEvent::System(_) => "system",
            StreamEvent::Assistant(_) => "assistant",
            StreamEvent::User(_) => "user",
            StreamEvent::Result(_) => "result",
            StreamEvent::PermissionRequest(_) => "permission_request",
            StreamEvent::Unrecognized(raw) => raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        match self {
            StreamEvent::Connected(event) => event.timestamp.as_deref(),
            StreamEvent::Error(event) => event.timestamp.as_deref(),
            StreamEvent::Closed(event) => event.timestamp.as_deref(),
            StreamEvent::PermissionRequest(event) => event.timestamp.as_deref(),
            StreamEvent::Unrecognized(raw) => raw.get("timestamp").and_then(Value::as_str),
            _ => None,
        }
    }

    /// JSON form of the event, as shown by generic panels.
    pub fn to_json(&self) -> Value {
        match self {
            StreamEvent::Unrecognized(raw) => raw.clone(),
            other => serde_json::to_value(other).unwrap_or(Value::Null),
        }
    }
}
