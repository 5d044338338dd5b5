mod api;
mod content;
mod events;

pub use api::*;
pub use content::{ContentBlock, WebSearchResult};
pub use events::{
    AssistantEvent, AssistantMessage, ClosedEvent, ConnectedEvent, ErrorEvent, McpServerStatus,
    PermissionRequestEvent, ResultEvent, ServerToolUsage, StreamEvent, SystemEvent, Usage,
    UserEvent, UserMessage,
};
