use serde_json::Value;

const EDIT_PREVIEW_CHARS: usize = 50;
const MULTIEDIT_PREVIEW_CHARS: usize = 30;
const MULTIEDIT_PREVIEW_COUNT: usize = 2;
const TODO_PREVIEW_CHARS: usize = 40;
const TODO_PREVIEW_COUNT: usize = 3;
const PLAN_PREVIEW_CHARS: usize = 100;
const WRITE_PREVIEW_LINES: usize = 10;

/// One line (or block) of a tool invocation panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolDetail {
    /// `label: value`, the panel's main facts.
    Field { label: &'static str, value: String },
    /// Emphasized free text (task description, todo count).
    Heading(String),
    /// Secondary, muted line.
    Note(String),
    /// Monospace command text.
    Code(String),
    Removed(String),
    Added(String),
    Todo { status: String, content: String },
    /// Labeled preformatted block.
    Block { label: &'static str, text: String },
    /// Numbered preview of file content.
    Lines(String),
    /// Pretty JSON of the whole input, for tools without a dedicated layout.
    Json(String),
}

pub fn content_stats(content: &str) -> (usize, usize) {
    (
        content.chars().count(),
        content
            .lines()
            .count()
            .max(usize::from(!content.is_empty())),
    )
}

pub fn preview_lines(
    marker: Option<char>,
    text: &str,
    max_lines: usize,
    start_line: usize,
    indent: &str,
) -> String {
    if text.is_empty() {
        return match marker {
            Some(marker) => format!("{indent}{start_line} {marker} <empty>\n"),
            None => format!("{indent}{start_line}   <empty>\n"),
        };
    }

    let mut out = String::new();
    let lines: Vec<&str> = text.lines().collect();
    for (idx, line) in lines.iter().take(max_lines).enumerate() {
        let line_number = start_line + idx;
        match marker {
            Some(marker) => out.push_str(&format!("{indent}{line_number} {marker} {line}\n")),
            None => out.push_str(&format!("{indent}{line_number}   {line}\n")),
        }
    }
    if lines.len() > max_lines {
        out.push_str(&format!(
            "{indent}... ({} more lines)\n",
            lines.len() - max_lines
        ));
    }
    out
}

/// First `max_chars` characters, with `...` appended only when something was cut.
pub fn clip(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let kept: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{kept}...")
    } else {
        kept
    }
}

fn str_field<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

fn required(input: &Value, key: &str) -> String {
    str_field(input, key).unwrap_or("<missing>").to_string()
}

/// Display form of an optional argument, or `None` when it is absent, empty,
/// zero or false.
fn present(input: &Value, key: &str) -> Option<String> {
    match input.get(key)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn pretty_json(input: &Value) -> String {
    serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string())
}

fn file_field(input: &Value) -> ToolDetail {
    ToolDetail::Field {
        label: "File",
        value: required(input, "file_path"),
    }
}

fn push_note(details: &mut Vec<ToolDetail>, input: &Value, key: &str, label: &str) {
    if let Some(value) = present(input, key) {
        details.push(ToolDetail::Note(format!("{label}: {value}")));
    }
}

/// Structured panel lines for a tool invocation, keyed by tool name
/// (case-insensitive). Unknown tools show their input as pretty JSON.
pub fn preview_tool_input(tool_name: &str, input: &Value) -> Vec<ToolDetail> {
    let mut details = Vec::new();
    match tool_name.to_ascii_lowercase().as_str() {
        "read" => {
            details.push(file_field(input));
            push_note(&mut details, input, "offset", "Offset");
            push_note(&mut details, input, "limit", "Limit");
        }
        "edit" => {
            details.push(file_field(input));
            details.push(ToolDetail::Removed(clip(
                str_field(input, "old_string").unwrap_or_default(),
                EDIT_PREVIEW_CHARS,
            )));
            details.push(ToolDetail::Added(clip(
                str_field(input, "new_string").unwrap_or_default(),
                EDIT_PREVIEW_CHARS,
            )));
        }
        "multiedit" => {
            details.push(file_field(input));
            let edits = input
                .get("edits")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            details.push(ToolDetail::Note(format!("{} edits", edits.len())));
            for edit in edits.iter().take(MULTIEDIT_PREVIEW_COUNT) {
                details.push(ToolDetail::Removed(clip(
                    str_field(edit, "old_string").unwrap_or_default(),
                    MULTIEDIT_PREVIEW_CHARS,
                )));
                details.push(ToolDetail::Added(clip(
                    str_field(edit, "new_string").unwrap_or_default(),
                    MULTIEDIT_PREVIEW_CHARS,
                )));
            }
            if edits.len() > MULTIEDIT_PREVIEW_COUNT {
                details.push(ToolDetail::Note(format!(
                    "... and {} more",
                    edits.len() - MULTIEDIT_PREVIEW_COUNT
                )));
            }
        }
        "write" => {
            details.push(file_field(input));
            let content = str_field(input, "content").unwrap_or_default();
            let (chars, lines) = content_stats(content);
            details.push(ToolDetail::Note(format!(
                "content: {chars} chars, {lines} lines"
            )));
            details.push(ToolDetail::Lines(preview_lines(
                Some('+'),
                content,
                WRITE_PREVIEW_LINES,
                1,
                "",
            )));
        }
        "bash" => {
            details.push(ToolDetail::Code(required(input, "command")));
            push_note(&mut details, input, "description", "Description");
        }
        "grep" => {
            details.push(ToolDetail::Field {
                label: "Search",
                value: format!("\"{}\"", required(input, "pattern")),
            });
            push_note(&mut details, input, "path", "Path");
            push_note(&mut details, input, "include", "Include");
        }
        "websearch" => details.push(ToolDetail::Field {
            label: "Query",
            value: format!("\"{}\"", required(input, "query")),
        }),
        "webfetch" => {
            details.push(ToolDetail::Field {
                label: "URL",
                value: required(input, "url"),
            });
            push_note(&mut details, input, "prompt", "Prompt");
        }
        "todowrite" => {
            let todos = input
                .get("todos")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            details.push(ToolDetail::Heading(format!("{} todo items", todos.len())));
            for todo in todos.iter().take(TODO_PREVIEW_COUNT) {
                details.push(ToolDetail::Todo {
                    status: str_field(todo, "status").unwrap_or("pending").to_string(),
                    content: clip(
                        str_field(todo, "content").unwrap_or_default(),
                        TODO_PREVIEW_CHARS,
                    ),
                });
            }
            if todos.len() > TODO_PREVIEW_COUNT {
                details.push(ToolDetail::Note(format!(
                    "... and {} more",
                    todos.len() - TODO_PREVIEW_COUNT
                )));
            }
        }
        "task" => {
            details.push(ToolDetail::Heading(required(input, "description")));
            if let Some(prompt) = present(input, "prompt") {
                details.push(ToolDetail::Note(format!("\"{prompt}\"")));
            }
        }
        "exit_plan_mode" => details.push(ToolDetail::Block {
            label: "Plan",
            text: clip(
                str_field(input, "plan").unwrap_or_default(),
                PLAN_PREVIEW_CHARS,
            ),
        }),
        "glob" | "ls" => {
            details.push(ToolDetail::Field {
                label: "Path",
                value: str_field(input, "path").unwrap_or(".").to_string(),
            });
            push_note(&mut details, input, "pattern", "Pattern");
            push_note(&mut details, input, "include", "Include");
        }
        _ => details.push(ToolDetail::Json(pretty_json(input))),
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preview_lines_with_and_without_marker() {
        assert_eq!(preview_lines(Some('+'), "", 10, 1, "  "), "  1 + <empty>\n");
        assert_eq!(
            preview_lines(None, "a\nb", 10, 1, "  "),
            "  1   a\n  2   b\n"
        );
        assert_eq!(
            preview_lines(Some('+'), "a\nb\nc", 2, 1, ""),
            "1 + a\n2 + b\n... (1 more lines)\n"
        );
    }

    #[test]
    fn test_clip_marks_only_real_truncation() {
        assert_eq!(clip("short", 50), "short");
        assert_eq!(clip("abcdef", 3), "abc...");
        assert_eq!(clip("", 3), "");
    }

    #[test]
    fn test_read_shows_file_and_optional_range() {
        let details = preview_tool_input("Read", &json!({ "file_path": "/src/main.rs", "offset": 0, "limit": 40 }));
        assert_eq!(
            details,
            vec![
                ToolDetail::Field {
                    label: "File",
                    value: "/src/main.rs".to_string()
                },
                ToolDetail::Note("Limit: 40".to_string()),
            ]
        );
    }

    #[test]
    fn test_multiedit_previews_two_edits_and_counts_rest() {
        let edit = json!({ "old_string": "x".repeat(40), "new_string": "y" });
        let details = preview_tool_input(
            "MultiEdit",
            &json!({ "file_path": "a.rs", "edits": [edit.clone(), edit.clone(), edit] }),
        );
        assert_eq!(details[1], ToolDetail::Note("3 edits".to_string()));
        assert_eq!(details[2], ToolDetail::Removed(format!("{}...", "x".repeat(30))));
        assert_eq!(details[3], ToolDetail::Added("y".to_string()));
        assert_eq!(details.last(), Some(&ToolDetail::Note("... and 1 more".to_string())));
    }

    #[test]
    fn test_todowrite_lists_first_three() {
        let todos: Vec<_> = (0..5)
            .map(|i| json!({ "content": format!("item {i}"), "status": "in_progress" }))
            .collect();
        let details = preview_tool_input("TodoWrite", &json!({ "todos": todos }));
        assert_eq!(details[0], ToolDetail::Heading("5 todo items".to_string()));
        assert_eq!(
            details[1],
            ToolDetail::Todo {
                status: "in_progress".to_string(),
                content: "item 0".to_string()
            }
        );
        assert_eq!(details[4], ToolDetail::Note("... and 2 more".to_string()));
    }

    #[test]
    fn test_bash_and_write_layouts() {
        let details = preview_tool_input("Bash", &json!({ "command": "cargo fmt", "description": "Format" }));
        assert_eq!(details[0], ToolDetail::Code("cargo fmt".to_string()));
        assert_eq!(details[1], ToolDetail::Note("Description: Format".to_string()));

        let details = preview_tool_input("Write", &json!({ "file_path": "a.txt", "content": "one\ntwo" }));
        assert_eq!(details[1], ToolDetail::Note("content: 7 chars, 2 lines".to_string()));
        assert_eq!(details[2], ToolDetail::Lines("1 + one\n2 + two\n".to_string()));
    }

    #[test]
    fn test_unknown_tool_falls_back_to_pretty_json() {
        let details = preview_tool_input("mcp__custom", &json!({ "a": 1 }));
        assert_eq!(details, vec![ToolDetail::Json("{\n  \"a\": 1\n}".to_string())]);
    }
}
