use ccui::transcript::{
    filter_visible, group_entries_at, merge_transcript, render_content, render_entry, ContentView,
    EntryKind, GroupKind, ResultFormat,
};
use ccui::types::{ConversationMessage, StreamEvent};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

fn message(uuid: &str, role: &str, body: Value, extra: Value) -> ConversationMessage {
    let mut value = json!({
        "uuid": uuid,
        "type": role,
        "message": body,
        "sessionId": "abc",
    });
    if let (Some(target), Value::Object(extra)) = (value.as_object_mut(), extra) {
        target.extend(extra);
    }
    serde_json::from_value(value).unwrap()
}

fn tool_result_body(content: Value) -> Value {
    json!({
        "role": "user",
        "content": [{"type": "tool_result", "tool_use_id": "toolu_1", "content": content}]
    })
}

fn history() -> Vec<ConversationMessage> {
    vec![
        message("A", "user", json!("fix the tests"), json!({"timestamp": "2025-01-01T10:00:00Z"})),
        message(
            "B",
            "assistant",
            json!({"content": [{"type": "text", "text": "Looking"}]}),
            json!({"timestamp": "2025-01-01T10:00:05Z", "costUSD": 0.02, "durationMs": 1500.0}),
        ),
        message(
            "C",
            "user",
            tool_result_body(json!("ok")),
            json!({"timestamp": "2025-01-01T10:00:09Z"}),
        ),
        message("D", "user", json!("thanks"), json!({"timestamp": "2025-01-01T10:01:00Z"})),
        message(
            "E",
            "assistant",
            json!({"content": [{"type": "text", "text": "Done"}]}),
            json!({"timestamp": "2025-01-01T10:01:02Z", "costUSD": 0.01}),
        ),
        message("F", "system", json!("compacted"), json!({})),
    ]
}

fn uuids(entries: &[ccui::transcript::TranscriptEntry<'_>]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| match entry.source {
            ccui::transcript::EntrySource::Persisted(message) => message.uuid.clone(),
            ccui::transcript::EntrySource::Live(event) => event.tag().to_string(),
        })
        .collect()
}

#[test]
fn test_history_groups_into_user_and_agent_runs() {
    let messages = history();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let entries = merge_transcript(&messages, &[], "abc", None);
    let groups = group_entries_at(&entries, now);

    let shape: Vec<_> = groups
        .iter()
        .map(|group| (group.header.kind, uuids(&group.entries)))
        .collect();
    assert_eq!(
        shape,
        vec![
            (GroupKind::User, vec!["A".to_string()]),
            (GroupKind::Agent, vec!["B".to_string(), "C".to_string()]),
            (GroupKind::User, vec!["D".to_string()]),
            (GroupKind::Agent, vec!["E".to_string(), "F".to_string()]),
        ]
    );

    assert_eq!(groups[1].header.total_cost, Some(0.02));
    assert_eq!(groups[1].header.total_duration_ms, Some(1500.0));
    assert_eq!(groups[1].header.latest_timestamp, "2025-01-01T10:00:09Z");
    assert_eq!(groups[0].header.total_cost, None);
    assert_eq!(groups[3].header.latest_timestamp, "2025-01-01T10:01:02Z");
}

#[test]
fn test_system_message_joins_following_agent_run() {
    let messages = vec![
        message("A", "user", json!("hi"), json!({})),
        message("B", "assistant", json!("one"), json!({})),
        message("C", "assistant", json!("two"), json!({})),
        message("D", "user", json!("more"), json!({})),
        message("E", "system", json!("note"), json!({})),
        message("F", "assistant", json!("three"), json!({})),
    ];
    let entries = merge_transcript(&messages, &[], "abc", None);
    let groups = group_entries_at(&entries, Utc::now());

    let members: Vec<_> = groups.iter().map(|group| uuids(&group.entries)).collect();
    assert_eq!(
        members,
        vec![vec!["A"], vec!["B", "C"], vec!["D"], vec!["E", "F"]]
    );
    let kinds: Vec<_> = groups.iter().map(|group| group.header.kind).collect();
    assert_eq!(
        kinds,
        vec![GroupKind::User, GroupKind::Agent, GroupKind::User, GroupKind::Agent]
    );
}

#[test]
fn test_cost_rollup_skips_missing_values() {
    let messages = vec![
        message("B", "assistant", json!("a"), json!({"costUSD": 0.02})),
        message("C", "assistant", json!("b"), json!({})),
        message("E", "assistant", json!("c"), json!({"costUSD": 0.01})),
    ];
    let entries = merge_transcript(&messages, &[], "abc", None);
    let groups = group_entries_at(&entries, Utc::now());
    assert_eq!(groups.len(), 1);
    let total = groups[0].header.total_cost.unwrap();
    assert!((total - 0.03).abs() < 1e-12);

    let uncosted = vec![
        message("B", "assistant", json!("a"), json!({})),
        message("C", "assistant", json!("b"), json!({})),
    ];
    let entries = merge_transcript(&uncosted, &[], "abc", None);
    let groups = group_entries_at(&entries, Utc::now());
    assert_eq!(groups[0].header.total_cost, None);
    assert_eq!(groups[0].header.total_duration_ms, None);
}

#[test]
fn test_group_without_timestamps_uses_now() {
    let messages = vec![message("F", "system", json!("compacted"), json!({}))];
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
    let entries = merge_transcript(&messages, &[], "abc", None);
    let groups = group_entries_at(&entries, now);
    assert_eq!(groups[0].header.latest_timestamp, "2025-06-01T12:30:00.000Z");
}

#[test]
fn test_user_message_with_tool_result_is_reclassified_and_hidden() {
    let messages = history();
    let entries = merge_transcript(&messages, &[], "abc", None);
    assert_eq!(entries[2].kind, EntryKind::ToolResult);
    assert_eq!(entries[3].kind, EntryKind::User);

    let hidden = filter_visible(entries.clone(), false);
    assert_eq!(uuids(&hidden), vec!["A", "B", "D", "E", "F"]);
    let shown = filter_visible(entries, true);
    assert_eq!(shown.len(), 6);
}

#[test]
fn test_live_events_append_only_for_streamed_session() {
    let messages = history();
    let live = vec![
        StreamEvent::from_value(json!({"type": "connected", "streaming_id": "s-1"})),
        StreamEvent::from_value(json!({
            "type": "result", "cost_usd": 0.05, "duration_ms": 2000.0, "is_error": false
        })),
    ];

    let entries = merge_transcript(&messages, &live, "s-1", Some("s-1"));
    assert_eq!(entries.len(), 8);
    assert_eq!(entries[7].cost_usd(), Some(0.05));

    let entries = merge_transcript(&messages, &live, "s-1", Some("s-2"));
    assert_eq!(entries.len(), 6);
    let entries = merge_transcript(&messages, &[], "s-1", Some("s-1"));
    assert_eq!(entries.len(), 6);
}

#[test]
fn test_tool_result_json_and_text_bodies() {
    let messages = vec![
        message("J", "user", tool_result_body(json!("{\"a\":1}")), json!({})),
        message("T", "user", tool_result_body(json!("plain output")), json!({})),
    ];
    let entries = merge_transcript(&messages, &[], "abc", None);

    let formats: Vec<_> = entries
        .iter()
        .map(|entry| match render_entry(entry) {
            ContentView::Sequence(views) => match &views[0] {
                ContentView::ToolResult(result) => (result.format, result.body.display(true)),
                other => panic!("expected tool result, got {other:?}"),
            },
            other => panic!("expected sequence, got {other:?}"),
        })
        .collect();
    assert_eq!(
        formats,
        vec![
            (ResultFormat::Json, "{\n  \"a\": 1\n}".to_string()),
            (ResultFormat::Text, "plain output".to_string()),
        ]
    );
}

#[test]
fn test_unknown_block_type_renders_generically() {
    let view = render_content(&json!([
        {"type": "text", "text": "before"},
        {"type": "image_gallery", "images": []}
    ]));
    let ContentView::Sequence(views) = view else {
        panic!("expected sequence");
    };
    assert_eq!(views[0], ContentView::Paragraph("before".to_string()));
    match &views[1] {
        ContentView::Generic { kind, label, json } => {
            assert_eq!(kind, "image_gallery");
            assert_eq!(label, "image gallery");
            assert!(json.contains("\"images\""));
        }
        other => panic!("expected generic view, got {other:?}"),
    }
}

#[test]
fn test_persisted_body_without_content_renders_as_panel() {
    let messages = vec![message("S", "system", json!({"subtype": "compact"}), json!({}))];
    let entries = merge_transcript(&messages, &[], "abc", None);
    assert!(matches!(
        render_entry(&entries[0]),
        ContentView::Generic { ref kind, .. } if kind == "system"
    ));
}
