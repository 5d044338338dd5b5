use ccui::api::NdjsonParser;
use ccui::types::StreamEvent;

fn tags(events: &[StreamEvent]) -> Vec<String> {
    events.iter().map(|event| event.tag().to_string()).collect()
}

#[test]
fn test_lines_split_at_every_byte_boundary() {
    let body = concat!(
        "{\"type\":\"connected\",\"streaming_id\":\"s-1\"}\n",
        "{\"type\":\"assistant\",\"message\":{\"content\":[{\"type\":\"text\",\"text\":\"Hi\"}]},\"session_id\":\"abc\"}\n",
        "{\"type\":\"result\",\"cost_usd\":0.05,\"is_error\":false,\"duration_ms\":2000}\n",
    )
    .as_bytes();

    for split in 0..=body.len() {
        let mut parser = NdjsonParser::new();
        let mut events = parser.process(&body[..split]);
        events.extend(parser.process(&body[split..]));
        assert_eq!(
            tags(&events),
            vec!["connected", "assistant", "result"],
            "split at {split}"
        );
        assert!(parser.pending().is_empty());
    }
}

#[test]
fn test_multibyte_character_split_across_chunks() {
    let line = "{\"type\":\"assistant\",\"message\":{\"content\":[{\"type\":\"text\",\"text\":\"caf\u{e9} \u{1f600}\"}]}}\n";
    let bytes = line.as_bytes();
    let emoji_start = line.find('\u{1f600}').unwrap();

    let mut parser = NdjsonParser::new();
    assert!(parser.process(&bytes[..emoji_start + 2]).is_empty());
    let events = parser.process(&bytes[emoji_start + 2..]);

    assert_eq!(events.len(), 1);
    let StreamEvent::Assistant(event) = &events[0] else {
        panic!("expected assistant event, got {:?}", events[0]);
    };
    assert_eq!(event.message.content[0]["text"], "caf\u{e9} \u{1f600}");
}

#[test]
fn test_bad_line_does_not_affect_neighbours() {
    let mut parser = NdjsonParser::new();
    let events = parser.process(
        b"{\"type\":\"connected\",\"streaming_id\":\"s\"}\n{not json\n{\"type\":\"closed\"}\n",
    );

    assert_eq!(tags(&events), vec!["connected", "closed"]);
    assert_eq!(parser.dropped_lines(), 1);
}

#[test]
fn test_unknown_tag_is_kept_as_unrecognized() {
    let mut parser = NdjsonParser::new();
    let events = parser.process(b"{\"type\":\"heartbeat\",\"n\":1}\n");

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], StreamEvent::Unrecognized(_)));
    assert_eq!(events[0].tag(), "heartbeat");
}

#[test]
fn test_crlf_and_blank_lines_are_tolerated() {
    let mut parser = NdjsonParser::new();
    let events = parser.process(b"\r\n{\"type\":\"closed\"}\r\n\n   \n");

    assert_eq!(tags(&events), vec!["closed"]);
    assert_eq!(parser.dropped_lines(), 0);
}

#[test]
fn test_unterminated_tail_is_flushed_on_finish() {
    let mut parser = NdjsonParser::new();
    assert!(parser.process(b"{\"type\":\"closed\"}").is_empty());
    assert_eq!(parser.pending(), b"{\"type\":\"closed\"}");

    let tail = parser.finish();
    assert!(matches!(tail, Some(StreamEvent::Closed(_))));
    assert!(parser.finish().is_none());
}
