use crate::api::logging;
use crate::types::StreamEvent;
use serde_json::Value;

/// Incremental NDJSON framer for the conversation stream.
///
/// Bytes are buffered and split on `\n` before any UTF-8 decoding, so a
/// multi-byte character split across two chunks is decoded whole.
#[derive(Debug, Default)]
pub struct NdjsonParser {
    buffer: Vec<u8>,
    dropped_lines: usize,
}

impl NdjsonParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].iter().position(|byte| *byte == b'\n') {
            let line_end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..line_end]).into_owned();
            if let Some(event) = self.parse_line(&line) {
                events.push(event);
            }
            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        events
    }

    /// Flushes the trailing fragment at end of body. A fragment that does not
    /// parse is dropped like any other bad line.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let remainder = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&remainder).into_owned();
        self.parse_line(&line)
    }

    /// Bytes received after the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    fn parse_line(&mut self, line: &str) -> Option<StreamEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(value) => Some(StreamEvent::from_value(value)),
            Err(error) => {
                self.dropped_lines += 1;
                logging::emit_frame_parse_error(line, &error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_fragment_waits_for_newline() {
        let mut parser = NdjsonParser::new();
        let events = parser.process(br#"{"type":"connected","streaming_id":"s"}"#);
        assert!(events.is_empty());
        assert!(!parser.pending().is_empty());

        let events = parser.process(b"\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tag(), "connected");
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn test_blank_and_whitespace_lines_are_skipped() {
        let mut parser = NdjsonParser::new();
        let events = parser.process(b"\n   \r\n\t\n{\"type\":\"closed\"}\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(parser.dropped_lines(), 0);
    }

    #[test]
    fn test_finish_flushes_parseable_fragment_only() {
        let mut parser = NdjsonParser::new();
        parser.process(br#"{"type":"closed"}"#);
        assert_eq!(parser.finish().map(|event| event.tag().to_string()), Some("closed".to_string()));
        assert!(parser.finish().is_none());

        parser.process(b"{\"type\":");
        assert!(parser.finish().is_none());
        assert_eq!(parser.dropped_lines(), 1);
    }
}
