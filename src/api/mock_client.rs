use super::connection::{ByteStream, StreamOpener};
use super::error::StreamError;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted outcome of one `open` call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Yields the chunks, then ends the body.
    Chunks(Vec<Vec<u8>>),
    /// Yields the chunks, then never produces another item.
    ChunksThenPending(Vec<Vec<u8>>),
    /// Yields the chunks, then fails the read with the given message.
    ChunksThenError(Vec<Vec<u8>>, String),
    /// Rejects the request with this HTTP status.
    Status(u16),
    MissingBody,
}

/// In-memory [`StreamOpener`] that replays scripted responses in order.
#[derive(Clone, Default)]
pub struct MockStreamOpener {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockStreamOpener {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Builds a single-response opener from NDJSON lines, one chunk per line.
    pub fn from_lines(lines: &[&str]) -> Self {
        let chunks = lines
            .iter()
            .map(|line| format!("{line}\n").into_bytes())
            .collect();
        Self::new(vec![MockResponse::Chunks(chunks)])
    }

    pub fn push(&self, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
    }

    /// Streaming ids passed to `open`, in call order.
    pub fn opened_ids(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

fn chunk_stream(chunks: Vec<Vec<u8>>) -> impl futures::Stream<Item = Result<Bytes, StreamError>> {
    stream::iter(chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))))
}

impl StreamOpener for MockStreamOpener {
    fn open<'a>(&'a self, streaming_id: &'a str) -> BoxFuture<'a, Result<ByteStream, StreamError>> {
        Box::pin(async move {
            self.opened
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(streaming_id.to_string());

            let next = self
                .responses
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .pop_front();

            match next {
                None => Err(StreamError::Request(
                    "MockStreamOpener: no more responses configured".to_string(),
                )),
                Some(MockResponse::Chunks(chunks)) => Ok(Box::pin(chunk_stream(chunks)) as ByteStream),
                Some(MockResponse::ChunksThenPending(chunks)) => {
                    Ok(Box::pin(chunk_stream(chunks).chain(stream::pending())) as ByteStream)
                }
                Some(MockResponse::ChunksThenError(chunks, message)) => Ok(Box::pin(
                    chunk_stream(chunks).chain(stream::once(async move { Err(StreamError::Read(message)) })),
                ) as ByteStream),
                Some(MockResponse::Status(status)) => Err(StreamError::Status {
                    status,
                    reason: StatusCode::from_u16(status)
                        .ok()
                        .and_then(|status| status.canonical_reason())
                        .unwrap_or_default()
                        .to_string(),
                }),
                Some(MockResponse::MissingBody) => Err(StreamError::MissingBody),
            }
        })
    }
}
