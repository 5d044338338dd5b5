use super::error::{describe_request_error, StreamError};
use super::stream::NdjsonParser;
use crate::config::Config;
use crate::types::StreamEvent;
use crate::util::endpoint_url;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

pub type MessageHandler = Box<dyn FnMut(&StreamEvent) -> anyhow::Result<()> + Send>;
pub type ErrorHandler = Box<dyn FnMut(&str) -> anyhow::Result<()> + Send>;
pub type CloseHandler = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// Opens the raw byte body of one conversation stream.
pub trait StreamOpener: Send + Sync {
    fn open<'a>(&'a self, streaming_id: &'a str) -> BoxFuture<'a, Result<ByteStream, StreamError>>;
}

/// Opens `GET {base}/api/stream/{id}` over HTTP.
#[derive(Clone)]
pub struct HttpStreamOpener {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStreamOpener {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        // No total timeout: the body stays open for the life of the conversation.
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
        })
    }

    pub fn stream_url(&self, streaming_id: &str) -> Result<reqwest::Url, StreamError> {
        endpoint_url(&self.base_url, &["api", "stream", streaming_id])
            .map_err(|error| StreamError::InvalidUrl(error.to_string()))
    }
}

impl StreamOpener for HttpStreamOpener {
    fn open<'a>(&'a self, streaming_id: &'a str) -> BoxFuture<'a, Result<ByteStream, StreamError>> {
        Box::pin(async move {
            let url = self.stream_url(streaming_id)?;
            debug!(%url, "opening conversation stream");

            let response = self
                .http
                .get(url.clone())
                .header(ACCEPT, "application/x-ndjson")
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .await
                .map_err(|error| StreamError::Request(describe_request_error(&error, url.as_str())))?;

            let status = response.status();
            if !status.is_success() {
                return Err(StreamError::Status {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or_default().to_string(),
                });
            }
            if status == StatusCode::NO_CONTENT {
                return Err(StreamError::MissingBody);
            }

            let body = response
                .bytes_stream()
                .map(|item| item.map_err(|error| StreamError::Read(error.to_string())));
            Ok(Box::pin(body) as ByteStream)
        })
    }
}

/// Cloneable remote control for a running [`StreamConnection`].
#[derive(Clone)]
pub struct DisconnectHandle {
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
}

impl DisconnectHandle {
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

enum ReadStep {
    Chunk(Bytes),
    Failed(StreamError),
    Done,
    Cancelled,
}

/// One live connection to one streaming id.
///
/// Single-use: once closed (end of body, read failure or disconnect) it never
/// emits again and cannot be reconnected.
pub struct StreamConnection {
    streaming_id: String,
    opener: Arc<dyn StreamOpener>,
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    closed: bool,
    body: Option<ByteStream>,
    parser: NdjsonParser,
    message_handlers: Vec<MessageHandler>,
    error_handlers: Vec<ErrorHandler>,
    close_handlers: Vec<CloseHandler>,
}

impl StreamConnection {
    pub fn new(streaming_id: impl Into<String>, opener: Arc<dyn StreamOpener>) -> Self {
        Self {
            streaming_id: streaming_id.into(),
            opener,
            cancel: CancellationToken::new(),
            connected: Arc::new(AtomicBool::new(false)),
            closed: false,
            body: None,
            parser: NdjsonParser::new(),
            message_handlers: Vec::new(),
            error_handlers: Vec::new(),
            close_handlers: Vec::new(),
        }
    }

    pub fn streaming_id(&self) -> &str {
        &self.streaming_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn on_message(
        &mut self,
        handler: impl FnMut(&StreamEvent) -> anyhow::Result<()> + Send + 'static,
    ) {
        self.message_handlers.push(Box::new(handler));
    }

    pub fn on_error(&mut self, handler: impl FnMut(&str) -> anyhow::Result<()> + Send + 'static) {
        self.error_handlers.push(Box::new(handler));
    }

    pub fn on_close(&mut self, handler: impl FnMut() -> anyhow::Result<()> + Send + 'static) {
        self.close_handlers.push(Box::new(handler));
    }

    pub fn disconnect_handle(&self) -> DisconnectHandle {
        DisconnectHandle {
            cancel: self.cancel.clone(),
            connected: Arc::clone(&self.connected),
        }
    }

    /// Issues the stream request. Failures are reported to the error handlers
    /// and returned; a cancelled attempt is returned silently.
    pub async fn connect(&mut self) -> Result<(), StreamError> {
        if self.is_connected() {
            return Err(StreamError::AlreadyConnected);
        }
        if self.closed || self.cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }

        let opened = tokio::select! {
            _ = self.cancel.cancelled() => Err(StreamError::Cancelled),
            opened = self.opener.open(&self.streaming_id) => opened,
        };

        match opened {
            Ok(body) => {
                self.body = Some(body);
                self.connected.store(true, Ordering::SeqCst);
                debug!(streaming_id = %self.streaming_id, "stream connected");
                Ok(())
            }
            Err(StreamError::Cancelled) => Err(StreamError::Cancelled),
            Err(error) => {
                self.connected.store(false, Ordering::SeqCst);
                self.notify_error(&format!("Connection failed: {error}"));
                Err(error)
            }
        }
    }

    /// Drives the read loop until end of body, a read failure or cancellation,
    /// then notifies close exactly once.
    pub async fn run(&mut self) {
        if self.body.is_none() {
            return;
        }

        loop {
            let step = match self.body.as_mut() {
                Some(body) => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => ReadStep::Cancelled,
                        item = body.next() => match item {
                            Some(Ok(bytes)) => ReadStep::Chunk(bytes),
                            Some(Err(error)) => ReadStep::Failed(error),
                            None => ReadStep::Done,
                        },
                    }
                }
                None => ReadStep::Cancelled,
            };

            match step {
                ReadStep::Chunk(bytes) => {
                    for event in self.parser.process(&bytes) {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        self.notify_message(&event);
                    }
                }
                ReadStep::Failed(error) => {
                    if !self.cancel.is_cancelled() {
                        self.notify_error(&format!("Stream read error: {error}"));
                    }
                    break;
                }
                ReadStep::Done => {
                    if let Some(event) = self.parser.finish() {
                        self.notify_message(&event);
                    }
                    break;
                }
                ReadStep::Cancelled => break,
            }
        }

        self.handle_close();
    }

    /// Cancels any in-flight read and releases the body. Idempotent; never
    /// reports an error.
    pub fn disconnect(&mut self) {
        self.cancel.cancel();
        self.connected.store(false, Ordering::SeqCst);
        if self.body.is_some() {
            self.handle_close();
        }
    }

    fn handle_close(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        self.body = None;
        if self.closed {
            return;
        }
        self.closed = true;
        debug!(streaming_id = %self.streaming_id, "stream closed");
        for handler in &mut self.close_handlers {
            report_handler_outcome("close", catch_unwind(AssertUnwindSafe(|| handler())));
        }
    }

    fn notify_message(&mut self, event: &StreamEvent) {
        for handler in &mut self.message_handlers {
            report_handler_outcome("message", catch_unwind(AssertUnwindSafe(|| handler(event))));
        }
    }

    fn notify_error(&mut self, message: &str) {
        for handler in &mut self.error_handlers {
            report_handler_outcome("error", catch_unwind(AssertUnwindSafe(|| handler(message))));
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn report_handler_outcome(kind: &str, outcome: Result<anyhow::Result<()>, Box<dyn Any + Send>>) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(failure)) => warn!(handler = kind, "stream handler failed: {failure:#}"),
        Err(payload) => error!(
            handler = kind,
            "stream handler panicked: {}",
            panic_message(payload.as_ref())
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
