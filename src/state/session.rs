use super::{lock_state, SharedState, StreamDispatcher};
use crate::api::{DisconnectHandle, StreamConnection, StreamOpener};
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

struct ActiveStream {
    streaming_id: String,
    handle: DisconnectHandle,
    task: JoinHandle<()>,
    joined: bool,
}

impl ActiveStream {
    async fn join(&mut self) {
        if self.joined {
            return;
        }
        let outcome = (&mut self.task).await;
        self.joined = true;
        if let Err(join_error) = outcome {
            if join_error.is_panic() {
                error!(streaming_id = %self.streaming_id, "stream task panicked");
            }
        }
    }
}

/// Owns at most one live connection and keeps the store pointed at it.
pub struct StreamSession {
    state: SharedState,
    opener: Arc<dyn StreamOpener>,
    active: Option<ActiveStream>,
}

impl StreamSession {
    pub fn new(state: SharedState, opener: Arc<dyn StreamOpener>) -> Self {
        Self {
            state,
            opener,
            active: None,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn streaming_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.streaming_id.as_str())
    }

    pub fn is_connected(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.handle.is_connected())
    }

    /// Switches the view to `streaming_id`. The previous connection is fully
    /// torn down before the new one is opened; selecting the current id is a
    /// no-op and `None` just clears.
    ///
    /// A connect failure has already been reported through the error
    /// handlers when it is returned here.
    pub async fn select(&mut self, streaming_id: Option<&str>) -> Result<()> {
        if streaming_id.is_some() && self.streaming_id() == streaming_id {
            return Ok(());
        }

        self.teardown().await;

        let Some(streaming_id) = streaming_id else {
            lock_state(&self.state)?.conversations.switch_streaming_id(None);
            return Ok(());
        };

        {
            let mut state = lock_state(&self.state)?;
            state
                .conversations
                .switch_streaming_id(Some(streaming_id.to_string()));
            state.conversations.reset_session_cost();
        }

        let mut connection = StreamConnection::new(streaming_id, Arc::clone(&self.opener));
        StreamDispatcher::new(Arc::clone(&self.state)).attach(&mut connection);
        let handle = connection.disconnect_handle();

        connection.connect().await?;

        debug!(streaming_id, "spawning stream read loop");
        let task = tokio::spawn(async move {
            connection.run().await;
        });
        self.active = Some(ActiveStream {
            streaming_id: streaming_id.to_string(),
            handle,
            task,
            joined: false,
        });
        Ok(())
    }

    /// Manual stop: closes the connection and forgets the streaming id while
    /// keeping the buffered transcript.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.teardown().await;
        let mut state = lock_state(&self.state)?;
        state.conversations.set_current_streaming_id(None);
        state.conversations.set_is_streaming(false);
        Ok(())
    }

    /// Waits for the active read loop to finish on its own.
    pub async fn wait(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.join().await;
        }
    }

    async fn teardown(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        debug!(streaming_id = %active.streaming_id, "tearing down stream");
        active.handle.disconnect();
        active.join().await;
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.handle.disconnect();
        }
    }
}
