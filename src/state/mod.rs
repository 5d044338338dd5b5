mod dispatcher;
mod session;
mod store;
mod ui;

pub use dispatcher::{apply_event, apply_transport_close, apply_transport_error, StreamDispatcher};
pub use session::StreamSession;
pub use store::ConversationStore;
pub use ui::{Notification, NotificationLevel, UiState, DEFAULT_NOTIFICATION_DURATION};

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything the front-end renders from.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub conversations: ConversationStore,
    pub ui: UiState,
}

impl AppState {
    pub fn new(ui: UiState) -> Self {
        Self {
            conversations: ConversationStore::new(),
            ui,
        }
    }
}

pub type SharedState = Arc<Mutex<AppState>>;

pub fn shared(state: AppState) -> SharedState {
    Arc::new(Mutex::new(state))
}

pub fn lock_state(state: &SharedState) -> Result<MutexGuard<'_, AppState>> {
    state
        .lock()
        .map_err(|_| anyhow!("application state lock poisoned"))
}
