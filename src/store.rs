//! The single state instance and the send flow.
//!
//! Transitions go through [`Store`]; each one publishes a fresh [`ChatState`]
//! snapshot on a watch channel that renderers subscribe to.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::client::ChatBackend;
use crate::session::{ChatState, PendingSend};

/// Result of one `send_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank draft or no running session; nothing happened.
    Skipped,
    Replied,
    Failed,
    /// The backend answered after the session was reset or restarted.
    Stale,
}

#[derive(Clone)]
pub struct Store {
    state: Arc<watch::Sender<ChatState>>,
    backend: Arc<dyn ChatBackend>,
}

impl Store {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        let (tx, _) = watch::channel(ChatState::new());
        Self {
            state: Arc::new(tx),
            backend,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    fn update<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let mut out = None;
        self.state.send_modify(|state| out = Some(f(state)));
        // send_modify always runs the closure
        out.unwrap_or_else(|| unreachable!())
    }

    pub fn select_celebrity(&self, name: &str) {
        self.update(|s| s.select_celebrity(name));
    }

    pub fn set_custom_name(&self, text: &str) {
        self.update(|s| s.set_custom_name(text));
    }

    pub fn draft_message(&self, text: &str) {
        self.update(|s| s.draft_message(text));
    }

    pub fn start_chat(&self) {
        self.update(ChatState::start_chat);
    }

    pub fn reset_session(&self) {
        self.update(ChatState::reset_session);
    }

    // Subscribers are only woken when the send actually touched the state.
    fn begin_send(&self) -> Option<PendingSend> {
        let mut pending = None;
        self.state.send_if_modified(|state| {
            pending = state.begin_send();
            pending.is_some()
        });
        pending
    }

    /// Sends the current draft.
    ///
    /// The user message is published before the request goes out; the reply
    /// (if any) is appended once the backend answers. Failures are logged and
    /// leave the user message in place.
    pub async fn send_message(&self) -> SendOutcome {
        match self.begin_send() {
            Some(pending) => self.finish_send(pending).await,
            None => SendOutcome::Skipped,
        }
    }

    /// Like `send_message`, but only the local half runs on the caller; the
    /// request and the reply are handled on a background task so the caller
    /// keeps taking input. Returns `None` when nothing was sent.
    pub fn spawn_send(&self) -> Option<JoinHandle<SendOutcome>> {
        let pending = self.begin_send()?;
        let store = self.clone();
        Some(tokio::spawn(async move { store.finish_send(pending).await }))
    }

    async fn finish_send(&self, pending: PendingSend) -> SendOutcome {
        let reply = match self.backend.chat(&pending.request).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                error!("Error sending message: {}", e);
                None
            }
        };
        let failed = reply.is_none();

        let mut appended = false;
        self.state.send_if_modified(|state| {
            appended = state.complete_send(&pending, reply);
            appended
        });

        if appended {
            info!(session_id = %pending.request.session_id, "Reply received");
            SendOutcome::Replied
        } else if failed {
            SendOutcome::Failed
        } else {
            SendOutcome::Stale
        }
    }
}
