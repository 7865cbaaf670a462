//! Local chat state: celebrity selection, draft, history and the session lifecycle.
//!
//! `ChatState` is a plain value. Every user action is a transition method on it,
//! and renderers work from clones (snapshots) published by [`crate::store::Store`].

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::ChatRequest;
use crate::constants::CUSTOM_SENTINEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the history. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What the selection control currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Unselected,
    Listed(String),
    /// The custom sentinel: the name comes from the free-text field.
    Custom,
}

impl Selection {
    pub fn parse(value: &str) -> Self {
        match value {
            CUSTOM_SENTINEL => Selection::Custom,
            v if v.trim().is_empty() => Selection::Unselected,
            v => Selection::Listed(v.to_string()),
        }
    }

    /// The raw value a selection control would show.
    pub fn as_value(&self) -> &str {
        match self {
            Selection::Unselected => "",
            Selection::Listed(name) => name,
            Selection::Custom => CUSTOM_SENTINEL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    NotStarted,
    Active,
}

/// A send that has been applied locally and is waiting for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub request: ChatRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    draft: String,
    history: Vec<ChatMessage>,
    selection: Selection,
    custom_name: String,
    session_id: Option<String>,
    started: bool,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn custom_name(&self) -> &str {
        &self.custom_name
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn phase(&self) -> Phase {
        if self.started {
            Phase::Active
        } else {
            Phase::NotStarted
        }
    }

    /// The name the backend is asked to impersonate: the custom text when the
    /// sentinel is selected, the literal selection otherwise.
    pub fn celebrity_name(&self) -> &str {
        match &self.selection {
            Selection::Unselected => "",
            Selection::Listed(name) => name,
            Selection::Custom => &self.custom_name,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.selection == Selection::Custom
    }

    /// Advisory for renderers; `start_chat` does not check it.
    pub fn can_start(&self) -> bool {
        !self.celebrity_name().trim().is_empty()
    }

    pub fn select_celebrity(&mut self, name: &str) {
        self.selection = Selection::parse(name);
        debug!(selection = ?self.selection, "Celebrity selected");
    }

    pub fn set_custom_name(&mut self, text: &str) {
        self.custom_name = text.to_string();
    }

    pub fn draft_message(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    /// Begins a fresh session. Any history from a running session is dropped.
    pub fn start_chat(&mut self) {
        let id = Uuid::new_v4().to_string();
        info!(session_id = %id, celebrity = %self.celebrity_name(), "Starting chat session");
        self.history.clear();
        self.session_id = Some(id);
        self.started = true;
    }

    /// Returns to the selection screen with every field cleared.
    pub fn reset_session(&mut self) {
        info!(session_id = ?self.session_id, "Resetting chat session");
        *self = Self::default();
    }

    /// Applies the local half of a send: appends the user message, empties the
    /// draft and returns the request to issue.
    ///
    /// Returns `None` without touching the state when the draft is blank, no
    /// session is running, or no celebrity name resolves.
    pub fn begin_send(&mut self) -> Option<PendingSend> {
        if self.draft.trim().is_empty() {
            return None;
        }
        let session_id = match (&self.session_id, self.started) {
            (Some(id), true) => id.clone(),
            _ => {
                warn!("Ignoring send: no chat session is running");
                return None;
            }
        };
        if self.celebrity_name().trim().is_empty() {
            warn!("Ignoring send: no celebrity selected");
            return None;
        }

        // Cleared here, not when the reply lands: text typed while the request
        // is outstanding must survive the reply.
        let message = std::mem::take(&mut self.draft);
        self.history.push(ChatMessage::user(message.clone()));
        Some(PendingSend {
            request: ChatRequest {
                message,
                session_id,
                celebrity_name: self.celebrity_name().to_string(),
            },
        })
    }

    /// Applies the backend's answer for `pending`.
    ///
    /// A reply for a session that has since been reset or restarted is dropped.
    /// Returns whether an assistant message was appended.
    pub fn complete_send(&mut self, pending: &PendingSend, reply: Option<String>) -> bool {
        let Some(reply) = reply else {
            return false;
        };
        if self.session_id.as_deref() != Some(pending.request.session_id.as_str()) {
            debug!(
                session_id = %pending.request.session_id,
                "Discarding reply for a session that is no longer current"
            );
            return false;
        }
        self.history.push(ChatMessage::assistant(reply));
        true
    }
}
