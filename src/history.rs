//! Committed conversation history, the single source of truth for what the
//! user sees. The engine owns the in-flight assistant message exclusively;
//! messages arrive here by move at commit time and are frozen afterwards.

use crate::message::{ConversationMessage, ProgressFlags};

#[derive(Debug, Default, Clone)]
pub struct ConversationHistory {
    messages: Vec<ConversationMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user message immediately at send() time.
    pub fn add_user_message(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    /// Commit a finished, aborted, or errored assistant message. Transient
    /// progress flags do not survive the commit, and a committed message is
    /// never still "thinking".
    pub fn commit(&mut self, mut message: ConversationMessage) {
        message.thinking_complete = true;
        message.progress = ProgressFlags::default();
        self.messages.push(message);
    }

    /// Replace the whole log, e.g. when the session store loads another
    /// session. Loaded historical messages are final by definition.
    pub fn replace_all(&mut self, messages: Vec<ConversationMessage>) {
        self.messages = messages;
        for msg in &mut self.messages {
            msg.thinking_complete = true;
            msg.progress = ProgressFlags::default();
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
