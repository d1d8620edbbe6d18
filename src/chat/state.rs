//! Conversation state for one room.

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::message::{Message, Role};
use crate::llm::tokenizer::TokenCounter;

/// Ordered message history anchored by a single system message.
///
/// Invariants, upheld by construction:
/// - index 0 is the system message and is never removed;
/// - no other system message exists;
/// - the history is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    /// Start a conversation with `system_prompt` at index 0.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Append a user or assistant message. Content is not validated.
    ///
    /// # Errors
    /// Returns [`ChatError::SystemMessageAppend`] for `Role::System`.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> ChatResult<()> {
        if role == Role::System {
            return Err(ChatError::SystemMessageAppend);
        }
        self.messages.push(Message::new(role, content));
        Ok(())
    }

    /// Append a user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Append an assistant message.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// All messages, system message first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages after the system message.
    #[must_use]
    pub fn conversation(&self) -> &[Message] {
        &self.messages[1..]
    }

    /// Number of messages including the system message.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Current system prompt.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.messages[0].content()
    }

    /// Sum of token counts over every message, recomputed on each call.
    #[must_use]
    pub fn total_tokens(&self, counter: &dyn TokenCounter, model: &str) -> usize {
        self.messages
            .iter()
            .map(|message| counter.count_tokens(model, message.content()))
            .sum()
    }

    /// Drop everything but the system message.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// Replace the system message in place.
    pub fn set_system_prompt(&mut self, text: impl Into<String>) {
        self.messages[0] = Message::system(text);
    }

    /// Remove the oldest non-system message, if any.
    pub(crate) fn evict_oldest(&mut self) -> Option<Message> {
        if self.messages.len() > 1 {
            Some(self.messages.remove(1))
        } else {
            None
        }
    }
}
