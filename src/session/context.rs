//! Context buffer - the conversation window resent with each request

use super::config::ContextPolicy;
use crate::message::Message;

/// Approximate bytes per token for display estimates
const APPROX_BYTES_PER_TOKEN: usize = 4;

/// Ordered role-tagged messages (oldest first)
#[derive(Debug, Clone, Default)]
pub struct ContextBuffer {
    items: Vec<Message>,
}

impl ContextBuffer {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append a finished exchange, user message first.
    ///
    /// Returns false and leaves the buffer alone when the policy has
    /// context mode off or the buffer locked.
    pub fn append(&mut self, policy: ContextPolicy, user: Message, assistant: Message) -> bool {
        if !policy.accepts_growth() {
            return false;
        }
        self.items.push(user);
        self.items.push(assistant);
        true
    }

    /// Drop every entry regardless of mode or lock
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Current window, for inclusion in an outgoing request
    pub fn snapshot(&self) -> &[Message] {
        &self.items
    }

    /// Rough token estimate of the window
    pub fn estimate_tokens(&self) -> usize {
        self.items
            .iter()
            .map(|m| m.content().len() / APPROX_BYTES_PER_TOKEN)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
