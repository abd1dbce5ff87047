//! Append-only store of finished exchanges, recallable by index

use crate::message::Message;
use crate::{ChatError, Result};

/// A question and its answer, identified by insertion index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRecord {
    index: usize,
    messages: [Message; 2],
}

impl TranscriptRecord {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn question(&self) -> &Message {
        &self.messages[0]
    }

    pub fn answer(&self) -> &Message {
        &self.messages[1]
    }

    /// Both messages in order, usable as an explicit request context
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    records: Vec<TranscriptRecord>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a record and return its index (the previous length)
    pub fn record(&mut self, user: Message, assistant: Message) -> usize {
        let index = self.records.len();
        self.records.push(TranscriptRecord {
            index,
            messages: [user, assistant],
        });
        index
    }

    /// Look up a record. Negative indices count from the end, `-1` is the
    /// most recent.
    pub fn get(&self, index: isize) -> Result<&TranscriptRecord> {
        let len = self.records.len();
        let resolved = if index < 0 {
            len.checked_sub(index.unsigned_abs())
        } else {
            Some(index as usize).filter(|i| *i < len)
        };
        resolved
            .and_then(|i| self.records.get(i))
            .ok_or(ChatError::IndexOutOfRange { index, len })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranscriptRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
