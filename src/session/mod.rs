//! Session state owned by the input loop
//!
//! Configuration, context window, transcript and token totals live in one
//! `Session` value that the dispatcher and orchestrator borrow mutably.

mod config;
mod context;
mod transcript;

pub use config::{
    ContextMode, ContextPolicy, SessionConfig, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_SYSTEM_ROLE, DEFAULT_TEMPERATURE,
};
pub use context::ContextBuffer;
pub use transcript::{TranscriptRecord, TranscriptStore};

/// Token usage accumulated over the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningTotals {
    total_tokens_used: u64,
}

impl RunningTotals {
    pub fn add(&mut self, tokens: u64) -> u64 {
        self.total_tokens_used = self.total_tokens_used.saturating_add(tokens);
        self.total_tokens_used
    }

    pub fn total_tokens_used(&self) -> u64 {
        self.total_tokens_used
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub config: SessionConfig,
    pub context: ContextBuffer,
    pub transcript: TranscriptStore,
    pub totals: RunningTotals,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            context: ContextBuffer::new(),
            transcript: TranscriptStore::new(),
            totals: RunningTotals::default(),
        }
    }

    /// Turn context mode on. The buffer is cleared when the mode flips
    /// from off to on; returns whether that happened.
    pub fn enable_context(&mut self) -> bool {
        if self.config.context_mode().is_on() {
            return false;
        }
        self.config.set_context_mode(ContextMode::On);
        self.context.clear();
        true
    }

    /// Turn context mode on with an empty buffer
    pub fn new_context(&mut self) {
        self.config.set_context_mode(ContextMode::On);
        self.context.clear();
    }

    /// Turn context mode off. The buffer is kept.
    pub fn disable_context(&mut self) {
        self.config.set_context_mode(ContextMode::Off);
    }
}
