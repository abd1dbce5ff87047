//! Askline - terminal chat client for chat-completion models
//!
//! Reads one line at a time, forwards questions to a completion provider and
//! keeps the conversation state the user steers with `\` commands:
//! - a transcript of every exchange, recallable by index
//! - an optional context window resent with each request
//! - per-session model settings (role, temperature, max tokens)

pub mod chat_log;
pub mod commands;
pub mod console;
pub mod credentials;
pub mod dispatcher;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod repl;
pub mod session;
pub mod settings;

pub use chat_log::ChatLog;
pub use commands::{parse_command, Command, CtxAction, ParsedCommand, RecallTarget};
pub use console::{Console, Speaker};
pub use dispatcher::{dispatch, Action};
pub use message::{Message, Role};
pub use orchestrator::{Exchange, Orchestrator};
pub use provider::{CompletionProvider, CompletionRequest, CompletionResponse};
pub use repl::Repl;
pub use session::{ContextMode, Session};
pub use settings::AppSettings;

use std::path::PathBuf;

/// Leading character that turns an input line into a command
pub const COMMAND_MARKER: char = '\\';

/// Configuration for an Askline run
#[derive(Debug, Clone)]
pub struct AskConfig {
    /// Directory holding config.toml, key files and the log tree
    pub home: PathBuf,

    /// Explicit key file, bypassing discovery under `home`
    pub key_file: Option<PathBuf>,

    /// Whether the chat log sink is enabled
    pub log_enabled: bool,

    /// Whether console output is colored
    pub color: bool,
}

impl AskConfig {
    pub fn new(home: PathBuf) -> Self {
        Self {
            home,
            key_file: None,
            log_enabled: true,
            color: true,
        }
    }

    pub fn with_key_file(mut self, path: PathBuf) -> Self {
        self.key_file = Some(path);
        self
    }

    pub fn with_log(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Path of the optional TOML settings file
    pub fn settings_file(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Root of the per-day chat log directories
    pub fn log_root(&self) -> PathBuf {
        self.home.join("log")
    }
}

/// Result type for Askline operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors that can occur in Askline
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Record index {index} out of range ({len} records)")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Only startup failures end the process; everything else is reported
    /// and the session keeps reading input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChatError::Startup(_))
    }
}
