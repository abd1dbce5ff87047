//! Mutable per-session model settings

use crate::{ChatError, Result};
use std::fmt;

/// Persona tag used when no system role is set
pub const DEFAULT_SYSTEM_ROLE: &str = "wiki";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const DEFAULT_TEMPERATURE: f32 = 0.5;

pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Range accepted by chat-completion providers
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Whether prior exchanges are resent with each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextMode {
    #[default]
    Off,
    On,
}

impl ContextMode {
    pub fn is_on(&self) -> bool {
        matches!(self, ContextMode::On)
    }
}

impl fmt::Display for ContextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextMode::Off => f.write_str("off"),
            ContextMode::On => f.write_str("on"),
        }
    }
}

/// Snapshot of the two flags that gate context buffer growth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextPolicy {
    pub mode: ContextMode,
    pub locked: bool,
}

impl ContextPolicy {
    /// True when a finished exchange may be appended to the context buffer
    pub fn accepts_growth(&self) -> bool {
        self.mode.is_on() && !self.locked
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    model: String,
    system_role: String,
    temperature: f32,
    max_tokens: u32,
    context_mode: ContextMode,
    context_locked: bool,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_role: DEFAULT_SYSTEM_ROLE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            context_mode: ContextMode::Off,
            context_locked: false,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: &str) -> Result<()> {
        let model = model.trim();
        if model.is_empty() {
            return Err(ChatError::InvalidValue("model name must not be empty".to_string()));
        }
        self.model = model.to_string();
        Ok(())
    }

    pub fn system_role(&self) -> &str {
        &self.system_role
    }

    /// Empty text falls back to [`DEFAULT_SYSTEM_ROLE`].
    pub fn set_system_role(&mut self, role: &str) {
        let role = role.trim();
        self.system_role = if role.is_empty() {
            DEFAULT_SYSTEM_ROLE.to_string()
        } else {
            role.to_string()
        };
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Parse and store a temperature. The stored value is untouched on error.
    pub fn set_temperature(&mut self, text: &str) -> Result<f32> {
        let text = text.trim();
        let value: f32 = text
            .parse()
            .map_err(|_| ChatError::InvalidValue(format!("temperature '{text}' is not a number")))?;
        if !TEMPERATURE_RANGE.contains(&value) {
            return Err(ChatError::InvalidValue(format!(
                "temperature {value} outside {}..={}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            )));
        }
        self.temperature = value;
        Ok(value)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Parse and store max tokens. The stored value is untouched on error.
    pub fn set_max_tokens(&mut self, text: &str) -> Result<u32> {
        let text = text.trim();
        let value = match text.parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => {
                return Err(ChatError::InvalidValue(format!(
                    "max tokens '{text}' is not a positive integer"
                )))
            }
        };
        self.max_tokens = value;
        Ok(value)
    }

    pub fn context_mode(&self) -> ContextMode {
        self.context_mode
    }

    pub fn set_context_mode(&mut self, mode: ContextMode) {
        self.context_mode = mode;
    }

    pub fn context_locked(&self) -> bool {
        self.context_locked
    }

    pub fn set_context_locked(&mut self, locked: bool) {
        self.context_locked = locked;
    }

    pub fn context_policy(&self) -> ContextPolicy {
        ContextPolicy {
            mode: self.context_mode,
            locked: self.context_locked,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}
