//! Startup settings from `<home>/config.toml`
//!
//! All keys are optional:
//!
//! ```toml
//! model = "gpt-4o-mini"
//! temperature = 0.7
//! max_tokens = 1024
//! system_role = "You are a terse assistant."
//! base_url = "http://localhost:11434/v1"
//! context = true
//! ```

use crate::provider::DEFAULT_BASE_URL;
use crate::session::{ContextMode, Session, SessionConfig};
use crate::{ChatError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSettings {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_role: Option<String>,
    pub base_url: Option<String>,
    /// Start with context mode on
    pub context: Option<bool>,
}

impl AppSettings {
    /// Load settings, treating a missing file as all defaults
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {}", path.display());
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        let settings = Self::parse(&content)
            .map_err(|e| ChatError::Startup(format!("{}: {e}", path.display())))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overlay `other` on top of `self`; set fields in `other` win
    pub fn merge(self, other: AppSettings) -> Self {
        Self {
            model: other.model.or(self.model),
            temperature: other.temperature.or(self.temperature),
            max_tokens: other.max_tokens.or(self.max_tokens),
            system_role: other.system_role.or(self.system_role),
            base_url: other.base_url.or(self.base_url),
            context: other.context.or(self.context),
        }
    }

    /// Provider endpoint: settings, then `OPENAI_BASE_URL`, then the default
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Build the initial session, validating values with the same rules as
    /// the interactive commands. Invalid values are startup errors.
    pub fn initial_session(&self) -> Result<Session> {
        let mut config = SessionConfig::new();
        let startup = |e: ChatError| ChatError::Startup(e.to_string());

        if let Some(model) = &self.model {
            config.set_model(model).map_err(startup)?;
        }
        if let Some(temperature) = self.temperature {
            config
                .set_temperature(&temperature.to_string())
                .map_err(startup)?;
        }
        if let Some(max_tokens) = self.max_tokens {
            config
                .set_max_tokens(&max_tokens.to_string())
                .map_err(startup)?;
        }
        if let Some(role) = &self.system_role {
            config.set_system_role(role);
        }
        if self.context == Some(true) {
            config.set_context_mode(ContextMode::On);
        }
        Ok(Session::new(config))
    }
}
