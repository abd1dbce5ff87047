//! Chat Completions client (`POST {base_url}/chat/completions`)

use super::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::{ChatError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Longest provider error detail shown to the user
const MAX_ERROR_DETAIL: usize = 500;

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("askline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatError::Startup(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check_response_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = truncate_error_detail(&extract_error_detail(&body), MAX_ERROR_DETAIL);
        if detail.is_empty() {
            return Err(ChatError::Provider(format!("API error {status}")));
        }
        Err(ChatError::Provider(format!("API error {status}: {detail}")))
    }

    fn map_reqwest_error(e: reqwest::Error) -> ChatError {
        if e.is_timeout() {
            ChatError::Provider(format!("timeout: {e}"))
        } else if e.is_connect() {
            ChatError::Provider(format!("network: {e}"))
        } else {
            ChatError::Provider(e.to_string())
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "POST {} model={} messages={}",
            url,
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(Self::map_reqwest_error)?;

        let response = Self::check_response_status(response).await?;

        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| ChatError::Provider(format!("malformed response: {e}")))
    }
}

/// Pull a human-readable message out of an error body
fn extract_error_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(msg) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }

    trimmed.to_string()
}

fn truncate_error_detail(detail: &str, max_chars: usize) -> String {
    if detail.chars().count() <= max_chars {
        return detail.to_string();
    }

    let mut truncated = detail.chars().take(max_chars).collect::<String>();
    truncated.push_str("... [truncated]");
    truncated
}
