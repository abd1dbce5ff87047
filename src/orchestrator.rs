//! Completion request orchestration
//!
//! Builds the outgoing message list from the session, calls the provider and
//! applies a successful answer to the transcript, context window and totals.
//! A failed call leaves the session exactly as it was.

use crate::message::Message;
use crate::provider::{CompletionProvider, CompletionRequest};
use crate::session::{Session, SessionConfig};
use crate::{ChatError, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of a successful request
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// Transcript index the exchange was stored under
    pub record_index: usize,
    pub answer: String,
    /// Tokens reported by the provider for this call
    pub tokens_used: u64,
    /// Session total after this call
    pub total_tokens: u64,
    /// Whether the live context window grew
    pub context_grew: bool,
    pub elapsed: Duration,
}

/// Build the message list for a request: exactly one system message, then
/// the explicit context if given, else the live window when context mode is
/// on, then the question.
pub fn build_messages(
    config: &SessionConfig,
    live_context: &[Message],
    question: &str,
    context_override: Option<&[Message]>,
) -> Vec<Message> {
    let history: &[Message] = match context_override {
        Some(explicit) => explicit,
        None if config.context_mode().is_on() => live_context,
        None => &[],
    };

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(config.system_role()));
    messages.extend(history.iter().cloned());
    messages.push(Message::user(question));
    messages
}

pub struct Orchestrator<P> {
    provider: P,
}

impl<P: CompletionProvider> Orchestrator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Ask `question`. With `context_override` the given messages replace the
    /// live context window for this request only; growth of the window still
    /// follows the context policy.
    pub async fn submit(
        &self,
        session: &mut Session,
        question: &str,
        context_override: Option<&[Message]>,
    ) -> Result<Exchange> {
        let started = Instant::now();
        let messages = build_messages(
            &session.config,
            session.context.snapshot(),
            question,
            context_override,
        );
        let request = CompletionRequest {
            model: session.config.model().to_string(),
            temperature: session.config.temperature(),
            max_tokens: session.config.max_tokens(),
            messages,
        };
        debug!("Submitting request with {} messages", request.messages.len());

        let response = self.provider.complete(request).await?;
        let answer = response
            .first_text()
            .ok_or_else(|| ChatError::Provider("response contained no choices".to_string()))?
            .to_string();
        let tokens_used = response.usage.total_tokens;

        let user = Message::user(question);
        let assistant = Message::assistant(answer.clone());
        let record_index = session.transcript.record(user.clone(), assistant.clone());
        let context_grew = session
            .context
            .append(session.config.context_policy(), user, assistant);
        let total_tokens = session.totals.add(tokens_used);

        info!(
            "Record {} stored, tokens {}/{}",
            record_index, tokens_used, total_tokens
        );

        Ok(Exchange {
            record_index,
            answer,
            tokens_used,
            total_tokens,
            context_grew,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::provider::CompletionResponse;
    use crate::session::ContextMode;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
        fail: bool,
    }

    #[async_trait]
    impl CompletionProvider for Recorder {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(ChatError::Provider("quota exceeded".to_string()));
            }
            let answer = format!("re: {}", request.messages.last().unwrap().content());
            Ok(CompletionResponse::single(answer, 7))
        }
    }

    #[test]
    fn test_build_messages_without_context() {
        let config = SessionConfig::new();
        let live = vec![Message::user("old"), Message::assistant("old answer")];
        let messages = build_messages(&config, &live, "new", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::system("wiki"));
        assert_eq!(messages[1], Message::user("new"));
    }

    #[test]
    fn test_build_messages_override_wins() {
        let mut config = SessionConfig::new();
        config.set_context_mode(ContextMode::On);
        let live = vec![Message::user("live"), Message::assistant("live a")];
        let recalled = vec![Message::user("rec"), Message::assistant("rec a")];

        let messages = build_messages(&config, &live, "q", Some(recalled.as_slice()));
        let contents: Vec<&str> = messages.iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["wiki", "rec", "rec a", "q"]);
        assert_eq!(
            messages.iter().filter(|m| m.role() == Role::System).count(),
            1
        );

        let messages = build_messages(&config, &live, "q", None);
        let contents: Vec<&str> = messages.iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["wiki", "live", "live a", "q"]);
    }

    #[tokio::test]
    async fn test_submit_records_and_counts() {
        let provider = Recorder::default();
        let orchestrator = Orchestrator::new(provider.clone());
        let mut session = Session::default();

        let exchange = orchestrator.submit(&mut session, "hello", None).await.unwrap();
        assert_eq!(exchange.record_index, 0);
        assert_eq!(exchange.answer, "re: hello");
        assert_eq!(exchange.total_tokens, 7);
        assert!(!exchange.context_grew);
        assert_eq!(session.transcript.len(), 1);
        assert!(session.context.is_empty());

        let sent = provider.requests.lock().unwrap();
        assert_eq!(sent[0].model, "gpt-3.5-turbo");
        assert_eq!(sent[0].max_tokens, 2000);
    }

    #[tokio::test]
    async fn test_submit_with_override_grows_window() {
        let provider = Recorder::default();
        let orchestrator = Orchestrator::new(provider.clone());
        let mut session = Session::default();
        session.new_context();

        let recalled = vec![Message::user("a"), Message::assistant("b")];
        let exchange = orchestrator
            .submit(&mut session, "again", Some(recalled.as_slice()))
            .await
            .unwrap();
        assert!(exchange.context_grew);
        assert_eq!(
            session.context.snapshot(),
            &[Message::user("again"), Message::assistant("re: again")]
        );
        assert_eq!(session.transcript.len(), 1);

        let sent = provider.requests.lock().unwrap();
        let contents: Vec<&str> = sent[0].messages.iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["wiki", "a", "b", "again"]);
    }

    #[tokio::test]
    async fn test_submit_with_override_context_off() {
        let orchestrator = Orchestrator::new(Recorder::default());
        let mut session = Session::default();

        let recalled = vec![Message::user("a"), Message::assistant("b")];
        let exchange = orchestrator
            .submit(&mut session, "again", Some(recalled.as_slice()))
            .await
            .unwrap();
        assert!(!exchange.context_grew);
        assert!(session.context.is_empty());
    }

    #[tokio::test]
    async fn test_failed_submit_changes_nothing() {
        let provider = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let orchestrator = Orchestrator::new(provider);
        let mut session = Session::default();
        session.new_context();

        let err = orchestrator.submit(&mut session, "hi", None).await.unwrap_err();
        assert!(matches!(err, ChatError::Provider(_)));
        assert!(session.transcript.is_empty());
        assert!(session.context.is_empty());
        assert_eq!(session.totals.total_tokens_used(), 0);
    }
}
