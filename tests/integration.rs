//! End-to-end tests driving the input loop with a stubbed provider

use askline::provider::{CompletionProvider, CompletionRequest, CompletionResponse, Usage};
use askline::session::ContextMode;
use askline::{ChatError, ChatLog, Console, Repl, Role, Session};
use async_trait::async_trait;
use chrono::Local;
use std::collections::VecDeque;
use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::BufReader;

/// Provider that replays scripted results and records every request
#[derive(Clone, Default)]
struct StubProvider {
    replies: Arc<Mutex<VecDeque<askline::Result<CompletionResponse>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl StubProvider {
    fn answering(answers: &[(&str, u64)]) -> Self {
        let stub = Self::default();
        for (text, tokens) in answers {
            stub.push_ok(text, *tokens);
        }
        stub
    }

    fn push_ok(&self, text: &str, tokens: u64) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(CompletionResponse::single(text, tokens)));
    }

    fn push_response(&self, response: CompletionResponse) {
        self.replies.lock().unwrap().push_back(Ok(response));
    }

    fn push_err(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(ChatError::Provider(message.to_string())));
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, request: CompletionRequest) -> askline::Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CompletionResponse::single("ok", 1)))
    }
}

/// Console sink the test can read back
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

type TestRepl = Repl<StubProvider, BufReader<Cursor<Vec<u8>>>>;

fn repl_with_input(provider: StubProvider, input: &str) -> (TestRepl, Captured) {
    let captured = Captured::default();
    let console = Console::new(captured.clone(), false);
    let reader = BufReader::new(Cursor::new(input.as_bytes().to_vec()));
    (
        Repl::new(Session::default(), provider, console, reader),
        captured,
    )
}

/// Asking "What is 2+2?" with a provider answering "4" for 10 tokens
#[tokio::test]
async fn test_first_exchange_is_record_zero() {
    let provider = StubProvider::answering(&[("4", 10)]);
    let (mut repl, output) = repl_with_input(provider.clone(), "What is 2+2?\n\\exit\n");
    repl.run().await;

    let session = repl.session();
    assert_eq!(session.transcript.len(), 1);
    let record = session.transcript.get(0).unwrap();
    assert_eq!(record.question().content(), "What is 2+2?");
    assert_eq!(record.answer().content(), "4");
    assert_eq!(session.totals.total_tokens_used(), 10);
    assert!(repl.exit_requested());

    let sent = provider.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].messages.len(), 2);
    assert_eq!(sent[0].messages[0].role(), Role::System);
    assert_eq!(sent[0].messages[0].content(), "wiki");

    let text = output.text();
    assert!(text.contains("Record <0>:"));
    assert!(text.contains("Tokens used/total: 10/10"));
    assert!(text.contains("Exiting..."));
}

#[tokio::test]
async fn test_transcript_grows_one_per_success() {
    let provider = StubProvider::answering(&[("a", 1), ("b", 2), ("c", 3)]);
    let (mut repl, _) = repl_with_input(provider, "");

    for (i, question) in ["one", "two", "three"].iter().enumerate() {
        repl.handle_line(question).await;
        let transcript = &repl.session().transcript;
        assert_eq!(transcript.len(), i + 1);
        assert_eq!(transcript.get(-1).unwrap().question().content(), *question);
    }
    assert_eq!(repl.session().totals.total_tokens_used(), 6);
}

#[tokio::test]
async fn test_context_off_never_grows() {
    let (mut repl, _) = repl_with_input(StubProvider::default(), "");
    for question in ["a", "b", "c"] {
        repl.handle_line(question).await;
    }
    assert_eq!(repl.session().config.context_mode(), ContextMode::Off);
    assert!(repl.session().context.is_empty());
    assert_eq!(repl.session().transcript.len(), 3);
}

#[tokio::test]
async fn test_context_on_grows_by_two_and_is_resent() {
    let provider = StubProvider::answering(&[("first answer", 5), ("second answer", 5)]);
    let (mut repl, _) = repl_with_input(provider.clone(), "");

    repl.handle_line("\\ctx on").await;
    repl.handle_line("first").await;
    assert_eq!(repl.session().context.len(), 2);
    repl.handle_line("second").await;
    assert_eq!(repl.session().context.len(), 4);

    let window = repl.session().context.snapshot();
    assert_eq!(window[2].role(), Role::User);
    assert_eq!(window[2].content(), "second");
    assert_eq!(window[3].role(), Role::Assistant);
    assert_eq!(window[3].content(), "second answer");

    let sent = provider.requests();
    let contents: Vec<&str> = sent[1].messages.iter().map(|m| m.content()).collect();
    assert_eq!(contents, vec!["wiki", "first", "first answer", "second"]);
}

#[tokio::test]
async fn test_locked_context_is_pinned() {
    let (mut repl, _) = repl_with_input(StubProvider::default(), "");
    repl.handle_line("\\ctx on").await;
    repl.handle_line("pin this").await;
    repl.handle_line("\\ctx lock").await;
    repl.handle_line("not kept").await;
    repl.handle_line("also not kept").await;

    let session = repl.session();
    assert_eq!(session.context.len(), 2);
    assert_eq!(session.context.snapshot()[0].content(), "pin this");
    assert_eq!(session.transcript.len(), 3);

    repl.handle_line("\\ctx unlock").await;
    repl.handle_line("kept").await;
    assert_eq!(repl.session().context.len(), 4);
}

#[tokio::test]
async fn test_ctx_new_always_empties() {
    let (mut repl, _) = repl_with_input(StubProvider::default(), "");
    repl.handle_line("\\ctx on").await;
    repl.handle_line("q").await;
    repl.handle_line("\\ctx lock").await;
    repl.handle_line("\\ctx new").await;
    assert!(repl.session().context.is_empty());
    assert_eq!(repl.session().config.context_mode(), ContextMode::On);

    repl.handle_line("\\ctx off").await;
    repl.handle_line("\\ctx new").await;
    assert!(repl.session().context.is_empty());
    assert_eq!(repl.session().config.context_mode(), ContextMode::On);
}

/// Request sent by `\with <target> follow up` after three exchanges
async fn recall_request(target: &str) -> Vec<String> {
    let provider = StubProvider::answering(&[("a0", 1), ("a1", 1), ("a2", 1)]);
    let (mut repl, _) = repl_with_input(provider.clone(), "");
    for question in ["q0", "q1", "q2"] {
        repl.handle_line(question).await;
    }
    repl.handle_line(&format!("\\with {target} follow up")).await;

    assert_eq!(repl.session().transcript.len(), 4);
    assert!(repl.session().context.is_empty());
    let sent = provider.requests();
    assert_eq!(sent.len(), 4);
    sent[3]
        .messages
        .iter()
        .map(|m| m.content().to_string())
        .collect()
}

#[tokio::test]
async fn test_with_aliases_send_same_record() {
    let by_last = recall_request("last").await;
    assert_eq!(by_last, vec!["wiki", "q2", "a2", "follow up"]);
    assert_eq!(recall_request("-1").await, by_last);
    assert_eq!(recall_request("2").await, by_last);
    assert_ne!(recall_request("0").await, by_last);
}

#[tokio::test]
async fn test_with_grows_live_context() {
    let provider = StubProvider::answering(&[("first answer", 2), ("follow answer", 3)]);
    let (mut repl, _) = repl_with_input(provider.clone(), "");

    repl.handle_line("\\ctx on").await;
    repl.handle_line("first").await;
    assert_eq!(repl.session().context.len(), 2);

    repl.handle_line("\\with last follow").await;
    let session = repl.session();
    assert_eq!(session.transcript.len(), 2);
    assert_eq!(session.context.len(), 4);
    let window = session.context.snapshot();
    assert_eq!(window[2].role(), Role::User);
    assert_eq!(window[2].content(), "follow");
    assert_eq!(window[3].role(), Role::Assistant);
    assert_eq!(window[3].content(), "follow answer");

    let sent = provider.requests();
    let contents: Vec<&str> = sent[1].messages.iter().map(|m| m.content()).collect();
    assert_eq!(contents, vec!["wiki", "first", "first answer", "follow"]);
}

#[tokio::test]
async fn test_with_locked_context_stays_pinned() {
    let (mut repl, _) = repl_with_input(StubProvider::default(), "");
    repl.handle_line("\\ctx on").await;
    repl.handle_line("pin").await;
    repl.handle_line("\\ctx lock").await;
    repl.handle_line("\\with 0 again").await;

    assert_eq!(repl.session().transcript.len(), 2);
    assert_eq!(repl.session().context.len(), 2);
}

#[tokio::test]
async fn test_with_bad_index_reported() {
    let provider = StubProvider::default();
    let (mut repl, output) = repl_with_input(provider.clone(), "");
    repl.handle_line("only one").await;
    repl.handle_line("\\with 4 anything").await;
    repl.handle_line("\\with nope anything").await;

    assert_eq!(provider.requests().len(), 1);
    assert_eq!(repl.session().transcript.len(), 1);
    let text = output.text();
    assert!(text.contains("Error: Record index 4 out of range (1 records)"));
    assert!(text.contains("Error: Invalid value: 'nope' is not a record index"));
}

#[tokio::test]
async fn test_bad_temp_keeps_value_and_loop_continues() {
    let provider = StubProvider::answering(&[("still here", 3)]);
    let (mut repl, output) =
        repl_with_input(provider, "\\temp abc\n\\max -1\nhello\n\\exit\n");
    repl.run().await;

    assert_eq!(repl.session().config.temperature(), 0.5);
    assert_eq!(repl.session().config.max_tokens(), 2000);
    assert_eq!(repl.session().transcript.len(), 1);
    assert!(output.text().contains("Error: Invalid value: temperature 'abc' is not a number"));
}

#[tokio::test]
async fn test_missing_argument_is_prompted() {
    let (mut repl, output) = repl_with_input(
        StubProvider::default(),
        "\\temp\n0.8\n\\role\n\n\\max\n256\n\\exit\n",
    );
    repl.run().await;

    let config = &repl.session().config;
    assert_eq!(config.temperature(), 0.8);
    assert_eq!(config.system_role(), "wiki");
    assert_eq!(config.max_tokens(), 256);

    let text = output.text();
    assert!(text.contains("Set temperature: "));
    assert!(text.contains("Temperature: 0.8"));
    assert!(text.contains("Max tokens: 256"));
}

#[tokio::test]
async fn test_provider_failure_changes_nothing() {
    let provider = StubProvider::default();
    provider.push_ok("fine", 4);
    provider.push_err("API error 429 Too Many Requests: quota exceeded");
    let (mut repl, output) = repl_with_input(provider, "");

    repl.handle_line("\\ctx on").await;
    repl.handle_line("works").await;
    repl.handle_line("fails").await;

    let session = repl.session();
    assert_eq!(session.transcript.len(), 1);
    assert_eq!(session.context.len(), 2);
    assert_eq!(session.totals.total_tokens_used(), 4);
    assert!(output.text().contains("Error: Provider error: API error 429"));
}

#[tokio::test]
async fn test_empty_choices_changes_nothing() {
    let provider = StubProvider::default();
    provider.push_ok("fine", 4);
    provider.push_response(CompletionResponse {
        choices: vec![],
        usage: Usage { total_tokens: 9 },
    });
    let (mut repl, output) = repl_with_input(provider, "");

    repl.handle_line("\\ctx on").await;
    repl.handle_line("works").await;
    repl.handle_line("nothing back").await;

    let session = repl.session();
    assert_eq!(session.transcript.len(), 1);
    assert_eq!(session.context.len(), 2);
    assert_eq!(session.totals.total_tokens_used(), 4);
    assert!(output
        .text()
        .contains("Error: Provider error: response contained no choices"));
}

#[tokio::test]
async fn test_unknown_command_is_not_fatal() {
    let (mut repl, output) = repl_with_input(StubProvider::default(), "\\fly away\nhi\n");
    repl.run().await;

    assert!(!repl.exit_requested());
    assert_eq!(repl.session().transcript.len(), 1);
    assert!(output.text().contains("Error: Unknown command: fly"));
}

#[tokio::test]
async fn test_mode_and_help_output() {
    let (mut repl, output) = repl_with_input(StubProvider::default(), "\\mode\n\\help\n\\rcd\n");
    repl.run().await;

    let text = output.text();
    assert!(text.contains("Model:             gpt-3.5-turbo"));
    assert!(text.contains("Context mode:      off"));
    assert!(text.contains("\\with [index|last|ctx] [question]"));
    assert!(text.contains("No records yet."));
}

#[tokio::test]
async fn test_role_and_settings_reach_provider() {
    let provider = StubProvider::default();
    let (mut repl, _) = repl_with_input(
        provider.clone(),
        "\\role You are a pirate.\n\\temp 1.5\n\\max 64\nahoy\n",
    );
    repl.run().await;

    let sent = provider.requests();
    assert_eq!(sent[0].messages[0].content(), "You are a pirate.");
    assert_eq!(sent[0].temperature, 1.5);
    assert_eq!(sent[0].max_tokens, 64);
}

#[tokio::test]
async fn test_chat_log_records_exchange_and_errors() {
    let temp_dir = TempDir::new().unwrap();
    let log = ChatLog::for_session(temp_dir.path(), Local::now())
        .await
        .unwrap();
    let log_path = log.path().to_path_buf();

    let provider = StubProvider::answering(&[("4", 10)]);
    let (repl, _) = repl_with_input(provider, "What is 2+2?\n\\temp hot\n");
    let mut repl = repl.with_log(log);
    repl.run().await;

    let content = std::fs::read_to_string(log_path).unwrap();
    let lines: Vec<&str> = content.split_terminator("\r\n").collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("] Client > What is 2+2?"));
    assert!(lines[1].ends_with("] Assistant > 4"));
    assert!(lines[2].contains("] Error > Invalid value"));
}
