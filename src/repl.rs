//! The input loop
//!
//! Strictly alternates between waiting for a line and, for questions,
//! waiting for the provider. Only the `exit` command or end of input stops it.

use crate::chat_log::{roles, ChatLog};
use crate::commands::{parse_command, Command, ParsedCommand};
use crate::console::{Console, Speaker};
use crate::dispatcher::{dispatch, Action};
use crate::message::Message;
use crate::orchestrator::Orchestrator;
use crate::provider::CompletionProvider;
use crate::session::Session;
use crate::{ChatError, COMMAND_MARKER};
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, warn};

pub struct Repl<P, R> {
    session: Session,
    orchestrator: Orchestrator<P>,
    console: Console,
    log: Option<ChatLog>,
    input: Lines<R>,
    exit_requested: bool,
}

impl<P, R> Repl<P, R>
where
    P: CompletionProvider,
    R: AsyncBufRead + Unpin,
{
    pub fn new(session: Session, provider: P, console: Console, input: R) -> Self {
        Self {
            session,
            orchestrator: Orchestrator::new(provider),
            console,
            log: None,
            input: input.lines(),
            exit_requested: false,
        }
    }

    pub fn with_log(mut self, log: ChatLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Print the startup banner
    pub fn greet(&mut self, key_file: &Path) {
        let console = &mut self.console;
        console.report(
            Speaker::System,
            format!("Welcome to Askline! Type '{}' to exit.", Command::Exit),
        );
        console.report(
            Speaker::System,
            format!(
                "Commands start with '{COMMAND_MARKER}'. Type '{}' to see available commands.",
                Command::Help
            ),
        );
        console.report(
            Speaker::System,
            format!("Using key file: {}.", key_file.display()),
        );
        if let Some(log) = &self.log {
            console.report(
                Speaker::System,
                format!("Chat will be recorded in file: {}.", log.path().display()),
            );
        }
        console.report(
            Speaker::Assistant,
            "Hello! I'm available now. How can I help you? You can type your question below.",
        );
    }

    /// Run until `exit` or end of input
    pub async fn run(&mut self) {
        while !self.exit_requested {
            self.console.prompt(Speaker::Client, "");
            let Some(line) = self.read_line().await else {
                debug!("End of input");
                break;
            };
            self.handle_line(&line).await;
        }
    }

    /// Handle one input line: a command or a question
    pub async fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match parse_command(line) {
            None => self.ask(line, None).await,
            Some(ParsedCommand::Unknown(keyword)) => {
                self.report_error(&ChatError::UnknownCommand(keyword)).await
            }
            Some(ParsedCommand::Known(command, args)) => self.run_command(command, args).await,
        }
    }

    async fn run_command(&mut self, command: Command, mut args: String) {
        if command.prompts_for_arg() && args.is_empty() {
            self.console.prompt(Speaker::System, command.prompt());
            args = self.read_line().await.unwrap_or_default();
        }
        match dispatch(&mut self.session, &mut self.console, command, &args) {
            Ok(Action::Continue) => {}
            Ok(Action::Exit) => self.exit_requested = true,
            Ok(Action::Ask { question, context }) => self.ask(&question, Some(context)).await,
            Err(e) => self.report_error(&e).await,
        }
    }

    /// Send a question and render the answer, or report the failure
    pub async fn ask(&mut self, question: &str, context: Option<Vec<Message>>) {
        if let Some(log) = &self.log {
            log.append(roles::CLIENT, question).await;
        }

        let result = self
            .orchestrator
            .submit(&mut self.session, question, context.as_deref())
            .await;

        match result {
            Ok(exchange) => {
                self.console.report(
                    Speaker::Assistant,
                    format!("Record <{}>:", exchange.record_index),
                );
                self.console.markdown(&exchange.answer);
                if let Some(log) = &self.log {
                    log.append(roles::ASSISTANT, &exchange.answer).await;
                }
                self.console.report(
                    Speaker::System,
                    format!(
                        "Tokens used/total: {}/{}, Time used: {}s.",
                        exchange.tokens_used,
                        exchange.total_tokens,
                        exchange.elapsed.as_secs()
                    ),
                );
            }
            Err(e) => self.report_error(&e).await,
        }
    }

    async fn report_error(&mut self, err: &ChatError) {
        self.console.error(err);
        if let Some(log) = &self.log {
            log.append(roles::ERROR, &err.to_string()).await;
        }
    }

    async fn read_line(&mut self) -> Option<String> {
        match self.input.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                None
            }
        }
    }
}
