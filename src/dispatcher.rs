//! Command dispatcher
//!
//! Applies a parsed command to the session. A failing command leaves the
//! session untouched and returns the error for the caller to report.

use crate::commands::{Command, CtxAction, RecallTarget};
use crate::console::{Console, Speaker};
use crate::message::Message;
use crate::session::Session;
use crate::Result;
use tracing::debug;

/// Longest question excerpt shown by `\rcd`
const PREVIEW_CHARS: usize = 60;

/// What the input loop should do after a command
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Continue,
    Exit,
    /// Send `question` with `context` in place of the live window
    Ask {
        question: String,
        context: Vec<Message>,
    },
}

pub fn dispatch(
    session: &mut Session,
    console: &mut Console,
    command: Command,
    args: &str,
) -> Result<Action> {
    debug!("Dispatching {} with args {:?}", command, args);
    match command {
        Command::Exit => {
            console.report(Speaker::System, "Exiting...");
            return Ok(Action::Exit);
        }
        Command::Mode => show_mode(session, console),
        Command::Role => {
            session.config.set_system_role(args);
            console.report(
                Speaker::System,
                format!("System role: {}", session.config.system_role()),
            );
        }
        Command::Temp => {
            let value = session.config.set_temperature(args)?;
            console.report(Speaker::System, format!("Temperature: {value}"));
        }
        Command::Max => {
            let value = session.config.set_max_tokens(args)?;
            console.report(Speaker::System, format!("Max tokens: {value}"));
        }
        Command::Ctx => {
            apply_ctx(session, args.parse()?);
            let locked = if session.config.context_locked() {
                " (locked)"
            } else {
                ""
            };
            console.report(
                Speaker::System,
                format!("Context mode: {}{}", session.config.context_mode(), locked),
            );
        }
        Command::With => return recall(session, console, args),
        Command::Rcd => list_records(session, console),
        Command::Help => show_help(console),
    }
    Ok(Action::Continue)
}

fn apply_ctx(session: &mut Session, action: CtxAction) {
    match action {
        CtxAction::On => {
            session.enable_context();
        }
        CtxAction::New => session.new_context(),
        CtxAction::Off => session.disable_context(),
        CtxAction::Lock => session.config.set_context_locked(true),
        CtxAction::Unlock => session.config.set_context_locked(false),
    }
}

fn recall(session: &Session, console: &mut Console, args: &str) -> Result<Action> {
    let (target, question) = RecallTarget::parse_with_args(args)?;
    let index = match target {
        RecallTarget::LiveContext => {
            console.report(Speaker::System, "Assist with context ...");
            let context = session.context.snapshot().to_vec();
            return Ok(Action::Ask { question, context });
        }
        RecallTarget::Last => -1,
        RecallTarget::Index(i) => i,
    };
    let record = session.transcript.get(index)?;
    console.report(
        Speaker::System,
        format!("Assist with record {} ...", record.index()),
    );
    Ok(Action::Ask {
        question,
        context: record.messages().to_vec(),
    })
}

fn show_mode(session: &Session, console: &mut Console) {
    let config = &session.config;
    let lines = [
        "Current settings:".to_string(),
        format!("    Model:             {}", config.model()),
        format!("    System role:       {}", config.system_role()),
        format!("    Temperature:       {}", config.temperature()),
        format!("    Max tokens:        {}", config.max_tokens()),
        format!("    Context mode:      {}", config.context_mode()),
        format!("    Context locked:    {}", config.context_locked()),
        format!(
            "    Context size:      {} messages (~{} tokens)",
            session.context.len(),
            session.context.estimate_tokens()
        ),
        format!("    Records:           {}", session.transcript.len()),
        format!(
            "    Tokens used:       {}",
            session.totals.total_tokens_used()
        ),
    ];
    for line in lines {
        console.report(Speaker::System, line);
    }
}

fn list_records(session: &Session, console: &mut Console) {
    if session.transcript.is_empty() {
        console.report(Speaker::System, "No records yet.");
        return;
    }
    for record in session.transcript.iter() {
        console.report(
            Speaker::System,
            format!(
                "    <{}> {}",
                record.index(),
                preview(record.question().content())
            ),
        );
    }
}

fn show_help(console: &mut Console) {
    console.report(Speaker::System, "Available commands:");
    for cmd in Command::all() {
        let usage = format!("{} {}", cmd, cmd.usage());
        console.report(
            Speaker::System,
            format!("    {:<36} - {}", usage.trim_end(), cmd.description()),
        );
    }
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= PREVIEW_CHARS && !text.contains('\n') {
        return line.to_string();
    }
    let mut short: String = line.chars().take(PREVIEW_CHARS).collect();
    short.push_str("...");
    short
}
