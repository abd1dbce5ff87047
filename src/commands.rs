//! Command table
//!
//! Lines starting with `\` are commands. The keyword is matched by prefix
//! (`\temp0.7` and `\temp 0.7` are the same command); whatever follows the
//! keyword, trimmed, is the argument.

use crate::{ChatError, Result, COMMAND_MARKER};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    Mode,
    Role,
    Temp,
    Max,
    Ctx,
    With,
    Rcd,
    Help,
}

impl Command {
    pub fn all() -> &'static [Command] {
        &[
            Command::Exit,
            Command::Mode,
            Command::Role,
            Command::Temp,
            Command::Max,
            Command::Ctx,
            Command::With,
            Command::Rcd,
            Command::Help,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Exit => "exit",
            Command::Mode => "mode",
            Command::Role => "role",
            Command::Temp => "temp",
            Command::Max => "max",
            Command::Ctx => "ctx",
            Command::With => "with",
            Command::Rcd => "rcd",
            Command::Help => "help",
        }
    }

    /// Argument placeholder shown in help
    pub fn usage(&self) -> &'static str {
        match self {
            Command::Role => "[role desc]",
            Command::Temp => "[temperature]",
            Command::Max => "[max_tokens]",
            Command::Ctx => "[on/off/new/lock/unlock]",
            Command::With => "[index|last|ctx] [question]",
            _ => "",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::Exit => "Exit the chat",
            Command::Mode => "Show current settings",
            Command::Role => "Set system role",
            Command::Temp => "Set temperature",
            Command::Max => "Set max tokens",
            Command::Ctx => "Switch or reset context mode",
            Command::With => "Ask with a record as context",
            Command::Rcd => "List transcript records",
            Command::Help => "Show available commands",
        }
    }

    /// Commands that read their argument from an extra input line when
    /// none was given inline
    pub fn prompts_for_arg(&self) -> bool {
        matches!(self, Command::Role | Command::Temp | Command::Max)
    }

    /// Prompt text for [`Command::prompts_for_arg`] commands
    pub fn prompt(&self) -> &'static str {
        match self {
            Command::Role => "Set system role: ",
            Command::Temp => "Set temperature: ",
            Command::Max => "Set max tokens: ",
            _ => "",
        }
    }

    /// Find the command whose keyword prefixes `input`, returning it with
    /// the trimmed remainder.
    pub fn match_prefix(input: &str) -> Option<(Command, &str)> {
        Self::all().iter().find_map(|cmd| {
            input
                .strip_prefix(cmd.name())
                .map(|rest| (*cmd, rest.trim()))
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", COMMAND_MARKER, self.name())
    }
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Known(Command, String),
    /// Marker present but no keyword matched
    Unknown(String),
}

/// Parse an input line. Returns `None` when the line is not a command.
pub fn parse_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix(COMMAND_MARKER)?;
    match Command::match_prefix(rest) {
        Some((cmd, args)) => Some(ParsedCommand::Known(cmd, args.to_string())),
        None => {
            let keyword = rest.split_whitespace().next().unwrap_or_default();
            Some(ParsedCommand::Unknown(keyword.to_string()))
        }
    }
}

/// Argument of `\ctx`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtxAction {
    On,
    New,
    Off,
    Lock,
    Unlock,
}

impl FromStr for CtxAction {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "on" => Ok(CtxAction::On),
            "new" => Ok(CtxAction::New),
            "off" => Ok(CtxAction::Off),
            "lock" => Ok(CtxAction::Lock),
            "unlock" => Ok(CtxAction::Unlock),
            other => Err(ChatError::InvalidValue(format!(
                "ctx expects on/new/off/lock/unlock, got '{other}'"
            ))),
        }
    }
}

/// First argument of `\with`: which history to send along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallTarget {
    /// A transcript record; negative counts from the end
    Index(isize),
    /// Alias for index -1
    Last,
    /// The live context buffer, whatever the context mode
    LiveContext,
}

impl RecallTarget {
    /// Split `\with` arguments into target and question
    pub fn parse_with_args(args: &str) -> Result<(RecallTarget, String)> {
        let args = args.trim();
        let (target, question) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
        if target.is_empty() {
            return Err(ChatError::InvalidValue(
                "with expects an index, 'last' or 'ctx'".to_string(),
            ));
        }
        let target: RecallTarget = target.parse()?;
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::InvalidValue("with expects a question".to_string()));
        }
        Ok((target, question.to_string()))
    }
}

impl FromStr for RecallTarget {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "last" => Ok(RecallTarget::Last),
            "ctx" => Ok(RecallTarget::LiveContext),
            _ => s
                .parse::<isize>()
                .map(RecallTarget::Index)
                .map_err(|_| ChatError::InvalidValue(format!("'{s}' is not a record index"))),
        }
    }
}
