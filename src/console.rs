//! User-facing terminal output
//!
//! Every line is framed as `[HH:MM:SS] @speaker > text`. Answers are
//! rendered from markdown.

use chrono::Local;
use crossterm::style::{StyledContent, Stylize};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::fmt::Display;
use std::io::{self, Write};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    System,
    Client,
    Assistant,
}

impl Speaker {
    pub fn name(&self) -> &'static str {
        match self {
            Speaker::System => "system",
            Speaker::Client => "client",
            Speaker::Assistant => "assistant",
        }
    }

    fn paint<'a>(&self, text: &'a str) -> StyledContent<&'a str> {
        let styled = text.bold();
        match self {
            Speaker::System => styled.green(),
            Speaker::Client => styled.blue(),
            Speaker::Assistant => styled.yellow(),
        }
    }
}

pub struct Console {
    out: Box<dyn Write + Send>,
    color: bool,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static, color: bool) -> Self {
        Self {
            out: Box::new(out),
            color,
        }
    }

    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }

    /// Print a framed line
    pub fn report(&mut self, speaker: Speaker, text: impl Display) {
        let header = self.header(speaker);
        self.emit(&format!("{header} {text}\n"));
    }

    /// Print a framed line without a newline, for input prompts
    pub fn prompt(&mut self, speaker: Speaker, text: &str) {
        let header = self.header(speaker);
        self.emit(&format!("{header} {text}"));
    }

    /// Report an error with a red marker
    pub fn error(&mut self, err: impl Display) {
        let marker = if self.color {
            "Error:".red().bold().to_string()
        } else {
            "Error:".to_string()
        };
        self.report(Speaker::System, format!("{marker} {err}"));
    }

    /// Render an answer from markdown
    pub fn markdown(&mut self, source: &str) {
        let rendered = render_markdown(source, self.color);
        self.emit(&rendered);
    }

    fn header(&self, speaker: Speaker) -> String {
        let header = format!(
            "[{}] @{} >",
            Local::now().format("%H:%M:%S"),
            speaker.name()
        );
        if self.color {
            speaker.paint(&header).to_string()
        } else {
            header
        }
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!("Failed to write to console: {}", e);
        }
    }
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Render markdown to terminal text. Without color, inline code keeps its
/// backticks and emphasis is dropped.
pub fn render_markdown(source: &str, color: bool) -> String {
    let mut out = String::new();
    // One entry per open list; `Some(n)` is the next ordered number
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut bold = 0usize;
    let mut italic = 0usize;
    let mut in_code_block = false;
    let mut link_url: Option<String> = None;

    let ensure_line_start = |out: &mut String| {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    };

    for event in Parser::new_ext(source, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                ensure_line_start(&mut out);
                bold += 1;
            }
            Event::End(TagEnd::Heading(_)) => {
                bold = bold.saturating_sub(1);
                out.push_str("\n\n");
            }
            Event::End(TagEnd::Paragraph) => {
                out.push_str(if lists.is_empty() { "\n\n" } else { "\n" });
            }
            Event::Start(Tag::Strong) => bold += 1,
            Event::End(TagEnd::Strong) => bold = bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => italic += 1,
            Event::End(TagEnd::Emphasis) => italic = italic.saturating_sub(1),
            Event::Start(Tag::List(start)) => {
                ensure_line_start(&mut out);
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                ensure_line_start(&mut out);
                let depth = lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => ensure_line_start(&mut out),
            Event::Start(Tag::CodeBlock(kind)) => {
                ensure_line_start(&mut out);
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() && color {
                        out.push_str(&format!("    {}\n", (&*lang).dim()));
                    }
                }
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                out.push('\n');
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                link_url = Some(dest_url.to_string());
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = link_url.take() {
                    if !out.ends_with(url.as_str()) {
                        let suffix = format!(" ({url})");
                        if color {
                            out.push_str(&suffix.as_str().dim().to_string());
                        } else {
                            out.push_str(&suffix);
                        }
                    }
                }
            }
            Event::Text(text) if in_code_block => {
                for line in text.lines() {
                    out.push_str("    ");
                    if color {
                        out.push_str(&line.cyan().to_string());
                    } else {
                        out.push_str(line);
                    }
                    out.push('\n');
                }
            }
            Event::Text(text) => {
                if color && (bold > 0 || italic > 0) {
                    let mut styled = (&*text).stylize();
                    if bold > 0 {
                        styled = styled.bold();
                    }
                    if italic > 0 {
                        styled = styled.italic();
                    }
                    out.push_str(&styled.to_string());
                } else {
                    out.push_str(&text);
                }
            }
            Event::Code(code) => {
                if color {
                    out.push_str(&(&*code).yellow().to_string());
                } else {
                    out.push_str(&format!("`{code}`"));
                }
            }
            Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
            Event::End(TagEnd::TableCell) => out.push_str("  "),
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                out.push('\n');
            }
            Event::End(TagEnd::Table) => out.push('\n'),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::Rule => {
                ensure_line_start(&mut out);
                out.push_str("────────\n\n");
            }
            _ => {}
        }
    }

    let mut rendered = out.trim_end().to_string();
    rendered.push('\n');
    rendered
}
