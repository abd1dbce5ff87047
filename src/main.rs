//! Askline CLI
//!
//! Interactive chat with a chat-completion model, one line at a time.

use askline::credentials::load_key;
use askline::provider::OpenAiProvider;
use askline::{AppSettings, AskConfig, ChatError, ChatLog, Console, Repl};
use chrono::Local;
use clap::Parser;
use crossterm::style::Stylize;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Askline - chat with a language model from the terminal
#[derive(Parser, Debug)]
#[command(name = "askline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding config.toml, key files and chat logs
    #[arg(long, env = "ASKLINE_HOME")]
    home: Option<PathBuf>,

    /// Key file to use instead of searching the home directory
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Maximum tokens per answer
    #[arg(long)]
    max_tokens: Option<u32>,

    /// System role sent with every request
    #[arg(long)]
    role: Option<String>,

    /// Provider base URL (e.g. http://localhost:11434/v1)
    #[arg(long)]
    base_url: Option<String>,

    /// Start with context mode on
    #[arg(long)]
    context: bool,

    /// Do not write a chat log
    #[arg(long)]
    no_log: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Settings given on the command line, layered over the config file
    fn overrides(&self) -> AppSettings {
        AppSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            system_role: self.role.clone(),
            base_url: self.base_url.clone(),
            context: self.context.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(cli: Cli) -> askline::Result<()> {
    let home = match &cli.home {
        Some(home) => home.clone(),
        None => default_home()?,
    };
    info!("Askline home: {:?}", home);

    let mut config = AskConfig::new(home)
        .with_log(!cli.no_log)
        .with_color(!cli.no_color);
    if let Some(key_file) = &cli.key_file {
        config = config.with_key_file(key_file.clone());
    }

    let settings = AppSettings::load(&config.settings_file())
        .await?
        .merge(cli.overrides());
    let session = settings.initial_session()?;

    let key = load_key(&config.home, config.key_file.as_deref())?;
    let provider = OpenAiProvider::new(key.token, settings.base_url())?;
    info!("Using provider at {}", provider.base_url());

    let console = Console::stdout(config.color);
    let input = BufReader::new(tokio::io::stdin());
    let mut repl = Repl::new(session, provider, console, input);

    if config.log_enabled {
        match ChatLog::for_session(&config.log_root(), Local::now()).await {
            Ok(log) => repl = repl.with_log(log),
            Err(e) => warn!("Chat log disabled: {}", e),
        }
    }

    repl.greet(&key.path);
    repl.run().await;
    Ok(())
}

/// `~/.askline`
fn default_home() -> askline::Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ChatError::Startup("Could not find home directory".to_string()))?;
    Ok(home.join(".askline"))
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
