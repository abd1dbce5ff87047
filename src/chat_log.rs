//! Append-only chat log
//!
//! One file per session at `<root>/<YYYYMMDD>/<HHMMSS>.log`. Each entry is
//! `[HH:MM:SS] <role> > <content>` terminated by CRLF. The file is opened
//! for every write and closed again right after.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Role labels written to the log
pub mod roles {
    pub const CLIENT: &str = "Client";
    pub const ASSISTANT: &str = "Assistant";
    pub const ERROR: &str = "Error";
}

#[derive(Debug, Clone)]
pub struct ChatLog {
    path: PathBuf,
}

impl ChatLog {
    /// Log for a session that started at `started`. Creates the date
    /// directory under `root`.
    pub async fn for_session(root: &Path, started: DateTime<Local>) -> crate::Result<Self> {
        let path = Self::session_path(root, started);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        Ok(Self { path })
    }

    /// `<root>/<YYYYMMDD>/<HHMMSS>.log`
    pub fn session_path(root: &Path, started: DateTime<Local>) -> PathBuf {
        root.join(started.format("%Y%m%d").to_string())
            .join(format!("{}.log", started.format("%H%M%S")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, role: &str, content: &str) -> crate::Result<()> {
        let line = format_entry(Local::now(), role, content);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Like [`ChatLog::write`], but a failure only produces a warning
    pub async fn append(&self, role: &str, content: &str) {
        if let Err(e) = self.write(role, content).await {
            warn!("Failed to write chat log {}: {}", self.path.display(), e);
        }
    }
}

fn format_entry(at: DateTime<Local>, role: &str, content: &str) -> String {
    format!("[{}] {} > {}\r\n", at.format("%H:%M:%S"), role, content)
}
