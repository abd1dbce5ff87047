//! API key discovery
//!
//! The key is a single token stored in a file whose name contains `.key`
//! (`openai.key`, `work.key.txt`, ...) anywhere below the Askline home.

use crate::{ChatError, Result};
use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A discovered key and where it came from
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub path: PathBuf,
    pub token: String,
}

/// Find the first key file below `home`, in sorted path order
pub fn find_key_file(home: &Path) -> Option<PathBuf> {
    let root = Pattern::escape(&home.to_string_lossy());
    let pattern = format!("{root}/**/*.key*");
    let mut found: Vec<PathBuf> = glob(&pattern)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    found.sort();
    debug!("Key candidates under {}: {:?}", home.display(), found);
    found.into_iter().next()
}

/// Read and trim a key file
pub fn read_key(path: &Path) -> Result<ApiKey> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ChatError::Startup(format!("cannot read key file {}: {e}", path.display()))
    })?;
    let token = content.trim().to_string();
    if token.is_empty() {
        return Err(ChatError::Startup(format!(
            "key file {} is empty",
            path.display()
        )));
    }
    Ok(ApiKey {
        path: path.to_path_buf(),
        token,
    })
}

/// Load the API key, from `explicit` when given, otherwise by discovery
/// under `home`. Any failure is a startup error.
pub fn load_key(home: &Path, explicit: Option<&Path>) -> Result<ApiKey> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_key_file(home).ok_or_else(|| {
            ChatError::Startup(format!("No key file found under {}", home.display()))
        })?,
    };
    read_key(&path)
}
