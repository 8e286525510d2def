//! File utility functions

use std::path::{Path, PathBuf};

/// Expand a user-supplied path.
///
/// Handles `~` and `~/rest` (home directory via `dirs`); every other path is
/// returned as given so relative paths stay relative to the working directory,
/// which is where `token.json` and friends are looked up by default.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }

    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }

    PathBuf::from(path)
}

/// Expand an already-typed path (see [`expand_path`])
pub fn expand(path: &Path) -> PathBuf {
    expand_path(&path.to_string_lossy())
}
