use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Recompute chunk CRCs when reading cards and reject mismatches
    pub verify_crc: Option<bool>,
    /// Replace existing `chara` chunks when embedding; when off, embedding into
    /// an image that already has a card fails
    pub replace_existing: Option<bool>,
    /// Pretty-print extracted JSON
    pub pretty: Option<bool>,
    /// Check cards against the v2 schema on embed and extract
    pub validate_cards: Option<bool>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/chara-png/config.toml` → `~/.config/chara-png/config.toml`
/// - Windows: `C:\\Users\\user\\AppData\\Roaming\\chara-png` → unchanged
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
