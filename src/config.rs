//! Configuration and persisted session parameters.
//!
//! Two small files live under `~/.webhunt/`:
//!
//! - `config.toml` — client settings (server URL, sound, end-mode policy)
//! - `session` — the last-used session parameters in the fragment
//!   `key=value,key=value` encoding, so instance/name/team/enter survive
//!   restarts
//!
//! # Configuration File
//!
//! ```toml
//! # Game front end to talk to
//! server = "http://127.0.0.1:8080"
//!
//! # Start with the bell muted
//! muted = false
//!
//! # What an unknown end-of-game mode means: "death" or "server-closed"
//! end_mode_policy = "death"
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::decoder::UnknownEndPolicy;
use crate::fragment::Fragment;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the game front end.
    pub server: String,
    /// Start with the bell muted.
    pub muted: bool,
    /// Policy for end-of-game modes the protocol does not define:
    /// "death" or "server-closed".
    pub end_mode_policy: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: "http://127.0.0.1:8080".to_string(),
            muted: false,
            end_mode_policy: "death".to_string(),
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults on any problem.
    pub fn load() -> Self {
        if let Some(path) = config_dir().map(|d| d.join("config.toml")) {
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(config) = toml::from_str(&content) {
                        return config;
                    }
                    warn!("could not parse {}, using defaults", path.display());
                }
            }
        }
        Self::default()
    }

    pub fn unknown_end_policy(&self) -> UnknownEndPolicy {
        match self.end_mode_policy.as_str() {
            "death" => UnknownEndPolicy::Death,
            "server-closed" => UnknownEndPolicy::ServerClosed,
            other => {
                warn!("unknown end_mode_policy '{}', using death", other);
                UnknownEndPolicy::Death
            }
        }
    }
}

/// Where the client's log file goes.
pub fn log_path() -> PathBuf {
    config_dir()
        .map(|d| d.join("webhunt.log"))
        .unwrap_or_else(|| PathBuf::from("webhunt.log"))
}

fn session_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("session"))
}

/// Load the persisted session parameters. Missing or unreadable files
/// yield an empty fragment.
pub fn load_session() -> Fragment {
    let Some(path) = session_path() else {
        return Fragment::new();
    };
    match fs::read_to_string(&path) {
        Ok(content) => Fragment::parse(content.trim()),
        Err(_) => Fragment::new(),
    }
}

/// Persist session parameters for the next run.
pub fn save_session(fragment: &Fragment) -> io::Result<()> {
    let Some(path) = session_path() else {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "no home directory",
        ));
    };
    fs::write(path, fragment.encode())
}

/// `~/.webhunt`, created on first use.
fn config_dir() -> Option<PathBuf> {
    let home = home_dir()?;
    let dir = home.join(".webhunt");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server, "http://127.0.0.1:8080");
        assert!(!config.muted);
        assert_eq!(config.unknown_end_policy(), UnknownEndPolicy::Death);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("muted = true").unwrap();
        assert!(config.muted);
        assert_eq!(config.server, "http://127.0.0.1:8080");
        assert_eq!(config.end_mode_policy, "death");
    }

    #[test]
    fn test_end_mode_policy_parsing() {
        let mut config = Config::default();
        config.end_mode_policy = "server-closed".to_string();
        assert_eq!(config.unknown_end_policy(), UnknownEndPolicy::ServerClosed);

        config.end_mode_policy = "bogus".to_string();
        assert_eq!(config.unknown_end_policy(), UnknownEndPolicy::Death);
    }
}
