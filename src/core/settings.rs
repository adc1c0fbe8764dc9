//! Client settings persistence
//!
//! Saves and loads [`ClientSettings`] to/from a JSON file so poll cadence and
//! the service address survive restarts.
//!
//! # File Location
//!
//! `settings.json` in the platform configuration directory
//! (e.g. `~/.config/shogisync/settings.json`), or the working directory when
//! no config dir can be resolved.
//!
//! # Error Handling
//!
//! - Load failures fall back to default settings with a warning
//! - Save failures are returned to the caller

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Settings filename
const SETTINGS_FILENAME: &str = "settings.json";

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000/";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Poll cadence in milliseconds for each situation the client can be in.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PollDelays {
    /// Waiting for the opponent to move
    pub opponent_turn_ms: u64,
    /// Local side holds the turn
    pub own_turn_ms: u64,
    /// A move is still being applied
    pub busy_ms: u64,
    /// A reset proposal (either side's) is outstanding
    pub reset_pending_ms: u64,
    /// Reinitialisation after an accepted reset
    pub resetting_ms: u64,
    /// Right after the opponent retracted a ply
    pub after_undo_ms: u64,
    /// Backoff after a transport or protocol failure
    pub error_backoff_ms: u64,
    /// Post-game heartbeat interval
    pub heartbeat_ms: u64,
    /// Interval between match-start checks
    pub match_start_ms: u64,
}

impl Default for PollDelays {
    fn default() -> Self {
        Self {
            opponent_turn_ms: 800,
            own_turn_ms: 1500,
            busy_ms: 400,
            reset_pending_ms: 1000,
            resetting_ms: 1200,
            after_undo_ms: 700,
            error_backoff_ms: 2000,
            heartbeat_ms: 1500,
            match_start_ms: 2000,
        }
    }
}

impl PollDelays {
    pub fn opponent_turn(&self) -> Duration {
        Duration::from_millis(self.opponent_turn_ms)
    }

    pub fn own_turn(&self) -> Duration {
        Duration::from_millis(self.own_turn_ms)
    }

    pub fn busy(&self) -> Duration {
        Duration::from_millis(self.busy_ms)
    }

    pub fn reset_pending(&self) -> Duration {
        Duration::from_millis(self.reset_pending_ms)
    }

    pub fn resetting(&self) -> Duration {
        Duration::from_millis(self.resetting_ms)
    }

    pub fn after_undo(&self) -> Duration {
        Duration::from_millis(self.after_undo_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn match_start(&self) -> Duration {
        Duration::from_millis(self.match_start_ms)
    }
}

/// Persistent client configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the match service; endpoint paths are joined onto it
    pub server_url: Url,
    /// Fallback `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    pub delays: PollDelays,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            log_filter: "info".to_string(),
            delays: PollDelays::default(),
        }
    }
}

fn default_server_url() -> Url {
    match Url::parse(DEFAULT_SERVER_URL) {
        Ok(url) => url,
        Err(_) => unreachable!("default server URL is a valid literal"),
    }
}

/// Resolve the settings file path
///
/// Returns `settings.json` in the user's configuration directory, falling
/// back to the working directory if none can be found.
pub fn settings_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "shogi-sync", "ShogiSync") {
        proj_dirs.config_dir().join(SETTINGS_FILENAME)
    } else {
        // Fallback to current directory
        PathBuf::from(SETTINGS_FILENAME)
    }
}

impl ClientSettings {
    /// Load settings from `path`, using defaults if the file is missing or invalid.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("[SETTINGS] No settings file found at {:?}. Using defaults.", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ClientSettings>(&contents) {
                Ok(settings) => {
                    info!("[SETTINGS] Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!(
                        "[SETTINGS] Failed to parse settings file at {:?}: {}. Using defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!(
                    "[SETTINGS] Failed to read settings file at {:?}: {}. Using defaults.",
                    path, e
                );
                Self::default()
            }
        }
    }

    /// Load settings from the platform config directory.
    pub fn load() -> Self {
        Self::load_from(&settings_path())
    }

    /// Write settings as pretty JSON, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> SettingsResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("[SETTINGS] Saved settings to {:?}", path);
        Ok(())
    }
}
