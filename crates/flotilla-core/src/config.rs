//! Path helpers and user configuration.
//!
//! Record files live at the workspace root the user points a command at;
//! daemon control files (pid, log, bound port) live in a per-user runtime
//! directory so one daemon serves the machine.

use std::path::PathBuf;

use serde::Deserialize;

/// Default reconciliation interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 300;
/// Preferred dashboard port; the daemon falls back to an ephemeral port.
pub const DEFAULT_PORT: u16 = 8374;

/// User-tunable settings from `~/.config/flotilla/config.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interval_secs: u64,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            port: DEFAULT_PORT,
        }
    }
}

/// Runtime directory for daemon control files:
/// `~/.local/share/flotilla/` (platform equivalent via `dirs`).
pub fn runtime_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("flotilla"))
        .unwrap_or_else(|| PathBuf::from("/tmp/flotilla"))
}

/// Path to the config file: `~/.config/flotilla/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })?;
    Some(config_dir.join("flotilla").join("config.toml"))
}

/// Load user config; a missing or malformed file yields the defaults.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return Config::default(),
    };
    toml::from_str(&content).unwrap_or_default()
}
