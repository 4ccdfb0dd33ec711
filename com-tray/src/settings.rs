//! Application settings

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use com_sim::VirtualPortConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Environment variable that overrides the settings file location
const SETTINGS_ENV: &str = "COMTRAY_SETTINGS";

/// Lower bound for the poll period
const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Errors loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine settings path")]
    NoConfigDir,

    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remembered connection settings for one port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortSettings {
    /// Baud rate
    pub baud: u32,
    /// Terminal alias (falls back to the default terminal)
    #[serde(default)]
    pub app: Option<String>,
}

/// A terminal emulator that can be launched for a port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerminalApp {
    /// Executable path or name
    pub path: String,
    /// Argument template; `::port::` and `::baud::` are substituted
    #[serde(default)]
    pub arguments: String,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Poll period for the port watcher in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Baud rate for ports without saved settings
    #[serde(default = "default_baud")]
    pub default_baud: u32,
    /// Terminal alias for ports without saved settings
    #[serde(default = "default_terminal")]
    pub default_terminal: String,
    /// Open a terminal as soon as a port is attached
    #[serde(default)]
    pub auto_launch: bool,
    /// Hide ports whose name contains one of these patterns
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    /// Per-port settings keyed by port name
    #[serde(default)]
    pub ports: BTreeMap<String, PortSettings>,
    /// Terminal emulators keyed by alias
    #[serde(default = "default_apps")]
    pub apps: BTreeMap<String, TerminalApp>,
    /// Watch simulated ports instead of the host's
    #[serde(default)]
    pub simulate: bool,
    /// Ports present at startup in simulated mode
    #[serde(default)]
    pub simulated_ports: Vec<VirtualPortConfig>,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_baud() -> u32 {
    115200
}

fn default_terminal() -> String {
    "putty".to_string()
}

fn default_apps() -> BTreeMap<String, TerminalApp> {
    BTreeMap::from([(
        default_terminal(),
        TerminalApp {
            path: "putty".to_string(),
            arguments: "-serial ::port:: -sercfg ::baud::,8,n,1,N".to_string(),
        },
    )])
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            default_baud: default_baud(),
            default_terminal: default_terminal(),
            auto_launch: false,
            skip_patterns: Vec::new(),
            ports: BTreeMap::new(),
            apps: default_apps(),
            simulate: false,
            simulated_ports: Vec::new(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for comtray
    /// Uses $XDG_CONFIG_HOME/comtray on Linux/macOS, falls back to ~/.config/comtray
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("comtray"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("comtray"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(SETTINGS_ENV) {
            return Some(PathBuf::from(path));
        }
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine settings path, using defaults");
            return Self::default();
        };
        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("Failed to load settings from {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Load settings from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save settings to a file, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Poll period for the watcher
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    /// Baud rate to use for a port
    pub fn port_baud(&self, port: &str) -> u32 {
        self.ports
            .get(port)
            .map(|p| p.baud)
            .unwrap_or(self.default_baud)
    }

    /// Terminal alias to use for a port
    pub fn port_terminal(&self, port: &str) -> &str {
        self.ports
            .get(port)
            .and_then(|p| p.app.as_deref())
            .unwrap_or(self.default_terminal.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.ports.insert(
            "COM3".to_string(),
            PortSettings {
                baud: 921600,
                app: Some("putty".to_string()),
            },
        );
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{
            "ports": { "COM3": { "baud": 9600, "app": "minicom" } },
            "apps": {}
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.poll_interval_ms, 500);
        assert!(settings.apps.is_empty());
        assert_eq!(settings.port_baud("COM3"), 9600);
        assert_eq!(settings.port_terminal("COM3"), "minicom");
        assert_eq!(settings.port_baud("COM4"), 115200);
        assert_eq!(settings.port_terminal("COM4"), "putty");
    }

    #[test]
    fn test_poll_interval_has_floor() {
        let settings = Settings {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(settings.poll_interval(), Duration::from_millis(10));
    }
}
