//! Configuration file support

use brain_client::Framing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default proxy chat endpoint
pub const DEFAULT_URL: &str = "http://localhost:3000/api/chat";

/// Configuration for brain-terminal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Proxy chat endpoint
    pub url: Option<String>,
    /// Response framing: "event-stream" or "plain-text"
    pub framing: Option<Framing>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Color theme: "terminal" or "dark"
    pub theme: Option<String>,
    /// Skip the welcome and loading stages
    pub skip_intro: Option<bool>,
    /// Welcome text reveal speed, in milliseconds per character
    pub typewriter_ms: Option<u64>,
    /// Length of the boot animation, in milliseconds
    pub boot_ms: Option<u64>,
    /// Maximum number of status log entries
    pub log_capacity: Option<usize>,
    /// Where `--verbose` writes its trace log
    pub log_file: Option<String>,
}

/// Effective settings after merging CLI arguments over the config file
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub url: String,
    pub framing: Framing,
    pub tui: bool,
    pub theme: String,
    pub skip_intro: bool,
    pub typewriter_interval: Duration,
    pub boot_duration: Duration,
    pub log_capacity: usize,
    pub log_file: PathBuf,
}

/// Values given on the command line; each one wins over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub framing: Option<Framing>,
    pub no_tui: bool,
    pub skip_intro: bool,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brain-terminal")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("BRAIN_TERMINAL_CONFIG") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default path.
    ///
    /// A missing file yields the defaults; an unreadable one is reported and
    /// ignored.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}", e);
                Self::default()
            }
        }
    }

    /// Load config from `path`
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            url: Some(DEFAULT_URL.to_string()),
            framing: Some(Framing::EventStream),
            tui: Some(true),
            theme: Some("terminal".to_string()),
            ..Default::default()
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Merge command-line overrides over this config
    pub fn resolve(&self, overrides: Overrides) -> Settings {
        let log_file = self
            .log_file
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("brain-terminal.log"));

        Settings {
            url: overrides
                .url
                .or_else(|| self.url.clone())
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
            framing: overrides.framing.or(self.framing).unwrap_or_default(),
            tui: !overrides.no_tui && self.tui.unwrap_or(true),
            theme: self.theme.clone().unwrap_or_else(|| "terminal".to_string()),
            skip_intro: overrides.skip_intro || self.skip_intro.unwrap_or(false),
            typewriter_interval: self
                .typewriter_ms
                .map(Duration::from_millis)
                .unwrap_or(brain_tui::widgets::typewriter::DEFAULT_INTERVAL),
            boot_duration: Duration::from_millis(self.boot_ms.unwrap_or(4000)),
            log_capacity: self
                .log_capacity
                .filter(|&n| n > 0)
                .unwrap_or(brain_tui::widgets::log_panel::DEFAULT_CAPACITY),
            log_file,
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# brain-terminal configuration file
# Place at ~/.config/brain-terminal/config.toml (Linux),
# ~/Library/Application Support/brain-terminal/config.toml (macOS)
# or set BRAIN_TERMINAL_CONFIG to another path.

# Proxy chat endpoint
url = "http://localhost:3000/api/chat"

# Response framing: "event-stream" (default) or "plain-text"
framing = "event-stream"

# Whether to use TUI mode by default
tui = true

# Color theme: "terminal" (green phosphor) or "dark"
theme = "terminal"

# Skip the welcome text and boot animation
# skip_intro = false

# Welcome text reveal speed (ms per character) and boot animation length (ms)
# typewriter_ms = 50
# boot_ms = 4000

# Number of SYSTEM STATUS entries kept
# log_capacity = 200

# Trace log written with --verbose
# log_file = "/tmp/brain-terminal.log"
"#
}
