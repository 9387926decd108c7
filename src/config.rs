use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to file in TUI mode (false = stderr for debugging)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

/// Terminal UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Event poll interval for the TUI loop
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate_ms: u64,
    /// Dialog width as a percentage of the terminal
    #[serde(default = "default_dialog_width")]
    pub dialog_width_percent: u16,
    /// Dialog height as a percentage of the terminal
    #[serde(default = "default_dialog_height")]
    pub dialog_height_percent: u16,
}

fn default_refresh_rate() -> u64 {
    100
}

fn default_dialog_width() -> u16 {
    60
}

fn default_dialog_height() -> u16 {
    40
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: default_refresh_rate(),
            dialog_width_percent: default_dialog_width(),
            dialog_height_percent: default_dialog_height(),
        }
    }
}

/// Remote submit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL that relative submit targets are joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for runtime state (logs)
    #[serde(default = "default_state_path")]
    pub state: String,
}

fn default_state_path() -> String {
    ".modalflow".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: default_state_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            ui: UiConfig::default(),
            remote: RemoteConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Config {
    /// Path to the project-local config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".modalflow/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so modalflow works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/modalflow/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("modalflow").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with MODALFLOW_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("MODALFLOW")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to .modalflow/config.toml
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::project_config_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str = self.to_toml()?;
        std::fs::write(config_path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.state)
    }

    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}
