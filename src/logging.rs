//! Tracing setup for the modalflow binary.
//!
//! While the demo TUI is running, dialogs own the terminal, so events go to
//! `<state>/logs/modalflow-<timestamp>.log`. The `config` command and runs
//! with `logging.to_file = false` write to stderr instead.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Keeps the file writer alive and remembers where the session log went.
pub struct LoggingHandle {
    /// Flushes buffered events when dropped; hold it until exit
    pub _guard: Option<WorkerGuard>,

    pub log_file_path: Option<PathBuf>,
}

/// Name of the log file for a session started now.
pub fn log_file_name() -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    format!("modalflow-{}.log", timestamp)
}

/// Whether events go to a file rather than stderr.
pub fn logs_to_file(config: &Config, is_tui_mode: bool) -> bool {
    is_tui_mode && config.logging.to_file
}

/// `RUST_LOG` wins; otherwise `--debug` or the configured level.
fn env_filter(config: &Config, debug_override: bool) -> EnvFilter {
    let level = if debug_override {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. Call once, after config is loaded.
pub fn init_logging(
    config: &Config,
    is_tui_mode: bool,
    debug_override: bool,
) -> Result<LoggingHandle> {
    let filter = env_filter(config, debug_override);

    if !logs_to_file(config, is_tui_mode) {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
        return Ok(LoggingHandle {
            _guard: None,
            log_file_path: None,
        });
    }

    let logs_dir = config.logs_path();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let file_name = log_file_name();
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&logs_dir, &file_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();

    Ok(LoggingHandle {
        _guard: Some(guard),
        log_file_path: Some(logs_dir.join(file_name)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();
        config
    }

    #[test]
    fn test_logs_path_created() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let logs_dir = config.logs_path();
        assert!(logs_dir.ends_with("logs"));
        assert!(logs_dir.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_log_file_name_format() {
        let name = log_file_name();
        assert!(name.starts_with("modalflow-"));
        assert!(name.ends_with("Z.log"));
    }

    #[test]
    fn test_cli_mode_logs_to_stderr() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        assert!(!logs_to_file(&config, false));
    }

    #[test]
    fn test_debug_flag_overrides_configured_level() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.logging.level = "warn".to_string();

        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter(&config, true).to_string(), "debug");
            assert_eq!(env_filter(&config, false).to_string(), "warn");
        }
    }

    #[test]
    fn test_tui_mode_with_file_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        assert!(logs_to_file(&config, true));

        config.logging.to_file = false;
        assert!(!logs_to_file(&config, true));
    }
}
