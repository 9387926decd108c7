use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod app;
mod demos;

use app::App;
use demos::DemoWorkflow;
use modalflow::{logging, ui, Config};

#[derive(Parser)]
#[command(name = "modalflow")]
#[command(about = "Run modal dialog workflows in the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a demo workflow in the terminal UI
    Demo {
        /// Which workflow to run
        #[arg(value_enum, default_value = "data-passing")]
        workflow: DemoWorkflow,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Also write it to .modalflow/config.toml
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let is_tui_mode = !matches!(cli.command, Some(Commands::Config { .. }));
    let logging_handle = logging::init_logging(&config, is_tui_mode, cli.debug)?;

    match cli.command {
        Some(Commands::Config { save }) => cmd_config(&config, save)?,
        Some(Commands::Demo { workflow }) => {
            run_tui(config, workflow, logging_handle.log_file_path).await?;
        }
        None => {
            run_tui(config, DemoWorkflow::DataPassing, logging_handle.log_file_path).await?;
        }
    }

    Ok(())
}

async fn run_tui(
    config: Config,
    workflow: DemoWorkflow,
    log_file_path: Option<PathBuf>,
) -> Result<()> {
    ui::install_panic_hook();

    let mut app = App::new(config, workflow)?;
    let result = app.run().await;

    // Print log file path on exit if logs were written
    if let Some(log_path) = log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }

    result
}

fn cmd_config(config: &Config, save: bool) -> Result<()> {
    print!("{}", config.to_toml()?);
    if save {
        config.save()?;
        eprintln!("Saved to {}", Config::project_config_path().display());
    }
    Ok(())
}
