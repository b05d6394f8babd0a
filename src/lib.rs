pub mod cli;
pub mod config;
pub mod core;
pub mod importer;
pub mod providers;
pub mod reporter;

use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Report {
        input: PathBuf,
        output: Option<PathBuf>,
        error_log: Option<PathBuf>,
    },
    Generate {
        output: PathBuf,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    match command {
        AppCommand::Report {
            input,
            output,
            error_log,
        } => {
            info!("Crypto tax report starting...");

            let config = match config_path {
                Some(path) => config::AppConfig::load_from_path(path)?,
                None => config::AppConfig::load()?,
            };
            debug!("Loaded config: {config:#?}");

            cli::report::run(&config, &input, output.as_deref(), error_log.as_deref()).await
        }
        AppCommand::Generate { output } => cli::generate::run(&output),
    }
}
