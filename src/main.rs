use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use cryptotax::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for cryptotax::AppCommand {
    fn from(cmd: Commands) -> cryptotax::AppCommand {
        match cmd {
            Commands::Report {
                input,
                output,
                error_log,
            } => cryptotax::AppCommand::Report {
                input,
                output,
                error_log,
            },
            Commands::Generate { output } => cryptotax::AppCommand::Generate { output },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compute the capital-gains tax report for a transaction file
    Report {
        /// Transaction CSV to process
        input: PathBuf,

        /// Report output path (defaults to crypto_taxes_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Malformed-row log path (defaults to errors_<timestamp>.log)
        #[arg(short, long)]
        error_log: Option<PathBuf>,
    },
    /// Generate a sample transaction file
    Generate {
        /// Where to write the sample file
        #[arg(default_value = "transactions.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => cryptotax::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = cryptotax::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
currency: "EUR"

provider:
  base_url: "https://api.exchangeratesapi.io"
  timeout_secs: 10

rate_limit_ms: 100
audit_log: "fx_audit.log"

tax:
  flat_rate: 0.30
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
