//! Formdeck CLI - profile forms with live username checks

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use formdeck::{create_gateway, FixSuggestion, FormSession, FormdeckConfig, FormdeckError};

#[derive(Parser)]
#[command(name = "formdeck")]
#[command(about = "Formdeck - multi-form profile entry with batch submission")]
#[command(version)]
struct Cli {
    /// Path to a formdeck.yaml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the gateway kind (http, mock)
    #[arg(short, long, global = true)]
    gateway: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the form deck (default)
    Run {
        /// Write logs to this file instead of discarding them
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Ask the gateway whether a username is available
    Check {
        username: String,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run { log_file: None });

    let result: anyhow::Result<()> = match command {
        Commands::Run { log_file } => {
            init_file_tracing(log_file.as_deref());
            match load_config(cli.config.as_deref(), cli.gateway, cli.api_url) {
                Ok(config) => run_tui(config).await,
                Err(e) => Err(e.into()),
            }
        }
        Commands::Check { username } => {
            init_stderr_tracing();
            match load_config(cli.config.as_deref(), cli.gateway, cli.api_url) {
                Ok(config) => check_username(&config, &username).await.map_err(Into::into),
                Err(e) => Err(e.into()),
            }
        }
        Commands::Config => {
            init_stderr_tracing();
            load_config(cli.config.as_deref(), cli.gateway, cli.api_url)
                .and_then(|config| print_config(&config))
                .map_err(Into::into)
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e
            .downcast_ref::<FormdeckError>()
            .and_then(|err| err.fix_suggestion())
        {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("formdeck=info"))
}

/// The TUI owns the terminal, so logs only go to a file when asked
fn init_file_tracing(path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    match File::create(path) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        Err(e) => eprintln!(
            "{} cannot open log file {}: {}",
            "Warning:".yellow(),
            path.display(),
            e
        ),
    }
}

fn init_stderr_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults < file < environment < flags
fn load_config(
    path: Option<&Path>,
    gateway: Option<String>,
    api_url: Option<String>,
) -> Result<FormdeckConfig, FormdeckError> {
    let config = FormdeckConfig::load(path)?
        .with_env()
        .with_overrides(gateway, api_url);
    config.validate()?;
    Ok(config)
}

async fn run_tui(config: FormdeckConfig) -> anyhow::Result<()> {
    let gateway = create_gateway(&config.gateway)?;
    tracing::info!(gateway = gateway.name(), "Starting form deck");
    let session = FormSession::new(gateway, &config);
    formdeck::tui::run(session).await
}

async fn check_username(config: &FormdeckConfig, username: &str) -> Result<(), FormdeckError> {
    let gateway = create_gateway(&config.gateway)?;
    let available = gateway.check_username(username).await?;

    if available {
        println!("{} {} is available", "✓".green(), username.bold());
    } else {
        println!("{} {} is taken", "✗".red(), username.bold());
    }
    Ok(())
}

fn print_config(config: &FormdeckConfig) -> Result<(), FormdeckError> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
