//! crosspost command-line client.
//!
//! Uploads a video to the posting service once and follows its progress
//! onto every configured platform. Logs go to stderr; stdout carries the
//! card lines.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod terminal;

use app::App;
use config::ClientConfig;

/// Command-line arguments for crosspost.
#[derive(Parser, Debug)]
#[command(name = "crosspost")]
#[command(about = "Upload a video once, follow it onto every platform")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/crosspost/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Posting service base URL, overrides the config file
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload one file and follow its progress
    Upload {
        file: PathBuf,
        /// Media type, detected from the extension when omitted
        #[arg(long)]
        media_type: Option<String>,
    },
    /// Upload every file that lands in the drop folder
    Watch { dir: Option<PathBuf> },
    /// Show the error detail for a platform
    Details { platform_id: String },
    /// List the configured platforms
    Platforms,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the current settings to the config file
    Init,
    /// Print the config file location
    Path,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => {
                config.save()?;
                println!("{}", config.file_path().display());
                Ok(ExitCode::SUCCESS)
            }
            ConfigAction::Path => {
                println!("{}", config.file_path().display());
                Ok(ExitCode::SUCCESS)
            }
        };
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async move {
        let app = App::new(config)?;
        match cli.command {
            Command::Upload { file, media_type } => app.upload(file, media_type).await,
            Command::Watch { dir } => app.watch(dir).await,
            Command::Details { platform_id } => app.details(&platform_id).await,
            Command::Platforms => Ok(app.platforms()),
            Command::Config { .. } => Ok(ExitCode::SUCCESS),
        }
    })
}
