//! cssmod - CSS modules transform cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use cssmod::cli::args::ConfigAction;
use cssmod::cli::{Cli, Commands};
use cssmod::config::ConfigManager;
use cssmod::error::{CssModError, CssModResult};
use cssmod::ui;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CssModResult<()> {
    let cli = Cli::parse();

    let cwd =
        std::env::current_dir().map_err(|e| CssModError::io("getting current directory", e))?;

    // An explicit path must exist, except when we are about to create it
    let creating = matches!(
        cli.command,
        Commands::Config(ref args) if matches!(args.action, Some(ConfigAction::Init { .. }))
    );
    let (manager, config) = match cli.config {
        Some(ref path) => {
            let manager = ConfigManager::with_path(cwd.join(path));
            let config = if creating {
                manager.load().await?
            } else {
                manager.load_required().await?
            };
            (manager, config)
        }
        None => {
            let manager = ConfigManager::discover(&cwd);
            let config = manager.load().await?;
            (manager, config)
        }
    };

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("cssmod=warn"),
        1 => EnvFilter::new("cssmod=info"),
        _ => EnvFilter::new("cssmod=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .init();
    }

    debug!("Using config {}", manager.path().display());
    ui::init_theme();

    match cli.command {
        Commands::Transform(args) => {
            cssmod::cli::commands::transform(args, &manager, &config).await
        }
        Commands::Build(args) => cssmod::cli::commands::build(args, &manager, &config).await,
        Commands::Config(args) => cssmod::cli::commands::config(args, &manager, &config).await,
        Commands::Cache(args) => cssmod::cli::commands::cache(args, &manager, &config).await,
    }
}
