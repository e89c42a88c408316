// ABOUTME: Entry point for the skyhook CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use skyhook::config::{self, Config};
use skyhook::error::Result;
use skyhook::output::Output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = cli.output_mode();
    match run(cli, Output::new(mode)).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            Output::new(mode).error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    }
}

/// Run a command and return the process exit code.
async fn run(cli: Cli, output: Output) -> Result<i32> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init {
            application,
            repository,
            force,
        } => {
            config::init_config(&cwd, application.as_deref(), repository.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(0)
        }
        Commands::Deploy {
            targets,
            parallel,
            force_lock,
        } => {
            let config = Config::discover(&cwd)?;
            commands::deploy(config, targets.into(), parallel, force_lock, output).await
        }
        Commands::Rollback {
            release,
            targets,
            force_lock,
        } => {
            let config = Config::discover(&cwd)?;
            commands::rollback(config, targets.into(), release.as_deref(), force_lock, output)
                .await
        }
        Commands::Cleanup { targets } => {
            let config = Config::discover(&cwd)?;
            commands::cleanup(config, targets.into(), output).await
        }
        Commands::Current { targets } => {
            let config = Config::discover(&cwd)?;
            commands::current(config, targets.into(), output).await
        }
        Commands::GetOption { key } => {
            let config = Config::discover(&cwd)?;
            commands::option(&config, &key)
        }
    }
}
