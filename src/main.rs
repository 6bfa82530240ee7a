//! Grokipedia CLI - search and read the Grokipedia knowledge base
//!
//! Exit codes: 0 success, 1 generic failure, 2 not found, 3 rate limited,
//! 4 invalid arguments.

use std::io::{self, IsTerminal};

use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;

use grokipedia::api::{ApiError, ExitCode};
use grokipedia::cli::{Cli, Command};
use grokipedia::commands::{self, Context};
use grokipedia::config::{ColorMode, Config};
use grokipedia::logging;

/// Resolves the color mode against the terminal
fn use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal(),
    }
}

async fn run(cli: Cli) -> Result<(), ApiError> {
    let mut out = io::stdout();

    // Completion scripts must not depend on a readable config file
    if let Command::Completion { shell } = cli.command {
        return commands::completion(shell, &mut out);
    }

    let config = Config::load(&cli.globals.overrides())?;
    debug!(url = %config.api.url, cache = config.cache_enabled(), "configuration loaded");

    let color = use_color(config.output.color);
    colored::control::set_override(color);

    if let Command::Cache { .. } = cli.command {
        return commands::cache_clear(&config, &mut out);
    }

    let ctx = Context::from_config(config, color)?;
    commands::run(&ctx, &cli.command, &mut out).await
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Success.into(),
                _ => ExitCode::InvalidArgs.into(),
            };
        }
    };

    logging::init(cli.globals.verbose, cli.globals.debug);

    match run(cli).await {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => {
            eprintln!("Error: {}", err);
            err.exit_code().into()
        }
    }
}
