mod api;
mod cli;
mod config;
mod pipeline;
mod report;

use anyhow::Result;
use clap::Parser;
use colored::*;

use cli::commands::auth::handle_auth_command;
use cli::commands::update::handle_update_command;
use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Update(args) => handle_update_command(args, config, cli.verbose).await,
        Commands::Auth(args) => handle_auth_command(args, config).await,
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
