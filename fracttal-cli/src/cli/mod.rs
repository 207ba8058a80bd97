//! Command-line interface

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::auth::AuthCommands;
use commands::update::UpdateCommands;

#[derive(Debug, Parser)]
#[command(
    name = "fracttal-cli",
    version,
    about = "Push odometer and hour-meter readings from activity reports into Fracttal"
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Update meters from an activity report
    Update(UpdateCommands),
    /// Check that the configured credentials are accepted
    Auth(AuthCommands),
}
