//! `update` command

mod handler;

use clap::Args;
use std::path::PathBuf;

pub use handler::handle_update_command;

#[derive(Debug, Args)]
pub struct UpdateCommands {
    /// Activity report (.xlsx) to process; its status column is updated in place
    pub file: PathBuf,

    /// Submit readings as historical instead of current
    #[arg(long)]
    pub historical: bool,

    /// Reading timestamp (RFC 3339); defaults to the time of each update
    #[arg(long, value_name = "DATETIME")]
    pub timestamp: Option<String>,
}
