//! `auth` command: verify credentials without touching any report

use anyhow::Result;
use clap::Args;
use colored::*;

use crate::api::{FracttalClient, MeterApi};
use crate::config::{Config, Credentials};

#[derive(Debug, Args)]
pub struct AuthCommands {
    /// Also look up the meter of this asset after authenticating
    #[arg(long, value_name = "SERIAL")]
    pub asset: Option<String>,
}

pub async fn handle_auth_command(args: AuthCommands, config: Config) -> Result<bool> {
    let credentials = Credentials::from_env()?;
    println!("Authenticating as {}...", credentials.api_key.cyan());

    let mut client = FracttalClient::new(&config.api, credentials)?;
    if !client.authenticate().await {
        eprintln!("{}", "✗ Authentication failed".red().bold());
        return Ok(false);
    }
    println!("{}", "✓ Authentication successful".green());

    if let Some(asset) = args.asset {
        match client.get_meter_value(&asset).await {
            Some(value) => println!("{}: {:.1}", asset.bold(), value),
            None => println!("{}: {}", asset.bold(), "no meter found".yellow()),
        }
    }

    Ok(true)
}
