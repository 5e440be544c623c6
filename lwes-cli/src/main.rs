//! ## lwes-cli
//! Command line front end: listen for LWES events on a UDP endpoint or
//! decode a captured datagram offline.

use clap::Parser;

mod commands;
mod error;

use commands::Cli;
use error::CliError;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}
