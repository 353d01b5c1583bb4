//! Taxonomy builder CLI.
//!
//! Turns saved business-directory pages into validated category taxonomies
//! plus a compact choices file for downstream pickers.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
