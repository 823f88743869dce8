//! normdraft CLI: guided drafting of official documents from regulations.
//!
//! Extracts requirements from norms, proposes an outline, and drafts each
//! section, with a human review between every step.

mod commands;
mod session;

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
