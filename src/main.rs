//! manifest-render CLI entry point
//!
//! Parses arguments, renders the configured sources and prints the documents.
//! Failures are printed with a suggestion where one is known and exit with
//! status 1.

use anyhow::Result;
use clap::Parser;
use manifest_render::cli;
use manifest_render::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
