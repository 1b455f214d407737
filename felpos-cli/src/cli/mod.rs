//! Command-line interface definitions

pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "felpos-cli",
    version,
    about = "Import FEL point-of-sale sales into an accounting ledger"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a sales workbook and drive it through the ledger workflow
    Import(commands::import::ImportArgs),
}
