//! Import command definitions

mod handler;

pub use handler::handle_import_command;

use std::path::PathBuf;

use clap::{Args, ValueEnum};

/// Output format for the import report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Path to the sales workbook (.xlsx)
    pub file: PathBuf,

    /// Ledger environment to import into
    #[arg(long)]
    pub env: Option<String>,

    /// Parse and group the file without touching the ledger
    #[arg(long)]
    pub dry: bool,

    /// Report output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Print per-stage progress
    #[arg(short, long)]
    pub verbose: bool,
}
