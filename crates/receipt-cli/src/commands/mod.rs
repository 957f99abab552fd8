//! Subcommands.

pub mod config;
pub mod parse;
pub mod prompt;
pub mod run;
pub mod show;

use receipt_core::ExportFormat;

/// Output format flag shared by the commands that print records.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array
    Json,
    /// CSV with a header row
    Csv,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ExportFormat::Json,
            OutputFormat::Csv => ExportFormat::Csv,
        }
    }
}
