//! Show command - print or convert a previously exported file.

use std::path::PathBuf;

use clap::Args;

use receipt_core::export;

use super::OutputFormat;

/// Arguments for the show command.
#[derive(Args)]
pub struct ShowArgs {
    /// Exported JSON file
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ShowArgs) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.input)?;
    let records = export::from_json(&content)?;
    println!("{}", export::render(&records, args.format.into())?);
    Ok(())
}
