//! Parse command - decode a saved model reply without calling the API.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use console::style;

use receipt_core::export;
use receipt_core::extract::{find_candidate, parse_records};

use super::OutputFormat;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// File holding the model reply ("-" reads stdin)
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Print the candidate payload instead of the records
    #[arg(long)]
    candidate: bool,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    let reply = if args.input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(&args.input)?
    };

    if args.candidate {
        println!("{}", find_candidate(&reply));
        return Ok(());
    }

    match parse_records(&reply) {
        Ok(records) => {
            println!("{}", export::render(&records, args.format.into())?);
            eprintln!("{} {} records", style("✓").green(), records.len());
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", e),
    }
}
