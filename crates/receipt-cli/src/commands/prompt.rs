//! Prompt command - show or save the instruction prompt for editing.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use receipt_core::prompt::{compose_instruction, load_instruction, DEFAULT_INSTRUCTION_PROMPT};

use super::config::load_config;

/// Arguments for the prompt command.
#[derive(Args)]
pub struct PromptArgs {
    #[command(subcommand)]
    command: PromptCommand,
}

#[derive(Subcommand)]
enum PromptCommand {
    /// Print the active instruction prompt
    Show {
        /// Print the text sent for this document name
        #[arg(long)]
        document: Option<String>,
    },

    /// Write the default prompt to a file for editing
    Init {
        /// Output path
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(args: PromptArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        PromptCommand::Show { document } => {
            let config = load_config(config_path)?;
            let prompt = load_instruction(config.prompt.instruction_file.as_deref())?;
            match document {
                Some(name) => println!("{}", compose_instruction(&prompt, &name)),
                None => print!("{}", prompt),
            }
            Ok(())
        }
        PromptCommand::Init { output, force } => {
            if output.exists() && !force {
                anyhow::bail!(
                    "{} already exists. Use --force to overwrite.",
                    output.display()
                );
            }
            fs::write(&output, DEFAULT_INSTRUCTION_PROMPT)?;
            println!(
                "{} Wrote instruction prompt to {}",
                style("✓").green(),
                output.display()
            );
            println!("Edit it, then pass it with 'receipt-ocr run --prompt-file {}'.", output.display());
            Ok(())
        }
    }
}
