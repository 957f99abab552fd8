//! Run command - extract records from a batch of receipt documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use receipt_core::batch::{validate_count, BatchObserver, BatchRunner};
use receipt_core::export::{self, ExportFormat};
use receipt_core::models::config::{BatchConfig, ReceiptConfig};
use receipt_core::prompt::load_instruction;
use receipt_core::{
    Credential, Document, ExtractionEvent, Extractor, HttpTransport, ReferenceList, RunConfig,
};

use super::config::load_config;
use super::OutputFormat;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Receipt files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Text file listing the allowed account categories
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Edited instruction prompt (default: built-in prompt)
    #[arg(short, long)]
    prompt_file: Option<PathBuf>,

    /// API key (default: read from the configured environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Directory for the export file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Export format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Print the records without writing an export file
    #[arg(long)]
    no_save: bool,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Inputs are checked before anything is read or sent
    let files = expand_inputs(&args.inputs, &config.batch)?;
    validate_count(files.len(), config.batch.max_documents)?;
    let documents = files
        .iter()
        .map(|path| read_document(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let run_config = build_run_config(&args, &config)?;

    let extractor = Extractor::new(
        HttpTransport::new(config.api.endpoint.clone()),
        config.api.model.clone(),
    );
    debug!("Using endpoint {}", extractor.transport().endpoint());

    println!(
        "{} Processing {} documents with {}",
        style("ℹ").blue(),
        documents.len(),
        extractor.model()
    );

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    let observer = ConsoleObserver { pb: pb.clone() };

    let report = BatchRunner::new(&extractor)
        .with_max_documents(config.batch.max_documents)
        .run(&documents, &run_config, &observer)
        .await?;

    pb.finish_with_message("Complete");

    let failed: Vec<_> = report.outcomes.iter().filter(|o| o.failed()).collect();

    println!();
    println!(
        "{} Processed {} documents in {:?}",
        style("✓").green(),
        report.outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} records, {} failed documents",
        style(report.records.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed documents:").red());
        for outcome in &failed {
            println!(
                "  - {}: {}",
                outcome.name,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if report.records.is_empty() {
        anyhow::bail!("No records were extracted");
    }

    let format: ExportFormat = args
        .format
        .map(ExportFormat::from)
        .unwrap_or(config.export.format);

    println!();
    println!("{}", export::render(&report.records, format)?);

    if !args.no_save {
        let output_dir = args
            .output_dir
            .clone()
            .unwrap_or_else(|| config.export.output_dir.clone());
        fs::create_dir_all(&output_dir)?;

        let path = export::write_export(
            &output_dir,
            &report.records,
            format,
            &chrono::Local::now(),
        )?;
        println!(
            "{} Export written to {}",
            style("✓").green(),
            path.display()
        );
    }

    Ok(())
}

/// Expand paths and glob patterns into the list of documents to send.
fn expand_inputs(inputs: &[String], batch: &BatchConfig) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let matches: Vec<PathBuf> = glob(input)?.filter_map(|r| r.ok()).collect();
        if matches.is_empty() {
            anyhow::bail!("No matching files found for: {}", input);
        }

        for path in matches {
            if !path.is_file() {
                continue;
            }
            if !batch.accepts(&path) {
                warn!("Skipping {}: unsupported file type", path.display());
                continue;
            }
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

fn read_document(path: &Path) -> anyhow::Result<Document> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();
    debug!("Read {} ({} bytes)", name, bytes.len());
    Ok(Document::new(name, bytes))
}

fn build_run_config(args: &RunArgs, config: &ReceiptConfig) -> anyhow::Result<RunConfig> {
    let api_key = args
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .or_else(|| config.api_key_from_env())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "API key missing. Pass --api-key or set {}.",
                config.api.api_key_env
            )
        })?;

    let prompt_path = args
        .prompt_file
        .as_deref()
        .or(config.prompt.instruction_file.as_deref());
    let instruction_prompt = load_instruction(prompt_path)?;

    let reference = match &args.reference {
        Some(path) => Some(ReferenceList::new(fs::read(path)?)),
        None => None,
    };

    Ok(RunConfig {
        instruction_prompt,
        credential: Credential::new(api_key),
        reference,
    })
}

/// Renders batch notifications above the progress bar.
struct ConsoleObserver {
    pb: ProgressBar,
}

impl BatchObserver for ConsoleObserver {
    fn on_event(&self, event: &ExtractionEvent) {
        let document = event.document();
        match event {
            ExtractionEvent::Started { .. } => {
                self.pb.set_message(format!("Processing {} ...", document));
            }
            ExtractionEvent::Succeeded { records, .. } => {
                self.pb.println(format!(
                    "{} {}: {} records",
                    style("✓").green(),
                    document,
                    records
                ));
            }
            ExtractionEvent::TransportFailed { detail, .. } => {
                self.pb.println(format!(
                    "{} Error while processing {}: {}",
                    style("✗").red(),
                    document,
                    detail
                ));
            }
            ExtractionEvent::ParseFailed {
                detail,
                raw_response,
                ..
            } => {
                self.pb.println(format!(
                    "{} Could not parse the model reply for {}: {}",
                    style("✗").red(),
                    document,
                    detail
                ));
                self.pb
                    .println(style("--- raw model reply ---").dim().to_string());
                self.pb.println(raw_response);
                self.pb.println(style("--- end of reply ---").dim().to_string());
            }
        }
    }

    fn on_progress(&self, completed: usize, _total: usize) {
        self.pb.set_position(completed as u64);
    }
}
