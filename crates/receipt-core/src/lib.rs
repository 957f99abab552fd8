//! Core library for AI-assisted receipt extraction.
//!
//! This crate provides:
//! - Receipt record model with loose decoding of model output
//! - Default instruction prompt and per-document prompt composition
//! - Chat-completion client that sends documents as base64 file parts
//! - Best-effort JSON array recovery from free-form model replies
//! - Sequential batch runner with progress and failure notifications
//! - JSON and CSV export

pub mod batch;
pub mod error;
pub mod export;
pub mod extract;
pub mod models;
pub mod prompt;

pub use batch::{
    run_batch, validate_count, validate_documents, BatchObserver, BatchReport, BatchRunner, Credential,
    Document, DocumentOutcome, NullObserver, ReferenceList, RunConfig,
};
pub use error::{BatchError, ExportError, ExtractionError, ReceiptError, Result};
pub use export::ExportFormat;
pub use extract::{
    ChatTransport, ExtractionEvent, ExtractionRequest, Extractor, HttpTransport,
};
pub use models::record::{PageNumber, ReceiptRecord};
