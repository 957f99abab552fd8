//! Error types for the receipt-core library.

use thiserror::Error;

/// Error type for loading and saving library configuration.
#[derive(Error, Debug)]
pub enum ReceiptError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning one document into records.
///
/// None of these abort a batch: the extractor reports them and the document
/// contributes zero records.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The document has no bytes to send.
    #[error("document {0} is empty")]
    EmptyDocument(String),

    /// Network or client-side HTTP failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response envelope did not carry a message content.
    #[error("response has no message content: {0}")]
    MissingContent(String),

    /// The model reply could not be decoded as records.
    #[error("could not parse model reply: {reason}")]
    Parse {
        reason: String,
        raw_response: String,
    },
}

impl ExtractionError {
    /// Whether the failure happened before a model reply was available.
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::Parse { .. })
    }

    /// Raw model reply attached to a parse failure.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Parse { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// Input validation errors detected before a batch starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BatchError {
    /// No documents were supplied.
    #[error("no documents selected")]
    NoDocuments,

    /// More documents than the batch limit.
    #[error("{count} documents selected, at most {max} allowed")]
    TooManyDocuments { count: usize, max: usize },

    /// The API credential is empty.
    #[error("API key is missing")]
    MissingCredential,
}

/// Errors related to exporting records.
#[derive(Error, Debug)]
pub enum ExportError {
    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Writing the export file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ReceiptError>;
