//! Extraction client: one document in, zero or more records out.

pub mod candidate;
pub mod request;
pub mod response;
pub mod transport;

pub use candidate::{find_candidate, parse_records};
pub use request::{build_request, ChatCompletionRequest, ContentPart};
pub use transport::{ChatTransport, HttpTransport};

use tracing::{debug, error, info};

use crate::batch::{BatchObserver, Credential, Document, ReferenceList};
use crate::error::ExtractionError;
use crate::models::record::ReceiptRecord;

/// Inputs for extracting one document. Built per call and discarded.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub document: &'a Document,
    pub instruction_prompt: &'a str,
    pub credential: &'a Credential,
    pub reference: Option<&'a ReferenceList>,
}

/// Status notifications emitted while extracting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionEvent {
    /// A document is about to be sent.
    Started { document: String },
    /// The reply was decoded into records.
    Succeeded { document: String, records: usize },
    /// The request failed or the response envelope was unusable.
    TransportFailed { document: String, detail: String },
    /// The model replied but its text could not be decoded.
    ParseFailed {
        document: String,
        detail: String,
        raw_response: String,
    },
}

impl ExtractionEvent {
    /// Name of the document the event refers to.
    pub fn document(&self) -> &str {
        match self {
            Self::Started { document }
            | Self::Succeeded { document, .. }
            | Self::TransportFailed { document, .. }
            | Self::ParseFailed { document, .. } => document,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::TransportFailed { .. } | Self::ParseFailed { .. })
    }

    fn from_error(document: &str, err: &ExtractionError) -> Self {
        match err.raw_response() {
            Some(raw) => Self::ParseFailed {
                document: document.to_string(),
                detail: err.to_string(),
                raw_response: raw.to_string(),
            },
            None => Self::TransportFailed {
                document: document.to_string(),
                detail: err.to_string(),
            },
        }
    }
}

/// Extraction client over a chat transport.
pub struct Extractor<T> {
    transport: T,
    model: String,
}

impl<T: ChatTransport> Extractor<T> {
    /// Create an extractor sending requests for `model` through `transport`.
    pub fn new(transport: T, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Extract records, reporting every failure as an error.
    ///
    /// Makes exactly one request; there is no retry.
    pub async fn try_extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Vec<ReceiptRecord>, ExtractionError> {
        if request.document.bytes.is_empty() {
            return Err(ExtractionError::EmptyDocument(request.document.name.clone()));
        }

        let body = build_request(&self.model, request);
        debug!(
            "Sending {} ({} bytes, reference list: {})",
            request.document.name,
            request.document.bytes.len(),
            request.reference.is_some()
        );

        let reply = self.transport.complete(&body, request.credential).await?;
        parse_records(&reply)
    }

    /// Extract records, converting any failure into an empty result.
    ///
    /// Failures are logged and passed to `observer`; they never propagate.
    pub async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
        observer: &dyn BatchObserver,
    ) -> Vec<ReceiptRecord> {
        self.extract_reported(request, observer)
            .await
            .unwrap_or_default()
    }

    /// Like [`Extractor::try_extract`], but also logs and notifies `observer`
    /// of the start and the outcome.
    pub async fn extract_reported(
        &self,
        request: &ExtractionRequest<'_>,
        observer: &dyn BatchObserver,
    ) -> Result<Vec<ReceiptRecord>, ExtractionError> {
        let name = request.document.name.as_str();
        info!("Processing {}", name);
        observer.on_event(&ExtractionEvent::Started {
            document: name.to_string(),
        });

        match self.try_extract(request).await {
            Ok(records) => {
                info!("Extracted {} records from {}", records.len(), name);
                observer.on_event(&ExtractionEvent::Succeeded {
                    document: name.to_string(),
                    records: records.len(),
                });
                Ok(records)
            }
            Err(e) => {
                error!("Failed to process {}: {}", name, e);
                observer.on_event(&ExtractionEvent::from_error(name, &e));
                Err(e)
            }
        }
    }
}
