//! Batch runner: extract every document in order and concatenate the records.

use std::fmt;

use tracing::{info, warn};

use crate::error::BatchError;
use crate::extract::{ChatTransport, ExtractionEvent, ExtractionRequest, Extractor};
use crate::models::record::ReceiptRecord;

/// Maximum number of documents in one run. Configured limits may only lower it.
pub const MAX_DOCUMENTS: usize = 5;

/// An uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Optional list of permitted category labels, sent alongside each document
/// under [`crate::prompt::REFERENCE_FILE_NAME`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceList {
    pub bytes: Vec<u8>,
}

impl ReferenceList {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Everything a run needs besides the documents, fixed for its duration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub instruction_prompt: String,
    pub credential: Credential,
    pub reference: Option<ReferenceList>,
}

/// Receives notifications while a batch runs.
pub trait BatchObserver {
    /// Called for every extraction status change.
    fn on_event(&self, _event: &ExtractionEvent) {}

    /// Called after each document finishes, successful or not.
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl BatchObserver for NullObserver {}

/// Per-document summary of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub name: String,
    pub record_count: usize,
    /// Failure detail when the document contributed nothing because of an error.
    pub error: Option<String>,
}

impl DocumentOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records of every document, in input order.
    pub records: Vec<ReceiptRecord>,
    /// One entry per input document, in input order.
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.failed()).count()
    }
}

/// Clamp a configured document limit to `1..=MAX_DOCUMENTS`.
pub fn effective_limit(max: usize) -> usize {
    max.clamp(1, MAX_DOCUMENTS)
}

/// Reject a document count of zero or above the limit.
///
/// The limit is clamped first, so more than [`MAX_DOCUMENTS`] is always rejected.
pub fn validate_count(count: usize, max: usize) -> Result<(), BatchError> {
    let max = effective_limit(max);
    if count == 0 {
        return Err(BatchError::NoDocuments);
    }
    if count > max {
        return Err(BatchError::TooManyDocuments { count, max });
    }
    Ok(())
}

/// Reject a batch that is empty or larger than `max`.
pub fn validate_documents(documents: &[Document], max: usize) -> Result<(), BatchError> {
    validate_count(documents.len(), max)
}

/// Runs the extractor over a batch of documents, one at a time.
pub struct BatchRunner<'a, T> {
    extractor: &'a Extractor<T>,
    max_documents: usize,
}

impl<'a, T: ChatTransport> BatchRunner<'a, T> {
    pub fn new(extractor: &'a Extractor<T>) -> Self {
        Self {
            extractor,
            max_documents: MAX_DOCUMENTS,
        }
    }

    /// Lower the document limit. Values are clamped to `1..=MAX_DOCUMENTS`.
    pub fn with_max_documents(mut self, max: usize) -> Self {
        self.max_documents = effective_limit(max);
        self
    }

    /// Validate inputs, then extract each document in order.
    ///
    /// Validation failures return before any request is made. A failing
    /// document contributes no records and does not stop the run.
    pub async fn run(
        &self,
        documents: &[Document],
        config: &RunConfig,
        observer: &dyn BatchObserver,
    ) -> Result<BatchReport, BatchError> {
        validate_documents(documents, self.max_documents)?;
        if config.credential.is_empty() {
            return Err(BatchError::MissingCredential);
        }

        let total = documents.len();
        let mut report = BatchReport::default();

        for (i, document) in documents.iter().enumerate() {
            let request = ExtractionRequest {
                document,
                instruction_prompt: &config.instruction_prompt,
                credential: &config.credential,
                reference: config.reference.as_ref(),
            };

            let outcome = match self.extractor.extract_reported(&request, observer).await {
                Ok(records) => {
                    let outcome = DocumentOutcome {
                        name: document.name.clone(),
                        record_count: records.len(),
                        error: None,
                    };
                    report.records.extend(records);
                    outcome
                }
                Err(e) => DocumentOutcome {
                    name: document.name.clone(),
                    record_count: 0,
                    error: Some(e.to_string()),
                },
            };
            report.outcomes.push(outcome);

            observer.on_progress(i + 1, total);
        }

        let failed = report.failed_count();
        if failed > 0 {
            warn!("{} of {} documents failed", failed, total);
        }
        info!(
            "Batch finished: {} records from {} documents",
            report.records.len(),
            total
        );

        Ok(report)
    }
}

/// Run a batch with the default document limit and return only the records.
pub async fn run_batch<T: ChatTransport>(
    extractor: &Extractor<T>,
    documents: &[Document],
    config: &RunConfig,
    observer: &dyn BatchObserver,
) -> Result<Vec<ReceiptRecord>, BatchError> {
    BatchRunner::new(extractor)
        .run(documents, config, observer)
        .await
        .map(|report| report.records)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::ExtractionError;
    use crate::extract::tests::ScriptedTransport;
    use pretty_assertions::assert_eq;

    /// Observer that keeps every notification for later inspection.
    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        events: Mutex<Vec<ExtractionEvent>>,
        progress: Mutex<Vec<(usize, usize)>>,
    }

    impl RecordingObserver {
        pub(crate) fn events(&self) -> Vec<ExtractionEvent> {
            self.events.lock().unwrap().clone()
        }

        pub(crate) fn progress(&self) -> Vec<(usize, usize)> {
            self.progress.lock().unwrap().clone()
        }
    }

    impl BatchObserver for RecordingObserver {
        fn on_event(&self, event: &ExtractionEvent) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn on_progress(&self, completed: usize, total: usize) {
            self.progress.lock().unwrap().push((completed, total));
        }
    }

    fn config() -> RunConfig {
        RunConfig {
            instruction_prompt: "prompt".to_string(),
            credential: Credential::new("key"),
            reference: None,
        }
    }

    fn documents(n: usize) -> Vec<Document> {
        (1..=n)
            .map(|i| Document::new(format!("doc{}.pdf", i), vec![i as u8]))
            .collect()
    }

    #[test]
    fn test_validate_documents() {
        assert_eq!(validate_documents(&[], 5), Err(BatchError::NoDocuments));
        assert_eq!(validate_documents(&documents(1), 5), Ok(()));
        assert_eq!(validate_documents(&documents(5), 5), Ok(()));
        assert_eq!(
            validate_documents(&documents(6), 5),
            Err(BatchError::TooManyDocuments { count: 6, max: 5 })
        );
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let config = config();
        assert!(!format!("{:?}", config).contains("\"key\""));
        assert_eq!(format!("{:?}", config.credential), "Credential(***)");
    }

    #[tokio::test]
    async fn test_middle_failure_keeps_order() {
        let extractor = Extractor::new(
            ScriptedTransport::new(vec![
                Ok(r#"[{"merchant": "A1"}, {"merchant": "A2"}]"#.to_string()),
                Ok("I could not read this.".to_string()),
                Ok(r#"{"merchant": "C1"}"#.to_string()),
            ]),
            "m",
        );
        let observer = RecordingObserver::default();

        let report = BatchRunner::new(&extractor)
            .run(&documents(3), &config(), &observer)
            .await
            .unwrap();

        let merchants: Vec<&str> = report.records.iter().map(|r| r.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["A1", "A2", "C1"]);
        assert_eq!(report.failed_count(), 1);
        assert!(report.outcomes[1].failed());
        assert_eq!(report.outcomes[0].record_count, 2);
        assert_eq!(observer.progress(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty_aggregate() {
        let extractor = Extractor::new(
            ScriptedTransport::new(vec![
                Err(ExtractionError::Api { status: 500, body: "boom".into() }),
                Err(ExtractionError::MissingContent("choices".into())),
            ]),
            "m",
        );
        let observer = RecordingObserver::default();

        let records = run_batch(&extractor, &documents(2), &config(), &observer)
            .await
            .unwrap();

        assert!(records.is_empty());
        let errors = observer.events().iter().filter(|e| e.is_error()).count();
        assert_eq!(errors, 2);
    }

    #[tokio::test]
    async fn test_invalid_batches_make_no_requests() {
        let extractor = Extractor::new(ScriptedTransport::new(vec![]), "m");

        let err = run_batch(&extractor, &[], &config(), &NullObserver).await.unwrap_err();
        assert_eq!(err, BatchError::NoDocuments);

        let err = run_batch(&extractor, &documents(6), &config(), &NullObserver)
            .await
            .unwrap_err();
        assert_eq!(err, BatchError::TooManyDocuments { count: 6, max: 5 });

        let mut no_key = config();
        no_key.credential = Credential::new("  ");
        let err = run_batch(&extractor, &documents(1), &no_key, &NullObserver)
            .await
            .unwrap_err();
        assert_eq!(err, BatchError::MissingCredential);

        assert_eq!(extractor_sent(&extractor), 0);
    }

    #[tokio::test]
    async fn test_custom_limit() {
        let extractor = Extractor::new(ScriptedTransport::new(vec![]), "m");
        let err = BatchRunner::new(&extractor)
            .with_max_documents(2)
            .run(&documents(3), &config(), &NullObserver)
            .await
            .unwrap_err();
        assert_eq!(err, BatchError::TooManyDocuments { count: 3, max: 2 });
    }

    #[test]
    fn test_limit_cannot_exceed_five() {
        assert_eq!(effective_limit(10), 5);
        assert_eq!(effective_limit(0), 1);
        assert_eq!(effective_limit(3), 3);
        assert_eq!(
            validate_count(6, 10),
            Err(BatchError::TooManyDocuments { count: 6, max: 5 })
        );
        assert_eq!(validate_count(1, 0), Ok(()));
        assert_eq!(validate_count(0, 5), Err(BatchError::NoDocuments));
    }

    #[tokio::test]
    async fn test_raised_limit_still_rejects_six_documents() {
        let extractor = Extractor::new(ScriptedTransport::new(vec![]), "m");
        let err = BatchRunner::new(&extractor)
            .with_max_documents(10)
            .run(&documents(6), &config(), &NullObserver)
            .await
            .unwrap_err();

        assert_eq!(err, BatchError::TooManyDocuments { count: 6, max: 5 });
        assert_eq!(extractor_sent(&extractor), 0);
    }

    #[tokio::test]
    async fn test_reference_list_sent_with_every_document() {
        let extractor = Extractor::new(
            ScriptedTransport::new(vec![Ok("[]".into()), Ok("[]".into())]),
            "m",
        );
        let mut config = config();
        config.reference = Some(ReferenceList::new(b"travel".to_vec()));

        run_batch(&extractor, &documents(2), &config, &NullObserver)
            .await
            .unwrap();

        let sent = extractor.transport().sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|r| r.messages[0].content.len() == 3));
    }

    fn extractor_sent(extractor: &Extractor<ScriptedTransport>) -> usize {
        extractor.transport().sent_count()
    }
}
