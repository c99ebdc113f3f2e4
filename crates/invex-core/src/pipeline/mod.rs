//! Pipeline orchestration: text, structured extraction, validation, storage.
//!
//! A run moves through `Idle → TextExtracted → Validated → Persisted` and
//! stops in `Errored(kind)` as soon as a stage fails. Nothing is retried.
//! A persistence failure keeps the validated record and its warnings in the
//! run so the caller can still report them.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ClientError, SchemaError, Violation};
use crate::llm::{OpenAiExtractor, StructuredExtractor};
use crate::models::config::InvexConfig;
use crate::models::invoice::InvoiceData;
use crate::pdf::{PdfExtractor, TextExtractor};
use crate::report::Report;
use crate::schema::{self, INVOICE_SCHEMA};
use crate::store::{ConnectionFactory, InvoiceId, InvoiceStore, SqliteInvoiceStore};
use crate::validate::{check_text, ReconciliationWarning, Validator};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No usable text in the document.
    EmptyDocument,
    /// The extraction client failed or ran past the deadline.
    ExtractionFailed,
    /// The client response did not match the invoice schema.
    SchemaViolation,
    /// The store did not confirm the write.
    PersistenceFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::EmptyDocument => "empty document",
            FailureKind::ExtractionFailed => "extraction failed",
            FailureKind::SchemaViolation => "schema violation",
            FailureKind::PersistenceFailed => "persistence failed",
        };
        f.write_str(name)
    }
}

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    TextExtracted,
    Validated,
    Persisted,
    Errored(FailureKind),
}

impl PipelineState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Persisted | PipelineState::Errored(_))
    }
}

/// Details of a failed run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFailure {
    pub kind: FailureKind,
    pub detail: String,
    /// Every schema violation, for [`FailureKind::SchemaViolation`].
    pub violations: Vec<Violation>,
    /// Raw client output, when one was received.
    pub raw_response: Option<String>,
    /// The record may have been written despite the error.
    pub outcome_unknown: bool,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub state: PipelineState,
    /// Every state visited, starting with `Idle`.
    pub trail: Vec<PipelineState>,
    /// Length in chars of the trimmed document text.
    pub text_length: Option<usize>,
    pub invoice: Option<InvoiceData>,
    pub warnings: Vec<ReconciliationWarning>,
    pub raw_response: Option<String>,
    pub id: Option<InvoiceId>,
    pub failure: Option<PipelineFailure>,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            trail: vec![PipelineState::Idle],
            text_length: None,
            invoice: None,
            warnings: Vec::new(),
            raw_response: None,
            id: None,
            failure: None,
        }
    }

    /// Whether the invoice was stored.
    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Persisted
    }

    /// Report of the validated record, present even if persistence failed.
    pub fn report(&self) -> Option<Report> {
        self.invoice.as_ref().map(|invoice| Report {
            invoice: invoice.clone(),
            warnings: self.warnings.clone(),
        })
    }
}

type Observer = Box<dyn Fn(PipelineState) + Send + Sync>;

/// Invoice extraction pipeline.
pub struct Pipeline {
    text_extractor: Arc<dyn TextExtractor>,
    extractor: Arc<dyn StructuredExtractor>,
    store: Arc<dyn InvoiceStore>,
    validator: Validator,
    min_text_length: usize,
    deadline: Option<Duration>,
    observer: Option<Observer>,
}

impl Pipeline {
    /// Create a pipeline with default validation settings.
    pub fn new(
        text_extractor: Arc<dyn TextExtractor>,
        extractor: Arc<dyn StructuredExtractor>,
        store: Arc<dyn InvoiceStore>,
    ) -> Self {
        let config = InvexConfig::default();
        Self {
            text_extractor,
            extractor,
            store,
            validator: Validator::new(config.validation),
            min_text_length: config.pdf.min_text_length,
            deadline: config.llm.extraction_deadline(),
            observer: None,
        }
    }

    /// Pipeline with the shipped collaborators: PDF text, the OpenAI client
    /// and the SQLite store. No connection is opened until the first insert.
    pub fn from_config(config: &InvexConfig) -> crate::Result<Self> {
        config.validate()?;
        let extractor = OpenAiExtractor::from_config(&config.llm)?;
        let store = SqliteInvoiceStore::new(ConnectionFactory::from_config(&config.database));

        Ok(Self::new(
            Arc::new(PdfExtractor::new()),
            Arc::new(extractor),
            Arc::new(store),
        )
        .with_config(config))
    }

    /// Apply validation, text and deadline settings.
    pub fn with_config(mut self, config: &InvexConfig) -> Self {
        self.validator = Validator::new(config.validation.clone());
        self.min_text_length = config.pdf.min_text_length;
        self.deadline = config.llm.extraction_deadline();
        self
    }

    /// Bound the extraction call.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Call `observer` on every state change.
    pub fn with_observer(mut self, observer: impl Fn(PipelineState) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Run the full pipeline on PDF bytes.
    pub async fn run(&self, pdf: &[u8]) -> PipelineRun {
        let run = PipelineRun::new();
        info!("Processing document ({} bytes)", pdf.len());

        match self.text_extractor.extract_text(pdf) {
            Ok(text) => self.run_from_text(run, &text).await,
            Err(e) => self.fail(run, FailureKind::EmptyDocument, e.to_string()),
        }
    }

    /// Run the pipeline on already extracted text.
    pub async fn run_text(&self, text: &str) -> PipelineRun {
        self.run_from_text(PipelineRun::new(), text).await
    }

    /// Release the store's connections.
    pub async fn close(&self) {
        self.store.close().await;
    }

    async fn run_from_text(&self, mut run: PipelineRun, text: &str) -> PipelineRun {
        let text = match check_text(text, self.min_text_length) {
            Ok(text) => text,
            Err(e) => return self.fail(run, FailureKind::EmptyDocument, e.to_string()),
        };
        run.text_length = Some(text.chars().count());
        self.advance(&mut run, PipelineState::TextExtracted);

        let start = Instant::now();
        let completion = match self.complete(text).await {
            Ok(completion) => completion,
            Err(e) => {
                let raw = e.raw_response().map(str::to_string);
                run.raw_response = raw;
                return self.fail(run, FailureKind::ExtractionFailed, e.to_string());
            }
        };
        debug!(
            "Extraction by {} took {:?}",
            completion.model,
            start.elapsed()
        );
        run.raw_response = Some(completion.text);

        let raw = run.raw_response.as_deref().unwrap_or_default();
        let invoice: InvoiceData = match schema::decode(&INVOICE_SCHEMA, raw) {
            Ok(invoice) => invoice,
            Err(e) => {
                let violations = match &e {
                    SchemaError::Violations(v) => v.clone(),
                    SchemaError::InvalidJson(_) => Vec::new(),
                };
                let mut run = self.fail(run, FailureKind::SchemaViolation, e.to_string());
                if let Some(failure) = run.failure.as_mut() {
                    failure.violations = violations;
                }
                return run;
            }
        };

        let validated = self.validator.validate(invoice);
        run.invoice = Some(validated.invoice);
        run.warnings = validated.warnings;
        self.advance(&mut run, PipelineState::Validated);

        let Some(invoice) = run.invoice.as_ref() else {
            return run;
        };
        match self.store.insert(invoice).await {
            Ok(id) => {
                run.id = Some(id);
                self.advance(&mut run, PipelineState::Persisted);
                run
            }
            Err(e) => {
                let outcome_unknown = e.outcome_unknown();
                let mut run = self.fail(run, FailureKind::PersistenceFailed, e.to_string());
                if let Some(failure) = run.failure.as_mut() {
                    failure.outcome_unknown = outcome_unknown;
                }
                run
            }
        }
    }

    async fn complete(&self, text: &str) -> Result<crate::llm::RawCompletion, ClientError> {
        let call = self.extractor.complete(&INVOICE_SCHEMA, text);
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .unwrap_or(Err(ClientError::Timeout(deadline))),
            None => call.await,
        }
    }

    fn advance(&self, run: &mut PipelineRun, state: PipelineState) {
        info!("Pipeline {:?} -> {:?}", run.state, state);
        run.state = state;
        run.trail.push(state);
        if let Some(observer) = &self.observer {
            observer(state);
        }
    }

    fn fail(&self, mut run: PipelineRun, kind: FailureKind, detail: String) -> PipelineRun {
        info!("Pipeline failed in {:?}: {}: {}", run.state, kind, detail);
        run.failure = Some(PipelineFailure {
            kind,
            detail,
            violations: Vec::new(),
            raw_response: run.raw_response.clone(),
            outcome_unknown: false,
        });
        self.advance(&mut run, PipelineState::Errored(kind));
        run
    }
}
