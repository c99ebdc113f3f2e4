//! Error types for the invex-core library.

use thiserror::Error;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// The structured extraction client failed.
    #[error("extraction client error: {0}")]
    Client(#[from] ClientError),

    /// Configuration file could not be parsed or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors raised before extraction when the document text is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The text is empty or too short to describe an invoice.
    #[error("incomplete extraction: {length} chars of text, at least {minimum} required")]
    IncompleteExtraction { length: usize, minimum: usize },
}

/// A single mismatch between a response and the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Field path, e.g. `items[2].quantity`.
    pub path: String,
    /// What was wrong with the value at `path`.
    pub reason: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Errors raised while decoding a raw response against the schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The response is not JSON at all.
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    /// The response is JSON but breaks one or more field constraints.
    #[error("{} schema violation(s): {}", .0.len(), join_violations(.0))]
    Violations(Vec<Violation>),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised by a structured extraction client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Client is misconfigured (missing API key, bad base URL).
    #[error("client configuration error: {0}")]
    Config(String),

    /// Connection failed before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The request or the pipeline deadline expired.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Non-success HTTP status from the provider.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The model declined to produce structured output.
    #[error("model refused: {0}")]
    Refused(String),

    /// The provider returned no candidate content.
    #[error("empty response from model")]
    EmptyResponse,

    /// The provider's response envelope could not be read.
    #[error("failed to parse provider response: {0}")]
    Parse(String),
}

/// Errors raised by an invoice store.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Could not obtain a connection; nothing was written.
    #[error("database connection failed: {0}")]
    Connect(String),

    /// The database rejected the statement; nothing was written.
    #[error("database rejected write: {0}")]
    Rejected(String),

    /// The write failed mid-flight; the row may or may not exist.
    #[error("write outcome unknown: {0}")]
    Write(String),

    /// A read query failed.
    #[error("database read failed: {0}")]
    Read(String),

    /// A stored row could not be mapped back into an invoice.
    #[error("corrupt stored row {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    /// The store was closed explicitly.
    #[error("store is closed")]
    Closed,
}

impl PersistenceError {
    /// Whether the caller must assume the row might have been written.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, PersistenceError::Write(_))
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A setting has an unusable value.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
