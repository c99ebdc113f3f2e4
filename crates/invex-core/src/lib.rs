//! Core library for LLM-based invoice extraction.
//!
//! This crate provides:
//! - PDF text extraction
//! - A schema-as-data invoice model with JSON Schema encoding and checked decoding
//! - Structured extraction through an OpenAI-compatible client
//! - Normalization and reconciliation of extracted amounts and dates
//! - SQLite persistence and a pipeline tying the stages together

pub mod error;
pub mod llm;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod store;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{InvexError, Result};
pub use llm::{OpenAiExtractor, RawCompletion, StructuredExtractor};
pub use models::config::InvexConfig;
pub use models::invoice::{InvoiceData, LineItem};
pub use pdf::{PdfExtractor, TextExtractor};
pub use pipeline::{FailureKind, Pipeline, PipelineFailure, PipelineRun, PipelineState};
pub use report::Report;
pub use schema::{Schema, INVOICE_SCHEMA};
pub use store::{ConnectionFactory, InvoiceId, InvoiceStore, SqliteInvoiceStore};
pub use validate::{ReconciliationWarning, Validator};
