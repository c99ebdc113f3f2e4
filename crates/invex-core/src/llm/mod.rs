//! Structured extraction clients.
//!
//! A client turns document text into a raw structured response shaped by a
//! [`Schema`]. It is nondeterministic and only responsible for shape at best
//! effort: the pipeline re-checks every response with
//! [`schema::decode`](crate::schema::decode).

mod openai;

pub use openai::{OpenAiExtractor, StructuredRequest};

use async_trait::async_trait;

use crate::error::ClientError;
use crate::schema::Schema;

/// Raw structured response from an extraction client.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCompletion {
    /// Response text, expected to be a JSON document.
    pub text: String,
    /// Model that produced the response.
    pub model: String,
}

/// Capability to complete document text into a schema-shaped response.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Produce a raw response for `text` constrained by `schema`.
    async fn complete(&self, schema: &Schema, text: &str) -> Result<RawCompletion, ClientError>;
}

impl ClientError {
    /// Provider output carried by the error, if any, for diagnostics.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ClientError::Api { body, .. } => Some(body),
            ClientError::Refused(text) => Some(text),
            _ => None,
        }
    }
}
