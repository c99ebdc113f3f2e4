//! Configuration structures for the extraction pipeline.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Main configuration for the invex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Extraction client configuration.
    pub llm: LlmConfig,

    /// Database configuration.
    pub database: DatabaseConfig,

    /// Validation and reconciliation configuration.
    pub validation: ValidationConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,
}

/// Structured extraction client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier passed to the provider.
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sampling temperature.
    pub temperature: f32,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Overall deadline for the extraction call, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_deadline_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            temperature: 0.0,
            request_timeout_secs: 120,
            extraction_deadline_secs: None,
        }
    }
}

impl LlmConfig {
    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pipeline deadline for the extraction call, if any.
    pub fn extraction_deadline(&self) -> Option<Duration> {
        self.extraction_deadline_secs.map(Duration::from_secs)
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string.
    pub url: String,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://invoices.db?mode=rwc".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

/// Validation and reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Absolute tolerance for numeric reconciliation.
    pub tolerance: Decimal,

    /// Check `total_price` against sub total plus tax.
    pub check_line_totals: bool,

    /// Check `total_due` against the sum of line totals.
    pub check_total_due: bool,

    /// Fill an absent `sub_total` with the computed value.
    pub derive_missing_sub_totals: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(1, 2),
            check_line_totals: true,
            check_total_due: true,
            derive_missing_sub_totals: false,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum trimmed text length to treat a document as non-empty.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self { min_text_length: 1 }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override settings from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override settings from a key lookup (`MODEL_NAME`, `DATABASE_URL`,
    /// `OPENAI_BASE_URL`, `OPENAI_API_KEY`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("MODEL_NAME") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
    }

    /// Check the settings the pipeline cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Empty("llm.model"));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Empty("database.url"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "database.max_connections",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.validation.tolerance.is_sign_negative() {
            return Err(ConfigError::Invalid {
                key: "validation.tolerance",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}
