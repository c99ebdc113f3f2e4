//! Validation and normalization of extracted invoices.
//!
//! Everything here is pure. Text that is too short is rejected before any
//! extraction happens; a decoded record is normalized and reconciled, which
//! yields advisory warnings but never rejects it.

pub mod rules;

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::models::config::ValidationConfig;
use crate::models::invoice::InvoiceData;

/// Advisory inconsistency found in an otherwise valid record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconciliationWarning {
    /// Printed sub total differs from `quantity * unit_price - discount`.
    SubTotalMismatch {
        item: usize,
        computed: Decimal,
        printed: Decimal,
    },
    /// Printed line total differs from sub total plus tax.
    LineTotalMismatch {
        item: usize,
        computed: Decimal,
        printed: Decimal,
    },
    /// Due date is earlier than the invoice date.
    DueBeforeInvoiceDate {
        invoice_date: NaiveDate,
        due_date: NaiveDate,
    },
    /// Printed total due differs from the sum of line totals.
    TotalDueMismatch { computed: Decimal, printed: Decimal },
    /// Amounts too large to reconcile, for one item or for the line total sum.
    AmountOutOfRange { item: Option<usize> },
    /// The invoice has no line items.
    NoLineItems,
}

impl fmt::Display for ReconciliationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubTotalMismatch {
                item,
                computed,
                printed,
            } => write!(
                f,
                "items[{}]: sub_total {} does not match quantity * unit_price - discount = {}",
                item, printed, computed
            ),
            Self::LineTotalMismatch {
                item,
                computed,
                printed,
            } => write!(
                f,
                "items[{}]: total_price {} does not match sub_total + tax_rate = {}",
                item, printed, computed
            ),
            Self::DueBeforeInvoiceDate {
                invoice_date,
                due_date,
            } => write!(
                f,
                "due_date {} is before invoice_date {}",
                due_date, invoice_date
            ),
            Self::TotalDueMismatch { computed, printed } => write!(
                f,
                "total_due {} does not match the sum of line totals {}",
                printed, computed
            ),
            Self::AmountOutOfRange { item: Some(item) } => write!(
                f,
                "items[{}]: amounts are too large to reconcile",
                item
            ),
            Self::AmountOutOfRange { item: None } => {
                write!(f, "line totals are too large to sum")
            }
            Self::NoLineItems => write!(f, "invoice has no line items"),
        }
    }
}

/// A normalized record with its warnings, in item order then invoice order.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub invoice: InvoiceData,
    pub warnings: Vec<ReconciliationWarning>,
}

/// Reject text that cannot hold an invoice. Returns the trimmed text.
pub fn check_text(text: &str, min_length: usize) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if length == 0 || length < min_length {
        return Err(ValidationError::IncompleteExtraction {
            length,
            minimum: min_length.max(1),
        });
    }
    Ok(trimmed)
}

/// Normalizes decoded records and reconciles their amounts and dates.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Normalize `invoice` and collect reconciliation warnings.
    pub fn validate(&self, mut invoice: InvoiceData) -> Validated {
        self.normalize(&mut invoice);

        let tolerance = self.config.tolerance;
        let mut warnings = Vec::new();

        for (index, item) in invoice.items.iter().enumerate() {
            if let Some(warning) = rules::line_range(index, item) {
                warnings.push(warning);
                continue;
            }
            warnings.extend(rules::sub_total(index, item, tolerance));
            if self.config.check_line_totals {
                warnings.extend(rules::line_total(index, item, tolerance));
            }
        }

        warnings.extend(rules::due_date(&invoice));
        if self.config.check_total_due {
            warnings.extend(rules::total_due(&invoice, tolerance));
        }
        warnings.extend(rules::has_items(&invoice));

        for warning in &warnings {
            debug!("Invoice {}: {}", invoice.invoice_number, warning);
        }
        debug!(
            "Validated invoice {} with {} item(s), {} warning(s)",
            invoice.invoice_number,
            invoice.items.len(),
            warnings.len()
        );

        Validated { invoice, warnings }
    }

    fn normalize(&self, invoice: &mut InvoiceData) {
        for field in [
            &mut invoice.vendor,
            &mut invoice.vendor_address,
            &mut invoice.invoice_number,
            &mut invoice.currency,
            &mut invoice.customer,
            &mut invoice.customer_address,
            &mut invoice.billing_address,
        ] {
            trim(field);
        }

        for field in [
            &mut invoice.vendor_email,
            &mut invoice.vendor_phone,
            &mut invoice.order_number,
            &mut invoice.customer_email,
            &mut invoice.customer_phone,
            &mut invoice.billing_email,
            &mut invoice.billing_phone,
        ] {
            trim_optional(field);
        }

        for item in &mut invoice.items {
            trim(&mut item.description);
            if self.config.derive_missing_sub_totals && item.sub_total.is_none() {
                item.sub_total = item.computed_sub_total();
            }
        }
    }
}

fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn trim_optional(value: &mut Option<String>) {
    if let Some(text) = value {
        trim(text);
        if text.is_empty() {
            *value = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_invoice;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_check_text_rejects_empty_and_whitespace() {
        assert_eq!(
            check_text("", 1),
            Err(ValidationError::IncompleteExtraction {
                length: 0,
                minimum: 1
            })
        );
        assert!(check_text(" \n\t ", 1).is_err());
        assert!(check_text("INV", 10).is_err());
        assert_eq!(check_text("  Invoice INV-100 \n", 1), Ok("Invoice INV-100"));
    }

    #[test]
    fn test_check_text_zero_minimum_still_rejects_empty() {
        assert!(check_text("   ", 0).is_err());
        assert!(check_text("x", 0).is_ok());
    }

    #[test]
    fn test_consistent_invoice_has_no_warnings() {
        let invoice = sample_invoice();
        let validated = Validator::default().validate(invoice.clone());
        assert!(validated.warnings.is_empty());
        assert_eq!(validated.invoice, invoice);
    }

    #[test]
    fn test_sub_total_mismatch_is_single_warning() {
        let mut invoice = sample_invoice();
        invoice.items[0].discount = Some(Decimal::ZERO);
        invoice.items[0].sub_total = Some(Decimal::new(900, 2));

        let validated = Validator::default().validate(invoice);
        assert_eq!(
            validated.warnings,
            vec![ReconciliationWarning::SubTotalMismatch {
                item: 0,
                computed: Decimal::new(1000, 2),
                printed: Decimal::new(900, 2),
            }]
        );
    }

    #[test]
    fn test_due_before_invoice_date_is_single_warning() {
        let mut invoice = sample_invoice();
        invoice.due_date = NaiveDate::from_ymd_opt(2023, 11, 1);

        let validated = Validator::default().validate(invoice);
        assert_eq!(validated.warnings.len(), 1);
        assert!(matches!(
            validated.warnings[0],
            ReconciliationWarning::DueBeforeInvoiceDate { .. }
        ));
    }

    #[test]
    fn test_warning_order_items_then_invoice() {
        let mut invoice = sample_invoice();
        let mut second = invoice.items[0].clone();
        second.sub_total = Some(Decimal::new(5, 0));
        invoice.items.push(second);
        invoice.items[0].total_price = Decimal::new(20, 0);
        invoice.due_date = NaiveDate::from_ymd_opt(2023, 1, 1);

        let kinds: Vec<String> = Validator::default()
            .validate(invoice)
            .warnings
            .iter()
            .map(|w| serde_json::to_value(w).unwrap()["kind"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(
            kinds,
            vec![
                "line_total_mismatch",
                "sub_total_mismatch",
                "due_before_invoice_date",
                "total_due_mismatch",
            ]
        );
    }

    #[test]
    fn test_optional_checks_can_be_disabled() {
        let mut invoice = sample_invoice();
        invoice.items[0].total_price = Decimal::new(99, 0);
        invoice.total_due = Decimal::new(500, 0);

        let validator = Validator::new(ValidationConfig {
            check_line_totals: false,
            check_total_due: false,
            ..ValidationConfig::default()
        });
        assert!(validator.validate(invoice).warnings.is_empty());
    }

    #[test]
    fn test_no_line_items_warning() {
        let mut invoice = sample_invoice();
        invoice.items.clear();
        let validated = Validator::default().validate(invoice);
        assert_eq!(validated.warnings, vec![ReconciliationWarning::NoLineItems]);
    }

    #[test]
    fn test_normalization_trims_text() {
        let mut invoice = sample_invoice();
        invoice.vendor = "  Acme Co \n".to_string();
        invoice.vendor_email = Some("   ".to_string());
        invoice.order_number = Some(" PO-7 ".to_string());
        invoice.items[0].description = "\tWidget ".to_string();

        let validated = Validator::default().validate(invoice);
        assert_eq!(validated.invoice.vendor, "Acme Co");
        assert_eq!(validated.invoice.vendor_email, None);
        assert_eq!(validated.invoice.order_number.as_deref(), Some("PO-7"));
        assert_eq!(validated.invoice.items[0].description, "Widget");
    }

    #[test]
    fn test_derive_missing_sub_totals() {
        let mut invoice = sample_invoice();
        invoice.items[0].sub_total = None;

        let kept = Validator::default().validate(invoice.clone());
        assert_eq!(kept.invoice.items[0].sub_total, None);

        let derived = Validator::new(ValidationConfig {
            derive_missing_sub_totals: true,
            ..ValidationConfig::default()
        })
        .validate(invoice);
        assert_eq!(derived.invoice.items[0].sub_total, Some(Decimal::new(1000, 2)));
        assert!(derived.warnings.is_empty());
    }

    #[test]
    fn test_warning_display() {
        let warning = ReconciliationWarning::SubTotalMismatch {
            item: 2,
            computed: Decimal::new(1000, 2),
            printed: Decimal::new(900, 2),
        };
        assert_eq!(
            warning.to_string(),
            "items[2]: sub_total 9.00 does not match quantity * unit_price - discount = 10.00"
        );
    }

    #[test]
    fn test_overflowing_amounts_warn_instead_of_panicking() {
        let mut invoice = sample_invoice();
        invoice.items[0].quantity = Decimal::new(1_000_000_000_000_000, 0);
        invoice.items[0].unit_price = Decimal::new(1_000_000_000_000_000, 0);
        invoice.items[0].sub_total = None;

        let validated = Validator::new(ValidationConfig {
            derive_missing_sub_totals: true,
            ..ValidationConfig::default()
        })
        .validate(invoice);

        assert_eq!(
            validated.warnings,
            vec![ReconciliationWarning::AmountOutOfRange { item: Some(0) }]
        );
        assert_eq!(validated.invoice.items[0].sub_total, None);
        assert_eq!(
            validated.warnings[0].to_string(),
            "items[0]: amounts are too large to reconcile"
        );
    }
}
