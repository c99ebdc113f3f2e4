//! Reconciliation rules. Each rule inspects a normalized record and yields
//! advisory warnings; none of them can reject a record.

use rust_decimal::Decimal;

use super::ReconciliationWarning;
use crate::models::invoice::{InvoiceData, LineItem};

fn differs(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    // A difference too large to represent is beyond any tolerance.
    a.checked_sub(b).is_none_or(|d| d.abs() > tolerance)
}

/// Line amounts whose product or sum does not fit in a `Decimal`. Such an
/// item cannot be reconciled, so the other line rules skip it.
pub fn line_range(index: usize, item: &LineItem) -> Option<ReconciliationWarning> {
    item.computed_total()
        .is_none()
        .then_some(ReconciliationWarning::AmountOutOfRange { item: Some(index) })
}

/// Printed `sub_total` against `quantity * unit_price - discount`.
pub fn sub_total(index: usize, item: &LineItem, tolerance: Decimal) -> Option<ReconciliationWarning> {
    let printed = item.sub_total?;
    let computed = item.computed_sub_total()?;
    differs(computed, printed, tolerance).then_some(ReconciliationWarning::SubTotalMismatch {
        item: index,
        computed,
        printed,
    })
}

/// Printed `total_price` against the computed sub total plus tax.
pub fn line_total(index: usize, item: &LineItem, tolerance: Decimal) -> Option<ReconciliationWarning> {
    let computed = item.computed_total()?;
    differs(computed, item.total_price, tolerance).then_some(
        ReconciliationWarning::LineTotalMismatch {
            item: index,
            computed,
            printed: item.total_price,
        },
    )
}

/// Due date falling before the invoice date.
pub fn due_date(invoice: &InvoiceData) -> Option<ReconciliationWarning> {
    let due = invoice.due_date?;
    (due < invoice.invoice_date).then_some(ReconciliationWarning::DueBeforeInvoiceDate {
        invoice_date: invoice.invoice_date,
        due_date: due,
    })
}

/// Printed `total_due` against the sum of line totals.
pub fn total_due(invoice: &InvoiceData, tolerance: Decimal) -> Option<ReconciliationWarning> {
    if invoice.items.is_empty() {
        return None;
    }
    let Some(computed) = invoice.items_total() else {
        return Some(ReconciliationWarning::AmountOutOfRange { item: None });
    };
    differs(computed, invoice.total_due, tolerance).then_some(
        ReconciliationWarning::TotalDueMismatch {
            computed,
            printed: invoice.total_due,
        },
    )
}

/// Invoice without any line items.
pub fn has_items(invoice: &InvoiceData) -> Option<ReconciliationWarning> {
    invoice
        .items
        .is_empty()
        .then_some(ReconciliationWarning::NoLineItems)
}
