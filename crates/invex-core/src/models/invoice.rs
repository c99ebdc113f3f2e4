//! Invoice data models produced by structured extraction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A complete extracted invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    /// Vendor name.
    pub vendor: String,

    /// Vendor address.
    pub vendor_address: String,

    /// Vendor email.
    #[serde(default)]
    pub vendor_email: Option<String>,

    /// Vendor phone.
    #[serde(default)]
    pub vendor_phone: Option<String>,

    /// Invoice number. Not guaranteed to be globally unique.
    pub invoice_number: String,

    /// Order number.
    #[serde(default)]
    pub order_number: Option<String>,

    /// Date the invoice was issued.
    pub invoice_date: NaiveDate,

    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    /// Total amount due.
    pub total_due: Decimal,

    /// Currency code as printed on the invoice (e.g. USD, EUR).
    pub currency: String,

    /// Customer name.
    pub customer: String,

    /// Customer address.
    pub customer_address: String,

    /// Customer email.
    #[serde(default)]
    pub customer_email: Option<String>,

    /// Customer phone.
    #[serde(default)]
    pub customer_phone: Option<String>,

    /// Billing address.
    pub billing_address: String,

    /// Billing email.
    #[serde(default)]
    pub billing_email: Option<String>,

    /// Billing phone.
    #[serde(default)]
    pub billing_phone: Option<String>,

    /// Line items in document order.
    pub items: Vec<LineItem>,
}

/// A single line item on the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product/service description.
    pub description: String,

    /// Quantity.
    pub quantity: Decimal,

    /// Price per unit.
    pub unit_price: Decimal,

    /// Discount amount for the line.
    #[serde(default)]
    pub discount: Option<Decimal>,

    /// Sub total as printed, `quantity * unit_price - discount`.
    #[serde(default)]
    pub sub_total: Option<Decimal>,

    /// Tax for the line, read as an absolute amount.
    pub tax_rate: Decimal,

    /// Total for the line, `sub_total + tax_rate`.
    pub total_price: Decimal,
}

impl LineItem {
    /// Recompute the sub total from quantity, unit price and discount.
    /// `None` when the result does not fit in a `Decimal`.
    pub fn computed_sub_total(&self) -> Option<Decimal> {
        self.quantity
            .checked_mul(self.unit_price)?
            .checked_sub(self.discount.unwrap_or(Decimal::ZERO))
    }

    /// Computed sub total plus the line's tax amount.
    pub fn computed_total(&self) -> Option<Decimal> {
        self.computed_sub_total()?.checked_add(self.tax_rate)
    }
}

impl InvoiceData {
    /// Sum of all line item totals, `None` on overflow.
    pub fn items_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.total_price))
    }
}
