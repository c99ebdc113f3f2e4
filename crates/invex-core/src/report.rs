//! Human and machine readable reports of a validated invoice.

use serde::{Deserialize, Serialize};

use crate::models::invoice::InvoiceData;
use crate::validate::ReconciliationWarning;

/// A validated invoice with its reconciliation warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub invoice: InvoiceData,
    #[serde(default)]
    pub warnings: Vec<ReconciliationWarning>,
}

impl Report {
    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read a report back from its JSON rendering.
    pub fn parse_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Plain-text rendering of every field and warning.
    pub fn render_text(&self) -> String {
        let invoice = &self.invoice;
        let mut output = String::new();

        output.push_str(&format!("Invoice: {}\n", invoice.invoice_number));
        if let Some(order) = &invoice.order_number {
            output.push_str(&format!("Order: {}\n", order));
        }
        output.push_str(&format!("Date: {}\n", invoice.invoice_date));
        if let Some(due_date) = invoice.due_date {
            output.push_str(&format!("Due: {}\n", due_date));
        }
        output.push('\n');

        output.push_str("Vendor:\n");
        push_party(
            &mut output,
            &invoice.vendor,
            &invoice.vendor_address,
            invoice.vendor_email.as_deref(),
            invoice.vendor_phone.as_deref(),
        );

        output.push_str("Customer:\n");
        push_party(
            &mut output,
            &invoice.customer,
            &invoice.customer_address,
            invoice.customer_email.as_deref(),
            invoice.customer_phone.as_deref(),
        );

        output.push_str("Billing:\n");
        output.push_str(&format!("  {}\n", invoice.billing_address));
        if let Some(email) = &invoice.billing_email {
            output.push_str(&format!("  Email: {}\n", email));
        }
        if let Some(phone) = &invoice.billing_phone {
            output.push_str(&format!("  Phone: {}\n", phone));
        }
        output.push('\n');

        output.push_str(&format!("Items ({}):\n", invoice.items.len()));
        for (i, item) in invoice.items.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {}: {} x {}",
                i + 1,
                item.description,
                item.quantity,
                item.unit_price
            ));
            if let Some(discount) = item.discount {
                output.push_str(&format!(" - {}", discount));
            }
            if let Some(sub_total) = item.sub_total {
                output.push_str(&format!(" = {}", sub_total));
            }
            output.push_str(&format!(
                ", tax {}, total {} {}\n",
                item.tax_rate, item.total_price, invoice.currency
            ));
        }
        output.push('\n');

        output.push_str(&format!(
            "Total due: {} {}\n",
            invoice.total_due, invoice.currency
        ));

        if !self.warnings.is_empty() {
            output.push_str(&format!("\nWarnings ({}):\n", self.warnings.len()));
            for warning in &self.warnings {
                output.push_str(&format!("  - {}\n", warning));
            }
        }

        output
    }
}

fn push_party(
    output: &mut String,
    name: &str,
    address: &str,
    email: Option<&str>,
    phone: Option<&str>,
) {
    output.push_str(&format!("  {}\n", name));
    output.push_str(&format!("  {}\n", address));
    if let Some(email) = email {
        output.push_str(&format!("  Email: {}\n", email));
    }
    if let Some(phone) = phone {
        output.push_str(&format!("  Phone: {}\n", phone));
    }
    output.push('\n');
}
