//! Schema-as-data description of the invoice record.
//!
//! The [`Schema`] value is the single source of truth for the shape of an
//! extracted invoice. It is consumed by two pure functions:
//! - [`encode::to_json_schema`] renders it for the extraction client
//! - [`decode::decode`] checks a raw client response against it and builds
//!   the typed record
//!
//! Field descriptions double as guidance for the model when the source text
//! is ambiguous.

pub mod decode;
pub mod encode;

use lazy_static::lazy_static;

pub use decode::decode;
pub use encode::to_json_schema;

/// Primitive type tag of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Free text.
    Text,
    /// Real number, carried as an exact decimal.
    Number,
    /// Calendar date in `YYYY-MM-DD` format.
    Date,
    /// Ordered sequence of nested objects.
    List(ObjectSpec),
}

/// Description of one field of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    /// Text must contain something other than whitespace.
    pub non_empty: bool,
    /// Number must be zero or greater.
    pub non_negative: bool,
    pub description: &'static str,
}

impl FieldSpec {
    fn new(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: true,
            non_empty: false,
            non_negative: false,
            description,
        }
    }

    pub fn text(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::Text, description)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::Number, description)
    }

    pub fn date(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::Date, description)
    }

    pub fn list(name: &'static str, of: ObjectSpec, description: &'static str) -> Self {
        Self::new(name, FieldType::List(of), description)
    }

    /// Mark the field as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Reject blank text.
    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    /// Reject negative numbers.
    pub fn non_negative(mut self) -> Self {
        self.non_negative = true;
        self
    }
}

/// Description of an object with named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl ObjectSpec {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A named root object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Name reported to the extraction client.
    pub name: &'static str,
    pub root: ObjectSpec,
}

fn line_item_spec() -> ObjectSpec {
    ObjectSpec {
        name: "LineItem",
        description: "A single line item in an invoice.",
        fields: vec![
            FieldSpec::text("description", "Description of the item or service.").non_empty(),
            FieldSpec::number("quantity", "Quantity of the item."),
            FieldSpec::number("unit_price", "Price per unit of the item."),
            FieldSpec::number("discount", "Discount amount for the line item.")
                .optional()
                .non_negative(),
            FieldSpec::number(
                "sub_total",
                "Sub total for the line item ((quantity * unit_price) - discount).",
            )
            .optional(),
            FieldSpec::number("tax_rate", "Tax amount for the line item."),
            FieldSpec::number(
                "total_price",
                "Total price for the line item (sub_total + tax_rate).",
            ),
        ],
    }
}

fn invoice_spec() -> ObjectSpec {
    ObjectSpec {
        name: "InvoiceData",
        description: "Structured data extracted from an invoice.",
        fields: vec![
            FieldSpec::text("vendor", "Vendor name."),
            FieldSpec::text("vendor_address", "Vendor address."),
            FieldSpec::text("vendor_email", "Vendor email.").optional(),
            FieldSpec::text("vendor_phone", "Vendor phone.").optional(),
            FieldSpec::text("invoice_number", "Invoice number.").non_empty(),
            FieldSpec::text("order_number", "Order number.").optional(),
            FieldSpec::date("invoice_date", "Invoice date in YYYY-MM-DD format."),
            FieldSpec::date("due_date", "Due date in YYYY-MM-DD format.").optional(),
            FieldSpec::number("total_due", "Total amount due."),
            FieldSpec::text("currency", "Currency of the total amount (e.g., USD, EUR)."),
            FieldSpec::text("customer", "Customer name."),
            FieldSpec::text("customer_address", "Customer address."),
            FieldSpec::text("customer_email", "Customer email.").optional(),
            FieldSpec::text("customer_phone", "Customer phone.").optional(),
            FieldSpec::text("billing_address", "Billing address."),
            FieldSpec::text("billing_email", "Billing email.").optional(),
            FieldSpec::text("billing_phone", "Billing phone.").optional(),
            FieldSpec::list(
                "items",
                line_item_spec(),
                "A list of all line items from the invoice.",
            ),
        ],
    }
}

lazy_static! {
    /// Schema of [`InvoiceData`](crate::models::invoice::InvoiceData).
    pub static ref INVOICE_SCHEMA: Schema = Schema {
        name: "invoice_data",
        root: invoice_spec(),
    };
}
