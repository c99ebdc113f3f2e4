//! Fixtures and stub collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::error::{ClientError, PdfError, PersistenceError};
use crate::llm::{RawCompletion, StructuredExtractor};
use crate::models::invoice::{InvoiceData, LineItem};
use crate::pdf::TextExtractor;
use crate::schema::Schema;
use crate::store::{InvoiceId, InvoiceStore};

pub const SAMPLE_TEXT: &str = "Acme Co\n1 Main St\nInvoice INV-100\nDate 2023-12-01\n\
Widget 1 x 10.00 = 10.00\nTax 1.00\nTotal due USD 11.00";

/// A fully consistent invoice: one widget at 10.00 plus 1.00 tax.
pub fn sample_invoice() -> InvoiceData {
    InvoiceData {
        vendor: "Acme Co".to_string(),
        vendor_address: "1 Main St, Springfield".to_string(),
        vendor_email: Some("billing@acme.test".to_string()),
        vendor_phone: None,
        invoice_number: "INV-100".to_string(),
        order_number: None,
        invoice_date: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
        due_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        total_due: Decimal::new(1100, 2),
        currency: "USD".to_string(),
        customer: "Globex Corp".to_string(),
        customer_address: "42 Elm Rd, Shelbyville".to_string(),
        customer_email: None,
        customer_phone: Some("+1 555 0100".to_string()),
        billing_address: "42 Elm Rd, Shelbyville".to_string(),
        billing_email: None,
        billing_phone: None,
        items: vec![LineItem {
            description: "Widget".to_string(),
            quantity: Decimal::new(1, 0),
            unit_price: Decimal::new(1000, 2),
            discount: None,
            sub_total: Some(Decimal::new(1000, 2)),
            tax_rate: Decimal::new(100, 2),
            total_price: Decimal::new(1100, 2),
        }],
    }
}

/// [`sample_invoice`] as a model would return it.
pub fn sample_response() -> Value {
    json!({
        "vendor": "Acme Co",
        "vendor_address": "1 Main St, Springfield",
        "vendor_email": "billing@acme.test",
        "vendor_phone": null,
        "invoice_number": "INV-100",
        "order_number": null,
        "invoice_date": "2023-12-01",
        "due_date": "2024-01-01",
        "total_due": 11.0,
        "currency": "USD",
        "customer": "Globex Corp",
        "customer_address": "42 Elm Rd, Shelbyville",
        "customer_email": null,
        "customer_phone": "+1 555 0100",
        "billing_address": "42 Elm Rd, Shelbyville",
        "billing_email": null,
        "billing_phone": null,
        "items": [{
            "description": "Widget",
            "quantity": 1,
            "unit_price": 10.0,
            "discount": null,
            "sub_total": 10.0,
            "tax_rate": 1.0,
            "total_price": 11.0
        }]
    })
}

enum Reply {
    Text(String),
    Fail(fn() -> ClientError),
    Hang,
}

/// Extraction client with a canned reply and a call counter.
pub struct StubExtractor {
    reply: Reply,
    calls: AtomicUsize,
}

impl StubExtractor {
    pub fn responding(value: Value) -> Self {
        Self::raw(value.to_string())
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::with_reply(Reply::Text(text.into()))
    }

    pub fn failing(error: fn() -> ClientError) -> Self {
        Self::with_reply(Reply::Fail(error))
    }

    /// Never answers; only useful together with a deadline.
    pub fn hanging() -> Self {
        Self::with_reply(Reply::Hang)
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuredExtractor for StubExtractor {
    async fn complete(&self, _schema: &Schema, _text: &str) -> Result<RawCompletion, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Text(text) => Ok(RawCompletion {
                text: text.clone(),
                model: "stub".to_string(),
            }),
            Reply::Fail(error) => Err(error()),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Text extractor that ignores the bytes and returns fixed text.
pub struct StaticText(pub Result<String, fn() -> PdfError>);

impl StaticText {
    pub fn new(text: &str) -> Self {
        Self(Ok(text.to_string()))
    }
}

impl TextExtractor for StaticText {
    fn extract_text(&self, _data: &[u8]) -> crate::pdf::Result<String> {
        match &self.0 {
            Ok(text) => Ok(text.clone()),
            Err(error) => Err(error()),
        }
    }
}

/// In-memory store assigning ids from 1.
#[derive(Default)]
pub struct MemoryStore {
    pub rows: Mutex<Vec<InvoiceData>>,
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert(&self, invoice: &InvoiceData) -> Result<InvoiceId, PersistenceError> {
        let mut rows = self.rows.lock().unwrap();
        rows.push(invoice.clone());
        Ok(InvoiceId(rows.len() as i64))
    }
}

/// Store that always fails with the given error.
pub struct FailingStore {
    error: fn() -> PersistenceError,
    pub calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(error: fn() -> PersistenceError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self::new(|| PersistenceError::Connect("connection refused".to_string()))
    }
}

#[async_trait]
impl InvoiceStore for FailingStore {
    async fn insert(&self, _invoice: &InvoiceData) -> Result<InvoiceId, PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.error)())
    }
}
