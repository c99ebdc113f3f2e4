//! SQLite invoice store using sqlx.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{ConnectionFactory, InvoiceId, InvoiceStore};
use crate::error::PersistenceError;
use crate::models::invoice::{InvoiceData, LineItem};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS invoices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vendor TEXT NOT NULL,
    vendor_address TEXT NOT NULL,
    vendor_email TEXT,
    vendor_phone TEXT,
    invoice_number TEXT NOT NULL,
    order_number TEXT,
    invoice_date TEXT NOT NULL,
    due_date TEXT,
    total_due TEXT NOT NULL,
    currency TEXT NOT NULL,
    customer TEXT NOT NULL,
    customer_address TEXT NOT NULL,
    customer_email TEXT,
    customer_phone TEXT,
    billing_address TEXT NOT NULL,
    billing_email TEXT,
    billing_phone TEXT,
    items TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

const INSERT_INVOICE: &str = r#"
INSERT INTO invoices (
    vendor, vendor_address, vendor_email, vendor_phone,
    invoice_number, order_number, invoice_date, due_date,
    total_due, currency,
    customer, customer_address, customer_email, customer_phone,
    billing_address, billing_email, billing_phone,
    items, created_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

/// Invoice store backed by a lazily opened SQLite pool.
pub struct SqliteInvoiceStore {
    factory: ConnectionFactory,
    pool: OnceCell<SqlitePool>,
    closed: AtomicBool,
}

/// One row of the `invoices` table.
#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: i64,
    vendor: String,
    vendor_address: String,
    vendor_email: Option<String>,
    vendor_phone: Option<String>,
    invoice_number: String,
    order_number: Option<String>,
    invoice_date: NaiveDate,
    due_date: Option<NaiveDate>,
    total_due: String,
    currency: String,
    customer: String,
    customer_address: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    billing_address: String,
    billing_email: Option<String>,
    billing_phone: Option<String>,
    items: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self) -> Result<InvoiceData, PersistenceError> {
        let id = self.id;
        let corrupt = |reason: String| PersistenceError::Corrupt { id, reason };

        let total_due: Decimal = self
            .total_due
            .parse()
            .map_err(|e| corrupt(format!("total_due: {}", e)))?;
        let items: Vec<LineItem> =
            serde_json::from_str(&self.items).map_err(|e| corrupt(format!("items: {}", e)))?;

        Ok(InvoiceData {
            vendor: self.vendor,
            vendor_address: self.vendor_address,
            vendor_email: self.vendor_email,
            vendor_phone: self.vendor_phone,
            invoice_number: self.invoice_number,
            order_number: self.order_number,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            total_due,
            currency: self.currency,
            customer: self.customer,
            customer_address: self.customer_address,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            billing_address: self.billing_address,
            billing_email: self.billing_email,
            billing_phone: self.billing_phone,
            items,
        })
    }
}

impl SqliteInvoiceStore {
    /// Create a store. No connection is opened until first use.
    pub fn new(factory: ConnectionFactory) -> Self {
        Self {
            factory,
            pool: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    async fn pool(&self) -> Result<&SqlitePool, PersistenceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PersistenceError::Closed);
        }

        self.pool
            .get_or_try_init(|| async {
                let pool = SqlitePoolOptions::new()
                    .max_connections(self.factory.max_connections)
                    .acquire_timeout(self.factory.acquire_timeout)
                    .connect(&self.factory.url)
                    .await
                    .map_err(|e| PersistenceError::Connect(e.to_string()))?;

                sqlx::query(CREATE_TABLE)
                    .execute(&pool)
                    .await
                    .map_err(|e| PersistenceError::Connect(format!("schema setup: {}", e)))?;

                info!(
                    "Opened invoice store (max {} connections)",
                    self.factory.max_connections
                );
                Ok::<_, PersistenceError>(pool)
            })
            .await
    }

    /// Read a stored invoice back.
    pub async fn fetch(&self, id: InvoiceId) -> Result<Option<InvoiceData>, PersistenceError> {
        let pool = self.pool().await?;
        let row: Option<InvoiceRow> = sqlx::query_as("SELECT * FROM invoices WHERE id = ?")
            .bind(id.0)
            .fetch_optional(pool)
            .await
            .map_err(classify_read)?;

        row.map(InvoiceRow::into_invoice).transpose()
    }

    /// Number of stored invoices.
    pub async fn count(&self) -> Result<i64, PersistenceError> {
        let pool = self.pool().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM invoices")
            .fetch_one(pool)
            .await
            .map_err(classify_read)?;
        Ok(count)
    }
}

#[async_trait]
impl InvoiceStore for SqliteInvoiceStore {
    async fn insert(&self, invoice: &InvoiceData) -> Result<InvoiceId, PersistenceError> {
        let pool = self.pool().await?;

        let items = serde_json::to_string(&invoice.items)
            .map_err(|e| PersistenceError::Rejected(format!("items: {}", e)))?;

        let result = sqlx::query(INSERT_INVOICE)
            .bind(&invoice.vendor)
            .bind(&invoice.vendor_address)
            .bind(&invoice.vendor_email)
            .bind(&invoice.vendor_phone)
            .bind(&invoice.invoice_number)
            .bind(&invoice.order_number)
            .bind(invoice.invoice_date)
            .bind(invoice.due_date)
            .bind(invoice.total_due.to_string())
            .bind(&invoice.currency)
            .bind(&invoice.customer)
            .bind(&invoice.customer_address)
            .bind(&invoice.customer_email)
            .bind(&invoice.customer_phone)
            .bind(&invoice.billing_address)
            .bind(&invoice.billing_email)
            .bind(&invoice.billing_phone)
            .bind(items)
            .bind(Utc::now())
            .execute(pool)
            .await
            .map_err(|e| {
                let err = classify_write(e);
                debug!("Failed to store invoice {}: {}", invoice.invoice_number, err);
                err
            })?;

        let id = InvoiceId(result.last_insert_rowid());
        info!("Stored invoice {} as id {}", invoice.invoice_number, id);
        Ok(id)
    }

    /// Close the pool. Later calls fail with [`PersistenceError::Closed`].
    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            debug!("Closed invoice store");
        }
    }
}

/// Map a failed write to whether the row could exist.
fn classify_write(err: sqlx::Error) -> PersistenceError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            PersistenceError::Connect(err.to_string())
        }
        sqlx::Error::Database(_) | sqlx::Error::Encode(_) | sqlx::Error::TypeNotFound { .. } => {
            PersistenceError::Rejected(err.to_string())
        }
        other => PersistenceError::Write(other.to_string()),
    }
}

fn classify_read(err: sqlx::Error) -> PersistenceError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PersistenceError::Connect(err.to_string())
        }
        other => PersistenceError::Read(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_invoice;
    use pretty_assertions::assert_eq;

    fn store() -> SqliteInvoiceStore {
        SqliteInvoiceStore::new(ConnectionFactory::in_memory())
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = store();
        let first = store.insert(&sample_invoice()).await.unwrap();
        let second = store.insert(&sample_invoice()).await.unwrap();

        assert_eq!(first, InvoiceId(1));
        assert_eq!(second, InvoiceId(2));
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_round_trips_invoice() {
        let store = store();
        let mut invoice = sample_invoice();
        invoice.items[0].discount = Some(Decimal::new(125, 2));
        invoice.items[0].quantity = Decimal::new(15, 1);
        invoice.due_date = None;

        let id = store.insert(&invoice).await.unwrap();
        let stored = store.fetch(id).await.unwrap();
        assert_eq!(stored, Some(invoice));
    }

    #[tokio::test]
    async fn test_fetch_missing_id() {
        let store = store();
        assert_eq!(store.fetch(InvoiceId(42)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_closed_store_refuses_writes() {
        let store = store();
        store.insert(&sample_invoice()).await.unwrap();
        store.close().await;

        let err = store.insert(&sample_invoice()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Closed));
        assert!(!err.outcome_unknown());
    }

    #[tokio::test]
    async fn test_unreachable_database_is_connect_error() {
        let store = SqliteInvoiceStore::new(ConnectionFactory::new(
            "sqlite:///nonexistent-dir/invex/invoices.db",
        ));
        let err = store.insert(&sample_invoice()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Connect(_)), "got {err:?}");
        assert!(!err.outcome_unknown());
    }

    #[test]
    fn test_classify_write() {
        assert!(matches!(
            classify_write(sqlx::Error::PoolTimedOut),
            PersistenceError::Connect(_)
        ));
        assert!(classify_write(sqlx::Error::WorkerCrashed).outcome_unknown());
        assert!(classify_write(sqlx::Error::Protocol("reset".into())).outcome_unknown());
    }

    #[test]
    fn test_classify_read() {
        assert!(matches!(
            classify_read(sqlx::Error::PoolTimedOut),
            PersistenceError::Connect(_)
        ));
        assert!(matches!(
            classify_read(sqlx::Error::RowNotFound),
            PersistenceError::Read(_)
        ));
    }

    #[tokio::test]
    async fn test_failed_query_is_read_error() {
        let store = store();
        store.insert(&sample_invoice()).await.unwrap();
        sqlx::query("DROP TABLE invoices")
            .execute(store.pool().await.unwrap())
            .await
            .unwrap();

        let err = store.count().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Read(_)), "got {err:?}");
        let err = store.fetch(InvoiceId(1)).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Read(_)), "got {err:?}");
    }
}
