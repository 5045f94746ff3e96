//! Owner-scoped persistence for company profiles and invoice aggregates.
//!
//! Every operation takes the owning `UserId`; cross-owner access is
//! impossible by construction. Writes are all-or-nothing: an invoice and its
//! line items persist together or not at all, and the default-company swap
//! happens inside one transaction boundary.

use async_trait::async_trait;
use thiserror::Error;

use metasoft_companies::{Company, CompanyId};
use metasoft_core::UserId;
use metasoft_invoicing::{Invoice, InvoiceId, InvoiceStatus};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Persistence-layer error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Storage is unreachable or failed mid-operation. Retryable; the
    /// caller's draft state is preserved.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness or referential-integrity rule was violated.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The addressed record does not exist for this owner.
    #[error("not found")]
    NotFound,
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }
}

/// Company profile persistence.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn insert_company(&self, owner: UserId, company: &Company) -> Result<(), StoreError>;

    /// Replace the stored profile. `NotFound` when the id is absent for this
    /// owner.
    async fn update_company(&self, owner: UserId, company: &Company) -> Result<(), StoreError>;

    async fn get_company(
        &self,
        owner: UserId,
        id: CompanyId,
    ) -> Result<Option<Company>, StoreError>;

    /// All companies for the owner, in creation order.
    async fn list_companies(&self, owner: UserId) -> Result<Vec<Company>, StoreError>;

    /// The owner's default company, if one is flagged.
    async fn default_company(&self, owner: UserId) -> Result<Option<Company>, StoreError>;

    /// Flag `id` as the owner's default, atomically unsetting any previous
    /// default in the same transaction. At most one default survives.
    async fn set_default_company(&self, owner: UserId, id: CompanyId) -> Result<(), StoreError>;

    /// Delete a company. `Integrity` when any invoice still references it on
    /// either the from or to side.
    async fn delete_company(&self, owner: UserId, id: CompanyId) -> Result<(), StoreError>;
}

/// Invoice aggregate persistence. Header and line items always move together.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persist a new invoice with its items atomically. `Integrity` when the
    /// invoice number is already taken for this owner, or when either company
    /// reference does not resolve.
    async fn insert_invoice(&self, owner: UserId, invoice: &Invoice) -> Result<(), StoreError>;

    /// Replace a stored invoice and its items atomically. Company references
    /// are checked the same way as on insert.
    async fn update_invoice(&self, owner: UserId, invoice: &Invoice) -> Result<(), StoreError>;

    async fn get_invoice(
        &self,
        owner: UserId,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, StoreError>;

    /// All invoices for the owner, in creation order.
    async fn list_invoices(&self, owner: UserId) -> Result<Vec<Invoice>, StoreError>;
}

/// Combined storage surface the application services work against.
pub trait Store: CompanyStore + InvoiceStore {}

impl<T: CompanyStore + InvoiceStore> Store for T {}

pub(crate) fn status_to_str(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Draft => "draft",
        InvoiceStatus::Sent => "sent",
        InvoiceStatus::Paid => "paid",
    }
}

pub(crate) fn status_from_str(s: &str) -> Result<InvoiceStatus, StoreError> {
    match s {
        "draft" => Ok(InvoiceStatus::Draft),
        "sent" => Ok(InvoiceStatus::Sent),
        "paid" => Ok(InvoiceStatus::Paid),
        other => Err(StoreError::integrity(format!(
            "stored invoice status '{other}' is not recognized"
        ))),
    }
}
