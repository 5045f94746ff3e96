use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use metasoft_companies::CompanyId;
use metasoft_core::{AggregateId, DomainError, Entity, Money};

/// Invoice identifier (owner-scoped via `UserId` keys at the store).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice status lifecycle. Transitions are linear: draft → sent → paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
}

impl InvoiceStatus {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition(self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Draft, InvoiceStatus::Sent) | (InvoiceStatus::Sent, InvoiceStatus::Paid)
        )
    }
}

/// A billable line on an invoice.
///
/// Owned exclusively by its parent invoice; the subtotal is derived, never
/// stored as an independent source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineItem {
    /// `quantity × unit_price`; `None` on i64 overflow.
    pub fn subtotal(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// Aggregate: an invoice header plus its owned, ordered line items.
///
/// Instances only come out of `InvoiceDraft::validate` or the store, so the
/// field invariants (non-empty number, ≥1 item, positive quantities) hold by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    invoice_number: String,
    invoice_date: NaiveDate,
    due_date: Option<NaiveDate>,
    from_company: CompanyId,
    to_company: CompanyId,
    status: InvoiceStatus,
    items: Vec<LineItem>,
}

impl Invoice {
    /// Assemble a validated invoice. Callers are the draft validator and the
    /// store's row mapper; both uphold the item/field invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_validated(
        id: InvoiceId,
        invoice_number: String,
        invoice_date: NaiveDate,
        due_date: Option<NaiveDate>,
        from_company: CompanyId,
        to_company: CompanyId,
        status: InvoiceStatus,
        items: Vec<LineItem>,
    ) -> Self {
        debug_assert!(!items.is_empty(), "invoice must keep at least one item");
        Self {
            id,
            invoice_number,
            invoice_date,
            due_date,
            from_company,
            to_company,
            status,
            items,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn invoice_date(&self) -> NaiveDate {
        self.invoice_date
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn from_company(&self) -> CompanyId {
        self.from_company
    }

    pub fn to_company(&self) -> CompanyId {
        self.to_company
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Total = Σ line subtotals, recomputed at read time.
    ///
    /// Validation bounds quantities and prices, so the sum cannot overflow
    /// for invoices built through the draft; saturation covers store-loaded
    /// data anyway.
    pub fn total(&self) -> Money {
        Money::checked_sum(self.items.iter().filter_map(LineItem::subtotal))
            .unwrap_or(Money::from_cents(i64::MAX))
    }

    /// Move the invoice along its lifecycle (draft → sent → paid).
    pub fn transition(&mut self, next: InvoiceStatus) -> Result<(), DomainError> {
        if !self.status.can_transition(next) {
            return Err(DomainError::conflict(format!(
                "cannot transition invoice from {:?} to {next:?}",
                self.status
            )));
        }
        self.status = next;
        Ok(())
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
