//! In-memory store for dev and tests.
//!
//! Mutations build the new record fully before swapping it in under one
//! write lock, so readers never observe a half-written invoice and the
//! default-company swap is atomic.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use metasoft_companies::{Company, CompanyId};
use metasoft_core::UserId;
use metasoft_invoicing::{Invoice, InvoiceId};

use super::{CompanyStore, InvoiceStore, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    companies: RwLock<HashMap<(UserId, CompanyId), Company>>,
    invoices: RwLock<HashMap<(UserId, InvoiceId), Invoice>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Poisoned locks only happen after a panic elsewhere; surface that as the
// retryable storage failure rather than propagating the panic.
fn poisoned<T>(_: T) -> StoreError {
    StoreError::unavailable("store lock poisoned")
}

#[async_trait]
impl CompanyStore for InMemoryStore {
    async fn insert_company(&self, owner: UserId, company: &Company) -> Result<(), StoreError> {
        let mut companies = self.companies.write().map_err(poisoned)?;
        let key = (owner, company.id_typed());
        if companies.contains_key(&key) {
            return Err(StoreError::integrity("company id already exists"));
        }
        companies.insert(key, company.clone());
        Ok(())
    }

    async fn update_company(&self, owner: UserId, company: &Company) -> Result<(), StoreError> {
        let mut companies = self.companies.write().map_err(poisoned)?;
        let key = (owner, company.id_typed());
        match companies.get_mut(&key) {
            Some(stored) => {
                *stored = company.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn get_company(
        &self,
        owner: UserId,
        id: CompanyId,
    ) -> Result<Option<Company>, StoreError> {
        let companies = self.companies.read().map_err(poisoned)?;
        Ok(companies.get(&(owner, id)).cloned())
    }

    async fn list_companies(&self, owner: UserId) -> Result<Vec<Company>, StoreError> {
        let companies = self.companies.read().map_err(poisoned)?;
        let mut result: Vec<Company> = companies
            .iter()
            .filter_map(|((o, _), c)| (*o == owner).then(|| c.clone()))
            .collect();
        // UUIDv7 ids are time-ordered, so this is creation order.
        result.sort_by_key(|c| c.id_typed().0);
        Ok(result)
    }

    async fn default_company(&self, owner: UserId) -> Result<Option<Company>, StoreError> {
        let companies = self.companies.read().map_err(poisoned)?;
        Ok(companies
            .iter()
            .find(|((o, _), c)| *o == owner && c.is_default())
            .map(|(_, c)| c.clone()))
    }

    async fn set_default_company(&self, owner: UserId, id: CompanyId) -> Result<(), StoreError> {
        // One critical section = one transaction boundary: the previous
        // default is unset and the new one set with no observable gap.
        let mut companies = self.companies.write().map_err(poisoned)?;
        if !companies.contains_key(&(owner, id)) {
            return Err(StoreError::NotFound);
        }
        for ((o, cid), company) in companies.iter_mut() {
            if *o == owner {
                company.set_default_flag(*cid == id);
            }
        }
        Ok(())
    }

    async fn delete_company(&self, owner: UserId, id: CompanyId) -> Result<(), StoreError> {
        // Companies lock first, held across the reference check, so no
        // invoice insert can slip in between the check and the removal.
        // Lock order is always companies then invoices.
        let mut companies = self.companies.write().map_err(poisoned)?;
        let invoices = self.invoices.read().map_err(poisoned)?;
        let referenced = invoices
            .iter()
            .any(|((o, _), inv)| {
                *o == owner && (inv.from_company() == id || inv.to_company() == id)
            });
        if referenced {
            return Err(StoreError::integrity(
                "company is referenced by existing invoices",
            ));
        }
        drop(invoices);

        match companies.remove(&(owner, id)) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}

/// Both company references must resolve for the owner; this runs under the
/// companies lock so a concurrent delete cannot invalidate them mid-write.
fn check_company_refs(
    companies: &HashMap<(UserId, CompanyId), Company>,
    owner: UserId,
    invoice: &Invoice,
) -> Result<(), StoreError> {
    for id in [invoice.from_company(), invoice.to_company()] {
        if !companies.contains_key(&(owner, id)) {
            return Err(StoreError::integrity(
                "invoice references a missing company",
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn insert_invoice(&self, owner: UserId, invoice: &Invoice) -> Result<(), StoreError> {
        let companies = self.companies.read().map_err(poisoned)?;
        check_company_refs(&companies, owner, invoice)?;
        let mut invoices = self.invoices.write().map_err(poisoned)?;
        let duplicate = invoices.iter().any(|((o, iid), stored)| {
            *o == owner
                && *iid != invoice.id_typed()
                && stored.invoice_number() == invoice.invoice_number()
        });
        if duplicate {
            return Err(StoreError::integrity(format!(
                "invoice number '{}' already exists",
                invoice.invoice_number()
            )));
        }
        let key = (owner, invoice.id_typed());
        if invoices.contains_key(&key) {
            return Err(StoreError::integrity("invoice id already exists"));
        }
        invoices.insert(key, invoice.clone());
        Ok(())
    }

    async fn update_invoice(&self, owner: UserId, invoice: &Invoice) -> Result<(), StoreError> {
        let companies = self.companies.read().map_err(poisoned)?;
        check_company_refs(&companies, owner, invoice)?;
        let mut invoices = self.invoices.write().map_err(poisoned)?;
        let key = (owner, invoice.id_typed());
        if !invoices.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        let duplicate = invoices.iter().any(|((o, iid), stored)| {
            *o == owner
                && *iid != invoice.id_typed()
                && stored.invoice_number() == invoice.invoice_number()
        });
        if duplicate {
            return Err(StoreError::integrity(format!(
                "invoice number '{}' already exists",
                invoice.invoice_number()
            )));
        }
        invoices.insert(key, invoice.clone());
        Ok(())
    }

    async fn get_invoice(
        &self,
        owner: UserId,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, StoreError> {
        let invoices = self.invoices.read().map_err(poisoned)?;
        Ok(invoices.get(&(owner, id)).cloned())
    }

    async fn list_invoices(&self, owner: UserId) -> Result<Vec<Invoice>, StoreError> {
        let invoices = self.invoices.read().map_err(poisoned)?;
        let mut result: Vec<Invoice> = invoices
            .iter()
            .filter_map(|((o, _), inv)| (*o == owner).then(|| inv.clone()))
            .collect();
        result.sort_by_key(|inv| inv.id_typed().0);
        Ok(result)
    }
}
