//! Application services: store wiring plus the invoice/letterhead workflows.
//!
//! Handlers stay thin; everything that touches more than one aggregate or the
//! store lives here.

use std::sync::Arc;

use metasoft_companies::{Company, CompanyForm, CompanyId};
use metasoft_core::{FieldErrors, PaperSize, Template, UserId};
use metasoft_infra::{InMemoryStore, PostgresStore, Store, StoreError};
use metasoft_invoicing::{Invoice, InvoiceDraft, InvoiceId, InvoiceStatus};
use metasoft_rendering::{
    LetterheadRequest, RenderedDocument, parse_selection, render_invoice, render_letterhead,
};

use crate::app::errors::ApiError;

#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn Store>,
}

/// Select the store backend: Postgres when `DATABASE_URL` is set, in-memory
/// otherwise.
pub async fn build_services() -> AppServices {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await
                .expect("failed to connect to DATABASE_URL");
            tracing::info!("using postgres-backed store");
            AppServices::new(Arc::new(PostgresStore::new(pool)))
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            AppServices::new(Arc::new(InMemoryStore::new()))
        }
    }
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // ---- companies ----

    pub async fn create_company(
        &self,
        user: UserId,
        form: CompanyForm,
    ) -> Result<Company, ApiError> {
        let company = Company::create(form).map_err(ApiError::Validation)?;
        self.store.insert_company(user, &company).await?;
        tracing::info!(company_id = %company.id_typed(), "company created");
        Ok(company)
    }

    pub async fn update_company(
        &self,
        user: UserId,
        id: CompanyId,
        form: CompanyForm,
        is_active: Option<bool>,
    ) -> Result<Company, ApiError> {
        let mut company = self
            .store
            .get_company(user, id)
            .await?
            .ok_or(StoreError::NotFound)?;
        company.apply_form(form).map_err(ApiError::Validation)?;
        if let Some(active) = is_active {
            company.set_active(active);
        }
        self.store.update_company(user, &company).await?;
        Ok(company)
    }

    pub async fn get_company(&self, user: UserId, id: CompanyId) -> Result<Company, ApiError> {
        Ok(self
            .store
            .get_company(user, id)
            .await?
            .ok_or(StoreError::NotFound)?)
    }

    pub async fn list_companies(&self, user: UserId) -> Result<Vec<Company>, ApiError> {
        Ok(self.store.list_companies(user).await?)
    }

    pub async fn set_default_company(&self, user: UserId, id: CompanyId) -> Result<(), ApiError> {
        self.store.set_default_company(user, id).await?;
        tracing::info!(company_id = %id, "default company changed");
        Ok(())
    }

    pub async fn delete_company(&self, user: UserId, id: CompanyId) -> Result<(), ApiError> {
        Ok(self.store.delete_company(user, id).await?)
    }

    // ---- invoices ----

    /// Start a fresh draft, pre-filled with the user's default company.
    ///
    /// Nothing is persisted; the draft lives on the client until saved.
    pub async fn new_draft(&self, user: UserId) -> Result<InvoiceDraft, ApiError> {
        let default = self.store.default_company(user).await?;
        Ok(InvoiceDraft::for_user(default.as_ref()))
    }

    /// Validate a draft and persist the resulting invoice.
    ///
    /// Validation covers the form fields plus cross-aggregate rules (both
    /// companies must exist and be active); all violations are reported
    /// together, and nothing persists on failure.
    pub async fn save_invoice(&self, user: UserId, draft: &InvoiceDraft) -> Result<Invoice, ApiError> {
        let (invoice, mut errors) = match draft.validate() {
            Ok(invoice) => (Some(invoice), FieldErrors::new()),
            Err(errors) => (None, errors),
        };

        self.check_company(user, draft.from_company, "from_company", &mut errors)
            .await?;
        self.check_company(user, draft.to_company, "to_company", &mut errors)
            .await?;

        let invoice = match (invoice, errors.is_empty()) {
            (Some(invoice), true) => invoice,
            (_, _) => return Err(ApiError::Validation(errors)),
        };

        self.store.insert_invoice(user, &invoice).await?;
        tracing::info!(invoice_id = %invoice.id_typed(), "invoice saved");
        Ok(invoice)
    }

    async fn check_company(
        &self,
        user: UserId,
        id: Option<CompanyId>,
        field: &str,
        errors: &mut FieldErrors,
    ) -> Result<(), ApiError> {
        let Some(id) = id else {
            // Absence is already reported by draft validation.
            return Ok(());
        };
        match self.store.get_company(user, id).await? {
            Some(company) if company.can_issue_documents() => {}
            Some(_) => errors.push(field, "company is inactive"),
            None => errors.push(field, "company not found"),
        }
        Ok(())
    }

    pub async fn get_invoice(&self, user: UserId, id: InvoiceId) -> Result<Invoice, ApiError> {
        Ok(self
            .store
            .get_invoice(user, id)
            .await?
            .ok_or(StoreError::NotFound)?)
    }

    pub async fn list_invoices(&self, user: UserId) -> Result<Vec<Invoice>, ApiError> {
        Ok(self.store.list_invoices(user).await?)
    }

    pub async fn transition_invoice(
        &self,
        user: UserId,
        id: InvoiceId,
        status: &str,
    ) -> Result<Invoice, ApiError> {
        let next = parse_status(status)?;
        let mut invoice = self.get_invoice(user, id).await?;
        invoice.transition(next)?;
        self.store.update_invoice(user, &invoice).await?;
        tracing::info!(invoice_id = %id, status = status, "invoice status changed");
        Ok(invoice)
    }

    // ---- documents ----

    /// Option lists for the letterhead form: the user's companies plus the
    /// closed template and paper-size sets.
    pub async fn letterhead_options(&self, user: UserId) -> Result<Vec<Company>, ApiError> {
        self.list_companies(user).await
    }

    pub async fn generate_letterhead(
        &self,
        user: UserId,
        company_id: CompanyId,
        body: String,
        template: Option<&str>,
        paper_size: Option<&str>,
    ) -> Result<RenderedDocument, ApiError> {
        let company = self.get_company(user, company_id).await?;
        let (template, paper_size) = resolve_selection(&company, template, paper_size)?;
        let document = render_letterhead(
            &company,
            &LetterheadRequest {
                body,
                template,
                paper_size,
            },
        )?;
        Ok(document)
    }

    /// Render a stored invoice as a document, defaulting template and paper
    /// size to the issuing company's preferences.
    pub async fn render_invoice_document(
        &self,
        user: UserId,
        id: InvoiceId,
        template: Option<&str>,
        paper_size: Option<&str>,
    ) -> Result<RenderedDocument, ApiError> {
        let invoice = self.get_invoice(user, id).await?;
        let from = self.get_invoice_company(user, invoice.from_company()).await?;
        let to = self.get_invoice_company(user, invoice.to_company()).await?;
        let (template, paper_size) = resolve_selection(&from, template, paper_size)?;
        let document = render_invoice(&from, &to, &invoice, template, paper_size)?;
        Ok(document)
    }

    /// A stored invoice referencing a missing company is corrupt data, not a
    /// 404 on the invoice route.
    async fn get_invoice_company(&self, user: UserId, id: CompanyId) -> Result<Company, ApiError> {
        match self.store.get_company(user, id).await? {
            Some(company) => Ok(company),
            None => Err(StoreError::integrity("invoice references a missing company").into()),
        }
    }
}

/// Resolve an optional template/paper-size selection against a company's
/// defaults. Unknown names are rejected, never silently mapped.
fn resolve_selection(
    company: &Company,
    template: Option<&str>,
    paper_size: Option<&str>,
) -> Result<(Template, PaperSize), ApiError> {
    let template = template.unwrap_or(company.default_template().as_str());
    let paper_size = paper_size.unwrap_or(company.default_paper_size().as_str());
    Ok(parse_selection(template, paper_size)?)
}

fn parse_status(s: &str) -> Result<InvoiceStatus, ApiError> {
    match s.to_lowercase().as_str() {
        "draft" => Ok(InvoiceStatus::Draft),
        "sent" => Ok(InvoiceStatus::Sent),
        "paid" => Ok(InvoiceStatus::Paid),
        _ => Err(ApiError::Validation(FieldErrors::single(
            "status",
            "must be one of: draft, sent, paid",
        ))),
    }
}
