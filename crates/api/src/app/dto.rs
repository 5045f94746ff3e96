use serde::Deserialize;
use serde_json::json;

use metasoft_companies::{Company, CompanyForm};
use metasoft_core::{PaperSize, Template};
use metasoft_invoicing::Invoice;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UpsertCompanyRequest {
    #[serde(flatten)]
    pub form: CompanyForm,
    /// Optional on update only; ignored on create.
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateLetterheadRequest {
    pub company_id: String,
    pub body: String,
    pub template: Option<String>,
    pub paper_size: Option<String>,
}

/// Query parameters for document rendering; absent values fall back to the
/// issuing company's defaults.
#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub template: Option<String>,
    pub paper_size: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn company_to_json(company: &Company) -> serde_json::Value {
    json!({
        "id": company.id_typed().to_string(),
        "name": company.name(),
        "street": company.address().street,
        "city": company.address().city,
        "postal_code": company.address().postal_code,
        "country": company.address().country,
        "primary_color": company.primary_color().as_str(),
        "default_template": company.default_template().as_str(),
        "default_paper_size": company.default_paper_size().as_str(),
        "is_active": company.is_active(),
        "is_default": company.is_default(),
    })
}

pub fn invoice_to_json(invoice: &Invoice) -> serde_json::Value {
    let items = invoice
        .items()
        .iter()
        .map(|item| {
            json!({
                "description": item.description,
                "quantity": item.quantity,
                "unit_price": item.unit_price.to_string(),
                "subtotal": item.subtotal().map(|m| m.to_string()),
            })
        })
        .collect::<Vec<_>>();

    json!({
        "id": invoice.id_typed().to_string(),
        "invoice_number": invoice.invoice_number(),
        "invoice_date": invoice.invoice_date().format("%Y-%m-%d").to_string(),
        "due_date": invoice.due_date().map(|d| d.format("%Y-%m-%d").to_string()),
        "from_company": invoice.from_company().to_string(),
        "to_company": invoice.to_company().to_string(),
        "status": invoice.status(),
        "items": items,
        "total": invoice.total().to_string(),
    })
}

pub fn letterhead_options_to_json(companies: &[Company]) -> serde_json::Value {
    json!({
        "companies": companies.iter().map(company_to_json).collect::<Vec<_>>(),
        "templates": Template::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        "paper_sizes": PaperSize::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
    })
}
