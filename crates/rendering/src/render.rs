use thiserror::Error;

use metasoft_companies::Company;
use metasoft_core::{Money, PaperSize, Template};
use metasoft_invoicing::{Invoice, InvoiceStatus, LineItem};

use crate::html;

/// Rendering failures. Rendering has no side effects, so a failed generate
/// request leaves nothing behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("unknown template '{0}' (expected classic, modern, or minimal)")]
    UnknownTemplate(String),

    #[error("unknown paper size '{0}' (expected us_letter or a4)")]
    UnknownPaperSize(String),

    #[error("company '{0}' is inactive and cannot appear on new documents")]
    InactiveCompany(String),

    #[error("letterhead body must not be empty")]
    EmptyBody,
}

/// A rendered document, returned inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    html: String,
}

impl RenderedDocument {
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    pub fn into_html(self) -> String {
        self.html
    }
}

/// Transient letterhead generate request; exists only for one render call.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LetterheadRequest {
    pub body: String,
    pub template: Template,
    pub paper_size: PaperSize,
}

/// Parse wire-level template/paper-size selections, failing loudly on unknown
/// values instead of silently defaulting.
pub fn parse_selection(template: &str, paper_size: &str) -> Result<(Template, PaperSize), RenderError> {
    let template = template
        .parse::<Template>()
        .map_err(|_| RenderError::UnknownTemplate(template.to_string()))?;
    let paper_size = paper_size
        .parse::<PaperSize>()
        .map_err(|_| RenderError::UnknownPaperSize(paper_size.to_string()))?;
    Ok((template, paper_size))
}

/// Render a branded letterhead with free-form body content.
pub fn render_letterhead(
    company: &Company,
    request: &LetterheadRequest,
) -> Result<RenderedDocument, RenderError> {
    if !company.can_issue_documents() {
        return Err(RenderError::InactiveCompany(company.name().to_string()));
    }
    if request.body.trim().is_empty() {
        return Err(RenderError::EmptyBody);
    }

    let title = format!("{} — Letterhead", html::escape(company.name()));
    let body = format!(
        r#"<header class="brand">{header}</header>
<main class="body">{body}</main>"#,
        header = company_block(company),
        body = html::escape_multiline(request.body.trim()),
    );

    Ok(document(
        &title,
        request.template,
        request.paper_size,
        company,
        &body,
    ))
}

/// Render an invoice document for its from/to companies.
///
/// The renderer never mutates the invoice; it is a read-only view over the
/// aggregate.
pub fn render_invoice(
    from: &Company,
    to: &Company,
    invoice: &Invoice,
    template: Template,
    paper_size: PaperSize,
) -> Result<RenderedDocument, RenderError> {
    if !from.can_issue_documents() {
        return Err(RenderError::InactiveCompany(from.name().to_string()));
    }

    let rows: String = invoice.items().iter().map(line_item_row).collect();

    let due_row = match invoice.due_date() {
        Some(due) => format!(
            r#"<div class="meta-row"><span>Due date</span><span>{}</span></div>"#,
            due.format("%Y-%m-%d")
        ),
        None => String::new(),
    };

    let title = format!("Invoice {}", html::escape(invoice.invoice_number()));
    let body = format!(
        r#"<header class="brand">{from_block}</header>
<section class="invoice-meta">
  <h2>Invoice {number}</h2>
  <span class="status status-{status}">{status}</span>
  <div class="meta-row"><span>Invoice date</span><span>{date}</span></div>
  {due_row}
  <div class="bill-to"><h3>Bill to</h3>{to_block}</div>
</section>
<table class="items">
  <thead>
    <tr><th>Description</th><th class="right">Qty</th><th class="right">Unit price</th><th class="right">Amount</th></tr>
  </thead>
  <tbody>
{rows}  </tbody>
  <tfoot>
    <tr class="total"><td colspan="3">Total</td><td class="right">{total}</td></tr>
  </tfoot>
</table>"#,
        from_block = company_block(from),
        number = html::escape(invoice.invoice_number()),
        status = status_label(invoice.status()),
        date = invoice.invoice_date().format("%Y-%m-%d"),
        due_row = due_row,
        to_block = company_block(to),
        rows = rows,
        total = format_amount(invoice.total()),
    );

    Ok(document(&title, template, paper_size, from, &body))
}

fn line_item_row(item: &LineItem) -> String {
    // Validation guarantees line subtotals fit; render a dash if a stored
    // record somehow does not.
    let subtotal = item
        .subtotal()
        .map(format_amount)
        .unwrap_or_else(|| "—".to_string());
    format!(
        r#"    <tr>
      <td>{}</td>
      <td class="right">{}</td>
      <td class="right">{}</td>
      <td class="right">{}</td>
    </tr>
"#,
        html::escape(&item.description),
        item.quantity,
        format_amount(item.unit_price),
        subtotal,
    )
}

fn status_label(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Draft => "draft",
        InvoiceStatus::Sent => "sent",
        InvoiceStatus::Paid => "paid",
    }
}

fn format_amount(amount: Money) -> String {
    amount.to_string()
}

fn company_block(company: &Company) -> String {
    let address = company.address();
    let mut lines = vec![html::escape(&address.street), html::escape(&address.city)];
    if !address.postal_code.is_empty() {
        lines.push(html::escape(&address.postal_code));
    }
    if !address.country.is_empty() {
        lines.push(html::escape(&address.country));
    }
    format!(
        r#"<div class="company"><span class="company-name">{}</span><span class="company-address">{}</span></div>"#,
        html::escape(company.name()),
        lines.join(", "),
    )
}

/// Wrap rendered body content in the full document shell for one template and
/// paper size. Paper size drives physical dimensions only.
fn document(
    title: &str,
    template: Template,
    paper_size: PaperSize,
    company: &Company,
    body: &str,
) -> RenderedDocument {
    let (width, height) = paper_size.css_dimensions();
    let color = company.primary_color().as_str();

    // Exhaustive by construction: adding a template variant forces a new arm.
    let template_css = match template {
        Template::Classic => concat!(
            ".tpl-classic { font-family: Georgia, 'Times New Roman', serif; }\n",
            ".tpl-classic .brand { text-align: center; border-bottom: 3px double var(--brand); padding-bottom: 12px; }\n",
            ".tpl-classic .company-name { font-variant: small-caps; letter-spacing: 1px; }\n",
        ),
        Template::Modern => concat!(
            ".tpl-modern { font-family: 'Helvetica Neue', Arial, sans-serif; }\n",
            ".tpl-modern .brand { border-left: 8px solid var(--brand); padding-left: 16px; }\n",
            ".tpl-modern .company-name { color: var(--brand); text-transform: uppercase; }\n",
        ),
        Template::Minimal => concat!(
            ".tpl-minimal { font-family: Arial, sans-serif; }\n",
            ".tpl-minimal .brand { border-bottom: 1px solid #ddd; padding-bottom: 8px; }\n",
        ),
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
@page {{ size: {width} {height}; margin: 1in; }}
:root {{ --brand: {color}; }}
html, body {{ margin: 0; padding: 0; }}
body {{ width: {width}; min-height: {height}; box-sizing: border-box; padding: 1in; font-size: 11pt; color: #1a1a1a; }}
.company {{ display: flex; flex-direction: column; gap: 2px; }}
.company-name {{ font-size: 16pt; font-weight: bold; }}
.company-address {{ font-size: 9pt; color: #555; }}
.body {{ margin-top: 24pt; line-height: 1.5; }}
.invoice-meta {{ margin-top: 18pt; }}
.meta-row {{ display: flex; justify-content: space-between; max-width: 280px; font-size: 10pt; }}
.bill-to {{ margin-top: 12pt; }}
.status {{ font-size: 9pt; text-transform: uppercase; border: 1px solid #888; padding: 1px 6px; }}
.status-paid {{ border-color: var(--brand); color: var(--brand); }}
table.items {{ width: 100%; border-collapse: collapse; margin-top: 18pt; }}
table.items th, table.items td {{ border-bottom: 1px solid #ddd; padding: 6px 4px; text-align: left; }}
table.items .right {{ text-align: right; }}
table.items tfoot .total td {{ font-weight: bold; border-top: 2px solid var(--brand); border-bottom: none; }}
{template_css}</style>
</head>
<body class="tpl-{template}">
{body}
</body>
</html>
"#,
    );

    RenderedDocument { html }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use metasoft_companies::CompanyForm;
    use metasoft_core::AggregateId;
    use metasoft_invoicing::{InvoiceDraft, InvoiceId, LineItemInput};

    fn company(name: &str) -> Company {
        Company::create(CompanyForm {
            name: name.into(),
            street: "1 Main St".into(),
            city: "Springfield".into(),
            postal_code: "12345".into(),
            country: "USA".into(),
            primary_color: "#0057b8".into(),
            ..CompanyForm::default()
        })
        .unwrap()
    }

    fn letterhead(body: &str) -> LetterheadRequest {
        LetterheadRequest {
            body: body.into(),
            template: Template::Classic,
            paper_size: PaperSize::UsLetter,
        }
    }

    fn sample_invoice(from: &Company, to: &Company) -> Invoice {
        let draft = InvoiceDraft {
            invoice_number: "INV-001".into(),
            invoice_date: "2026-03-01".into(),
            due_date: "2026-03-31".into(),
            from_company: Some(from.id_typed()),
            to_company: Some(to.id_typed()),
            items: vec![
                LineItemInput {
                    description: "Design work".into(),
                    quantity: "10".into(),
                    unit_price: "125.00".into(),
                },
                LineItemInput {
                    description: "Hosting".into(),
                    quantity: "3".into(),
                    unit_price: "20".into(),
                },
            ],
        };
        draft.validate().unwrap()
    }

    #[test]
    fn identical_inputs_render_byte_identical_output() {
        let acme = company("Acme");
        let request = letterhead("Dear customer,\nthank you.");

        let first = render_letterhead(&acme, &request).unwrap();
        let second = render_letterhead(&acme, &request).unwrap();
        assert_eq!(first.html(), second.html());
    }

    #[test]
    fn letterhead_contains_branding_and_body() {
        let acme = company("Acme");
        let doc = render_letterhead(&acme, &letterhead("Hello\nworld")).unwrap();
        assert!(doc.html().contains("Acme"));
        assert!(doc.html().contains("--brand: #0057b8"));
        assert!(doc.html().contains("Hello<br>world"));
        assert_eq!(doc.content_type(), "text/html; charset=utf-8");
    }

    #[test]
    fn user_content_is_escaped() {
        let evil = company("Acme <script>alert(1)</script>");
        let doc = render_letterhead(&evil, &letterhead("a & b < c")).unwrap();
        assert!(!doc.html().contains("<script>alert"));
        assert!(doc.html().contains("&lt;script&gt;"));
        assert!(doc.html().contains("a &amp; b &lt; c"));
    }

    #[test]
    fn inactive_company_is_rejected() {
        let mut acme = company("Acme");
        acme.set_active(false);
        let err = render_letterhead(&acme, &letterhead("Hello")).unwrap_err();
        assert_eq!(err, RenderError::InactiveCompany("Acme".into()));
    }

    #[test]
    fn blank_body_is_rejected() {
        let acme = company("Acme");
        let err = render_letterhead(&acme, &letterhead("  \n ")).unwrap_err();
        assert_eq!(err, RenderError::EmptyBody);
    }

    #[test]
    fn paper_size_changes_dimensions_only() {
        let acme = company("Acme");
        let mut request = letterhead("Same content");

        let letter = render_letterhead(&acme, &request).unwrap();
        request.paper_size = PaperSize::A4;
        let a4 = render_letterhead(&acme, &request).unwrap();

        assert!(letter.html().contains("size: 8.5in 11in"));
        assert!(a4.html().contains("size: 210mm 297mm"));
        assert!(letter.html().contains("Same content"));
        assert!(a4.html().contains("Same content"));
    }

    #[test]
    fn each_template_gets_its_own_class() {
        let acme = company("Acme");
        for template in Template::ALL {
            let mut request = letterhead("body");
            request.template = template;
            let doc = render_letterhead(&acme, &request).unwrap();
            assert!(doc.html().contains(&format!("tpl-{template}")));
        }
    }

    #[test]
    fn invoice_renders_items_and_total() {
        let acme = company("Acme");
        let globex = company("Globex");
        let invoice = sample_invoice(&acme, &globex);

        let doc =
            render_invoice(&acme, &globex, &invoice, Template::Modern, PaperSize::A4).unwrap();
        assert!(doc.html().contains("Invoice INV-001"));
        assert!(doc.html().contains("Design work"));
        assert!(doc.html().contains("125.00"));
        // 10 × 125.00 + 3 × 20.00
        assert!(doc.html().contains("1310.00"));
        assert!(doc.html().contains("Globex"));
        assert!(doc.html().contains("status-draft"));
    }

    #[test]
    fn invoice_from_inactive_company_is_rejected() {
        let mut acme = company("Acme");
        let globex = company("Globex");
        let invoice = sample_invoice(&acme, &globex);
        acme.set_active(false);

        let err = render_invoice(&acme, &globex, &invoice, Template::Classic, PaperSize::UsLetter)
            .unwrap_err();
        assert!(matches!(err, RenderError::InactiveCompany(_)));
    }

    #[test]
    fn selection_parsing_rejects_unknown_values() {
        assert!(parse_selection("classic", "a4").is_ok());
        assert_eq!(
            parse_selection("corporate", "a4").unwrap_err(),
            RenderError::UnknownTemplate("corporate".into())
        );
        assert_eq!(
            parse_selection("classic", "legal").unwrap_err(),
            RenderError::UnknownPaperSize("legal".into())
        );
    }

    #[test]
    fn due_date_row_is_optional() {
        let acme = company("Acme");
        let globex = company("Globex");

        let with_due = sample_invoice(&acme, &globex);
        let doc =
            render_invoice(&acme, &globex, &with_due, Template::Classic, PaperSize::UsLetter)
                .unwrap();
        assert!(doc.html().contains("Due date"));

        let no_due = Invoice::from_validated(
            InvoiceId::new(AggregateId::new()),
            "INV-002".into(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            None,
            acme.id_typed(),
            globex.id_typed(),
            InvoiceStatus::Draft,
            with_due.items().to_vec(),
        );
        let doc = render_invoice(&acme, &globex, &no_due, Template::Classic, PaperSize::UsLetter)
            .unwrap();
        assert!(!doc.html().contains("Due date"));
    }
}
