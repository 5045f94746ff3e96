//! Form-state controller for invoice editing.
//!
//! The draft mirrors the invoice form: every field holds what the user typed
//! (dates and amounts as text), plus company selections. `validate()` is the
//! single gate between form state and the `Invoice` aggregate, reporting all
//! violations keyed by field path in one pass.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use metasoft_companies::{Company, CompanyId};
use metasoft_core::{AggregateId, FieldErrors, Money};

use crate::invoice::{Invoice, InvoiceId, InvoiceStatus, LineItem};

/// One editable line of the invoice form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    pub description: String,
    /// Whole-number quantity, as typed.
    pub quantity: String,
    /// Decimal amount, as typed (`"1250"` or `"1250.00"`).
    pub unit_price: String,
}

/// Mutable, not-yet-persisted invoice being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub invoice_number: String,
    /// ISO date (`YYYY-MM-DD`), as typed.
    pub invoice_date: String,
    /// Optional ISO date; blank means no due date.
    pub due_date: String,
    pub from_company: Option<CompanyId>,
    pub to_company: Option<CompanyId>,
    pub items: Vec<LineItemInput>,
}

impl InvoiceDraft {
    /// Fresh draft with one empty line item.
    pub fn new() -> Self {
        Self {
            invoice_number: String::new(),
            invoice_date: String::new(),
            due_date: String::new(),
            from_company: None,
            to_company: None,
            items: vec![LineItemInput::default()],
        }
    }

    /// Fresh draft pre-filled with the caller's default company, if any.
    ///
    /// No side effects: the draft lives purely in memory until saved.
    pub fn for_user(default_company: Option<&Company>) -> Self {
        let mut draft = Self::new();
        draft.from_company = default_company.map(|c| c.id_typed());
        draft
    }

    /// Append an empty line item.
    pub fn add_item(&mut self) {
        self.items.push(LineItemInput::default());
    }

    /// Remove the item at `index`, compacting without reordering.
    ///
    /// Removing the last remaining item is a validation error, not a crash:
    /// an invoice always retains at least one line.
    pub fn remove_item(&mut self, index: usize) -> Result<(), FieldErrors> {
        if index >= self.items.len() {
            return Err(FieldErrors::single(
                "items",
                format!("no line item at position {index}"),
            ));
        }
        if self.items.len() == 1 {
            return Err(FieldErrors::single(
                "items",
                "an invoice must keep at least one line item",
            ));
        }
        self.items.remove(index);
        Ok(())
    }

    /// Validate the whole form and build the aggregate.
    ///
    /// All violations are collected and reported together; persisted state is
    /// untouched either way.
    pub fn validate(&self) -> Result<Invoice, FieldErrors> {
        let mut errors = FieldErrors::new();

        let invoice_number = self.invoice_number.trim().to_string();
        if invoice_number.is_empty() {
            errors.push("invoice_number", "is required");
        }

        let invoice_date = parse_required_date(&self.invoice_date, "invoice_date", &mut errors);
        let due_date = parse_optional_date(&self.due_date, "due_date", &mut errors);
        if let (Some(invoiced), Some(due)) = (invoice_date, due_date.flatten()) {
            if due < invoiced {
                errors.push("due_date", "cannot precede the invoice date");
            }
        }

        if self.from_company.is_none() {
            errors.push("from_company", "is required");
        }
        if self.to_company.is_none() {
            errors.push("to_company", "is required");
        }

        if self.items.is_empty() {
            errors.push("items", "at least one line item is required");
        }

        let mut items = Vec::with_capacity(self.items.len());
        for (index, input) in self.items.iter().enumerate() {
            if let Some(item) = validate_item(index, input, &mut errors) {
                items.push(item);
            }
        }

        // Line subtotals are bounded, but the grand total can still overflow
        // across many lines; surface that on the items field.
        if errors.is_empty()
            && Money::checked_sum(items.iter().filter_map(LineItem::subtotal)).is_none()
        {
            errors.push("items", "invoice total is too large");
        }

        // Required-field checks above guarantee these are Some when no error
        // was recorded.
        let (Some(invoice_date), Some(from_company), Some(to_company)) =
            (invoice_date, self.from_company, self.to_company)
        else {
            return Err(errors);
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Invoice::from_validated(
            InvoiceId::new(AggregateId::new()),
            invoice_number,
            invoice_date,
            due_date.flatten(),
            from_company,
            to_company,
            InvoiceStatus::Draft,
            items,
        ))
    }
}

impl Default for InvoiceDraft {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_item(index: usize, input: &LineItemInput, errors: &mut FieldErrors) -> Option<LineItem> {
    let mut ok = true;

    let description = input.description.trim().to_string();
    if description.is_empty() {
        errors.push(format!("items[{index}].description"), "is required");
        ok = false;
    }

    let quantity = match input.quantity.trim().parse::<i64>() {
        Ok(q) if q > 0 => Some(q),
        Ok(_) => {
            errors.push(format!("items[{index}].quantity"), "must be positive");
            None
        }
        Err(_) => {
            errors.push(format!("items[{index}].quantity"), "must be a whole number");
            None
        }
    };

    let unit_price = match parse_money(&input.unit_price) {
        Ok(price) if price.is_negative() => {
            errors.push(format!("items[{index}].unit_price"), "cannot be negative");
            None
        }
        Ok(price) => Some(price),
        Err(msg) => {
            errors.push(format!("items[{index}].unit_price"), msg);
            None
        }
    };

    let (quantity, unit_price) = (quantity?, unit_price?);
    if !ok {
        return None;
    }

    let item = LineItem {
        description,
        quantity,
        unit_price,
    };
    if item.subtotal().is_none() {
        errors.push(format!("items[{index}].quantity"), "line subtotal is too large");
        return None;
    }
    Some(item)
}

fn parse_required_date(raw: &str, field: &str, errors: &mut FieldErrors) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(field, "is required");
        return None;
    }
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(field, "must be a date (YYYY-MM-DD)");
            None
        }
    }
}

/// Outer `None` = parse failed, `Some(None)` = intentionally blank.
fn parse_optional_date(raw: &str, field: &str, errors: &mut FieldErrors) -> Option<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(None);
    }
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => Some(Some(date)),
        Err(_) => {
            errors.push(field, "must be a date (YYYY-MM-DD)");
            None
        }
    }
}

/// Parse a decimal money amount into cents. Accepts `"1250"`, `"1250.5"`,
/// `"1250.50"`; more than two fraction digits is rejected rather than rounded.
fn parse_money(raw: &str) -> Result<Money, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("is required".into());
    }

    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, trimmed),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err("must be an amount".into());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err("must be an amount".into());
    }
    if fraction.len() > 2 {
        return Err("amounts use at most two decimal places".into());
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| "amount is too large".to_string())?
    };
    let cents_fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| "must be an amount".to_string())? * 10,
        _ => fraction.parse().map_err(|_| "must be an amount".to_string())?,
    };

    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents_fraction))
        .map(|cents| Money::from_cents(sign * cents))
        .ok_or_else(|| "amount is too large".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metasoft_companies::{CompanyForm, Company};
    use metasoft_core::Template;
    use proptest::prelude::*;

    fn company(name: &str) -> Company {
        Company::create(CompanyForm {
            name: name.into(),
            street: "1 Main St".into(),
            city: "Springfield".into(),
            postal_code: "12345".into(),
            country: "USA".into(),
            primary_color: "#336699".into(),
            default_template: Template::Classic,
            ..CompanyForm::default()
        })
        .unwrap()
    }

    fn filled_draft() -> InvoiceDraft {
        let from = company("Acme");
        let to = company("Globex");
        InvoiceDraft {
            invoice_number: "INV-2026-001".into(),
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
        }
    }

    #[test]
    fn new_draft_starts_with_one_empty_item() {
        let draft = InvoiceDraft::new();
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0], LineItemInput::default());
        assert!(draft.from_company.is_none());
    }

    #[test]
    fn for_user_prefills_default_company() {
        let acme = company("Acme");
        let draft = InvoiceDraft::for_user(Some(&acme));
        assert_eq!(draft.from_company, Some(acme.id_typed()));

        let draft = InvoiceDraft::for_user(None);
        assert_eq!(draft.from_company, None);
    }

    #[test]
    fn valid_draft_builds_invoice_with_summed_total() {
        let invoice = filled_draft().validate().unwrap();
        assert_eq!(invoice.invoice_number(), "INV-2026-001");
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.items().len(), 2);
        assert_eq!(invoice.total(), Money::from_cents(10 * 12_500 + 3 * 2_000));
    }

    #[test]
    fn blanked_draft_reports_every_required_field() {
        // Prefilled values do not survive the user blanking them out.
        let acme = company("Acme");
        let mut draft = InvoiceDraft::for_user(Some(&acme));
        assert_eq!(draft.from_company, Some(acme.id_typed()));

        draft.invoice_number = "".into();
        draft.invoice_date = "".into();
        draft.from_company = None;
        draft.to_company = None;
        draft.items.clear();

        let errors = draft.validate().unwrap_err();
        assert!(errors.contains("invoice_number"));
        assert!(errors.contains("invoice_date"));
        assert!(errors.contains("from_company"));
        assert!(errors.contains("to_company"));
        assert!(errors.contains("items"));
    }

    #[test]
    fn item_violations_are_keyed_by_index() {
        let mut draft = filled_draft();
        draft.items[0].quantity = "0".into();
        draft.items[1].description = " ".into();
        draft.items[1].unit_price = "-5".into();

        let errors = draft.validate().unwrap_err();
        assert!(errors.contains("items[0].quantity"));
        assert!(errors.contains("items[1].description"));
        assert!(errors.contains("items[1].unit_price"));
    }

    #[test]
    fn malformed_numbers_and_dates_are_field_errors() {
        let mut draft = filled_draft();
        draft.invoice_date = "03/01/2026".into();
        draft.items[0].quantity = "ten".into();
        draft.items[0].unit_price = "12.345".into();

        let errors = draft.validate().unwrap_err();
        assert!(errors.contains("invoice_date"));
        assert!(errors.contains("items[0].quantity"));
        assert!(errors.contains("items[0].unit_price"));
    }

    #[test]
    fn due_date_cannot_precede_invoice_date() {
        let mut draft = filled_draft();
        draft.due_date = "2026-02-01".into();
        let errors = draft.validate().unwrap_err();
        assert!(errors.contains("due_date"));

        draft.due_date = "".into();
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn remove_item_keeps_at_least_one() {
        let mut draft = filled_draft();
        draft.remove_item(1).unwrap();
        assert_eq!(draft.items.len(), 1);

        let errors = draft.remove_item(0).unwrap_err();
        assert!(errors.contains("items"));
        assert_eq!(draft.items.len(), 1);
    }

    #[test]
    fn remove_item_out_of_range_is_rejected() {
        let mut draft = filled_draft();
        let errors = draft.remove_item(7).unwrap_err();
        assert!(errors.contains("items"));
        assert_eq!(draft.items.len(), 2);
    }

    #[test]
    fn remove_item_compacts_without_reordering() {
        let mut draft = filled_draft();
        draft.add_item();
        draft.items[2].description = "Support".into();
        draft.items[2].quantity = "1".into();
        draft.items[2].unit_price = "50".into();

        draft.remove_item(1).unwrap();
        assert_eq!(draft.items[0].description, "Design work");
        assert_eq!(draft.items[1].description, "Support");
    }

    #[test]
    fn money_parsing_accepts_decimal_forms() {
        assert_eq!(parse_money("1250"), Ok(Money::from_cents(125_000)));
        assert_eq!(parse_money("1250.5"), Ok(Money::from_cents(125_050)));
        assert_eq!(parse_money("0.05"), Ok(Money::from_cents(5)));
        assert_eq!(parse_money("-2.50"), Ok(Money::from_cents(-250)));
        assert!(parse_money("").is_err());
        assert!(parse_money(".").is_err());
        assert!(parse_money("12,50").is_err());
        assert!(parse_money("1.234").is_err());
    }

    proptest! {
        /// Any draft whose items are well-formed validates, and the computed
        /// total equals the independently summed subtotals.
        #[test]
        fn valid_items_always_sum(
            items in prop::collection::vec((1i64..10_000, 0i64..1_000_000), 1..20)
        ) {
            let mut draft = filled_draft();
            draft.items = items
                .iter()
                .map(|(quantity, cents)| LineItemInput {
                    description: "Line".into(),
                    quantity: quantity.to_string(),
                    unit_price: Money::from_cents(*cents).to_string(),
                })
                .collect();

            let invoice = draft.validate().unwrap();
            let expected: i64 = items.iter().map(|(q, c)| q * c).sum();
            prop_assert_eq!(invoice.total(), Money::from_cents(expected));
        }

        /// The item count never drops below one through `remove_item`.
        #[test]
        fn item_count_never_drops_below_one(removals in prop::collection::vec(0usize..8, 0..24)) {
            let mut draft = InvoiceDraft::new();
            draft.add_item();
            draft.add_item();

            for index in removals {
                let _ = draft.remove_item(index);
                prop_assert!(!draft.items.is_empty());
            }
        }
    }
}
