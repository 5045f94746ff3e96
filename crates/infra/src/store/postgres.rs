//! Postgres-backed store.
//!
//! Schema (managed by the platform's migration service, reproduced here for
//! reference):
//!
//! ```sql
//! CREATE TABLE companies (
//!   id UUID PRIMARY KEY,
//!   owner_id UUID NOT NULL,
//!   name TEXT NOT NULL,
//!   street TEXT NOT NULL,
//!   city TEXT NOT NULL,
//!   postal_code TEXT NOT NULL,
//!   country TEXT NOT NULL,
//!   primary_color TEXT NOT NULL,
//!   default_template TEXT NOT NULL,
//!   default_paper_size TEXT NOT NULL,
//!   is_active BOOLEAN NOT NULL,
//!   is_default BOOLEAN NOT NULL
//! );
//!
//! CREATE TABLE invoices (
//!   id UUID PRIMARY KEY,
//!   owner_id UUID NOT NULL,
//!   invoice_number TEXT NOT NULL,
//!   invoice_date DATE NOT NULL,
//!   due_date DATE,
//!   from_company UUID NOT NULL REFERENCES companies (id),
//!   to_company UUID NOT NULL REFERENCES companies (id),
//!   status TEXT NOT NULL,
//!   UNIQUE (owner_id, invoice_number)
//! );
//!
//! CREATE TABLE invoice_line_items (
//!   invoice_id UUID NOT NULL REFERENCES invoices (id) ON DELETE CASCADE,
//!   position INTEGER NOT NULL,
//!   description TEXT NOT NULL,
//!   quantity BIGINT NOT NULL,
//!   unit_price_cents BIGINT NOT NULL,
//!   PRIMARY KEY (invoice_id, position)
//! );
//! ```

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use metasoft_companies::{Address, Company, CompanyId, HexColor};
use metasoft_core::{AggregateId, Money, PaperSize, Template, UserId};
use metasoft_invoicing::{Invoice, InvoiceId, LineItem};

use super::{CompanyStore, InvoiceStore, StoreError, status_from_str, status_to_str};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map sqlx failures onto the store error taxonomy: constraint violations are
/// integrity errors, everything else is a retryable availability failure.
fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        // 23505 unique_violation, 23503 foreign_key_violation.
        if matches!(db.code().as_deref(), Some("23505") | Some("23503")) {
            return StoreError::integrity(db.message().to_string());
        }
    }
    StoreError::unavailable(e.to_string())
}

fn company_from_row(row: &PgRow) -> Result<Company, StoreError> {
    let id: Uuid = row.try_get("id").map_err(map_sqlx)?;
    let name: String = row.try_get("name").map_err(map_sqlx)?;
    let street: String = row.try_get("street").map_err(map_sqlx)?;
    let city: String = row.try_get("city").map_err(map_sqlx)?;
    let postal_code: String = row.try_get("postal_code").map_err(map_sqlx)?;
    let country: String = row.try_get("country").map_err(map_sqlx)?;
    let primary_color: String = row.try_get("primary_color").map_err(map_sqlx)?;
    let default_template: String = row.try_get("default_template").map_err(map_sqlx)?;
    let default_paper_size: String = row.try_get("default_paper_size").map_err(map_sqlx)?;
    let is_active: bool = row.try_get("is_active").map_err(map_sqlx)?;
    let is_default: bool = row.try_get("is_default").map_err(map_sqlx)?;

    let primary_color = HexColor::parse(&primary_color)
        .map_err(|msg| StoreError::integrity(format!("stored primary_color: {msg}")))?;
    let default_template = default_template
        .parse::<Template>()
        .map_err(|e| StoreError::integrity(format!("stored default_template: {e}")))?;
    let default_paper_size = default_paper_size
        .parse::<PaperSize>()
        .map_err(|e| StoreError::integrity(format!("stored default_paper_size: {e}")))?;

    Ok(Company::from_stored(
        CompanyId::new(AggregateId::from_uuid(id)),
        name,
        Address {
            street,
            city,
            postal_code,
            country,
        },
        primary_color,
        default_template,
        default_paper_size,
        is_active,
        is_default,
    ))
}

#[async_trait]
impl CompanyStore for PostgresStore {
    async fn insert_company(&self, owner: UserId, company: &Company) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO companies \
             (id, owner_id, name, street, city, postal_code, country, primary_color, \
              default_template, default_paper_size, is_active, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(*company.id_typed().0.as_uuid())
        .bind(*owner.as_uuid())
        .bind(company.name())
        .bind(&company.address().street)
        .bind(&company.address().city)
        .bind(&company.address().postal_code)
        .bind(&company.address().country)
        .bind(company.primary_color().as_str())
        .bind(company.default_template().as_str())
        .bind(company.default_paper_size().as_str())
        .bind(company.is_active())
        .bind(company.is_default())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn update_company(&self, owner: UserId, company: &Company) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE companies SET \
             name = $3, street = $4, city = $5, postal_code = $6, country = $7, \
             primary_color = $8, default_template = $9, default_paper_size = $10, \
             is_active = $11 \
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(*company.id_typed().0.as_uuid())
        .bind(*owner.as_uuid())
        .bind(company.name())
        .bind(&company.address().street)
        .bind(&company.address().city)
        .bind(&company.address().postal_code)
        .bind(&company.address().country)
        .bind(company.primary_color().as_str())
        .bind(company.default_template().as_str())
        .bind(company.default_paper_size().as_str())
        .bind(company.is_active())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_company(
        &self,
        owner: UserId,
        id: CompanyId,
    ) -> Result<Option<Company>, StoreError> {
        let row = sqlx::query("SELECT * FROM companies WHERE id = $1 AND owner_id = $2")
            .bind(*id.0.as_uuid())
            .bind(*owner.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(company_from_row).transpose()
    }

    async fn list_companies(&self, owner: UserId) -> Result<Vec<Company>, StoreError> {
        let rows = sqlx::query("SELECT * FROM companies WHERE owner_id = $1 ORDER BY id")
            .bind(*owner.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        rows.iter().map(company_from_row).collect()
    }

    async fn default_company(&self, owner: UserId) -> Result<Option<Company>, StoreError> {
        let row = sqlx::query("SELECT * FROM companies WHERE owner_id = $1 AND is_default")
            .bind(*owner.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(company_from_row).transpose()
    }

    async fn set_default_company(&self, owner: UserId, id: CompanyId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query("UPDATE companies SET is_default = FALSE WHERE owner_id = $1 AND is_default")
            .bind(*owner.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        let result =
            sqlx::query("UPDATE companies SET is_default = TRUE WHERE id = $1 AND owner_id = $2")
                .bind(*id.0.as_uuid())
                .bind(*owner.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the unset above.
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx)
    }

    async fn delete_company(&self, owner: UserId, id: CompanyId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS (\
             SELECT 1 FROM invoices \
             WHERE owner_id = $1 AND (from_company = $2 OR to_company = $2))",
        )
        .bind(*owner.as_uuid())
        .bind(*id.0.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if referenced {
            return Err(StoreError::integrity(
                "company is referenced by existing invoices",
            ));
        }

        let result = sqlx::query("DELETE FROM companies WHERE id = $1 AND owner_id = $2")
            .bind(*id.0.as_uuid())
            .bind(*owner.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx)
    }
}

#[async_trait]
impl InvoiceStore for PostgresStore {
    async fn insert_invoice(&self, owner: UserId, invoice: &Invoice) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            "INSERT INTO invoices \
             (id, owner_id, invoice_number, invoice_date, due_date, from_company, to_company, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(*invoice.id_typed().0.as_uuid())
        .bind(*owner.as_uuid())
        .bind(invoice.invoice_number())
        .bind(invoice.invoice_date())
        .bind(invoice.due_date())
        .bind(*invoice.from_company().0.as_uuid())
        .bind(*invoice.to_company().0.as_uuid())
        .bind(status_to_str(invoice.status()))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        insert_items(&mut tx, invoice).await?;
        tx.commit().await.map_err(map_sqlx)
    }

    async fn update_invoice(&self, owner: UserId, invoice: &Invoice) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let result = sqlx::query(
            "UPDATE invoices SET \
             invoice_number = $3, invoice_date = $4, due_date = $5, \
             from_company = $6, to_company = $7, status = $8 \
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(*invoice.id_typed().0.as_uuid())
        .bind(*owner.as_uuid())
        .bind(invoice.invoice_number())
        .bind(invoice.invoice_date())
        .bind(invoice.due_date())
        .bind(*invoice.from_company().0.as_uuid())
        .bind(*invoice.to_company().0.as_uuid())
        .bind(status_to_str(invoice.status()))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM invoice_line_items WHERE invoice_id = $1")
            .bind(*invoice.id_typed().0.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        insert_items(&mut tx, invoice).await?;
        tx.commit().await.map_err(map_sqlx)
    }

    async fn get_invoice(
        &self,
        owner: UserId,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, StoreError> {
        let row = sqlx::query("SELECT * FROM invoices WHERE id = $1 AND owner_id = $2")
            .bind(*id.0.as_uuid())
            .bind(*owner.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(Some(self.load_invoice(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list_invoices(&self, owner: UserId) -> Result<Vec<Invoice>, StoreError> {
        let rows = sqlx::query("SELECT * FROM invoices WHERE owner_id = $1 ORDER BY id")
            .bind(*owner.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in &rows {
            invoices.push(self.load_invoice(row).await?);
        }
        Ok(invoices)
    }
}

impl PostgresStore {
    async fn load_invoice(&self, row: &PgRow) -> Result<Invoice, StoreError> {
        let id: Uuid = row.try_get("id").map_err(map_sqlx)?;
        let invoice_number: String = row.try_get("invoice_number").map_err(map_sqlx)?;
        let invoice_date = row.try_get("invoice_date").map_err(map_sqlx)?;
        let due_date = row.try_get("due_date").map_err(map_sqlx)?;
        let from_company: Uuid = row.try_get("from_company").map_err(map_sqlx)?;
        let to_company: Uuid = row.try_get("to_company").map_err(map_sqlx)?;
        let status: String = row.try_get("status").map_err(map_sqlx)?;

        let item_rows = sqlx::query(
            "SELECT description, quantity, unit_price_cents \
             FROM invoice_line_items WHERE invoice_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut items = Vec::with_capacity(item_rows.len());
        for item in &item_rows {
            let description: String = item.try_get("description").map_err(map_sqlx)?;
            let quantity: i64 = item.try_get("quantity").map_err(map_sqlx)?;
            let cents: i64 = item.try_get("unit_price_cents").map_err(map_sqlx)?;
            items.push(LineItem {
                description,
                quantity,
                unit_price: Money::from_cents(cents),
            });
        }
        if items.is_empty() {
            return Err(StoreError::integrity(format!(
                "invoice {id} has no line items"
            )));
        }

        Ok(Invoice::from_validated(
            InvoiceId::new(AggregateId::from_uuid(id)),
            invoice_number,
            invoice_date,
            due_date,
            CompanyId::new(AggregateId::from_uuid(from_company)),
            CompanyId::new(AggregateId::from_uuid(to_company)),
            status_from_str(&status)?,
            items,
        ))
    }
}

async fn insert_items(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    invoice: &Invoice,
) -> Result<(), StoreError> {
    for (position, item) in invoice.items().iter().enumerate() {
        sqlx::query(
            "INSERT INTO invoice_line_items \
             (invoice_id, position, description, quantity, unit_price_cents) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*invoice.id_typed().0.as_uuid())
        .bind(position as i32)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price.cents())
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx)?;
    }
    Ok(())
}
