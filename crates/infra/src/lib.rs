//! Infrastructure layer: persistence for companies and invoices.

pub mod store;


pub use store::{CompanyStore, InMemoryStore, InvoiceStore, PostgresStore, Store, StoreError};
