//! Invoicing: the invoice aggregate and the form-state workflow that builds it.

pub mod draft;
pub mod invoice;

pub use draft::{InvoiceDraft, LineItemInput};
pub use invoice::{Invoice, InvoiceId, InvoiceStatus, LineItem};
