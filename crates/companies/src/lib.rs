//! Company profiles: the "from"/"to" parties of letterheads and invoices.

pub mod company;

pub use company::{Address, Company, CompanyForm, CompanyId, HexColor};
