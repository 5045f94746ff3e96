//! `metasoft-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod document;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use document::{PaperSize, Template};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldErrors};
pub use id::{AggregateId, UserId};
pub use money::Money;
pub use value_object::ValueObject;
