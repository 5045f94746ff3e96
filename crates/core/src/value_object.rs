//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Implementors must be immutable after construction and compare by value
/// (`Money`, `Address`, template/paper-size selections).
pub trait ValueObject: Clone + PartialEq {}
