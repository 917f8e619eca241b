//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values, e.g. a
/// validated license key: two keys with the same text are the same key.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
