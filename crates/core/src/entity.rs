//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// A license keeps its identity while its status changes; two licenses with
/// the same id are the same license even if one copy is stale.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
