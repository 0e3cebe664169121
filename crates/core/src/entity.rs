//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// A form row is an entity: its field values change on every keystroke and its
/// formset index may shift, but the handle that identifies it does not.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
