//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Computed totals,
/// per-line amounts and rendered summary text are value objects: two totals
/// with the same numbers are the same totals, no matter which recalculation
/// produced them.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: no identity (`Totals { subtotal: 10.0, .. }` equals any other
///   totals with the same fields)
/// - **Entity**: has identity (a form row stays the same row while its quantity changes)
///
/// The trait requires `Clone`, `PartialEq` and `Debug`, which is what tests
/// and log fields need.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct LineAmounts {
///     line_total: f64,
///     tax_amount: f64,
/// }
///
/// impl ValueObject for LineAmounts {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
