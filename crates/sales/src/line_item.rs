//! Line items: the typed row state behind each rendered form row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use salesdesk_core::{Entity, RecordId, ValueObject};

use crate::amount::{parse_amount, round2};

/// Stable handle of a row inside one form instance.
///
/// Unlike the formset index, a key never changes while the row exists and is
/// never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(pub u64);

impl core::fmt::Display for RowKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

/// Where a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum RowOrigin {
    /// Rendered from a saved record; removal only flags it.
    Persisted(RecordId),
    /// Added in this form session; removal discards it.
    New,
}

/// An editable field of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Quantity,
    UnitPrice,
    TaxRate,
    /// Any other input of the row (e.g. the product select); never affects totals.
    Other(String),
}

impl Field {
    /// Map a formset field suffix (`quantity`, `unit_price`, ...) to a field.
    pub fn from_name(name: &str) -> Self {
        match name {
            "quantity" => Field::Quantity,
            "unit_price" => Field::UnitPrice,
            "tax_rate" => Field::TaxRate,
            other => Field::Other(other.to_string()),
        }
    }

    /// Formset field suffix.
    pub fn name(&self) -> &str {
        match self {
            Field::Quantity => "quantity",
            Field::UnitPrice => "unit_price",
            Field::TaxRate => "tax_rate",
            Field::Other(name) => name,
        }
    }

    /// Whether an input on this field triggers a recalculation.
    pub fn affects_totals(&self) -> bool {
        !matches!(self, Field::Other(_))
    }
}

/// Numeric view of a row, as used by the totals computation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LineItem {
    pub quantity: f64,
    pub unit_price: f64,
    pub tax_rate_percent: f64,
    pub marked_for_deletion: bool,
}

impl ValueObject for LineItem {}

impl LineItem {
    pub fn new(quantity: f64, unit_price: f64, tax_rate_percent: f64) -> Self {
        Self {
            quantity,
            unit_price,
            tax_rate_percent,
            marked_for_deletion: false,
        }
    }

    /// `round2(quantity × unit_price)`.
    pub fn line_total(&self) -> f64 {
        round2(self.quantity * self.unit_price)
    }

    /// `round2(line_total × (rate / 100))`, computed from the rounded line total.
    ///
    /// The rate is divided first. `line_total × rate / 100` can land one ulp
    /// away at a rounding tie, and persisted totals were produced this way.
    pub fn tax_amount(&self) -> f64 {
        round2(self.line_total() * (self.tax_rate_percent / 100.0))
    }
}

/// A form row: raw field text exactly as typed, plus identity and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    key: RowKey,
    index: usize,
    origin: RowOrigin,
    quantity: String,
    unit_price: String,
    tax_rate: String,
    extra: BTreeMap<String, String>,
    marked_for_deletion: bool,
}

impl Row {
    /// A blank row: empty quantity and price, zero tax rate.
    pub fn blank(key: RowKey, index: usize) -> Self {
        Self {
            key,
            index,
            origin: RowOrigin::New,
            quantity: String::new(),
            unit_price: String::new(),
            tax_rate: "0".to_string(),
            extra: BTreeMap::new(),
            marked_for_deletion: false,
        }
    }

    /// A row with the given origin and field text.
    pub fn with_values(
        key: RowKey,
        index: usize,
        origin: RowOrigin,
        quantity: impl Into<String>,
        unit_price: impl Into<String>,
        tax_rate: impl Into<String>,
    ) -> Self {
        Self {
            key,
            index,
            origin,
            quantity: quantity.into(),
            unit_price: unit_price.into(),
            tax_rate: tax_rate.into(),
            extra: BTreeMap::new(),
            marked_for_deletion: false,
        }
    }

    pub fn key(&self) -> RowKey {
        self.key
    }

    /// Formset index (`items-{index}-...`).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn origin(&self) -> RowOrigin {
        self.origin
    }

    pub fn record_id(&self) -> Option<RecordId> {
        match self.origin {
            RowOrigin::Persisted(id) => Some(id),
            RowOrigin::New => None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self.origin, RowOrigin::Persisted(_))
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }

    /// Pass-through fields other than the three numeric ones.
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Raw text of a field; unset pass-through fields read as empty.
    pub fn value(&self, field: &Field) -> &str {
        match field {
            Field::Quantity => &self.quantity,
            Field::UnitPrice => &self.unit_price,
            Field::TaxRate => &self.tax_rate,
            Field::Other(name) => self.extra.get(name).map(String::as_str).unwrap_or(""),
        }
    }

    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Quantity => self.quantity = value,
            Field::UnitPrice => self.unit_price = value,
            Field::TaxRate => self.tax_rate = value,
            Field::Other(name) => {
                self.extra.insert(name, value);
            }
        }
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn mark_for_deletion(&mut self) {
        self.marked_for_deletion = true;
    }

    /// Parse the current field text into numbers (unusable text reads as zero).
    pub fn line_item(&self) -> LineItem {
        LineItem {
            quantity: parse_amount(&self.quantity),
            unit_price: parse_amount(&self.unit_price),
            tax_rate_percent: parse_amount(&self.tax_rate),
            marked_for_deletion: self.marked_for_deletion,
        }
    }
}

impl Entity for Row {
    type Id = RowKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}
