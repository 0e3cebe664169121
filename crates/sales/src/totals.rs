//! Pure totals computation and its display rendering.

use serde::{Deserialize, Serialize};

use salesdesk_core::ValueObject;

use crate::amount::{format_amount, format_currency, round2};
use crate::line_item::LineItem;

/// Rounded amounts of one counted line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub line_total: f64,
    pub tax_amount: f64,
}

impl ValueObject for LineAmounts {}

/// Result of one recalculation.
///
/// `subtotal` and `total_tax` are plain sums of per-line rounded values and
/// are not rounded again; `grand_total` is rounded once at the end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// One entry per input item, in input order; `None` for items marked for deletion.
    pub lines: Vec<Option<LineAmounts>>,
    pub subtotal: f64,
    pub total_tax: f64,
    pub discount: f64,
    pub grand_total: f64,
}

impl ValueObject for Totals {}

impl Totals {
    /// Number of lines that contributed to the aggregates.
    pub fn counted_lines(&self) -> usize {
        self.lines.iter().filter(|l| l.is_some()).count()
    }

    /// Display text for the four aggregate fields.
    pub fn summary(&self) -> SummaryText {
        SummaryText {
            subtotal: format_amount(self.subtotal),
            tax: format_amount(self.total_tax),
            discount: format_amount(self.discount),
            total: format_amount(self.grand_total),
        }
    }
}

/// Rendered aggregate fields (no currency label).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryText {
    pub subtotal: String,
    pub tax: String,
    pub discount: String,
    pub total: String,
}

impl ValueObject for SummaryText {}

impl LineAmounts {
    /// Per-line display text (`Tsh 3,000.00`).
    pub fn display(&self) -> String {
        format_currency(self.line_total)
    }
}

/// Compute totals for `items` with a discount applied once to the aggregate.
///
/// Items marked for deletion are skipped. The grand total is not clamped and
/// goes negative when the discount exceeds subtotal plus tax.
pub fn compute_totals<'a, I>(items: I, discount: f64) -> Totals
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let mut lines = Vec::new();
    let mut subtotal = 0.0;
    let mut total_tax = 0.0;

    for item in items {
        if item.marked_for_deletion {
            lines.push(None);
            continue;
        }

        let line_total = item.line_total();
        let tax_amount = item.tax_amount();
        subtotal += line_total;
        total_tax += tax_amount;
        lines.push(Some(LineAmounts {
            line_total,
            tax_amount,
        }));
    }

    Totals {
        lines,
        subtotal,
        total_tax,
        discount,
        grand_total: round2(subtotal + total_tax - discount),
    }
}
