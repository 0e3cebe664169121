//! Sale form line-item engine.
//!
//! This crate keeps the totals of a sale form consistent with its rows:
//! per-line rounding, tax, a sale-level discount, dynamic add/remove of rows,
//! and the formset encoding the form posts. The numeric core is a pure
//! function ([`compute_totals`]); [`LineItemCalculator`] wraps it with row
//! bookkeeping and pushes results through a [`FormView`].
//!
//! [`reconcile`] holds the server-side decimal arithmetic applied when the
//! posted sale is saved.

pub mod amount;
pub mod calculator;
pub mod config;
pub mod formset;
pub mod line_item;
pub mod reconcile;
pub mod row_factory;
pub mod totals;
pub mod view;

pub use amount::{CURRENCY_LABEL, format_amount, format_currency, parse_amount, round2};
pub use calculator::{Dispatched, FormEvent, LineItemCalculator, Removal};
pub use config::FormConfig;
pub use formset::{FormSnapshot, ManagementForm, RenderedRow, Submission};
pub use line_item::{Field, LineItem, Row, RowKey, RowOrigin};
pub use reconcile::{Discrepancy, Payment, PaymentMethod, PaymentStatus, SaleItemAmounts, SaleTotals};
pub use row_factory::{FieldNames, NewRow, RowFactory, RowTemplate};
pub use totals::{LineAmounts, SummaryText, Totals, compute_totals};
pub use view::{FormView, RecordingView};
