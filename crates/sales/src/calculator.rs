//! The sale form line-item calculator.
//!
//! One instance per form. All operations run to completion synchronously and
//! end with a recalculation pushed to the view.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use salesdesk_core::{DomainError, DomainResult};

use crate::amount::parse_amount;
use crate::config::FormConfig;
use crate::formset::{self, FormSnapshot, RenderedRow, Submission};
use crate::line_item::{Field, LineItem, Row, RowKey, RowOrigin};
use crate::row_factory::{RowFactory, RowTemplate};
use crate::totals::{Totals, compute_totals};
use crate::view::FormView;

/// A user interaction the calculator reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormEvent {
    FieldInput { row: RowKey, field: Field, value: String },
    DiscountInput { value: String },
    AddRow,
    RemoveRow { row: RowKey },
    Submit,
}

/// What `remove_row` did with the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Removal {
    /// Persisted row: flagged and hidden, still posted.
    MarkedForDeletion,
    /// New row: gone from the form, row count decremented.
    Discarded,
    /// Persisted row that was already flagged.
    AlreadyMarked,
}

/// Result of [`LineItemCalculator::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Recalculated,
    /// A non-numeric field changed; nothing to recompute.
    Stored,
    RowAdded(RowKey),
    RowRemoved(Removal),
    Submitted(Submission),
}

pub struct LineItemCalculator<V: FormView> {
    config: FormConfig,
    factory: RowFactory,
    rows: Vec<Row>,
    /// Running row count (`TOTAL_FORMS`); the index of the next new row.
    total_forms: usize,
    discount: String,
    next_key: u64,
    submitting: bool,
    totals: Totals,
    view: V,
}

impl<V: FormView> LineItemCalculator<V> {
    /// Wire up a form from its server-rendered state.
    ///
    /// Fails when the management form or the blank-row template is missing;
    /// a half-wired form is never started.
    pub fn init(config: FormConfig, snapshot: FormSnapshot, mut view: V) -> DomainResult<Self> {
        let Some(management) = snapshot.management else {
            let field = config.total_forms_field();
            error!(field = %field, "sale form initialization failed: management form missing");
            return Err(DomainError::missing_element(format!("management form ({field})")));
        };

        let Some(markup) = snapshot.template else {
            error!("sale form initialization failed: blank row template missing");
            return Err(DomainError::missing_element("blank row template"));
        };
        let template = RowTemplate::new(markup).inspect_err(|e| {
            error!(error = %e, "sale form initialization failed: unusable row template");
        })?;

        if management.total_forms != snapshot.rows.len() {
            warn!(
                declared = management.total_forms,
                rendered = snapshot.rows.len(),
                "TOTAL_FORMS disagrees with rendered rows; using rendered count"
            );
        }

        let factory = RowFactory::new(config.formset_prefix(), template);
        let mut rows = Vec::with_capacity(snapshot.rows.len());
        for (index, rendered) in snapshot.rows.into_iter().enumerate() {
            let key = RowKey(index as u64);
            let row = row_from_rendered(key, index, rendered);
            view.bind_row(key, &factory.names(index));
            if row.is_marked_for_deletion() {
                view.hide_row(key);
            }
            rows.push(row);
        }

        let mut calculator = Self {
            config,
            factory,
            total_forms: rows.len(),
            next_key: rows.len() as u64,
            rows,
            discount: snapshot.discount,
            submitting: false,
            totals: Totals::default(),
            view,
        };

        info!(
            rows = calculator.rows.len(),
            persisted = calculator.rows.iter().filter(|r| r.is_persisted()).count(),
            "sale form initialized"
        );
        calculator.recalculate();
        Ok(calculator)
    }

    /// Recompute every total from the current field text and display it.
    pub fn recalculate(&mut self) -> &Totals {
        let items: Vec<LineItem> = self.rows.iter().map(Row::line_item).collect();
        let totals = compute_totals(&items, parse_amount(&self.discount));

        for (row, amounts) in self.rows.iter().zip(&totals.lines) {
            if let Some(amounts) = amounts {
                self.view.set_line_total(row.key(), &amounts.display());
            }
        }
        self.view.set_summary(&totals.summary());

        debug!(
            lines = totals.counted_lines(),
            subtotal = totals.subtotal,
            total_tax = totals.total_tax,
            discount = totals.discount,
            grand_total = totals.grand_total,
            "sale form recalculated"
        );

        self.totals = totals;
        &self.totals
    }

    /// Append a blank row at the next index.
    pub fn add_row(&mut self) -> RowKey {
        let key = RowKey(self.next_key);
        self.next_key += 1;

        let index = self.total_forms;
        let new_row = self.factory.create(key, index);
        self.view.insert_row(key, &new_row.names, &new_row.markup);
        self.rows.push(new_row.row);
        self.total_forms += 1;

        info!(row = %key, index, total_forms = self.total_forms, "row added");
        self.recalculate();
        key
    }

    /// Remove a row: persisted rows are flagged and hidden, new rows discarded.
    ///
    /// Rows after a discarded one shift down an index so the posted indexes
    /// stay contiguous.
    pub fn remove_row(&mut self, key: RowKey) -> DomainResult<Removal> {
        let position = self.position(key)?;

        let removal = if self.rows[position].is_persisted() {
            if self.rows[position].is_marked_for_deletion() {
                Removal::AlreadyMarked
            } else {
                self.rows[position].mark_for_deletion();
                self.view.hide_row(key);
                Removal::MarkedForDeletion
            }
        } else {
            let removed = self.rows.remove(position);
            self.view.remove_row(key);
            self.total_forms = self.total_forms.saturating_sub(1);

            for row in self.rows.iter_mut().filter(|r| r.index() > removed.index()) {
                let index = row.index() - 1;
                row.set_index(index);
                self.view.reindex_row(row.key(), &self.factory.names(index));
            }
            Removal::Discarded
        };

        info!(row = %key, ?removal, total_forms = self.total_forms, "row removed");
        self.recalculate();
        Ok(removal)
    }

    /// Store new text for a row field; numeric fields trigger a recalculation.
    pub fn set_field(
        &mut self,
        key: RowKey,
        field: Field,
        value: impl Into<String>,
    ) -> DomainResult<bool> {
        let position = self.position(key)?;
        let recalc = field.affects_totals();
        self.rows[position].set_value(field, value);
        if recalc {
            self.recalculate();
        }
        Ok(recalc)
    }

    pub fn set_discount(&mut self, value: impl Into<String>) {
        self.discount = value.into();
        self.recalculate();
    }

    /// Encode the current form for posting and disable further submits.
    pub fn submit(&mut self) -> DomainResult<Submission> {
        if self.submitting {
            return Err(DomainError::invariant("form is already submitting"));
        }
        self.submitting = true;
        self.view.disable_submit();

        let submission = self.submission();
        info!(
            total_forms = self.total_forms,
            fields = submission.len(),
            "sale form submitted"
        );
        Ok(submission)
    }

    /// Current submission pairs, without submitting.
    pub fn submission(&self) -> Submission {
        formset::encode(&self.config, &self.rows, self.total_forms, &self.discount)
    }

    /// Route one interaction to the matching operation.
    pub fn dispatch(&mut self, event: FormEvent) -> DomainResult<Dispatched> {
        match event {
            FormEvent::FieldInput { row, field, value } => {
                if self.set_field(row, field, value)? {
                    Ok(Dispatched::Recalculated)
                } else {
                    Ok(Dispatched::Stored)
                }
            }
            FormEvent::DiscountInput { value } => {
                self.set_discount(value);
                Ok(Dispatched::Recalculated)
            }
            FormEvent::AddRow => Ok(Dispatched::RowAdded(self.add_row())),
            FormEvent::RemoveRow { row } => Ok(Dispatched::RowRemoved(self.remove_row(row)?)),
            FormEvent::Submit => Ok(Dispatched::Submitted(self.submit()?)),
        }
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Rows in display order, flagged ones included.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, key: RowKey) -> Option<&Row> {
        self.rows.iter().find(|r| r.key() == key)
    }

    /// Totals of the last recalculation.
    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn total_forms(&self) -> usize {
        self.total_forms
    }

    pub fn discount(&self) -> &str {
        &self.discount
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    fn position(&self, key: RowKey) -> DomainResult<usize> {
        self.rows
            .iter()
            .position(|r| r.key() == key)
            .ok_or_else(DomainError::not_found)
    }
}

fn row_from_rendered(key: RowKey, index: usize, rendered: RenderedRow) -> Row {
    let origin = match rendered.id {
        Some(id) => RowOrigin::Persisted(id),
        None => RowOrigin::New,
    };
    let mut row = Row::with_values(
        key,
        index,
        origin,
        rendered.quantity,
        rendered.unit_price,
        rendered.tax_rate,
    );
    for (name, value) in rendered.extra {
        row.set_value(Field::Other(name), value);
    }
    // Only a saved row can carry a deletion flag; a new one would just vanish.
    if rendered.delete && row.is_persisted() {
        row.mark_for_deletion();
    }
    row
}
