//! The seam between the calculator and whatever displays the form.

use std::collections::BTreeMap;

use crate::line_item::RowKey;
use crate::row_factory::FieldNames;
use crate::totals::SummaryText;

/// Display side of the form (a document in the browser, a recorder in tests).
///
/// The calculator only ever writes through this trait; it never reads back.
pub trait FormView {
    /// A row that was already rendered by the server.
    fn bind_row(&mut self, key: RowKey, names: &FieldNames);

    /// A new row to append, with its rendered markup.
    fn insert_row(&mut self, key: RowKey, names: &FieldNames, markup: &str);

    /// A row's formset index changed; its inputs must be renamed.
    fn reindex_row(&mut self, key: RowKey, names: &FieldNames);

    /// Keep the row (its inputs still post) but stop showing it.
    fn hide_row(&mut self, key: RowKey);

    /// Drop the row and its inputs entirely.
    fn remove_row(&mut self, key: RowKey);

    fn set_line_total(&mut self, key: RowKey, text: &str);

    fn set_summary(&mut self, summary: &SummaryText);

    fn disable_submit(&mut self) {}
}

/// What a [`RecordingView`] knows about one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    pub base_name: String,
    pub markup: Option<String>,
    pub hidden: bool,
    pub line_total: Option<String>,
}

/// In-memory [`FormView`] keeping the latest displayed state.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    rows: BTreeMap<RowKey, ViewRow>,
    order: Vec<RowKey>,
    summary: Option<SummaryText>,
    summary_updates: usize,
    submit_disabled: bool,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, key: RowKey) -> Option<&ViewRow> {
        self.rows.get(&key)
    }

    /// Rows still in the document, in display order (hidden ones included).
    pub fn rows(&self) -> impl Iterator<Item = (RowKey, &ViewRow)> {
        self.order
            .iter()
            .filter_map(|key| self.rows.get(key).map(|row| (*key, row)))
    }

    pub fn visible_rows(&self) -> usize {
        self.rows.values().filter(|row| !row.hidden).count()
    }

    pub fn summary(&self) -> Option<&SummaryText> {
        self.summary.as_ref()
    }

    /// How many times the summary was written.
    pub fn summary_updates(&self) -> usize {
        self.summary_updates
    }

    pub fn submit_disabled(&self) -> bool {
        self.submit_disabled
    }

    fn attach(&mut self, key: RowKey, names: &FieldNames, markup: Option<String>) {
        self.rows.insert(
            key,
            ViewRow {
                base_name: names.base().to_string(),
                markup,
                hidden: false,
                line_total: None,
            },
        );
        self.order.push(key);
    }
}

impl FormView for RecordingView {
    fn bind_row(&mut self, key: RowKey, names: &FieldNames) {
        self.attach(key, names, None);
    }

    fn insert_row(&mut self, key: RowKey, names: &FieldNames, markup: &str) {
        self.attach(key, names, Some(markup.to_string()));
    }

    fn reindex_row(&mut self, key: RowKey, names: &FieldNames) {
        if let Some(row) = self.rows.get_mut(&key) {
            row.base_name = names.base().to_string();
        }
    }

    fn hide_row(&mut self, key: RowKey) {
        if let Some(row) = self.rows.get_mut(&key) {
            row.hidden = true;
        }
    }

    fn remove_row(&mut self, key: RowKey) {
        self.rows.remove(&key);
        self.order.retain(|k| *k != key);
    }

    fn set_line_total(&mut self, key: RowKey, text: &str) {
        if let Some(row) = self.rows.get_mut(&key) {
            row.line_total = Some(text.to_string());
        }
    }

    fn set_summary(&mut self, summary: &SummaryText) {
        self.summary = Some(summary.clone());
        self.summary_updates += 1;
    }

    fn disable_submit(&mut self) {
        self.submit_disabled = true;
    }
}
