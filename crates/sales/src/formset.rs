//! Formset wire format: what the page renders in and what the form posts out.
//!
//! Rows are posted as indexed fields (`items-0-quantity`) next to two
//! management fields (`items-TOTAL_FORMS`, `items-INITIAL_FORMS`). Values are
//! carried as raw text, exactly as they sit in the inputs.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use salesdesk_core::{DomainError, DomainResult, RecordId};

use crate::config::{DISCOUNT_FIELD, FormConfig};
use crate::line_item::{Field, Row};
use crate::row_factory::FieldNames;

/// Upper bound on `TOTAL_FORMS` accepted from a post.
pub const MAX_FORMS: usize = 1000;

/// Row-count fields of the formset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementForm {
    pub total_forms: usize,
    pub initial_forms: usize,
}

/// One row as rendered by (or posted to) the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderedRow {
    /// Backing record; `None` for rows that were never saved.
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit_price: String,
    #[serde(default)]
    pub tax_rate: String,
    /// Other inputs of the row (e.g. `item`), passed through untouched.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
    #[serde(default)]
    pub delete: bool,
}

impl RenderedRow {
    /// A row added on the page and never filled in: no backing record, no
    /// typed values, and the blank template's tax rate. Such a row is not
    /// part of the sale.
    pub fn is_untouched_extra(&self) -> bool {
        self.id.is_none()
            && self.quantity.trim().is_empty()
            && self.unit_price.trim().is_empty()
            && matches!(self.tax_rate.trim(), "" | "0")
            && self.extra.values().all(|v| v.trim().is_empty())
    }
}

/// Everything the form needs at page load, or everything a post carried.
///
/// `management` and `template` are optional because a broken page may lack
/// them; the calculator refuses to start in that case.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormSnapshot {
    #[serde(default)]
    pub management: Option<ManagementForm>,
    #[serde(default)]
    pub rows: Vec<RenderedRow>,
    #[serde(default)]
    pub discount: String,
    #[serde(default)]
    pub template: Option<String>,
}

/// Ordered `(name, value)` pairs handed to the page's submit mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission {
    fields: Vec<(String, String)>,
}

impl Submission {
    pub fn from_pairs(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Value of the last field called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.fields
    }
}

/// Encode rows (in display order) plus the discount into submission pairs.
///
/// `total_forms` is the running row count kept by the calculator; rows marked
/// for deletion stay in the output with `DELETE=on`.
pub fn encode(
    config: &FormConfig,
    rows: &[Row],
    total_forms: usize,
    discount: &str,
) -> Submission {
    let mut out = Submission::default();
    let initial_forms = rows.iter().filter(|r| r.is_persisted()).count();

    out.push(config.total_forms_field(), total_forms.to_string());
    out.push(config.initial_forms_field(), initial_forms.to_string());

    for row in rows {
        let names = FieldNames::new(config.formset_prefix(), row.index());
        if let Some(id) = row.record_id() {
            out.push(names.id(), id.to_string());
        }
        for (name, value) in row.extra() {
            out.push(names.field(&Field::Other(name.clone())), value.clone());
        }
        for field in [Field::Quantity, Field::UnitPrice, Field::TaxRate] {
            out.push(names.field(&field), row.value(&field));
        }
        if row.is_marked_for_deletion() {
            out.push(names.delete(), "on");
        }
    }

    out.push(DISCOUNT_FIELD, discount);
    out
}

/// Decode posted pairs back into a snapshot.
///
/// Only indexes below `TOTAL_FORMS` are read; later duplicates of a name win.
/// A `TOTAL_FORMS` above [`MAX_FORMS`], or above the number of rows that
/// actually posted fields, is rejected as a tampered management form.
/// The returned snapshot has no template (posts never carry one).
pub fn decode<'a, I>(config: &FormConfig, pairs: I) -> DomainResult<FormSnapshot>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let fields: HashMap<&str, &str> = pairs.into_iter().collect();

    let total_forms = management_count(&fields, &config.total_forms_field())?;
    let initial_forms = management_count(&fields, &config.initial_forms_field())?;

    let total_name = config.total_forms_field();
    if total_forms > MAX_FORMS {
        return Err(DomainError::validation(format!(
            "{total_name}: {total_forms} exceeds the maximum of {MAX_FORMS} forms"
        )));
    }
    let posted = posted_row_count(&fields, config.formset_prefix());
    if total_forms > posted {
        return Err(DomainError::validation(format!(
            "{total_name}: {total_forms} forms declared but only {posted} posted"
        )));
    }

    let rows = (0..total_forms)
        .map(|index| decode_row(&fields, &FieldNames::new(config.formset_prefix(), index)))
        .collect::<DomainResult<Vec<_>>>()?;

    Ok(FormSnapshot {
        management: Some(ManagementForm {
            total_forms,
            initial_forms,
        }),
        rows,
        discount: fields.get(DISCOUNT_FIELD).copied().unwrap_or_default().to_string(),
        template: None,
    })
}

fn management_count(fields: &HashMap<&str, &str>, name: &str) -> DomainResult<usize> {
    let raw = fields.get(name).ok_or_else(|| {
        DomainError::validation(format!(
            "management form data is missing or has been tampered with ({name})"
        ))
    })?;
    raw.trim()
        .parse::<usize>()
        .map_err(|e| DomainError::validation(format!("{name}: {e}")))
}

/// One past the highest row index that has at least one posted field.
fn posted_row_count(fields: &HashMap<&str, &str>, prefix: &str) -> usize {
    fields
        .keys()
        .filter_map(|name| {
            let rest = name.strip_prefix(prefix)?.strip_prefix('-')?;
            let (index, _) = rest.split_once('-')?;
            index.parse::<usize>().ok()
        })
        .filter(|index| *index < MAX_FORMS)
        .max()
        .map_or(0, |index| index + 1)
}

fn decode_row(fields: &HashMap<&str, &str>, names: &FieldNames) -> DomainResult<RenderedRow> {
    let mut row = RenderedRow::default();
    let row_prefix = format!("{}-", names.base());

    for (name, value) in fields {
        let Some(suffix) = name.strip_prefix(row_prefix.as_str()) else {
            continue;
        };
        match suffix {
            "id" => {
                if !value.trim().is_empty() {
                    let id = value
                        .parse::<RecordId>()
                        .map_err(|e| DomainError::invalid_id(format!("{name}: {e}")))?;
                    row.id = Some(id);
                }
            }
            "DELETE" => row.delete = is_checked(value),
            "quantity" => row.quantity = value.to_string(),
            "unit_price" => row.unit_price = value.to_string(),
            "tax_rate" => row.tax_rate = value.to_string(),
            other => {
                row.extra.insert(other.to_string(), value.to_string());
            }
        }
    }

    Ok(row)
}

/// Checkbox semantics: present and not an explicit "false" value.
fn is_checked(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "false" | "0" | "off"
    )
}
