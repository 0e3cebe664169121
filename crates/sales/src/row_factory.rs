//! Structured creation of new rows.
//!
//! The factory hands out typed row state plus field names for an index; the
//! blank-row markup fragment is only used to render the row in the view.

use salesdesk_core::{DomainError, DomainResult};

use crate::line_item::{Field, Row, RowKey};

/// Placeholder the blank-row markup uses wherever the row index goes.
pub const INDEX_TOKEN: &str = "__prefix__";

/// Field names of one formset row (`{prefix}-{index}-{field}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    base: String,
}

impl FieldNames {
    pub fn new(prefix: &str, index: usize) -> Self {
        Self {
            base: format!("{prefix}-{index}"),
        }
    }

    /// `{prefix}-{index}`
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn field(&self, field: &Field) -> String {
        format!("{}-{}", self.base, field.name())
    }

    pub fn id(&self) -> String {
        format!("{}-id", self.base)
    }

    pub fn delete(&self) -> String {
        format!("{}-DELETE", self.base)
    }
}

/// The hidden blank-row markup fragment rendered by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowTemplate {
    markup: String,
}

impl RowTemplate {
    /// Wrap a markup fragment; it must contain the index token at least once.
    pub fn new(markup: impl Into<String>) -> DomainResult<Self> {
        let markup = markup.into();
        if !markup.contains(INDEX_TOKEN) {
            return Err(DomainError::missing_element(format!(
                "row template has no {INDEX_TOKEN} token"
            )));
        }
        Ok(Self { markup })
    }

    /// Markup for the row at `index`, every token substituted.
    pub fn render(&self, index: usize) -> String {
        self.markup.replace(INDEX_TOKEN, &index.to_string())
    }
}

/// A freshly created row together with what the view needs to show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRow {
    pub row: Row,
    pub names: FieldNames,
    pub markup: String,
}

#[derive(Debug, Clone)]
pub struct RowFactory {
    prefix: String,
    template: RowTemplate,
}

impl RowFactory {
    pub fn new(prefix: impl Into<String>, template: RowTemplate) -> Self {
        Self {
            prefix: prefix.into(),
            template,
        }
    }

    pub fn names(&self, index: usize) -> FieldNames {
        FieldNames::new(&self.prefix, index)
    }

    /// Blank row for `index`, identified by `key`.
    pub fn create(&self, key: RowKey, index: usize) -> NewRow {
        NewRow {
            row: Row::blank(key, index),
            names: self.names(index),
            markup: self.template.render(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r#"<div class="item-form-card"><input name="items-__prefix__-quantity" id="id_items-__prefix__-quantity"></div>"#;

    #[test]
    fn template_substitutes_every_token() {
        let template = RowTemplate::new(MARKUP).unwrap();
        let html = template.render(3);
        assert!(!html.contains(INDEX_TOKEN));
        assert_eq!(html.matches("items-3-quantity").count(), 2);
    }

    #[test]
    fn template_without_token_is_a_structural_error() {
        let err = RowTemplate::new("<div></div>").unwrap_err();
        assert!(matches!(err, DomainError::MissingElement(_)));
    }

    #[test]
    fn field_names_follow_formset_convention() {
        let names = FieldNames::new("items", 2);
        assert_eq!(names.base(), "items-2");
        assert_eq!(names.field(&Field::UnitPrice), "items-2-unit_price");
        assert_eq!(names.id(), "items-2-id");
        assert_eq!(names.delete(), "items-2-DELETE");
    }

    #[test]
    fn factory_creates_blank_rows_at_the_given_index() {
        let factory = RowFactory::new("items", RowTemplate::new(MARKUP).unwrap());
        let first = factory.create(RowKey(10), 4);
        let second = factory.create(RowKey(11), 5);

        assert_eq!(first.row.index(), 4);
        assert_eq!(second.row.index(), 5);
        assert_ne!(first.row, second.row);
        assert_ne!(first.markup, second.markup);
        assert_eq!(first.row.line_item().line_total(), 0.0);
    }
}
