//! Form configuration.

use serde::{Deserialize, Serialize};

use salesdesk_core::{DomainError, DomainResult};

/// Env var overriding the formset prefix.
pub const FORMSET_PREFIX_ENV: &str = "SALESDESK_FORMSET_PREFIX";

/// Prefix the sale form uses for its item rows (`items-0-quantity`).
pub const DEFAULT_FORMSET_PREFIX: &str = "items";

/// Name of the sale-level discount input.
pub const DISCOUNT_FIELD: &str = "discount_amount";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormConfig {
    formset_prefix: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            formset_prefix: DEFAULT_FORMSET_PREFIX.to_string(),
        }
    }
}

impl FormConfig {
    pub fn new(formset_prefix: impl Into<String>) -> DomainResult<Self> {
        let formset_prefix = formset_prefix.into();
        validate_prefix(&formset_prefix)?;
        Ok(Self { formset_prefix })
    }

    /// Build from process environment, falling back to defaults for unset vars.
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(FORMSET_PREFIX_ENV) {
            Some(prefix) => Self::new(prefix.trim()),
            None => Ok(Self::default()),
        }
    }

    pub fn formset_prefix(&self) -> &str {
        &self.formset_prefix
    }

    /// `{prefix}-TOTAL_FORMS`
    pub fn total_forms_field(&self) -> String {
        format!("{}-TOTAL_FORMS", self.formset_prefix)
    }

    /// `{prefix}-INITIAL_FORMS`
    pub fn initial_forms_field(&self) -> String {
        format!("{}-INITIAL_FORMS", self.formset_prefix)
    }
}

fn validate_prefix(prefix: &str) -> DomainResult<()> {
    if prefix.is_empty() {
        return Err(DomainError::validation("formset prefix must not be empty"));
    }
    // Field names are split on '-'; a dash in the prefix makes them ambiguous.
    if prefix.contains('-') || prefix.chars().any(char::is_whitespace) {
        return Err(DomainError::validation(format!(
            "formset prefix {prefix:?} must not contain '-' or whitespace"
        )));
    }
    Ok(())
}
