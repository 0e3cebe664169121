//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Primary key of a persisted backing record (e.g. a saved sale item).
///
/// Rows rendered from server state carry one; rows added in the form do not
/// until the server saves them. The key is assigned by the store, never here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn new(key: u64) -> Self {
        Self(key)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RecordId> for u64 {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    /// Accepts the decimal key as posted by a form (`"42"`); surrounding
    /// whitespace is ignored, signs and anything non-numeric are not.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DomainError::invalid_id("RecordId: empty key"));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::invalid_id(format!("RecordId: not a numeric key: {s:?}")));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| DomainError::invalid_id(format!("RecordId: {e}")))
    }
}
