//! # Sequence Module
//!
//! Human-readable sequential identifiers (`EMP0001`, `LV0001`).
//!
//! The counter lives in the `counters` table and is bumped inside the
//! caller's write transaction, so an aborted insert also gives its number
//! back. Committed numbers are never reused, even after the document that
//! consumed them is deleted.

use crate::HrResult;
use std::cmp::Ordering;
use crate::storage::WriteTx;

/// Minimum digits after the prefix. Longer numbers simply grow.
pub const ID_WIDTH: usize = 4;

/// The sequences the portal issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    /// User / employee ids.
    Employee,
    /// Leave application ids.
    Leave,
}

impl Sequence {
    /// Counter document name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Leave => "leave",
        }
    }

    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Employee => "EMP",
            Self::Leave => "LV",
        }
    }

    /// Render a counter value as an id.
    #[must_use]
    pub fn format(self, value: u64) -> String {
        format!("{}{:0width$}", self.prefix(), value, width = ID_WIDTH)
    }

    /// Extract the counter value from an id of this sequence.
    #[must_use]
    pub fn parse(self, id: &str) -> Option<u64> {
        let digits = id.strip_prefix(self.prefix())?;
        if digits.len() < ID_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Order two ids by counter value. Ids that do not parse sort after
    /// every well-formed one, then by their text.
    #[must_use]
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match (self.parse(a), self.parse(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    /// Reserve the next id inside `tx`.
    pub fn next(self, tx: &WriteTx) -> HrResult<String> {
        let value = tx.bump_counter(self.name())?;
        Ok(self.format(value))
    }
}
