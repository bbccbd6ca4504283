//! Finalized object-table entries
//!
//! After phase 2 each class carries a compacted table of the constant
//! objects its emitted code references, ordered by the deterministic
//! frequency sort. Entries whose every use was eliminated are replaced by
//! the dead markers so surviving indices stay stable.

use crate::klass::KlassId;

/// One slot of a finalized per-class object table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuiteObject {
    Str(String),
    Class(KlassId),
    IntArray(Vec<i32>),
    /// A string constant whose every use was eliminated.
    DeadString,
    /// A class reference whose every use was eliminated.
    DeadClass,
}

impl SuiteObject {
    /// True for the dead markers.
    pub fn is_dead(&self) -> bool {
        matches!(self, SuiteObject::DeadString | SuiteObject::DeadClass)
    }
}
