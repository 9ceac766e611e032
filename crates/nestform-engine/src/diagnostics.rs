// Diagnostics - observable side channels of a bound tree
// Reconciliation corrections and flattened validation errors

use serde::Serialize;

use crate::ReconciliationMismatch;

/// Counter corrections applied while binding a tree.
///
/// A non-empty list means some client posted counters that disagreed with
/// the rows it sent (usually a stale page); the corrected layout was used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub reconciliation_mismatches: Vec<ReconciliationMismatch>,
}

impl Diagnostics {
    pub fn push(&mut self, mismatch: ReconciliationMismatch) {
        self.reconciliation_mismatches.push(mismatch);
    }

    pub fn mismatch_count(&self) -> usize {
        self.reconciliation_mismatches.len()
    }

    pub fn is_clean(&self) -> bool {
        self.reconciliation_mismatches.is_empty()
    }
}

/// One validation error keyed by the rendered field name
/// (`buildings-0-name`), or by the formset prefix for formset-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub name: String,
    pub message: String,
}
