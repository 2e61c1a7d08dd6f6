//! Aggregate statistics computed from a merged coverage tree.

use crate::line::{Line, LineKind};

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Summary counts for a merged tree. Always recomputed by a fresh traversal
/// at serialization time, never combined with another `Metrics` — combining
/// two instances directly would double-count under the exclusive mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub file_count: u64,
    pub statement_count: u64,
    pub covered_statement_count: u64,
    pub conditional_count: u64,
    pub covered_conditional_count: u64,
    pub method_count: u64,
    pub covered_method_count: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file(&mut self) {
        self.file_count += 1;
    }

    pub fn record_line(&mut self, line: &Line) {
        let covered = u64::from(line.count() > 0);
        match line.kind() {
            LineKind::Statement => {
                self.statement_count += 1;
                self.covered_statement_count += covered;
            }
            LineKind::Conditional => {
                self.conditional_count += 1;
                self.covered_conditional_count += covered;
            }
            LineKind::Method => {
                self.method_count += 1;
                self.covered_method_count += covered;
            }
        }
    }

    /// Total coverable elements across all kinds.
    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.statement_count + self.conditional_count + self.method_count
    }

    /// Elements with at least one hit.
    #[must_use]
    pub fn covered_element_count(&self) -> u64 {
        self.covered_statement_count + self.covered_conditional_count + self.covered_method_count
    }

    /// Overall percentage, 0.0 when there is nothing coverable.
    #[must_use]
    pub fn coverage_percentage(&self) -> f64 {
        100.0 * rate(self.covered_element_count(), self.element_count())
    }
}
