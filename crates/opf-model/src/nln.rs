//! Named nonlinear-constraint blocks (row counts only).
//!
//! The model does not hold nonlinear residuals or Jacobians; the physics
//! layer builds those externally and only needs each block's row range in
//! the global nonlinear-constraint space. Registration therefore records a
//! count and nothing else, with the same uniqueness and contiguity rules as
//! the other categories.

use crate::error::ModelError;
use crate::idx::{BlockIdx, IndexLedger};

/// Counts-only registry of named nonlinear-constraint blocks.
#[derive(Debug, Clone)]
pub struct NonlinearRegistry {
    ledger: IndexLedger,
}

impl Default for NonlinearRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NonlinearRegistry {
    pub fn new() -> Self {
        Self {
            ledger: IndexLedger::new("nln"),
        }
    }

    /// Register a block of `n` nonlinear-constraint rows.
    pub fn add(&mut self, name: &str, n: usize) -> Result<BlockIdx, ModelError> {
        self.ledger.append(name, n)
    }

    /// Number of rows in a named block (0 if absent).
    pub fn n(&self, name: &str) -> usize {
        self.ledger.n(name)
    }

    /// Total number of nonlinear-constraint rows.
    pub fn total(&self) -> usize {
        self.ledger.total()
    }

    pub fn ledger(&self) -> &IndexLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idx::BlockIdx;

    #[test]
    fn test_count_bookkeeping() {
        let mut nln = NonlinearRegistry::new();
        nln.add("Pmis", 9).unwrap();
        nln.add("Qmis", 9).unwrap();

        assert_eq!(
            nln.ledger().get("Pmis").unwrap(),
            BlockIdx { start: 1, end: 9, n: 9 }
        );
        assert_eq!(
            nln.ledger().get("Qmis").unwrap(),
            BlockIdx { start: 10, end: 18, n: 9 }
        );
        assert_eq!(nln.total(), 18);
        assert_eq!(nln.n("Pmis"), 9);
        assert_eq!(nln.n("ghost"), 0);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut nln = NonlinearRegistry::new();
        nln.add("Pmis", 4).unwrap();
        assert!(nln.add("Pmis", 4).is_err());
        assert_eq!(nln.total(), 4);
    }
}
