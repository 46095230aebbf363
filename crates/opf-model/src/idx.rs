//! Global index bookkeeping for named blocks.
//!
//! Each category of the model (variables, linear constraints, nonlinear
//! constraints, costs) assigns every named block a contiguous range in its
//! global vector or row space:
//! ```text
//! block k:   start_k = end_{k-1} + 1     (1 for the first block)
//!            end_k   = start_k + n_k - 1
//! total    = end of the last registered block
//! ```
//! Indices are 1-based inclusive; [`BlockIdx::range`] converts to the
//! 0-based half-open range used for slicing.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use crate::error::ModelError;

/// Position of one named block within its category's global space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockIdx {
    /// 1-based starting index.
    pub start: usize,
    /// 1-based inclusive ending index. `end < start` for empty blocks.
    pub end: usize,
    /// Number of elements in the block.
    pub n: usize,
}

impl BlockIdx {
    /// 0-based half-open range for slicing global vectors and matrix rows.
    pub fn range(&self) -> Range<usize> {
        self.start - 1..self.end
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

/// Insertion-ordered ledger of named blocks and their index ranges.
///
/// One ledger per category. Registration appends at the end of the global
/// space; nothing is ever removed, so assigned ranges stay valid for the
/// lifetime of the model.
#[derive(Debug, Clone)]
pub struct IndexLedger {
    category: &'static str,
    order: Vec<String>,
    idx: HashMap<String, BlockIdx>,
    total: usize,
}

impl IndexLedger {
    pub fn new(category: &'static str) -> Self {
        Self {
            category,
            order: Vec::new(),
            idx: HashMap::new(),
            total: 0,
        }
    }

    /// Register a new block of `n` elements at the end of the global space.
    ///
    /// Fails with `DuplicateName` if `name` is already present, leaving the
    /// ledger unchanged.
    pub fn append(&mut self, name: &str, n: usize) -> Result<BlockIdx, ModelError> {
        if self.idx.contains_key(name) {
            return Err(ModelError::DuplicateName {
                category: self.category,
                name: name.to_string(),
            });
        }

        let idx = BlockIdx {
            start: self.total + 1,
            end: self.total + n,
            n,
        };
        self.total = idx.end;
        self.order.push(name.to_string());
        self.idx.insert(name.to_string(), idx);
        Ok(idx)
    }

    /// Index range of a named block, if registered.
    pub fn get(&self, name: &str) -> Option<BlockIdx> {
        self.idx.get(name).copied()
    }

    /// Index range of a named block, or `UnknownBlock` if absent.
    pub fn require(&self, name: &str) -> Result<BlockIdx, ModelError> {
        self.get(name).ok_or_else(|| ModelError::UnknownBlock {
            category: self.category,
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.idx.contains_key(name)
    }

    /// Size of a named block, or 0 if it was never registered.
    pub fn n(&self, name: &str) -> usize {
        self.idx.get(name).map_or(0, |b| b.n)
    }

    /// Total number of elements across all blocks.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of registered blocks.
    pub fn n_sets(&self) -> usize {
        self.order.len()
    }

    /// Block names in insertion order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Iterate `(name, idx)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, BlockIdx)> {
        self.order.iter().map(|name| (name.as_str(), self.idx[name]))
    }

    /// Copy of the name -> index map, for index snapshots.
    pub fn snapshot(&self) -> HashMap<String, BlockIdx> {
        self.idx.clone()
    }

    /// Write a summary table of the ledger, one row per block.
    pub(crate) fn write_summary(&self, f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
        if self.order.is_empty() {
            return writeln!(f, "{title}  :  <none>");
        }

        writeln!(
            f,
            "{:<22} {:>12} {:>8} {:>8} {:>8}",
            title, "name", "start", "end", "N"
        )?;
        for (k, (name, idx)) in self.iter().enumerate() {
            writeln!(
                f,
                "{:>15}: {:>18} {:>8} {:>8} {:>8}",
                k, name, idx.start, idx.end, idx.n
            )?;
        }
        writeln!(f, "{:>15} sets, {} total", self.n_sets(), self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_ranges() {
        let mut ledger = IndexLedger::new("var");
        let a = ledger.append("a", 2).unwrap();
        let b = ledger.append("b", 3).unwrap();

        assert_eq!(a, BlockIdx { start: 1, end: 2, n: 2 });
        assert_eq!(b, BlockIdx { start: 3, end: 5, n: 3 });
        assert_eq!(b.start, a.end + 1);
        assert_eq!(ledger.total(), 5);
        assert_eq!(ledger.n_sets(), 2);
        assert_eq!(ledger.order(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_duplicate_name_leaves_ledger_unchanged() {
        let mut ledger = IndexLedger::new("var");
        ledger.append("a", 2).unwrap();
        let before = ledger.snapshot();
        let total = ledger.total();

        let err = ledger.append("a", 4).unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateName {
                category: "var",
                name: "a".to_string()
            }
        );
        assert_eq!(ledger.snapshot(), before);
        assert_eq!(ledger.total(), total);
        assert_eq!(ledger.n_sets(), 1);
    }

    #[test]
    fn test_empty_block() {
        let mut ledger = IndexLedger::new("lin");
        ledger.append("a", 3).unwrap();
        let z = ledger.append("z", 0).unwrap();

        assert!(z.is_empty());
        assert_eq!(z.range(), 3..3);
        assert_eq!(ledger.total(), 3);

        // Blocks added after an empty one continue from the same offset
        let b = ledger.append("b", 2).unwrap();
        assert_eq!(b, BlockIdx { start: 4, end: 5, n: 2 });
    }

    #[test]
    fn test_absent_lookups_are_nonfatal() {
        let ledger = IndexLedger::new("var");
        assert_eq!(ledger.n("missing"), 0);
        assert!(ledger.get("missing").is_none());
        assert!(ledger.require("missing").is_err());
    }

    #[test]
    fn test_range_is_zero_based() {
        let mut ledger = IndexLedger::new("var");
        ledger.append("a", 2).unwrap();
        let b = ledger.append("b", 3).unwrap();
        assert_eq!(b.range(), 2..5);
    }
}
