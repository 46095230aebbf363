//! Named linear-constraint blocks and their global assembly.
//!
//! Each block declares `l <= A_local * x_vs <= u` where `x_vs` is the
//! concatenation of the variable blocks in its varset list. This lets a
//! block define its matrix only over the variables it touches; assembly
//! scatters the local columns to their global positions:
//! ```text
//! A[rows(block), cols(vs)] = A_local        for each vs in varsets
//! A[rows(block), elsewhere] = 0
//! ```
//! Column offsets are resolved from the variable registry's state at
//! assembly time, while the varset list itself is snapshotted at
//! registration time.

use sprs::{CsMat, TriMat};
use std::collections::HashMap;

use crate::error::ModelError;
use crate::idx::{BlockIdx, IndexLedger};
use crate::var::VariableRegistry;

/// Specification of a linear-constraint block to register.
///
/// Omitted bounds default to `l = -inf`, `u = +inf` (an empty vector counts
/// as omitted). An omitted varset list binds the block to every variable
/// block registered so far, in registration order.
#[derive(Debug, Clone)]
pub struct LinConSpec {
    a: CsMat<f64>,
    l: Option<Vec<f64>>,
    u: Option<Vec<f64>>,
    varsets: Option<Vec<String>>,
}

impl LinConSpec {
    pub fn new(a: CsMat<f64>) -> Self {
        Self {
            a,
            l: None,
            u: None,
            varsets: None,
        }
    }

    /// Lower bounds (length = rows of `a`).
    pub fn lower(mut self, l: Vec<f64>) -> Self {
        self.l = Some(l);
        self
    }

    /// Upper bounds (length = rows of `a`).
    pub fn upper(mut self, u: Vec<f64>) -> Self {
        self.u = Some(u);
        self
    }

    /// Lower and upper bounds together.
    pub fn bounds(self, l: Vec<f64>, u: Vec<f64>) -> Self {
        self.lower(l).upper(u)
    }

    /// Variable blocks whose concatenated columns define `a`'s column space.
    pub fn varsets<I, S>(mut self, varsets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.varsets = Some(varsets.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone)]
struct LinBlock {
    a: CsMat<f64>,
    l: Vec<f64>,
    u: Vec<f64>,
    varsets: Vec<String>,
}

/// Registry of named linear-constraint blocks.
#[derive(Debug, Clone)]
pub struct LinearConstraintRegistry {
    ledger: IndexLedger,
    blocks: HashMap<String, LinBlock>,
}

impl Default for LinearConstraintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearConstraintRegistry {
    pub fn new() -> Self {
        Self {
            ledger: IndexLedger::new("lin"),
            blocks: HashMap::new(),
        }
    }

    /// Register a new linear-constraint block.
    ///
    /// Validates name uniqueness, bound lengths against the row count, and
    /// the local column count against the summed size of the varsets. Any
    /// violation leaves the registry unmodified.
    pub fn add(
        &mut self,
        name: &str,
        spec: LinConSpec,
        vars: &VariableRegistry,
    ) -> Result<BlockIdx, ModelError> {
        let (n, m) = (spec.a.rows(), spec.a.cols());

        let l = resolve_bound(spec.l, n, f64::NEG_INFINITY, "l")?;
        let u = resolve_bound(spec.u, n, f64::INFINITY, "u")?;

        // Default varsets: snapshot of the variable order as of this add.
        let varsets = match spec.varsets {
            Some(vs) if !vs.is_empty() => vs,
            _ => vars.ledger().order().to_vec(),
        };
        for vs in &varsets {
            vars.ledger().require(vs)?;
        }
        let nv: usize = varsets.iter().map(|vs| vars.n(vs)).sum();
        if m != nv {
            return Err(ModelError::DimensionMismatch {
                what: format!("columns of A for '{name}' vs varset total"),
                expected: nv,
                got: m,
            });
        }

        let idx = self.ledger.append(name, n)?;
        self.blocks.insert(
            name.to_string(),
            LinBlock {
                a: spec.a,
                l,
                u,
                varsets,
            },
        );
        Ok(idx)
    }

    /// Assemble the full constraint set `l <= A * x <= u`.
    ///
    /// `A` is total-rows x total-variables; rows not covered by any block
    /// cannot exist, but columns for variables a block never references stay
    /// zero in that block's rows. Bounds are initialized to -inf/+inf and
    /// overwritten per block.
    pub fn assemble(&self, vars: &VariableRegistry) -> (CsMat<f64>, Vec<f64>, Vec<f64>) {
        let rows = self.ledger.total();
        let cols = vars.total();

        let mut a = TriMat::new((rows, cols));
        let mut l = vec![f64::NEG_INFINITY; rows];
        let mut u = vec![f64::INFINITY; rows];

        for (name, idx) in self.ledger.iter() {
            if idx.is_empty() {
                continue;
            }
            let block = &self.blocks[name];
            let row0 = idx.start - 1;

            let colmap = vars.column_map(&block.varsets);
            for (val, (r, c)) in block.a.iter() {
                a.add_triplet(row0 + r, colmap[c], *val);
            }

            l[idx.range()].copy_from_slice(&block.l);
            u[idx.range()].copy_from_slice(&block.u);
        }

        (a.to_csr(), l, u)
    }

    /// Number of rows in a named block (0 if absent).
    pub fn n(&self, name: &str) -> usize {
        self.ledger.n(name)
    }

    /// Total number of linear-constraint rows.
    pub fn total(&self) -> usize {
        self.ledger.total()
    }

    pub fn ledger(&self) -> &IndexLedger {
        &self.ledger
    }
}

fn resolve_bound(
    v: Option<Vec<f64>>,
    n: usize,
    default: f64,
    what: &str,
) -> Result<Vec<f64>, ModelError> {
    match v {
        Some(v) if !v.is_empty() => {
            if v.len() != n {
                return Err(ModelError::DimensionMismatch {
                    what: what.to_string(),
                    expected: n,
                    got: v.len(),
                });
            }
            Ok(v)
        }
        _ => Ok(vec![default; n]),
    }
}
