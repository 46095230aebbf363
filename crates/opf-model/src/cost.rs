//! Named generalized-cost blocks: registration, assembly and evaluation.
//!
//! Each block contributes `nw` rows to the aggregate cost parameters
//! `{N, Cw, H, dd, rh, kk, mm}` and the scalar cost at a point `x` is
//! ```text
//! r  = N*x - rh
//!
//!         /  kk(i),  r(i) < -kk(i)
//! K(i) = <   0,     -kk(i) <= r(i) <= kk(i)
//!         \ -kk(i),  r(i) > kk(i)
//!
//! rr = r + K                      deviation from the dead-zone boundary
//!
//! U(i) = 0 inside the dead zone, 1 outside
//!
//! w(i) = mm(i) * U(i) * rr(i)     if dd(i) == 1   (linear)
//!      = mm(i) * U(i) * rr(i)^2   if dd(i) == 2   (quadratic)
//!      = 0                        otherwise
//!
//! f = 1/2 * w'*H*w + Cw'*w
//! ```
//! `kk` defines a symmetric dead zone around the shifted target `rh`;
//! inside it a row contributes nothing. `H` couples rows on top of the
//! per-row piecewise response.

use sprs::{CsMat, TriMat};
use std::collections::HashMap;

use crate::error::ModelError;
use crate::idx::{BlockIdx, IndexLedger};
use crate::var::VariableRegistry;

/// Specification of a generalized-cost block to register.
///
/// `n` is the `nw x nx` row-building matrix and `cw` its `nw` linear
/// weights. Optional fields default per row to `H = 0`, `dd = 1` (linear),
/// `mm = 1`, `rh = 0`, `kk = 0`. An omitted varset list binds the block to
/// every variable block registered so far, in registration order.
#[derive(Debug, Clone)]
pub struct CostSpec {
    n: CsMat<f64>,
    cw: Vec<f64>,
    h: Option<CsMat<f64>>,
    dd: Option<Vec<f64>>,
    mm: Option<Vec<f64>>,
    rh: Option<Vec<f64>>,
    kk: Option<Vec<f64>>,
    varsets: Option<Vec<String>>,
}

impl CostSpec {
    pub fn new(n: CsMat<f64>, cw: Vec<f64>) -> Self {
        Self {
            n,
            cw,
            h: None,
            dd: None,
            mm: None,
            rh: None,
            kk: None,
            varsets: None,
        }
    }

    /// Quadratic coupling matrix (`nw x nw`).
    pub fn coupling(mut self, h: CsMat<f64>) -> Self {
        self.h = Some(h);
        self
    }

    /// Per-row mode selectors: 1 = linear, 2 = quadratic (length `nw`).
    pub fn modes(mut self, dd: Vec<f64>) -> Self {
        self.dd = Some(dd);
        self
    }

    /// Per-row scale factors (length `nw`).
    pub fn scales(mut self, mm: Vec<f64>) -> Self {
        self.mm = Some(mm);
        self
    }

    /// Per-row shift targets (length `nw`).
    pub fn shifts(mut self, rh: Vec<f64>) -> Self {
        self.rh = Some(rh);
        self
    }

    /// Per-row dead-zone half-widths (length `nw`).
    pub fn dead_zones(mut self, kk: Vec<f64>) -> Self {
        self.kk = Some(kk);
        self
    }

    /// Variable blocks whose concatenated columns define `n`'s column space.
    pub fn varsets<I, S>(mut self, varsets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.varsets = Some(varsets.into_iter().map(Into::into).collect());
        self
    }
}

/// Assembled generalized-cost parameters.
///
/// Produced by [`CostRegistry::build`] over all registered blocks, or row
/// sliced to one block by [`CostRegistry::params`]. `n` always keeps the
/// full variable-column width.
#[derive(Debug, Clone)]
pub struct CostParams {
    /// Row-building matrix, `nw x n_var`.
    pub n: CsMat<f64>,
    /// Linear weights on `w`, length `nw`.
    pub cw: Vec<f64>,
    /// Quadratic coupling, `nw x nw`, block-diagonal per cost block.
    pub h: CsMat<f64>,
    /// Mode selectors (1 linear, 2 quadratic), length `nw`.
    pub dd: Vec<f64>,
    /// Scale factors, length `nw`.
    pub mm: Vec<f64>,
    /// Shift targets, length `nw`.
    pub rh: Vec<f64>,
    /// Dead-zone half-widths, length `nw`.
    pub kk: Vec<f64>,
}

impl CostParams {
    /// Number of cost rows.
    pub fn nw(&self) -> usize {
        self.n.rows()
    }

    /// Evaluate the generalized cost at `x` (full variable vector).
    pub fn evaluate(&self, x: &[f64]) -> Result<f64, ModelError> {
        if x.len() != self.n.cols() {
            return Err(ModelError::DimensionMismatch {
                what: "x".to_string(),
                expected: self.n.cols(),
                got: x.len(),
            });
        }

        let nw = self.nw();
        let mut w = vec![0.0; nw];
        let r = {
            let mut r = matvec(&self.n, x);
            for (ri, rh) in r.iter_mut().zip(&self.rh) {
                *ri -= rh;
            }
            r
        };

        for i in 0..nw {
            let kk = self.kk[i];
            // Inside the dead zone (boundary included) the row is off.
            if -kk <= r[i] && r[i] <= kk {
                continue;
            }
            // Measure deviation from the dead-zone boundary, not from rh.
            let rr = if r[i] < -kk { r[i] + kk } else { r[i] - kk };
            let shape = if self.dd[i] == 1.0 {
                rr
            } else if self.dd[i] == 2.0 {
                rr * rr
            } else {
                0.0
            };
            w[i] = self.mm[i] * shape;
        }

        let hw = matvec(&self.h, &w);
        let quad: f64 = w.iter().zip(&hw).map(|(wi, hwi)| wi * hwi).sum();
        let lin: f64 = self.cw.iter().zip(&w).map(|(cwi, wi)| cwi * wi).sum();
        Ok(0.5 * quad + lin)
    }
}

#[derive(Debug, Clone)]
struct CostBlock {
    n: CsMat<f64>,
    cw: Vec<f64>,
    h: Option<CsMat<f64>>,
    dd: Option<Vec<f64>>,
    mm: Option<Vec<f64>>,
    rh: Option<Vec<f64>>,
    kk: Option<Vec<f64>>,
    varsets: Vec<String>,
}

/// Registry of named generalized-cost blocks.
#[derive(Debug, Clone)]
pub struct CostRegistry {
    ledger: IndexLedger,
    blocks: HashMap<String, CostBlock>,
    params: Option<CostParams>,
}

impl Default for CostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CostRegistry {
    pub fn new() -> Self {
        Self {
            ledger: IndexLedger::new("cost"),
            blocks: HashMap::new(),
            params: None,
        }
    }

    /// Register a new generalized-cost block.
    ///
    /// Validates name uniqueness, every optional field's length against
    /// `nw`, and `n`'s column count against the summed varset size (a
    /// zero-row `n` with mismatched columns is replaced by an empty
    /// placeholder instead). Violations leave the registry unmodified.
    /// Any previously assembled parameters are invalidated.
    pub fn add(
        &mut self,
        name: &str,
        spec: CostSpec,
        vars: &VariableRegistry,
    ) -> Result<BlockIdx, ModelError> {
        let (nw, nx) = (spec.n.rows(), spec.n.cols());

        let varsets = match spec.varsets {
            Some(vs) if !vs.is_empty() => vs,
            _ => vars.ledger().order().to_vec(),
        };
        for vs in &varsets {
            vars.ledger().require(vs)?;
        }
        let nv: usize = varsets.iter().map(|vs| vars.n(vs)).sum();

        let n = if nx != nv {
            if nw == 0 {
                CsMat::zero((0, nv))
            } else {
                return Err(ModelError::DimensionMismatch {
                    what: format!("columns of N for '{name}' vs varset total"),
                    expected: nv,
                    got: nx,
                });
            }
        } else {
            spec.n
        };

        check_len(spec.cw.len(), nw, "Cw")?;
        if let Some(h) = &spec.h {
            check_len(h.rows(), nw, "rows of H")?;
            check_len(h.cols(), nw, "columns of H")?;
        }
        for (v, what) in [
            (&spec.dd, "dd"),
            (&spec.mm, "mm"),
            (&spec.rh, "rh"),
            (&spec.kk, "kk"),
        ] {
            if let Some(v) = v {
                check_len(v.len(), nw, what)?;
            }
        }

        let idx = self.ledger.append(name, nw)?;
        self.blocks.insert(
            name.to_string(),
            CostBlock {
                n,
                cw: spec.cw,
                h: spec.h,
                dd: spec.dd,
                mm: spec.mm,
                rh: spec.rh,
                kk: spec.kk,
                varsets,
            },
        );
        self.params = None;
        Ok(idx)
    }

    /// Assemble the aggregate cost parameters from all registered blocks.
    ///
    /// Rebuilds from scratch every call, scattering each block's `n` into
    /// the global column space (offsets from the variable registry's final
    /// state) and its `h` onto the diagonal of the global coupling matrix.
    /// Rows of blocks that omitted an optional field keep the per-field
    /// default.
    pub fn build(&mut self, vars: &VariableRegistry) {
        let nw = self.ledger.total();
        let cols = vars.total();

        let mut n = TriMat::new((nw, cols));
        let mut h = TriMat::new((nw, nw));
        let mut cw = vec![0.0; nw];
        let mut dd = vec![1.0; nw];
        let mut mm = vec![1.0; nw];
        let mut rh = vec![0.0; nw];
        let mut kk = vec![0.0; nw];

        for (name, idx) in self.ledger.iter() {
            if idx.is_empty() {
                continue;
            }
            let block = &self.blocks[name];
            let row0 = idx.start - 1;

            let colmap = vars.column_map(&block.varsets);
            for (val, (r, c)) in block.n.iter() {
                n.add_triplet(row0 + r, colmap[c], *val);
            }

            cw[idx.range()].copy_from_slice(&block.cw);
            if let Some(hk) = &block.h {
                for (val, (r, c)) in hk.iter() {
                    h.add_triplet(row0 + r, row0 + c, *val);
                }
            }
            if let Some(v) = &block.dd {
                dd[idx.range()].copy_from_slice(v);
            }
            if let Some(v) = &block.mm {
                mm[idx.range()].copy_from_slice(v);
            }
            if let Some(v) = &block.rh {
                rh[idx.range()].copy_from_slice(v);
            }
            if let Some(v) = &block.kk {
                kk[idx.range()].copy_from_slice(v);
            }
        }

        self.params = Some(CostParams {
            n: n.to_csr(),
            cw,
            h: h.to_csr(),
            dd,
            mm,
            rh,
            kk,
        });
    }

    /// Assembled parameters for all blocks, or row-sliced to one block.
    ///
    /// The named slice keeps `n`'s full column width; `h` is reduced to the
    /// block's square diagonal sub-block (it is block-diagonal by
    /// construction). Fails with `NotAssembled` before [`build`], or
    /// `UnknownBlock` for a name that was never registered.
    ///
    /// [`build`]: CostRegistry::build
    pub fn params(&self, name: Option<&str>) -> Result<CostParams, ModelError> {
        let cp = self.params.as_ref().ok_or(ModelError::NotAssembled)?;
        match name {
            None => Ok(cp.clone()),
            Some(name) => {
                let idx = self.ledger.require(name)?;
                let range = idx.range();
                Ok(CostParams {
                    n: slice_rows(&cp.n, &range),
                    cw: cp.cw[range.clone()].to_vec(),
                    h: slice_square(&cp.h, &range),
                    dd: cp.dd[range.clone()].to_vec(),
                    mm: cp.mm[range.clone()].to_vec(),
                    rh: cp.rh[range.clone()].to_vec(),
                    kk: cp.kk[range.clone()].to_vec(),
                })
            }
        }
    }

    /// Evaluate the generalized cost at `x`, for all blocks or one block.
    pub fn evaluate(&self, x: &[f64], name: Option<&str>) -> Result<f64, ModelError> {
        match name {
            None => {
                let cp = self.params.as_ref().ok_or(ModelError::NotAssembled)?;
                cp.evaluate(x)
            }
            Some(name) => self.params(Some(name))?.evaluate(x),
        }
    }

    /// Number of cost rows in a named block (0 if absent).
    pub fn n(&self, name: &str) -> usize {
        self.ledger.n(name)
    }

    /// Total number of cost rows.
    pub fn total(&self) -> usize {
        self.ledger.total()
    }

    pub fn ledger(&self) -> &IndexLedger {
        &self.ledger
    }
}

fn check_len(got: usize, expected: usize, what: &str) -> Result<(), ModelError> {
    if got != expected {
        return Err(ModelError::DimensionMismatch {
            what: what.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

/// Sparse matrix-vector product (CSR rows).
fn matvec(m: &CsMat<f64>, x: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; m.rows()];
    for (val, (r, c)) in m.iter() {
        y[r] += val * x[c];
    }
    y
}

/// Rows `range` of `m`, keeping the full column width.
fn slice_rows(m: &CsMat<f64>, range: &std::ops::Range<usize>) -> CsMat<f64> {
    let mut t = TriMat::new((range.len(), m.cols()));
    for (val, (r, c)) in m.iter() {
        if range.contains(&r) {
            t.add_triplet(r - range.start, c, *val);
        }
    }
    t.to_csr()
}

/// Square sub-block of `m` on `range` rows and columns.
fn slice_square(m: &CsMat<f64>, range: &std::ops::Range<usize>) -> CsMat<f64> {
    let mut t = TriMat::new((range.len(), range.len()));
    for (val, (r, c)) in m.iter() {
        if range.contains(&r) && range.contains(&c) {
            t.add_triplet(r - range.start, c - range.start, *val);
        }
    }
    t.to_csr()
}
