//! Named optimization-variable blocks.
//!
//! Each block carries an initial value and lower/upper bound vector.
//! Concatenated in registration order they form the full optimization
//! vector `x0` and its bounds `(xl, xu)` handed to the solver.

use std::collections::HashMap;

use crate::error::ModelError;
use crate::idx::{BlockIdx, IndexLedger};

/// Specification of a variable block to register.
///
/// Omitted vectors default to `v0 = 0`, `vl = -inf`, `vu = +inf`. An empty
/// vector counts as omitted.
#[derive(Debug, Clone, Default)]
pub struct VarSpec {
    n: usize,
    v0: Option<Vec<f64>>,
    vl: Option<Vec<f64>>,
    vu: Option<Vec<f64>>,
}

impl VarSpec {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            ..Default::default()
        }
    }

    /// Initial values (length `n`).
    pub fn init(mut self, v0: Vec<f64>) -> Self {
        self.v0 = Some(v0);
        self
    }

    /// Lower bounds (length `n`).
    pub fn lower(mut self, vl: Vec<f64>) -> Self {
        self.vl = Some(vl);
        self
    }

    /// Upper bounds (length `n`).
    pub fn upper(mut self, vu: Vec<f64>) -> Self {
        self.vu = Some(vu);
        self
    }

    /// Lower and upper bounds together.
    pub fn bounds(self, vl: Vec<f64>, vu: Vec<f64>) -> Self {
        self.lower(vl).upper(vu)
    }
}

/// Registry of named variable blocks.
#[derive(Debug, Clone)]
pub struct VariableRegistry {
    ledger: IndexLedger,
    v0: HashMap<String, Vec<f64>>,
    vl: HashMap<String, Vec<f64>>,
    vu: HashMap<String, Vec<f64>>,
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self {
            ledger: IndexLedger::new("var"),
            v0: HashMap::new(),
            vl: HashMap::new(),
            vu: HashMap::new(),
        }
    }

    /// Register a new variable block.
    ///
    /// Fails with `DuplicateName` if the name is taken, or
    /// `DimensionMismatch` if a supplied non-empty vector does not have
    /// length `n`. No state changes on failure.
    pub fn add(&mut self, name: &str, spec: VarSpec) -> Result<BlockIdx, ModelError> {
        let n = spec.n;
        let v0 = resolve(spec.v0, n, 0.0, "v0")?;
        let vl = resolve(spec.vl, n, f64::NEG_INFINITY, "vl")?;
        let vu = resolve(spec.vu, n, f64::INFINITY, "vu")?;

        let idx = self.ledger.append(name, n)?;
        self.v0.insert(name.to_string(), v0);
        self.vl.insert(name.to_string(), vl);
        self.vu.insert(name.to_string(), vu);
        Ok(idx)
    }

    /// Initial value and bound vectors.
    ///
    /// With no name, returns the full `(x0, xl, xu)` concatenated in
    /// registration order. With a name, returns that block's vectors, or
    /// empty vectors if the block was never registered (absent names are a
    /// valid "not found" signal here, not an error).
    pub fn vectors(&self, name: Option<&str>) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        match name {
            Some(name) => {
                if self.ledger.contains(name) {
                    (
                        self.v0[name].clone(),
                        self.vl[name].clone(),
                        self.vu[name].clone(),
                    )
                } else {
                    (Vec::new(), Vec::new(), Vec::new())
                }
            }
            None => {
                let total = self.ledger.total();
                let mut v0 = Vec::with_capacity(total);
                let mut vl = Vec::with_capacity(total);
                let mut vu = Vec::with_capacity(total);
                for name in self.ledger.order() {
                    v0.extend_from_slice(&self.v0[name]);
                    vl.extend_from_slice(&self.vl[name]);
                    vu.extend_from_slice(&self.vu[name]);
                }
                (v0, vl, vu)
            }
        }
    }

    /// Number of variables in a named block (0 if absent).
    pub fn n(&self, name: &str) -> usize {
        self.ledger.n(name)
    }

    /// Total number of optimization variables.
    pub fn total(&self) -> usize {
        self.ledger.total()
    }

    pub fn ledger(&self) -> &IndexLedger {
        &self.ledger
    }

    /// Map local column positions of a matrix expressed over `varsets` to
    /// global 0-based column positions, in varset order.
    ///
    /// Offsets come from the registry's current state, so the same varset
    /// list maps to final global columns when called at assembly time.
    /// Names must all be registered (enforced at block registration).
    pub(crate) fn column_map(&self, varsets: &[String]) -> Vec<usize> {
        let mut map = Vec::new();
        for vs in varsets {
            if let Some(idx) = self.ledger.get(vs) {
                map.extend(idx.range());
            }
        }
        map
    }
}

fn resolve(
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mut vars = VariableRegistry::new();
        vars.add("Va", VarSpec::new(3)).unwrap();

        let (v0, vl, vu) = vars.vectors(Some("Va"));
        assert_eq!(v0, vec![0.0; 3]);
        assert!(vl.iter().all(|&v| v == f64::NEG_INFINITY));
        assert!(vu.iter().all(|&v| v == f64::INFINITY));
    }

    #[test]
    fn test_empty_vectors_count_as_omitted() {
        let mut vars = VariableRegistry::new();
        vars.add("Pg", VarSpec::new(2).init(Vec::new())).unwrap();
        let (v0, _, _) = vars.vectors(Some("Pg"));
        assert_eq!(v0, vec![0.0, 0.0]);
    }

    #[test]
    fn test_full_vector_concatenation_order() {
        let mut vars = VariableRegistry::new();
        vars.add("a", VarSpec::new(2).init(vec![1.0, 2.0])).unwrap();
        vars.add("b", VarSpec::new(3).init(vec![3.0, 4.0, 5.0]))
            .unwrap();

        let (v0, vl, vu) = vars.vectors(None);
        assert_eq!(v0, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(vl.len(), 5);
        assert_eq!(vu.len(), 5);
    }

    #[test]
    fn test_bad_bound_length_is_atomic() {
        let mut vars = VariableRegistry::new();
        let err = vars
            .add("Pg", VarSpec::new(3).lower(vec![0.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { .. }));
        assert_eq!(vars.total(), 0);
        assert_eq!(vars.n("Pg"), 0);
    }

    #[test]
    fn test_absent_name_yields_empty() {
        let vars = VariableRegistry::new();
        let (v0, vl, vu) = vars.vectors(Some("missing"));
        assert!(v0.is_empty() && vl.is_empty() && vu.is_empty());
        assert_eq!(vars.n("missing"), 0);
    }
}
