//! The OPF model object: named-block registration and unified access.
//!
//! [`OpfModel`] encapsulates one OPF problem formulation. Callers register
//! variables, constraints and costs in named blocks during a registration
//! phase; the model tracks each block's position in its category's global
//! space and assembles the pieces into the single structures a numerical
//! solver consumes:
//! - `linear_constraints()` -> `(A, l, u)`
//! - `var_vectors(None)` -> `(x0, xl, xu)`
//! - `build_cost_params()` / `cost_params()` -> aggregate cost struct
//! - `get_idx()` -> per-category index maps, for slicing a solution or
//!   dual vector back into named sub-vectors.
//!
//! One model is built and consumed within a single solve; concurrent solves
//! each get their own instance.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::cost::{CostParams, CostRegistry, CostSpec};
use crate::error::ModelError;
use crate::idx::BlockIdx;
use crate::lin::{LinConSpec, LinearConstraintRegistry};
use crate::nln::NonlinearRegistry;
use crate::var::{VarSpec, VariableRegistry};
use sprs::CsMat;

/// Snapshot of every category's name -> index-range map.
///
/// Taken with [`OpfModel::get_idx`]; used by post-processing to slice the
/// solved variable vector and dual multipliers into named quantities
/// without recomputing offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelIndex {
    pub var: HashMap<String, BlockIdx>,
    pub lin: HashMap<String, BlockIdx>,
    pub nln: HashMap<String, BlockIdx>,
    pub cost: HashMap<String, BlockIdx>,
}

/// Block-structured OPF problem model.
///
/// Generic over the originating problem definition `C`, which is carried
/// through opaque and never interpreted.
#[derive(Debug, Clone)]
pub struct OpfModel<C> {
    case: C,
    var: VariableRegistry,
    lin: LinearConstraintRegistry,
    nln: NonlinearRegistry,
    cost: CostRegistry,
    userdata: HashMap<String, Value>,
}

impl<C> OpfModel<C> {
    /// Create an empty model around a problem definition.
    pub fn new(case: C) -> Self {
        Self {
            case,
            var: VariableRegistry::new(),
            lin: LinearConstraintRegistry::new(),
            nln: NonlinearRegistry::new(),
            cost: CostRegistry::new(),
            userdata: HashMap::new(),
        }
    }

    /// The problem definition this model was built from.
    pub fn case(&self) -> &C {
        &self.case
    }

    /// Register a named variable block.
    pub fn add_var(&mut self, name: &str, spec: VarSpec) -> Result<BlockIdx, ModelError> {
        self.var.add(name, spec)
    }

    /// Register a named linear-constraint block `l <= A * x_vs <= u`.
    pub fn add_lin_constraint(
        &mut self,
        name: &str,
        spec: LinConSpec,
    ) -> Result<BlockIdx, ModelError> {
        self.lin.add(name, spec, &self.var)
    }

    /// Register a named nonlinear-constraint block (row count only).
    pub fn add_nln_constraint(&mut self, name: &str, n: usize) -> Result<BlockIdx, ModelError> {
        self.nln.add(name, n)
    }

    /// Register a named generalized-cost block.
    pub fn add_cost(&mut self, name: &str, spec: CostSpec) -> Result<BlockIdx, ModelError> {
        self.cost.add(name, spec, &self.var)
    }

    /// Assemble the full linear constraint set `l <= A * x <= u`.
    pub fn linear_constraints(&self) -> (CsMat<f64>, Vec<f64>, Vec<f64>) {
        self.lin.assemble(&self.var)
    }

    /// Assemble the aggregate generalized-cost parameters.
    ///
    /// Must be called before [`cost_params`] and [`compute_cost`], and again
    /// after any further `add_cost`.
    ///
    /// [`cost_params`]: OpfModel::cost_params
    /// [`compute_cost`]: OpfModel::compute_cost
    pub fn build_cost_params(&mut self) {
        self.cost.build(&self.var);
    }

    /// Assembled cost parameters, for all blocks or row-sliced to one.
    pub fn cost_params(&self, name: Option<&str>) -> Result<CostParams, ModelError> {
        self.cost.params(name)
    }

    /// Evaluate the generalized cost at `x`, for all blocks or one block.
    pub fn compute_cost(&self, x: &[f64], name: Option<&str>) -> Result<f64, ModelError> {
        self.cost.evaluate(x, name)
    }

    /// Initial values and bounds: full `(x0, xl, xu)` with no name, one
    /// block's vectors (or empty vectors if absent) with a name.
    pub fn var_vectors(&self, name: Option<&str>) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        self.var.vectors(name)
    }

    /// Snapshot of all four categories' index maps.
    pub fn get_idx(&self) -> ModelIndex {
        ModelIndex {
            var: self.var.ledger().snapshot(),
            lin: self.lin.ledger().snapshot(),
            nln: self.nln.ledger().snapshot(),
            cost: self.cost.ledger().snapshot(),
        }
    }

    pub fn vars(&self) -> &VariableRegistry {
        &self.var
    }

    pub fn lin(&self) -> &LinearConstraintRegistry {
        &self.lin
    }

    pub fn nln(&self) -> &NonlinearRegistry {
        &self.nln
    }

    pub fn costs(&self) -> &CostRegistry {
        &self.cost
    }

    /// Store auxiliary data scoped to this model's lifetime.
    ///
    /// Later pipeline stages use this to stash custom indexing built while
    /// adding blocks, then unpack results with it after the solve.
    pub fn set_userdata(&mut self, key: impl Into<String>, value: Value) {
        self.userdata.insert(key.into(), value);
    }

    /// Retrieve stored auxiliary data, or `None` if the key was never set.
    pub fn userdata(&self, key: &str) -> Option<&Value> {
        self.userdata.get(key)
    }
}

impl<C> fmt::Display for OpfModel<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.var.ledger().write_summary(f, "VARIABLES")?;
        self.nln.ledger().write_summary(f, "NONLINEAR CONSTRAINTS")?;
        self.lin.ledger().write_summary(f, "LINEAR CONSTRAINTS")?;
        self.cost.ledger().write_summary(f, "COSTS")?;
        writeln!(f, "userdata: {} entries", self.userdata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sprs::TriMat;

    fn dense(rows: usize, cols: usize, data: &[f64]) -> CsMat<f64> {
        let mut t = TriMat::new((rows, cols));
        for r in 0..rows {
            for c in 0..cols {
                let v = data[r * cols + c];
                if v != 0.0 {
                    t.add_triplet(r, c, v);
                }
            }
        }
        t.to_csr()
    }

    fn entry(m: &CsMat<f64>, i: usize, j: usize) -> f64 {
        m.get(i, j).copied().unwrap_or(0.0)
    }

    #[test]
    fn test_two_block_index_map() {
        let mut om = OpfModel::new(());
        om.add_var("a", VarSpec::new(2)).unwrap();
        om.add_var("b", VarSpec::new(3)).unwrap();

        let idx = om.get_idx();
        assert_eq!(idx.var["a"], BlockIdx { start: 1, end: 2, n: 2 });
        assert_eq!(idx.var["b"], BlockIdx { start: 3, end: 5, n: 3 });
        assert_eq!(om.vars().total(), 5);
    }

    #[test]
    fn test_failed_registration_leaves_index_unchanged() {
        let mut om = OpfModel::new(());
        om.add_var("Pg", VarSpec::new(3)).unwrap();
        om.add_nln_constraint("Pmis", 2).unwrap();

        let before = om.get_idx();
        assert!(om.add_var("Pg", VarSpec::new(1)).is_err());
        assert!(om.add_nln_constraint("Pmis", 5).is_err());
        assert_eq!(om.get_idx(), before);
    }

    #[test]
    fn test_full_pipeline_scenario() {
        // Register, assemble, evaluate, then slice a fake solution back out.
        let mut om = OpfModel::new("case3");
        om.add_var(
            "Pg",
            VarSpec::new(3)
                .init(vec![10.0, 20.0, 30.0])
                .bounds(vec![0.0; 3], vec![100.0; 3]),
        )
        .unwrap();
        om.add_var("Va", VarSpec::new(3)).unwrap();

        om.add_lin_constraint(
            "Pbal",
            LinConSpec::new(dense(1, 3, &[1.0, 1.0, 1.0]))
                .bounds(vec![150.0], vec![150.0])
                .varsets(["Pg"]),
        )
        .unwrap();
        om.add_nln_constraint("Qmis", 3).unwrap();

        om.add_cost(
            "fuel",
            CostSpec::new(dense(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
                vec![2.0, 2.5, 3.0],
            )
            .varsets(["Pg"]),
        )
        .unwrap();

        // Assembled linear constraints span all 6 variables
        let (a, l, u) = om.linear_constraints();
        assert_eq!(a.shape(), (1, 6));
        assert_eq!(l, vec![150.0]);
        assert_eq!(u, vec![150.0]);
        for j in 0..3 {
            assert_eq!(entry(&a, 0, j), 1.0);
            assert_eq!(entry(&a, 0, 3 + j), 0.0); // Va columns untouched
        }

        // Initial point and bounds
        let (x0, xl, xu) = om.var_vectors(None);
        assert_eq!(x0, vec![10.0, 20.0, 30.0, 0.0, 0.0, 0.0]);
        assert_eq!(xl[0], 0.0);
        assert_eq!(xl[3], f64::NEG_INFINITY);
        assert_eq!(xu[0], 100.0);

        // Cost over the assembled parameters
        om.build_cost_params();
        let x = [10.0, 20.0, 30.0, 0.1, 0.2, 0.3];
        let f = om.compute_cost(&x, None).unwrap();
        assert!((f - (2.0 * 10.0 + 2.5 * 20.0 + 3.0 * 30.0)).abs() < 1e-12);

        // Slice the solution back out by name
        let idx = om.get_idx();
        let va = idx.var["Va"];
        assert_eq!(&x[va.range()], &[0.1, 0.2, 0.3]);
        assert_eq!(idx.lin["Pbal"], BlockIdx { start: 1, end: 1, n: 1 });
        assert_eq!(idx.nln["Qmis"].n, 3);
        assert_eq!(om.case(), &"case3");
    }

    #[test]
    fn test_cost_before_build_fails() {
        let mut om = OpfModel::new(());
        om.add_var("x", VarSpec::new(1)).unwrap();
        om.add_cost("c", CostSpec::new(dense(1, 1, &[1.0]), vec![1.0]))
            .unwrap();
        assert_eq!(
            om.compute_cost(&[1.0], None).unwrap_err(),
            ModelError::NotAssembled
        );
        om.build_cost_params();
        assert!(om.compute_cost(&[1.0], None).is_ok());
    }

    #[test]
    fn test_userdata_round_trip() {
        let mut om = OpfModel::new(());
        assert!(om.userdata("gen_order").is_none());

        om.set_userdata("gen_order", json!([2, 0, 1]));
        assert_eq!(om.userdata("gen_order"), Some(&json!([2, 0, 1])));

        om.set_userdata("gen_order", json!([1, 2, 0]));
        assert_eq!(om.userdata("gen_order"), Some(&json!([1, 2, 0])));
    }

    #[test]
    fn test_display_summary() {
        let mut om = OpfModel::new(());
        om.add_var("Pg", VarSpec::new(3)).unwrap();

        let out = om.to_string();
        assert!(out.contains("VARIABLES"));
        assert!(out.contains("Pg"));
        assert!(out.contains("NONLINEAR CONSTRAINTS  :  <none>"));
    }
}
