//! # opf-model: block-structured OPF problem formulation
//!
//! This crate provides the model object used to encapsulate an OPF problem
//! formulation. Variables, constraints and costs are registered in named
//! blocks; the model keeps track of the ordering and global indexing of the
//! blocks as they are added, assembles them into the single sparse
//! structures a numerical solver consumes, and evaluates the generalized
//! piecewise linear/quadratic cost function over the assembled parameters.
//!
//! ## Categories
//!
//! | Category | Registered via | Payload |
//! |----------|----------------|---------|
//! | variables | [`OpfModel::add_var`] | size, initial values, bounds |
//! | linear constraints | [`OpfModel::add_lin_constraint`] | local matrix, bounds, varsets |
//! | nonlinear constraints | [`OpfModel::add_nln_constraint`] | row count only |
//! | generalized costs | [`OpfModel::add_cost`] | cost parameters, varsets |
//!
//! Each block gets a contiguous 1-based `{start, end, n}` range in its
//! category's global space ([`BlockIdx`]). Constraint and cost blocks
//! declare their matrices only over the variable blocks they reference
//! (their varsets); assembly scatters the local columns to the right
//! global positions.
//!
//! ## Example
//!
//! ```
//! use opf_model::{CostSpec, LinConSpec, OpfModel, VarSpec};
//! use sprs::TriMat;
//!
//! let mut om = OpfModel::new(());
//! om.add_var("Pg", VarSpec::new(3).bounds(vec![0.0; 3], vec![100.0; 3]))?;
//!
//! let mut a = TriMat::new((1, 3));
//! for j in 0..3 {
//!     a.add_triplet(0, j, 1.0);
//! }
//! om.add_lin_constraint(
//!     "Pbal",
//!     LinConSpec::new(a.to_csr())
//!         .bounds(vec![150.0], vec![150.0])
//!         .varsets(["Pg"]),
//! )?;
//!
//! let (a, _l, _u) = om.linear_constraints();
//! assert_eq!(a.shape(), (1, 3));
//! # Ok::<(), opf_model::ModelError>(())
//! ```
//!
//! The model performs no optimization itself and attaches no physical
//! meaning to any block; it is a generic named-block indexing and assembly
//! layer.

pub mod cost;
pub mod error;
pub mod idx;
pub mod lin;
pub mod model;
pub mod nln;
pub mod var;

pub use cost::{CostParams, CostRegistry, CostSpec};
pub use error::ModelError;
pub use idx::{BlockIdx, IndexLedger};
pub use lin::{LinConSpec, LinearConstraintRegistry};
pub use model::{ModelIndex, OpfModel};
pub use nln::NonlinearRegistry;
pub use var::{VarSpec, VariableRegistry};
