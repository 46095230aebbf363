//! Error types for model registration, assembly and evaluation.

use thiserror::Error;

/// Errors from model operations.
///
/// Registration errors (`DuplicateName`, `DimensionMismatch`) are raised
/// before any state is mutated, so a failed add leaves the model exactly
/// as it was.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// A block with this name was already registered in the category.
    #[error("{category} block named '{name}' already exists")]
    DuplicateName {
        category: &'static str,
        name: String,
    },

    /// A declared size or shape does not match its counterpart.
    #[error("dimension mismatch in {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    /// Cost parameters were requested before `build_cost_params`.
    #[error("cost parameters not assembled: call build_cost_params first")]
    NotAssembled,

    /// A named block was never registered.
    #[error("unknown {category} block: '{name}'")]
    UnknownBlock {
        category: &'static str,
        name: String,
    },
}
