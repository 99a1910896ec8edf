//! Error types for the disjoin engine.

use thiserror::Error;

use crate::types::Variable;

/// Errors reported by an arithmetic solver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// A required constraint could not be satisfied.
    #[error("The constraint cannot be satisfied")]
    UnsatisfiableConstraint,

    /// The specified constraint was not found.
    #[error("The constraint is not in the solver")]
    UnknownConstraint,

    /// The edit variable is already registered.
    #[error("The edit variable {0} is already registered")]
    DuplicateEditVariable(Variable),

    /// The variable is not registered as an edit variable.
    #[error("The variable {0} is not an edit variable")]
    UnknownEditVariable(Variable),

    /// Edit variables cannot use the required strength.
    #[error("Edit variables cannot be required")]
    BadRequiredStrength,

    /// The objective is unbounded.
    #[error("The objective is unbounded")]
    Unbounded,

    /// An internal error occurred.
    #[error("Internal solver error: {0}")]
    InternalError(&'static str),
}

/// Errors raised by the disjunctive constraint solver.
#[derive(Debug, Error)]
pub enum DisjoinError {
    #[error("Variable '{name}' is already registered")]
    DuplicateVariable { name: String },

    #[error("Variable '{name}' is not registered or has no solved value")]
    UnknownVariable { name: String },

    #[error("Constraint references unregistered variable handle {variable}")]
    UnregisteredHandle { variable: Variable },

    #[error("A disjunction needs at least one alternative")]
    EmptyDisjunction,

    #[error("Baseline constraints are infeasible: {constraint}")]
    BaselineInfeasible { constraint: String },

    #[error("Solver instance was discarded after its baseline became infeasible")]
    Discarded,

    #[error("Search step limit of {limit} alternative attempts exceeded")]
    StepLimitExceeded { limit: u64 },

    #[error(transparent)]
    Solver(#[from] SolverError),
}

impl DisjoinError {
    /// True for caller mistakes that are fixed before re-invoking.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DisjoinError::DuplicateVariable { .. }
                | DisjoinError::UnknownVariable { .. }
                | DisjoinError::UnregisteredHandle { .. }
                | DisjoinError::EmptyDisjunction
        )
    }

    /// True when the solver instance can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DisjoinError::BaselineInfeasible { .. } | DisjoinError::Discarded
        )
    }
}
