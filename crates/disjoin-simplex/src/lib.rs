//! Incremental linear constraint solving for the disjoin engine.
//!
//! This crate implements:
//! - The Cassowary simplex algorithm with required and weighted strengths
//! - Constraint removal for backtracking callers
//! - Edit variables with dual-simplex re-solving

mod cassowary;

pub use cassowary::Solver;
pub use disjoin_core::{
    ArithmeticSolver, Constraint, ConstraintId, Expression, Relation, SolverError, Strength,
    Variable,
};
