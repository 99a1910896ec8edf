//! Disjunctive constraint solving over an incremental linear arithmetic solver.
//!
//! A system is a conjunctive baseline of linear constraints plus disjunctions,
//! each an ordered list of alternatives. [`DisjunctiveSolver::solve`] commits
//! one alternative per disjunction by depth-first backtracking, driving the
//! backend's add/resolve/remove cycle.
//!
//! This crate implements:
//! - Variable registry and conjunctive baseline
//! - Disjunction registry with configurable decision order
//! - Bounds-based pruning with optional interval propagation
//! - Explicit-stack backtracking search with a step limit
//! - Solutions and rejection traces
//!
//! The default backend is the Cassowary solver from `disjoin-simplex`; any
//! [`ArithmeticSolver`] can be used through [`DisjunctiveSolver::with_backend`].

pub mod baseline;
pub mod config;
pub mod disjunction;
pub mod prune;
pub mod registry;
pub mod report;
mod search;
pub mod system;

pub use baseline::ConjunctiveStore;
pub use config::{DecisionOrder, PruneMode, SearchConfig};
pub use disjunction::{Alternative, Disjunction, DisjunctionId, DisjunctionRegistry};
pub use prune::{Interval, PruneConflict, PruneMark, Pruner};
pub use registry::VariableRegistry;
pub use report::{Conflict, DisjunctionTrace, RejectReason, Rejection, SearchStats, Solution, SolveResult};
pub use system::DisjunctiveSolver;

pub use disjoin_core::{
    ArithmeticSolver, Constraint, ConstraintId, DisjoinError, Expression, Relation, SolverError,
    Strength, Variable,
};
pub use disjoin_simplex::Solver;
