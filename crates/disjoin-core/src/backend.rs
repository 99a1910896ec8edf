//! The incremental arithmetic solver consumed by the disjunction search.

use crate::errors::SolverError;
use crate::types::{Constraint, ConstraintId, Variable};

/// An incremental solver over linear constraints.
///
/// Implementations must leave their constraint set untouched when
/// [`ArithmeticSolver::add_constraint`] fails, and must restore it exactly
/// when a constraint is removed. The disjunction search relies on both to
/// backtrack.
pub trait ArithmeticSolver {
    /// Allocate a fresh variable.
    fn new_variable(&mut self) -> Variable;

    /// Add a constraint and re-solve incrementally.
    ///
    /// Fails with [`SolverError::UnsatisfiableConstraint`] when the system
    /// becomes infeasible.
    fn add_constraint(&mut self, constraint: &Constraint) -> Result<ConstraintId, SolverError>;

    /// Remove a previously added constraint.
    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), SolverError>;

    /// Bring every variable value up to date with the current tableau.
    fn update_variables(&mut self) -> Result<(), SolverError>;

    /// The last updated value of a variable.
    fn value(&self, var: Variable) -> f64;

    /// Number of constraints currently held by the solver.
    fn constraint_count(&self) -> usize;
}

impl<S: ArithmeticSolver + ?Sized> ArithmeticSolver for Box<S> {
    fn new_variable(&mut self) -> Variable {
        (**self).new_variable()
    }

    fn add_constraint(&mut self, constraint: &Constraint) -> Result<ConstraintId, SolverError> {
        (**self).add_constraint(constraint)
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), SolverError> {
        (**self).remove_constraint(id)
    }

    fn update_variables(&mut self) -> Result<(), SolverError> {
        (**self).update_variables()
    }

    fn value(&self, var: Variable) -> f64 {
        (**self).value(var)
    }

    fn constraint_count(&self) -> usize {
        (**self).constraint_count()
    }
}
