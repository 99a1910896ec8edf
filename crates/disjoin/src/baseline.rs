//! Conjunctive constraint store: the permanent baseline.

use tracing::{debug, warn};

use disjoin_core::{ArithmeticSolver, Constraint, ConstraintId, DisjoinError, SolverError};

use crate::registry::VariableRegistry;

/// Always-active constraints, added to the solver exactly once.
#[derive(Debug, Clone, Default)]
pub struct ConjunctiveStore {
    constraints: Vec<(Constraint, ConstraintId)>,
}

impl ConjunctiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constraint to the baseline and add it to the solver.
    ///
    /// Fails with [`DisjoinError::BaselineInfeasible`] when the baseline alone
    /// becomes inconsistent.
    pub fn add<S: ArithmeticSolver>(
        &mut self,
        solver: &mut S,
        registry: &VariableRegistry,
        constraint: Constraint,
    ) -> Result<ConstraintId, DisjoinError> {
        match solver.add_constraint(&constraint) {
            Ok(id) => {
                debug!(constraint = %registry.describe(&constraint), "baseline constraint added");
                self.constraints.push((constraint, id));
                Ok(id)
            }
            Err(SolverError::UnsatisfiableConstraint) => {
                let constraint = registry.describe(&constraint);
                warn!(%constraint, "baseline became infeasible");
                Err(DisjoinError::BaselineInfeasible { constraint })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Baseline constraints in insertion order.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().map(|(constraint, _)| constraint)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}
