//! Depth-first backtracking over disjunctions.
//!
//! The search keeps an explicit stack of decision frames instead of recursing.
//! Each frame owns the commitment it made, so the constraints physically in the
//! solver are always the baseline plus the commitments on the stack. Popping
//! or replacing a commitment removes exactly the constraints it added.

use smallvec::SmallVec;
use tracing::{debug, trace};

use disjoin_core::{ArithmeticSolver, Constraint, ConstraintId, DisjoinError, SolverError};

use crate::config::SearchConfig;
use crate::disjunction::{DisjunctionId, DisjunctionRegistry};
use crate::prune::{PruneConflict, PruneMark, Pruner};
use crate::registry::VariableRegistry;
use crate::report::{DisjunctionTrace, RejectReason, SearchStats};

/// An alternative whose constraints are currently in the solver.
#[derive(Debug, Clone)]
pub(crate) struct Commit {
    pub disjunction: DisjunctionId,
    pub alternative: usize,
    constraints: SmallVec<[ConstraintId; 4]>,
    restore: PruneMark,
}

impl Commit {
    /// Remove the commitment's constraints and pruner bounds.
    pub fn retract<S: ArithmeticSolver>(
        &self,
        solver: &mut S,
        pruner: &mut Pruner,
    ) -> Result<(), SolverError> {
        pruner.undo(self.restore);
        remove_all(solver, &self.constraints)
    }
}

/// Remove constraints newest first. A failed removal does not stop the
/// rest; the first error is returned once every id has been tried.
fn remove_all<S: ArithmeticSolver>(
    solver: &mut S,
    ids: &[ConstraintId],
) -> Result<(), SolverError> {
    let mut result = Ok(());
    for &id in ids.iter().rev() {
        if let Err(err) = solver.remove_constraint(id) {
            if result.is_ok() {
                result = Err(err);
            }
        }
    }
    result
}

/// Outcome of trying one alternative against the current commitments.
#[derive(Debug)]
enum Attempt {
    Feasible(Commit),
    Pruned(PruneConflict),
    Infeasible { constraint: usize },
}

/// One decision level.
#[derive(Debug)]
struct Frame {
    disjunction: DisjunctionId,
    next_alternative: usize,
    commit: Option<Commit>,
}

impl Frame {
    fn new(disjunction: DisjunctionId) -> Self {
        Self {
            disjunction,
            next_alternative: 0,
            commit: None,
        }
    }
}

/// Result of a full search run.
#[derive(Debug)]
pub(crate) enum SearchOutcome {
    /// One commitment per disjunction, in decision order, left in the solver.
    Found(Vec<Commit>),
    /// Every combination failed; the solver holds only the baseline.
    Exhausted(Vec<DisjunctionTrace>),
}

/// Drives the solver's add/resolve/remove cycle for one `solve()` call.
pub(crate) struct SearchEngine<'a, S> {
    solver: &'a mut S,
    pruner: &'a mut Pruner,
    disjunctions: &'a DisjunctionRegistry,
    variables: &'a VariableRegistry,
    config: &'a SearchConfig,
    stats: SearchStats,
    traces: Vec<DisjunctionTrace>,
}

impl<'a, S: ArithmeticSolver> SearchEngine<'a, S> {
    pub fn new(
        solver: &'a mut S,
        pruner: &'a mut Pruner,
        disjunctions: &'a DisjunctionRegistry,
        variables: &'a VariableRegistry,
        config: &'a SearchConfig,
    ) -> Self {
        Self {
            solver,
            pruner,
            disjunctions,
            variables,
            config,
            stats: SearchStats::default(),
            traces: Vec::new(),
        }
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Search for one consistent alternative per disjunction.
    ///
    /// On error every speculative constraint has been retracted again.
    pub fn run(&mut self) -> Result<SearchOutcome, DisjoinError> {
        let order = self.disjunctions.decision_order(self.config.order);
        let mut stack: Vec<Frame> = Vec::with_capacity(order.len());

        match self.explore(&order, &mut stack) {
            Ok(true) => {
                let commits: Vec<Commit> = stack.into_iter().filter_map(|f| f.commit).collect();
                debug!(stats = ?self.stats, "consistent combination found");
                Ok(SearchOutcome::Found(commits))
            }
            Ok(false) => {
                debug!(stats = ?self.stats, "search exhausted");
                let mut traces = std::mem::take(&mut self.traces);
                traces.sort_by_key(|t| order.iter().position(|id| *id == t.disjunction));
                Ok(SearchOutcome::Exhausted(traces))
            }
            Err(err) => {
                self.unwind(&mut stack);
                Err(err)
            }
        }
    }

    fn explore(&mut self, order: &[DisjunctionId], stack: &mut Vec<Frame>) -> Result<bool, DisjoinError> {
        let Some(&first) = order.first() else {
            return self.leaf_consistent();
        };
        stack.push(Frame::new(first));

        while let Some(depth) = stack.len().checked_sub(1) {
            let frame = &mut stack[depth];

            // Coming back to this level means the previous choice led nowhere.
            if let Some(commit) = frame.commit.take() {
                commit.retract(self.solver, self.pruner)?;
                self.stats.backtracks += 1;
                trace!(disjunction = %commit.disjunction, alternative = commit.alternative, "backtrack");
                self.reject(commit.disjunction, commit.alternative, RejectReason::NoCompletion);
            }

            match self.next_alternative(frame)? {
                Some(commit) => {
                    frame.commit = Some(commit);
                    self.stats.max_depth = self.stats.max_depth.max(depth + 1);
                    match order.get(depth + 1) {
                        Some(&next) => stack.push(Frame::new(next)),
                        None => {
                            if self.leaf_consistent()? {
                                return Ok(true);
                            }
                        }
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }

        Ok(false)
    }

    /// Try the remaining alternatives of a frame in list order; first feasible wins.
    fn next_alternative(&mut self, frame: &mut Frame) -> Result<Option<Commit>, DisjoinError> {
        let disjunctions = self.disjunctions;
        let Some(disjunction) = disjunctions.get(frame.disjunction) else {
            return Ok(None);
        };

        while let Some(alternative) = disjunction.alternative(frame.next_alternative) {
            let index = frame.next_alternative;
            frame.next_alternative += 1;
            self.step()?;

            match self.attempt(frame.disjunction, index, alternative)? {
                Attempt::Feasible(commit) => {
                    trace!(disjunction = %frame.disjunction, alternative = index, "commit");
                    return Ok(Some(commit));
                }
                Attempt::Pruned(conflict) => {
                    self.stats.pruned += 1;
                    let variable = self.variables.display_name(conflict.variable);
                    trace!(disjunction = %frame.disjunction, alternative = index, %variable, "pruned");
                    self.reject(
                        frame.disjunction,
                        index,
                        RejectReason::Pruned {
                            variable,
                            lower: conflict.lower,
                            upper: conflict.upper,
                        },
                    );
                }
                Attempt::Infeasible { constraint } => {
                    self.stats.solver_rejections += 1;
                    trace!(disjunction = %frame.disjunction, alternative = index, constraint, "infeasible");
                    self.reject(frame.disjunction, index, RejectReason::Infeasible { constraint });
                }
            }
        }

        Ok(None)
    }

    /// Pre-check, then add the alternative's constraints one by one.
    fn attempt(
        &mut self,
        disjunction: DisjunctionId,
        alternative: usize,
        constraints: &[Constraint],
    ) -> Result<Attempt, DisjoinError> {
        if let Err(conflict) = self.pruner.check(constraints) {
            return Ok(Attempt::Pruned(conflict));
        }

        let restore = self.pruner.mark();
        let mut added: SmallVec<[ConstraintId; 4]> = SmallVec::new();
        for (index, constraint) in constraints.iter().enumerate() {
            match self.solver.add_constraint(constraint) {
                Ok(id) => added.push(id),
                Err(err) => {
                    remove_all(self.solver, &added)?;
                    return match err {
                        SolverError::UnsatisfiableConstraint => {
                            Ok(Attempt::Infeasible { constraint: index })
                        }
                        other => Err(other.into()),
                    };
                }
            }
        }

        self.pruner.commit(constraints);
        Ok(Attempt::Feasible(Commit {
            disjunction,
            alternative,
            constraints: added,
            restore,
        }))
    }

    /// Final resolve pass once every disjunction is decided.
    fn leaf_consistent(&mut self) -> Result<bool, DisjoinError> {
        match self.solver.update_variables() {
            Ok(()) => Ok(true),
            Err(SolverError::UnsatisfiableConstraint) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn step(&mut self) -> Result<(), DisjoinError> {
        if let Some(limit) = self.config.step_limit {
            if self.stats.attempts >= limit {
                return Err(DisjoinError::StepLimitExceeded { limit });
            }
        }
        self.stats.attempts += 1;
        Ok(())
    }

    fn reject(&mut self, disjunction: DisjunctionId, alternative: usize, reason: RejectReason) {
        let index = match self.traces.iter().position(|t| t.disjunction == disjunction) {
            Some(index) => index,
            None => {
                let label = self
                    .disjunctions
                    .get(disjunction)
                    .and_then(|d| d.label())
                    .map(str::to_string);
                self.traces.push(DisjunctionTrace::new(disjunction, label));
                self.traces.len() - 1
            }
        };
        self.traces[index].reject(alternative, reason);
    }

    /// Retract every commitment on the stack, innermost first.
    fn unwind(&mut self, stack: &mut Vec<Frame>) {
        while let Some(frame) = stack.pop() {
            if let Some(commit) = frame.commit {
                if let Err(err) = commit.retract(self.solver, self.pruner) {
                    tracing::warn!(%err, disjunction = %commit.disjunction, "failed to retract during unwind");
                }
            }
        }
    }
}
