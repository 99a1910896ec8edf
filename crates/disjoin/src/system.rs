//! The disjunctive solver facade.

use indexmap::IndexMap;
use tracing::{debug, debug_span, info};

use disjoin_core::{ArithmeticSolver, Constraint, DisjoinError, Variable};
use disjoin_simplex::Solver;

use crate::baseline::ConjunctiveStore;
use crate::config::SearchConfig;
use crate::disjunction::{Alternative, Disjunction, DisjunctionId, DisjunctionRegistry};
use crate::prune::Pruner;
use crate::registry::VariableRegistry;
use crate::report::{Conflict, SearchStats, Solution, SolveResult};
use crate::search::{Commit, SearchEngine, SearchOutcome};

/// A linear constraint system with disjunctions on top of an incremental
/// arithmetic solver.
///
/// The backend is exclusively owned. Between calls it holds the baseline
/// constraints plus, after a successful [`solve`](Self::solve), the
/// alternatives that solve committed.
///
/// ```
/// use disjoin::{Constraint, DisjunctiveSolver, Expression};
///
/// let mut solver = DisjunctiveSolver::new();
/// let x = solver.new_variable("x").unwrap();
/// let y = solver.new_variable("y").unwrap();
///
/// solver
///     .add_conjunctive_constraint(Constraint::equal(Expression::from(x).plus(y, 1.0), 100.0))
///     .unwrap();
/// solver
///     .add_conjunctive_constraint(Constraint::greater_or_equal(x, 60.0))
///     .unwrap();
/// solver
///     .add_disjunction(vec![
///         vec![Constraint::equal(x, 30.0), Constraint::equal(y, 70.0)],
///         vec![Constraint::equal(x, 70.0), Constraint::equal(y, 30.0)],
///     ])
///     .unwrap();
///
/// let result = solver.solve().unwrap();
/// assert!(result.satisfiable());
/// assert!((solver.value("x").unwrap() - 70.0).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct DisjunctiveSolver<S = Solver> {
    backend: S,
    config: SearchConfig,
    variables: VariableRegistry,
    baseline: ConjunctiveStore,
    disjunctions: DisjunctionRegistry,
    pruner: Pruner,
    /// Alternatives left in the backend by the last successful solve
    committed: Vec<Commit>,
    discarded: bool,
}

impl DisjunctiveSolver<Solver> {
    /// Create a solver over the Cassowary backend with the default configuration.
    pub fn new() -> Self {
        Self::with_backend(Solver::new(), SearchConfig::default())
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self::with_backend(Solver::new(), config)
    }
}

impl Default for DisjunctiveSolver<Solver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ArithmeticSolver> DisjunctiveSolver<S> {
    /// Wrap an arithmetic solver. Constraints already inside it are outside
    /// the baseline and never retracted.
    pub fn with_backend(backend: S, config: SearchConfig) -> Self {
        Self {
            backend,
            pruner: Pruner::new(config.prune),
            config,
            variables: VariableRegistry::new(),
            baseline: ConjunctiveStore::new(),
            disjunctions: DisjunctionRegistry::new(),
            committed: Vec::new(),
            discarded: false,
        }
    }

    /// Allocate a backend variable and register it under `name`.
    pub fn new_variable(&mut self, name: impl Into<String>) -> Result<Variable, DisjoinError> {
        self.ensure_usable()?;
        let name = name.into();
        if self.variables.handle(&name).is_some() {
            return Err(DisjoinError::DuplicateVariable { name });
        }
        let handle = self.backend.new_variable();
        self.variables.register(name, handle)?;
        Ok(handle)
    }

    /// Register a handle that was allocated on the backend directly.
    pub fn register_variable(&mut self, name: impl Into<String>, handle: Variable) -> Result<(), DisjoinError> {
        self.ensure_usable()?;
        self.variables.register(name, handle)
    }

    /// The handle registered under `name`.
    pub fn handle(&self, name: &str) -> Option<Variable> {
        self.variables.handle(name)
    }

    /// Add a permanent constraint.
    ///
    /// If the baseline alone becomes inconsistent this fails with
    /// [`DisjoinError::BaselineInfeasible`] and the instance is discarded:
    /// every later mutating call or solve returns [`DisjoinError::Discarded`].
    pub fn add_conjunctive_constraint(&mut self, constraint: Constraint) -> Result<(), DisjoinError> {
        self.ensure_usable()?;
        self.variables.check(&constraint)?;
        self.retract_commits()?;
        self.variables.clear_values();

        match self
            .baseline
            .add(&mut self.backend, &self.variables, constraint.clone())
        {
            Ok(_) => {
                self.pruner.commit(std::slice::from_ref(&constraint));
                Ok(())
            }
            Err(err) => {
                if err.is_fatal() {
                    self.discarded = true;
                }
                Err(err)
            }
        }
    }

    /// Register a disjunction; at least one alternative must hold in a solution.
    pub fn add_disjunction(&mut self, alternatives: Vec<Alternative>) -> Result<DisjunctionId, DisjoinError> {
        self.insert_disjunction(Disjunction::new(alternatives)?)
    }

    /// Register a disjunction whose label is shown in conflict reports.
    pub fn add_labeled_disjunction(
        &mut self,
        label: impl Into<String>,
        alternatives: Vec<Alternative>,
    ) -> Result<DisjunctionId, DisjoinError> {
        self.insert_disjunction(Disjunction::new(alternatives)?.with_label(label))
    }

    fn insert_disjunction(&mut self, disjunction: Disjunction) -> Result<DisjunctionId, DisjoinError> {
        self.ensure_usable()?;
        for constraint in disjunction.constraints() {
            self.variables.check(constraint)?;
        }
        self.variables.clear_values();
        let id = self.disjunctions.add(disjunction);
        debug!(disjunction = %id, alternatives = self.disjunctions.get(id).map_or(0, Disjunction::len), "disjunction registered");
        Ok(id)
    }

    /// Search for one alternative per disjunction that is consistent with the baseline.
    ///
    /// Global unsatisfiability is reported as [`SolveResult::Unsatisfied`].
    /// Errors leave the backend holding exactly the baseline.
    pub fn solve(&mut self) -> Result<SolveResult, DisjoinError> {
        self.ensure_usable()?;
        self.retract_commits()?;
        self.variables.clear_values();

        let span = debug_span!(
            "solve",
            variables = self.variables.len(),
            baseline = self.baseline.len(),
            disjunctions = self.disjunctions.len()
        );
        let _enter = span.enter();

        let mut engine = SearchEngine::new(
            &mut self.backend,
            &mut self.pruner,
            &self.disjunctions,
            &self.variables,
            &self.config,
        );
        let outcome = engine.run();
        let stats = engine.stats();

        match outcome? {
            SearchOutcome::Found(commits) => Ok(SolveResult::Satisfied(self.accept(commits, stats))),
            SearchOutcome::Exhausted(traces) => {
                info!(attempts = stats.attempts, "no consistent combination");
                Ok(SolveResult::Unsatisfied(Conflict { traces, stats }))
            }
        }
    }

    fn accept(&mut self, commits: Vec<Commit>, stats: SearchStats) -> Solution {
        let mut choices = vec![0; self.disjunctions.len()];
        for commit in &commits {
            choices[commit.disjunction.0] = commit.alternative;
        }

        let solved: Vec<(Variable, f64)> = self
            .variables
            .iter()
            .map(|(_, handle)| (handle, self.backend.value(handle)))
            .collect();
        let values: IndexMap<String, f64> = self
            .variables
            .iter()
            .zip(&solved)
            .map(|((name, _), &(_, value))| (name.to_string(), value))
            .collect();
        self.variables.record_values(solved);
        self.committed = commits;

        debug!(?choices, attempts = stats.attempts, "solved");
        Solution {
            values,
            choices,
            stats,
        }
    }

    /// Value of a variable from the last successful solve.
    pub fn value(&self, name: &str) -> Result<f64, DisjoinError> {
        self.variables.value(name)
    }

    /// Every solved value, in registration order. Empty until a solve succeeds.
    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.variables
            .iter()
            .filter_map(|(name, _)| self.variables.value(name).ok().map(|value| (name, value)))
    }

    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    pub fn baseline(&self) -> &ConjunctiveStore {
        &self.baseline
    }

    pub fn disjunctions(&self) -> &DisjunctionRegistry {
        &self.disjunctions
    }

    pub fn disjunction_count(&self) -> usize {
        self.disjunctions.len()
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Replace the configuration used by subsequent solves.
    pub fn set_config(&mut self, config: SearchConfig) {
        self.pruner.set_mode(config.prune);
        self.config = config;
    }

    /// True once the baseline was found infeasible.
    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    /// Consume the solver, returning the backend with the last committed alternatives still in it.
    pub fn into_backend(self) -> S {
        self.backend
    }

    fn ensure_usable(&self) -> Result<(), DisjoinError> {
        if self.discarded {
            return Err(DisjoinError::Discarded);
        }
        Ok(())
    }

    /// Take the previous solve's alternatives back out of the backend.
    fn retract_commits(&mut self) -> Result<(), DisjoinError> {
        while let Some(commit) = self.committed.pop() {
            commit.retract(&mut self.backend, &mut self.pruner)?;
        }
        Ok(())
    }
}
