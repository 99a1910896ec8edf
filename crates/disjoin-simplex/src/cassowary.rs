//! Cassowary constraint solver implementation.
//!
//! This is an implementation of the Cassowary linear arithmetic constraint solving
//! algorithm, as described in "The Cassowary Linear Arithmetic Constraint Solving
//! Algorithm" by Greg J. Badros and Alan Borning.
//!
//! The algorithm uses a variation of the simplex method optimized for incremental
//! constraint solving with priorities (strengths). A rejected constraint leaves the
//! tableau describing exactly the constraint set it held before the call, which is
//! what lets the disjunction search use add/remove as its backtracking primitive.

use indexmap::IndexMap;
use tracing::trace;

use disjoin_core::{
    near_zero, ArithmeticSolver, Constraint, ConstraintId, Expression, Relation, SolverError,
    Strength, Variable, EPSILON,
};

/// Symbol types used internally in the solver.
///
/// The derived ordering is the fixed symbol order used by Bland's rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Symbol {
    /// An external variable (the actual unknowns we're solving for)
    External(usize),
    /// A slack variable (for inequality constraints)
    Slack(usize),
    /// An error variable (for non-required constraints)
    Error(usize),
    /// A dummy variable (for required equality constraints)
    Dummy(usize),
}

impl Symbol {
    fn is_external(&self) -> bool {
        matches!(self, Symbol::External(_))
    }

    fn is_error(&self) -> bool {
        matches!(self, Symbol::Error(_))
    }

    fn is_dummy(&self) -> bool {
        matches!(self, Symbol::Dummy(_))
    }

    fn is_pivotable(&self) -> bool {
        matches!(self, Symbol::Slack(_) | Symbol::Error(_))
    }
}

/// Marker symbols identifying a constraint's rows in the tableau.
#[derive(Debug, Clone, Copy)]
struct Tag {
    marker: Symbol,
    other: Option<Symbol>,
}

#[derive(Debug, Clone)]
struct ConstraintInfo {
    tag: Tag,
    strength: Strength,
}

#[derive(Debug, Clone)]
struct EditInfo {
    tag: Tag,
    constraint: ConstraintId,
    constant: f64,
}

/// Which objective an optimization pass minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Objective {
    Main,
    Artificial,
}

/// A row in the simplex tableau.
#[derive(Debug, Clone)]
struct Row {
    constant: f64,
    cells: IndexMap<Symbol, f64>,
}

impl Row {
    fn new(constant: f64) -> Self {
        Self {
            constant,
            cells: IndexMap::new(),
        }
    }

    /// Add a value to the constant and return the new constant.
    fn add(&mut self, value: f64) -> f64 {
        self.constant += value;
        self.constant
    }

    fn insert_symbol(&mut self, symbol: Symbol, coefficient: f64) {
        let entry = self.cells.entry(symbol).or_insert(0.0);
        *entry += coefficient;
        if near_zero(*entry) {
            self.cells.swap_remove(&symbol);
        }
    }

    fn insert_row(&mut self, other: &Row, coefficient: f64) {
        self.constant += other.constant * coefficient;
        for (&s, &c) in &other.cells {
            self.insert_symbol(s, c * coefficient);
        }
    }

    fn remove(&mut self, symbol: Symbol) {
        self.cells.swap_remove(&symbol);
    }

    fn reverse_sign(&mut self) {
        self.constant = -self.constant;
        for coeff in self.cells.values_mut() {
            *coeff = -*coeff;
        }
    }

    fn coefficient(&self, symbol: Symbol) -> f64 {
        self.cells.get(&symbol).copied().unwrap_or(0.0)
    }

    /// Substitute a symbol in this row with another row.
    fn substitute(&mut self, symbol: Symbol, row: &Row) {
        if let Some(coeff) = self.cells.swap_remove(&symbol) {
            self.insert_row(row, coeff);
        }
    }

    /// Solve for a symbol in this row.
    ///
    /// Given `0 = constant + a*symbol + ...`, rewrite as `symbol = -constant/a - ...`.
    fn solve_for(&mut self, symbol: Symbol) {
        let multiplier = self
            .cells
            .swap_remove(&symbol)
            .map_or(-1.0, |coeff| -1.0 / coeff);
        self.constant *= multiplier;
        for c in self.cells.values_mut() {
            *c *= multiplier;
        }
    }

    /// Solve for `rhs` in a row whose basic symbol is `lhs`.
    fn solve_for_symbols(&mut self, lhs: Symbol, rhs: Symbol) {
        self.insert_symbol(lhs, -1.0);
        self.solve_for(rhs);
    }
}

/// The Cassowary constraint solver.
#[derive(Debug)]
pub struct Solver {
    /// Counter for generating unique variable IDs
    var_counter: usize,
    /// Counter for generating unique symbol IDs
    symbol_counter: usize,
    /// The objective function row
    objective: Row,
    /// Artificial objective for phase 1
    artificial: Option<Row>,
    /// The tableau rows, keyed by their basic symbol
    rows: IndexMap<Symbol, Row>,
    /// Mapping from constraints to their marker symbols
    constraints: IndexMap<ConstraintId, ConstraintInfo>,
    /// Counter for constraint IDs
    constraint_counter: usize,
    /// Rows with a negative constant awaiting dual optimization
    infeasible_rows: Vec<Symbol>,
    /// Edit variables and their current suggested values
    edits: IndexMap<Variable, EditInfo>,
    /// External variables and their values
    var_data: IndexMap<Variable, f64>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Self {
        Self {
            var_counter: 0,
            symbol_counter: 0,
            objective: Row::new(0.0),
            artificial: None,
            rows: IndexMap::new(),
            constraints: IndexMap::new(),
            constraint_counter: 0,
            infeasible_rows: Vec::new(),
            edits: IndexMap::new(),
            var_data: IndexMap::new(),
        }
    }

    /// Create a new variable.
    pub fn new_variable(&mut self) -> Variable {
        let var = Variable(self.var_counter);
        self.var_counter += 1;
        self.var_data.insert(var, 0.0);
        var
    }

    /// Get the current value of a variable straight from the tableau.
    pub fn get_value(&self, var: Variable) -> f64 {
        self.rows
            .get(&Symbol::External(var.0))
            .map_or(0.0, |row| row.constant)
    }

    /// Check whether a constraint is currently in the solver.
    pub fn has_constraint(&self, id: ConstraintId) -> bool {
        self.constraints.contains_key(&id)
    }

    /// Add a constraint to the solver.
    ///
    /// On failure the tableau still describes the previous constraint set.
    pub fn add_constraint(&mut self, constraint: &Constraint) -> Result<ConstraintId, SolverError> {
        let expr = &constraint.expression;
        if !expr.constant.is_finite() || expr.terms().any(|(_, c)| !c.is_finite()) {
            return Err(SolverError::InternalError("Non-finite constraint coefficient"));
        }

        let (mut row, tag) = self.create_row(constraint);
        let mut subject = Self::choose_subject(&row, &tag);

        // A row made only of dummies has nothing left to pivot on: it is
        // either redundant or contradicts the required equalities.
        if subject.is_none() && row.cells.keys().all(Symbol::is_dummy) {
            if !near_zero(row.constant) {
                trace!(%constraint, "rejected by required equalities");
                return Err(SolverError::UnsatisfiableConstraint);
            }
            subject = Some(tag.marker);
        }

        match subject {
            Some(subject) => {
                row.solve_for(subject);
                self.substitute(subject, &row);
                self.rows.insert(subject, row);
            }
            None => {
                if !self.add_with_artificial_variable(&row)? {
                    trace!(%constraint, "rejected by artificial phase");
                    self.optimize(Objective::Main)?;
                    return Err(SolverError::UnsatisfiableConstraint);
                }
            }
        }

        let id = ConstraintId(self.constraint_counter);
        self.constraint_counter += 1;
        self.constraints.insert(
            id,
            ConstraintInfo {
                tag,
                strength: constraint.strength,
            },
        );
        self.optimize(Objective::Main)?;

        Ok(id)
    }

    /// Remove a constraint from the solver.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), SolverError> {
        let info = self
            .constraints
            .swap_remove(&id)
            .ok_or(SolverError::UnknownConstraint)?;

        self.remove_constraint_effects(&info);

        // Try to remove the marker from the tableau
        if self.rows.swap_remove(&info.tag.marker).is_none() {
            // The marker is not basic - need to pivot it out
            let (leaving, mut row) = self
                .take_marker_leaving_row(info.tag.marker)
                .ok_or(SolverError::InternalError("No leaving row found"))?;
            row.solve_for_symbols(leaving, info.tag.marker);
            self.substitute(info.tag.marker, &row);
        }

        self.optimize(Objective::Main)
    }

    /// Register a variable whose value will be driven by [`Solver::suggest_value`].
    pub fn add_edit_variable(&mut self, var: Variable, strength: Strength) -> Result<(), SolverError> {
        if self.edits.contains_key(&var) {
            return Err(SolverError::DuplicateEditVariable(var));
        }
        let strength = Strength::new(strength.0);
        if strength.is_required() {
            return Err(SolverError::BadRequiredStrength);
        }

        let constraint = Constraint::new(Expression::from_variable(var), Relation::Equal, strength);
        let id = self.add_constraint(&constraint)?;
        let tag = self
            .constraints
            .get(&id)
            .map(|info| info.tag)
            .ok_or(SolverError::InternalError("Edit constraint vanished"))?;

        self.edits.insert(
            var,
            EditInfo {
                tag,
                constraint: id,
                constant: 0.0,
            },
        );
        Ok(())
    }

    /// Stop editing a variable.
    pub fn remove_edit_variable(&mut self, var: Variable) -> Result<(), SolverError> {
        let info = self
            .edits
            .swap_remove(&var)
            .ok_or(SolverError::UnknownEditVariable(var))?;
        self.remove_constraint(info.constraint)
    }

    /// Check whether a variable is being edited.
    pub fn has_edit_variable(&self, var: Variable) -> bool {
        self.edits.contains_key(&var)
    }

    /// Suggest a value for an edit variable and re-solve with the dual simplex.
    pub fn suggest_value(&mut self, var: Variable, value: f64) -> Result<(), SolverError> {
        let info = self
            .edits
            .get_mut(&var)
            .ok_or(SolverError::UnknownEditVariable(var))?;
        let delta = value - info.constant;
        info.constant = value;
        let tag = info.tag;

        self.infeasible_rows.clear();

        // Check first if the positive error variable is basic.
        if let Some(row) = self.rows.get_mut(&tag.marker) {
            if row.add(-delta) < 0.0 {
                self.infeasible_rows.push(tag.marker);
            }
            return self.dual_optimize();
        }

        // Check next if the negative error variable is basic.
        if let Some(other) = tag.other {
            if let Some(row) = self.rows.get_mut(&other) {
                if row.add(delta) < 0.0 {
                    self.infeasible_rows.push(other);
                }
                return self.dual_optimize();
            }
        }

        // Otherwise update each row where the error variables exist.
        for (&symbol, row) in self.rows.iter_mut() {
            let coeff = row.coefficient(tag.marker);
            if coeff != 0.0 && row.add(delta * coeff) < 0.0 && !symbol.is_external() {
                self.infeasible_rows.push(symbol);
            }
        }

        self.dual_optimize()
    }

    /// Update all variable values after solving.
    pub fn update_variables(&mut self) -> Result<(), SolverError> {
        if self
            .rows
            .iter()
            .any(|(s, row)| !s.is_external() && row.constant < -EPSILON)
        {
            return Err(SolverError::UnsatisfiableConstraint);
        }

        for (&var, value) in self.var_data.iter_mut() {
            *value = self
                .rows
                .get(&Symbol::External(var.0))
                .map_or(0.0, |row| row.constant);
        }
        Ok(())
    }

    /// Create a row for a constraint.
    fn create_row(&mut self, constraint: &Constraint) -> (Row, Tag) {
        let expr = &constraint.expression;
        let mut row = Row::new(expr.constant);

        // Add the terms to the row, substituting basic variables
        for (var, coeff) in expr.terms() {
            let symbol = Symbol::External(var.0);
            if let Some(basic_row) = self.rows.get(&symbol) {
                row.insert_row(basic_row, coeff);
            } else {
                row.insert_symbol(symbol, coeff);
            }
        }

        let strength = constraint.strength.0;
        let tag = match constraint.relation {
            Relation::LessOrEqual | Relation::GreaterOrEqual => {
                let coeff = if constraint.relation == Relation::LessOrEqual {
                    1.0
                } else {
                    -1.0
                };

                let slack = self.new_symbol(Symbol::Slack);
                row.insert_symbol(slack, coeff);

                let other = if constraint.strength.is_required() {
                    None
                } else {
                    let error = self.new_symbol(Symbol::Error);
                    row.insert_symbol(error, -coeff);
                    self.objective.insert_symbol(error, strength);
                    Some(error)
                };
                Tag { marker: slack, other }
            }
            Relation::Equal => {
                if constraint.strength.is_required() {
                    let dummy = self.new_symbol(Symbol::Dummy);
                    row.insert_symbol(dummy, 1.0);
                    Tag {
                        marker: dummy,
                        other: None,
                    }
                } else {
                    let errplus = self.new_symbol(Symbol::Error);
                    let errminus = self.new_symbol(Symbol::Error);
                    row.insert_symbol(errplus, -1.0);
                    row.insert_symbol(errminus, 1.0);
                    self.objective.insert_symbol(errplus, strength);
                    self.objective.insert_symbol(errminus, strength);
                    Tag {
                        marker: errplus,
                        other: Some(errminus),
                    }
                }
            }
        };

        // Ensure the constant is non-negative
        if row.constant < 0.0 {
            row.reverse_sign();
        }

        (row, tag)
    }

    /// Generate a new symbol.
    fn new_symbol(&mut self, kind: fn(usize) -> Symbol) -> Symbol {
        let id = self.symbol_counter;
        self.symbol_counter += 1;
        kind(id)
    }

    /// Choose a subject for the row.
    fn choose_subject(row: &Row, tag: &Tag) -> Option<Symbol> {
        if let Some(&symbol) = row.cells.keys().find(|s| s.is_external()) {
            return Some(symbol);
        }

        std::iter::once(tag.marker)
            .chain(tag.other)
            .find(|s| s.is_pivotable() && row.coefficient(*s) < 0.0)
    }

    /// Add the row through an artificial variable (phase 1).
    ///
    /// Returns whether the row could be satisfied. When it cannot, the artificial
    /// variable is still basic, so dropping its row restores the prior system.
    fn add_with_artificial_variable(&mut self, row: &Row) -> Result<bool, SolverError> {
        let art = self.new_symbol(Symbol::Slack);
        self.rows.insert(art, row.clone());
        self.artificial = Some(row.clone());

        // Optimize the artificial objective. This is successful
        // only if the artificial objective is optimized to zero.
        let optimized = self.optimize(Objective::Artificial);
        let success = self
            .artificial
            .take()
            .is_some_and(|objective| near_zero(objective.constant));
        if let Err(err) = optimized {
            self.rows.swap_remove(&art);
            return Err(err);
        }

        if let Some(mut art_row) = self.rows.swap_remove(&art) {
            if !success || art_row.cells.is_empty() {
                return Ok(success);
            }
            let Some(entering) = art_row.cells.keys().copied().find(Symbol::is_pivotable) else {
                return Ok(false);
            };
            art_row.solve_for_symbols(art, entering);
            self.substitute(entering, &art_row);
            self.rows.insert(entering, art_row);
        }

        // Remove the artificial variable from the tableau
        for row in self.rows.values_mut() {
            row.remove(art);
        }
        self.objective.remove(art);
        Ok(success)
    }

    /// Substitute a symbol throughout the tableau.
    fn substitute(&mut self, symbol: Symbol, row: &Row) {
        for (&basic, r) in self.rows.iter_mut() {
            r.substitute(symbol, row);
            if !basic.is_external() && r.constant < 0.0 {
                self.infeasible_rows.push(basic);
            }
        }
        self.objective.substitute(symbol, row);
        if let Some(art) = self.artificial.as_mut() {
            art.substitute(symbol, row);
        }
    }

    fn objective_row(&self, objective: Objective) -> Option<&Row> {
        match objective {
            Objective::Main => Some(&self.objective),
            Objective::Artificial => self.artificial.as_ref(),
        }
    }

    /// Optimize an objective function using the primal simplex with Bland's rule.
    fn optimize(&mut self, objective: Objective) -> Result<(), SolverError> {
        // Only edit suggestions consume infeasible rows
        self.infeasible_rows.clear();
        loop {
            // Smallest symbol with a negative objective coefficient enters
            let entering = self.objective_row(objective).and_then(|row| {
                row.cells
                    .iter()
                    .filter(|(s, c)| !s.is_dummy() && **c < 0.0)
                    .map(|(&s, _)| s)
                    .min()
            });

            let Some(entering) = entering else {
                return Ok(()); // Optimal
            };

            let (leaving, mut row) = self
                .take_leaving_row(entering)
                .ok_or(SolverError::Unbounded)?;

            // Pivot
            row.solve_for_symbols(leaving, entering);
            self.substitute(entering, &row);
            self.rows.insert(entering, row);
        }
    }

    /// Find and remove the row to leave the basis (minimum ratio test).
    fn take_leaving_row(&mut self, entering: Symbol) -> Option<(Symbol, Row)> {
        let mut min_ratio = f64::MAX;
        let mut leaving: Option<Symbol> = None;

        for (&symbol, row) in &self.rows {
            if symbol.is_external() {
                continue;
            }

            let coeff = row.coefficient(entering);
            if coeff < 0.0 {
                let ratio = -row.constant / coeff;
                let better = match leaving {
                    None => true,
                    Some(current) => {
                        ratio < min_ratio - EPSILON
                            || ((ratio - min_ratio).abs() <= EPSILON && symbol < current)
                    }
                };
                if better {
                    min_ratio = ratio;
                    leaving = Some(symbol);
                }
            }
        }

        let leaving = leaving?;
        self.rows.swap_remove(&leaving).map(|row| (leaving, row))
    }

    /// Find and remove the row used to pivot a non-basic marker out of the tableau.
    fn take_marker_leaving_row(&mut self, marker: Symbol) -> Option<(Symbol, Row)> {
        // A basic dummy stands for a redundant required equality. Pivoting
        // through its row makes that dummy non-basic again, where it is held
        // at zero. Any other row would mix non-dummy terms into it.
        let redundant = self
            .rows
            .iter()
            .find(|(symbol, row)| symbol.is_dummy() && row.coefficient(marker) != 0.0)
            .map(|(&symbol, _)| symbol);
        if let Some(leaving) = redundant {
            return self.rows.swap_remove(&leaving).map(|row| (leaving, row));
        }

        let mut r1 = f64::MAX;
        let mut r2 = f64::MAX;
        let mut first = None;
        let mut second = None;
        let mut third = None;

        for (&symbol, row) in &self.rows {
            let c = row.coefficient(marker);
            if c == 0.0 {
                continue;
            }
            if symbol.is_external() {
                third = Some(symbol);
            } else if c < 0.0 {
                let r = -row.constant / c;
                if r < r1 {
                    r1 = r;
                    first = Some(symbol);
                }
            } else {
                let r = row.constant / c;
                if r < r2 {
                    r2 = r;
                    second = Some(symbol);
                }
            }
        }

        let leaving = first.or(second).or(third)?;
        self.rows.swap_remove(&leaving).map(|row| (leaving, row))
    }

    /// Remove a constraint's error terms from the objective.
    fn remove_constraint_effects(&mut self, info: &ConstraintInfo) {
        for marker in std::iter::once(info.tag.marker).chain(info.tag.other) {
            if marker.is_error() {
                self.remove_marker_effects(marker, info.strength.0);
            }
        }
    }

    fn remove_marker_effects(&mut self, marker: Symbol, strength: f64) {
        if let Some(row) = self.rows.get(&marker) {
            self.objective.insert_row(row, -strength);
        } else {
            self.objective.insert_symbol(marker, -strength);
        }
    }

    /// Restore primal feasibility after edit suggestions.
    fn dual_optimize(&mut self) -> Result<(), SolverError> {
        while let Some(leaving) = self.infeasible_rows.pop() {
            let infeasible = self
                .rows
                .get(&leaving)
                .is_some_and(|row| row.constant < 0.0);
            if !infeasible {
                continue;
            }
            let Some(mut row) = self.rows.swap_remove(&leaving) else {
                continue;
            };

            let entering = self
                .dual_entering_symbol(&row)
                .ok_or(SolverError::InternalError("Dual optimize failed"))?;
            row.solve_for_symbols(leaving, entering);
            self.substitute(entering, &row);
            self.rows.insert(entering, row);
        }
        Ok(())
    }

    fn dual_entering_symbol(&self, row: &Row) -> Option<Symbol> {
        let mut ratio = f64::MAX;
        let mut entering = None;
        for (&symbol, &c) in &row.cells {
            if c > 0.0 && !symbol.is_dummy() {
                let r = self.objective.coefficient(symbol) / c;
                if r < ratio {
                    ratio = r;
                    entering = Some(symbol);
                }
            }
        }
        entering
    }
}

impl ArithmeticSolver for Solver {
    fn new_variable(&mut self) -> Variable {
        Solver::new_variable(self)
    }

    fn add_constraint(&mut self, constraint: &Constraint) -> Result<ConstraintId, SolverError> {
        Solver::add_constraint(self, constraint)
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), SolverError> {
        Solver::remove_constraint(self, id)
    }

    fn update_variables(&mut self) -> Result<(), SolverError> {
        Solver::update_variables(self)
    }

    fn value(&self, var: Variable) -> f64 {
        self.var_data
            .get(&var)
            .copied()
            .unwrap_or_else(|| self.get_value(var))
    }

    fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn eq(var: Variable, value: f64) -> Constraint {
        Constraint::equal(var, value)
    }

    fn value(solver: &Solver, var: Variable) -> f64 {
        ArithmeticSolver::value(solver, var)
    }

    #[test]
    fn test_create_variable() {
        let mut solver = Solver::new();
        let v1 = solver.new_variable();
        let v2 = solver.new_variable();
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_simple_equality() {
        let mut solver = Solver::new();
        let x = solver.new_variable();

        solver.add_constraint(&eq(x, 100.0)).unwrap();

        solver.update_variables().unwrap();
        assert!((value(&solver, x) - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_two_variables() {
        let mut solver = Solver::new();
        let x = solver.new_variable();
        let y = solver.new_variable();

        solver.add_constraint(&eq(x, 100.0)).unwrap();

        // y == x + 50
        let expr = Expression::from(y).plus(x, -1.0);
        solver.add_constraint(&Constraint::equal(expr, 50.0)).unwrap();

        solver.update_variables().unwrap();
        assert!((value(&solver, x) - 100.0).abs() < 0.001);
        assert!((value(&solver, y) - 150.0).abs() < 0.001);
    }

    #[test]
    fn test_inequality() {
        let mut solver = Solver::new();
        let x = solver.new_variable();

        solver
            .add_constraint(&Constraint::greater_or_equal(x, 50.0))
            .unwrap();
        solver
            .add_constraint(&eq(x, 100.0).with_strength(Strength::WEAK))
            .unwrap();

        solver.update_variables().unwrap();
        assert!((value(&solver, x) - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_strength_ordering() {
        let mut solver = Solver::new();
        let x = solver.new_variable();

        solver
            .add_constraint(&eq(x, 100.0).with_strength(Strength::WEAK))
            .unwrap();
        solver
            .add_constraint(&eq(x, 50.0).with_strength(Strength::STRONG))
            .unwrap();

        solver.update_variables().unwrap();
        // Strong constraint should win
        assert!((value(&solver, x) - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_conflicting_equalities_rejected() {
        let mut solver = Solver::new();
        let x = solver.new_variable();

        solver.add_constraint(&eq(x, 1.0)).unwrap();
        assert_eq!(
            solver.add_constraint(&eq(x, 2.0)),
            Err(SolverError::UnsatisfiableConstraint)
        );
        assert_eq!(solver.constraint_count(), 1);

        solver.update_variables().unwrap();
        assert!((value(&solver, x) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_redundant_equality_can_be_removed() {
        let mut solver = Solver::new();
        let x = solver.new_variable();

        let first = solver.add_constraint(&eq(x, 5.0)).unwrap();
        let second = solver.add_constraint(&eq(x, 5.0)).unwrap();
        solver.remove_constraint(second).unwrap();
        solver.remove_constraint(first).unwrap();
        assert_eq!(solver.constraint_count(), 0);

        // x is free again
        solver.add_constraint(&eq(x, 7.0)).unwrap();
        solver.update_variables().unwrap();
        assert!((value(&solver, x) - 7.0).abs() < 0.001);
    }

    #[test]
    fn test_first_of_two_equal_pins_can_be_removed() {
        let mut solver = Solver::new();
        let x = solver.new_variable();

        let first = solver.add_constraint(&eq(x, 5.0)).unwrap();
        solver.add_constraint(&Constraint::greater_or_equal(x, 0.0)).unwrap();
        solver.add_constraint(&eq(x, 5.0)).unwrap();
        solver.remove_constraint(first).unwrap();

        // The second pin still holds x in place.
        assert_eq!(
            solver.add_constraint(&eq(x, 7.0)),
            Err(SolverError::UnsatisfiableConstraint)
        );
        solver.update_variables().unwrap();
        assert!((value(&solver, x) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_scaled_equality_survives_removing_its_twin() {
        let mut solver = Solver::new();
        let v0 = solver.new_variable();
        let _v1 = solver.new_variable();
        let v2 = solver.new_variable();

        let first = solver
            .add_constraint(&Constraint::equal(Expression::from_term(v0, -1.0), 5.0))
            .unwrap();
        let active = [
            Constraint::less_or_equal(Expression::sum([(v2, -2.0), (v0, 2.0)]), 3.0),
            Constraint::less_or_equal(Expression::from_term(v2, -3.0), -7.0),
            Constraint::equal(Expression::from_term(v0, -2.0), 10.0),
        ];
        for constraint in &active {
            solver.add_constraint(constraint).unwrap();
        }
        solver.remove_constraint(first).unwrap();
        solver.update_variables().unwrap();

        for constraint in &active {
            assert!(constraint.holds(|v| value(&solver, v), 1e-6), "violated: {constraint}");
        }
        assert!((value(&solver, v0) + 5.0).abs() < 0.001);
    }

    #[test]
    fn test_reordered_equality_survives_removing_its_twin() {
        let mut solver = Solver::new();
        let v0 = solver.new_variable();
        let v2 = solver.new_variable();

        let first = solver
            .add_constraint(&Constraint::equal(Expression::sum([(v2, 2.0), (v0, -1.0)]), 1.0))
            .unwrap();
        let second = Constraint::equal(Expression::sum([(v0, -1.0), (v2, 2.0)]), 1.0);
        solver.add_constraint(&second).unwrap();
        solver.remove_constraint(first).unwrap();

        solver.add_constraint(&eq(v0, 3.0)).unwrap();
        solver.update_variables().unwrap();
        assert!(second.holds(|v| value(&solver, v), 1e-6));
        assert!((value(&solver, v2) - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_bound_conflict_through_sum() {
        // x + y == 100, x >= 60, then y == 70 forces x == 30
        let mut solver = Solver::new();
        let x = solver.new_variable();
        let y = solver.new_variable();

        solver
            .add_constraint(&Constraint::equal(Expression::from(x).plus(y, 1.0), 100.0))
            .unwrap();
        solver
            .add_constraint(&Constraint::greater_or_equal(x, 60.0))
            .unwrap();
        assert_eq!(
            solver.add_constraint(&eq(y, 70.0)),
            Err(SolverError::UnsatisfiableConstraint)
        );

        let pin = solver.add_constraint(&eq(y, 30.0)).unwrap();
        solver.update_variables().unwrap();
        assert!((value(&solver, x) - 70.0).abs() < 0.001);
        assert!((value(&solver, y) - 30.0).abs() < 0.001);

        solver.remove_constraint(pin).unwrap();
        solver.add_constraint(&eq(y, 20.0)).unwrap();
        solver.update_variables().unwrap();
        assert!((value(&solver, x) - 80.0).abs() < 0.001);
    }

    #[test]
    fn test_removal_restores_feasibility() {
        let mut solver = Solver::new();
        let x = solver.new_variable();

        let low = solver
            .add_constraint(&Constraint::greater_or_equal(x, 30.0))
            .unwrap();
        assert!(solver.add_constraint(&eq(x, 10.0)).is_err());

        solver.remove_constraint(low).unwrap();
        solver.add_constraint(&eq(x, 10.0)).unwrap();
        solver.update_variables().unwrap();
        assert!((value(&solver, x) - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_remove_unknown_constraint() {
        let mut solver = Solver::new();
        assert_eq!(
            solver.remove_constraint(ConstraintId(42)),
            Err(SolverError::UnknownConstraint)
        );
    }

    #[test]
    fn test_edit_variable() {
        let mut solver = Solver::new();
        let left = solver.new_variable();
        let width = solver.new_variable();
        let right = solver.new_variable();

        // right == left + width, width == 40, left >= 0
        let expr = Expression::from(right).plus(left, -1.0).plus(width, -1.0);
        solver.add_constraint(&Constraint::equal(expr, 0.0)).unwrap();
        solver.add_constraint(&eq(width, 40.0)).unwrap();
        solver
            .add_constraint(&Constraint::greater_or_equal(left, 0.0))
            .unwrap();

        solver.add_edit_variable(left, Strength::STRONG).unwrap();
        assert!(solver.has_edit_variable(left));

        solver.suggest_value(left, 25.0).unwrap();
        solver.update_variables().unwrap();
        assert!((value(&solver, right) - 65.0).abs() < 0.001);

        // The required lower bound wins over the suggestion
        solver.suggest_value(left, -10.0).unwrap();
        solver.update_variables().unwrap();
        assert!(value(&solver, left).abs() < 0.001);
        assert!((value(&solver, right) - 40.0).abs() < 0.001);

        solver.remove_edit_variable(left).unwrap();
        assert!(!solver.has_edit_variable(left));
    }

    #[test]
    fn test_edit_variable_errors() {
        let mut solver = Solver::new();
        let x = solver.new_variable();

        assert_eq!(
            solver.add_edit_variable(x, Strength::REQUIRED),
            Err(SolverError::BadRequiredStrength)
        );
        assert_eq!(
            solver.suggest_value(x, 1.0),
            Err(SolverError::UnknownEditVariable(x))
        );
        solver.add_edit_variable(x, Strength::MEDIUM).unwrap();
        assert_eq!(
            solver.add_edit_variable(x, Strength::MEDIUM),
            Err(SolverError::DuplicateEditVariable(x))
        );
    }
}
