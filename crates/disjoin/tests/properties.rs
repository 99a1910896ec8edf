//! Property-based tests for the disjunction search
//!
//! Tests:
//! - Reported values satisfy every active constraint
//! - No false negatives against exhaustive enumeration
//! - Pruning never changes the outcome
//! - The backend holds exactly the active constraints after a solve
//! - Alternative order does not change satisfiability

use disjoin::{
    ArithmeticSolver, Constraint, DisjoinError, DisjunctiveSolver, Expression, PruneMode,
    SearchConfig, SolveResult, Solver, Variable,
};
use proptest::collection::vec;
use proptest::prelude::*;

/// A constraint over variable indices, turned into a real constraint once handles exist.
#[derive(Debug, Clone)]
enum Atom {
    Pin(usize, i32),
    AtLeast(usize, i32),
    AtMost(usize, i32),
    SumAtMost(usize, usize, i32),
    /// `a - b >= c`
    Diff(usize, usize, i32),
}

impl Atom {
    fn build(&self, vars: &[Variable]) -> Constraint {
        match *self {
            Atom::Pin(v, c) => Constraint::equal(vars[v], c as f64),
            Atom::AtLeast(v, c) => Constraint::greater_or_equal(vars[v], c as f64),
            Atom::AtMost(v, c) => Constraint::less_or_equal(vars[v], c as f64),
            Atom::SumAtMost(a, b, c) => {
                Constraint::less_or_equal(Expression::from(vars[a]).plus(vars[b], 1.0), c as f64)
            }
            Atom::Diff(a, b, c) => {
                Constraint::greater_or_equal(Expression::from(vars[a]).plus(vars[b], -1.0), c as f64)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Case {
    vars: usize,
    baseline: Vec<Atom>,
    disjunctions: Vec<Vec<Vec<Atom>>>,
}

fn atom(vars: usize) -> impl Strategy<Value = Atom> {
    prop_oneof![
        3 => (0..vars, -10..10i32).prop_map(|(v, c)| Atom::Pin(v, c)),
        1 => (0..vars, -10..10i32).prop_map(|(v, c)| Atom::AtLeast(v, c)),
        1 => (0..vars, -10..10i32).prop_map(|(v, c)| Atom::AtMost(v, c)),
        1 => (0..vars, 0..vars, -20..20i32).prop_map(|(a, b, c)| Atom::SumAtMost(a, b, c)),
        1 => (0..vars, 0..vars, -10..10i32).prop_map(|(a, b, c)| Atom::Diff(a, b, c)),
    ]
}

fn cases() -> impl Strategy<Value = Case> {
    (1usize..=3)
        .prop_flat_map(|vars| {
            (
                Just(vars),
                vec(atom(vars), 0..3),
                vec(vec(vec(atom(vars), 0..3), 1..4), 0..4),
            )
        })
        .prop_map(|(vars, baseline, disjunctions)| Case {
            vars,
            baseline,
            disjunctions,
        })
}

struct Run {
    solver: DisjunctiveSolver,
    vars: Vec<Variable>,
    result: SolveResult,
}

/// Solve a case; `None` when its baseline alone is infeasible.
fn run(case: &Case, config: SearchConfig) -> Option<Run> {
    let mut solver = DisjunctiveSolver::with_config(config);
    let vars: Vec<Variable> = (0..case.vars)
        .map(|i| solver.new_variable(format!("v{i}")).unwrap())
        .collect();

    for atom in &case.baseline {
        match solver.add_conjunctive_constraint(atom.build(&vars)) {
            Ok(()) => {}
            Err(DisjoinError::BaselineInfeasible { .. }) => return None,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    for alternatives in &case.disjunctions {
        let alternatives = alternatives
            .iter()
            .map(|alt| alt.iter().map(|a| a.build(&vars)).collect())
            .collect();
        solver.add_disjunction(alternatives).unwrap();
    }

    let result = solver.solve().unwrap();
    Some(Run {
        solver,
        vars,
        result,
    })
}

fn combinations(sizes: &[usize]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for &n in sizes {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..n).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    out
}

/// Try every combination on a fresh backend.
fn brute_force(case: &Case) -> bool {
    let sizes: Vec<usize> = case.disjunctions.iter().map(Vec::len).collect();
    combinations(&sizes).into_iter().any(|choice| {
        let mut backend = Solver::new();
        let vars: Vec<Variable> = (0..case.vars).map(|_| backend.new_variable()).collect();
        let active = case
            .baseline
            .iter()
            .chain(choice.iter().zip(&case.disjunctions).flat_map(|(&i, d)| &d[i]));
        for atom in active {
            if backend.add_constraint(&atom.build(&vars)).is_err() {
                return false;
            }
        }
        backend.update_variables().is_ok()
    })
}

fn active_constraints(case: &Case, choices: &[usize], vars: &[Variable]) -> Vec<Constraint> {
    case.baseline
        .iter()
        .chain(choices.iter().zip(&case.disjunctions).flat_map(|(&i, d)| &d[i]))
        .map(|a| a.build(vars))
        .collect()
}

fn with_mode(mode: PruneMode) -> SearchConfig {
    SearchConfig::default().with_prune(mode)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn solutions_satisfy_active_constraints(case in cases()) {
        let Some(run) = run(&case, SearchConfig::default()) else {
            return Ok(());
        };
        if let SolveResult::Satisfied(solution) = &run.result {
            prop_assert_eq!(solution.choices.len(), case.disjunctions.len());
            let value = |v: Variable| run.solver.value(&format!("v{}", v.id())).unwrap();
            for constraint in active_constraints(&case, &solution.choices, &run.vars) {
                prop_assert!(constraint.holds(value, 1e-6), "violated: {}", constraint);
            }
        }
    }

    #[test]
    fn no_false_negatives(case in cases()) {
        let Some(run) = run(&case, with_mode(PruneMode::Off)) else {
            return Ok(());
        };
        prop_assert_eq!(run.result.satisfiable(), brute_force(&case));
    }

    #[test]
    fn pruning_never_changes_the_outcome(case in cases()) {
        let Some(off) = run(&case, with_mode(PruneMode::Off)) else {
            return Ok(());
        };
        for mode in [PruneMode::Bounds, PruneMode::Propagate] {
            let pruned = run(&case, with_mode(mode)).unwrap();
            prop_assert_eq!(pruned.result.satisfiable(), off.result.satisfiable());
            // Pruning only skips alternatives the solver would reject, so the
            // search takes the same path.
            prop_assert_eq!(
                pruned.result.solution().map(|s| s.choices.clone()),
                off.result.solution().map(|s| s.choices.clone())
            );
            prop_assert_eq!(
                pruned.result.stats().attempts,
                off.result.stats().attempts
            );
            prop_assert_eq!(
                pruned.result.stats().pruned + pruned.result.stats().solver_rejections,
                off.result.stats().solver_rejections
            );
        }
    }

    #[test]
    fn backend_holds_exactly_the_active_constraints(case in cases()) {
        let Some(mut run) = run(&case, SearchConfig::default()) else {
            return Ok(());
        };
        let expected = match &run.result {
            SolveResult::Satisfied(solution) => active_constraints(&case, &solution.choices, &run.vars).len(),
            SolveResult::Unsatisfied(_) => case.baseline.len(),
        };
        prop_assert_eq!(run.solver.backend().constraint_count(), expected);

        // A second solve retracts and rebuilds the same state.
        let again = run.solver.solve().unwrap();
        prop_assert_eq!(&again.solution().map(|s| &s.choices), &run.result.solution().map(|s| &s.choices));
        prop_assert_eq!(run.solver.backend().constraint_count(), expected);
    }

    #[test]
    fn alternative_order_does_not_change_satisfiability(case in cases(), rotate in 0usize..3) {
        let Some(original) = run(&case, SearchConfig::default()) else {
            return Ok(());
        };
        let mut permuted = case.clone();
        for alternatives in &mut permuted.disjunctions {
            alternatives.reverse();
            let len = alternatives.len();
            alternatives.rotate_left(rotate % len);
        }
        let permuted = run(&permuted, SearchConfig::default()).unwrap();
        prop_assert_eq!(permuted.result.satisfiable(), original.result.satisfiable());
    }

    #[test]
    fn pins_on_one_axis(
        lower in 0..10i32,
        upper in 0..10i32,
        pins in vec(vec(0..10i32, 1..4), 1..4),
    ) {
        let mut solver = DisjunctiveSolver::new();
        let x = solver.new_variable("x").unwrap();
        solver.add_conjunctive_constraint(Constraint::greater_or_equal(x, lower as f64)).unwrap();
        let bounded = solver.add_conjunctive_constraint(Constraint::less_or_equal(x, upper as f64));
        if lower > upper {
            prop_assert!(
                matches!(bounded, Err(DisjoinError::BaselineInfeasible { .. })),
                "expected infeasible baseline"
            );
            return Ok(());
        }
        bounded.unwrap();

        for values in &pins {
            let alternatives = values.iter().map(|&v| vec![Constraint::equal(x, v as f64)]).collect();
            solver.add_disjunction(alternatives).unwrap();
        }

        let expected = (lower..=upper).any(|v| pins.iter().all(|d| d.contains(&v)));
        let result = solver.solve().unwrap();
        prop_assert_eq!(result.satisfiable(), expected);
        if expected {
            let value = solver.value("x").unwrap();
            prop_assert!(pins.iter().all(|d| d.iter().any(|&v| (v as f64 - value).abs() < 1e-9)));
        }
    }
}
