//! Feasibility pre-check for candidate alternatives.
//!
//! The pruner tracks, per variable, the tightest constant interval implied by
//! the required constraints already in the solver (baseline plus committed
//! alternatives). A candidate alternative whose own required constraints
//! empty one of those intervals cannot be accepted by the solver, so the
//! search skips it without an add/solve/remove round trip.
//!
//! Everything here only ever weakens the conclusion "infeasible": intervals are
//! widened by a relative tolerance before they are declared empty, so the
//! pruner never rejects an alternative the solver would accept.

use rustc_hash::FxHashMap;

use disjoin_core::{Constraint, Relation, Variable};

use crate::config::PruneMode;

/// Relative slack applied before an interval counts as empty.
const PRUNE_TOLERANCE: f64 = 1e-6;

/// Upper bound on propagation sweeps per check.
const PROPAGATION_ROUNDS: usize = 8;

/// A closed interval of admissible values; infinite ends are unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub const UNBOUNDED: Interval = Interval {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    pub fn point(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    pub fn at_least(value: f64) -> Self {
        Self {
            lower: value,
            upper: f64::INFINITY,
        }
    }

    pub fn at_most(value: f64) -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: value,
        }
    }

    pub fn intersect(&self, other: &Interval) -> Interval {
        Interval {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    /// Empty beyond tolerance.
    pub fn is_empty(&self) -> bool {
        self.lower > self.upper + tolerance(self.lower, self.upper)
    }

    /// Strictly narrower than `other` beyond tolerance on either end.
    fn tighter_than(&self, other: &Interval) -> bool {
        let tol = tolerance(other.lower, other.upper);
        self.lower > other.lower + tol || self.upper < other.upper - tol
    }
}

fn tolerance(a: f64, b: f64) -> f64 {
    let scale = [a, b]
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    PRUNE_TOLERANCE * (1.0 + scale)
}

/// Why an alternative was rejected without consulting the solver: the
/// admissible interval of `variable` collapsed to `lower > upper`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneConflict {
    pub variable: Variable,
    pub lower: f64,
    pub upper: f64,
}

/// Restore point for [`Pruner::undo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneMark {
    trail: usize,
    linear: usize,
}

/// Constant interval of a required single-variable constraint.
fn unit_bound(constraint: &Constraint) -> Option<(Variable, Interval)> {
    if !constraint.strength.is_required() || constraint.expression.len() != 1 {
        return None;
    }
    let (var, coeff) = constraint.expression.terms().next()?;
    let value = -constraint.expression.constant / coeff;
    let relation = match (constraint.relation, coeff < 0.0) {
        (Relation::LessOrEqual, true) => Relation::GreaterOrEqual,
        (Relation::GreaterOrEqual, true) => Relation::LessOrEqual,
        (relation, _) => relation,
    };
    let interval = match relation {
        Relation::Equal => Interval::point(value),
        Relation::LessOrEqual => Interval::at_most(value),
        Relation::GreaterOrEqual => Interval::at_least(value),
    };
    Some((var, interval))
}

fn is_linear(constraint: &Constraint) -> bool {
    constraint.strength.is_required() && constraint.expression.len() > 1
}

/// Candidate-local view of the committed bounds.
struct Scratch<'a> {
    base: &'a FxHashMap<Variable, Interval>,
    overlay: FxHashMap<Variable, Interval>,
}

impl<'a> Scratch<'a> {
    fn new(base: &'a FxHashMap<Variable, Interval>) -> Self {
        Self {
            base,
            overlay: FxHashMap::default(),
        }
    }

    fn get(&self, var: Variable) -> Interval {
        self.overlay
            .get(&var)
            .or_else(|| self.base.get(&var))
            .copied()
            .unwrap_or(Interval::UNBOUNDED)
    }

    /// Narrow a variable; `Ok(true)` if the interval actually shrank.
    fn tighten(&mut self, var: Variable, interval: Interval) -> Result<bool, PruneConflict> {
        let current = self.get(var);
        let next = current.intersect(&interval);
        if next.is_empty() {
            return Err(PruneConflict {
                variable: var,
                lower: next.lower,
                upper: next.upper,
            });
        }
        if next.tighter_than(&current) {
            self.overlay.insert(var, next);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Interval implied for `target` by one linear constraint and the other variables' intervals.
fn derive(scratch: &Scratch<'_>, constraint: &Constraint, target: Variable, coeff: f64) -> Interval {
    let expr = &constraint.expression;
    // Range of the remaining terms; lo never reaches +inf and hi never -inf.
    let (mut lo, mut hi) = (expr.constant, expr.constant);
    for (var, c) in expr.terms().filter(|(var, _)| *var != target) {
        let range = scratch.get(var);
        if c > 0.0 {
            lo += c * range.lower;
            hi += c * range.upper;
        } else {
            lo += c * range.upper;
            hi += c * range.lower;
        }
    }

    let (t_lo, t_hi) = match constraint.relation {
        Relation::Equal => (-hi, -lo),
        Relation::LessOrEqual => (f64::NEG_INFINITY, -lo),
        Relation::GreaterOrEqual => (-hi, f64::INFINITY),
    };
    if coeff > 0.0 {
        Interval {
            lower: t_lo / coeff,
            upper: t_hi / coeff,
        }
    } else {
        Interval {
            lower: t_hi / coeff,
            upper: t_lo / coeff,
        }
    }
}

/// Bounds-based feasibility pre-check with an undo trail.
#[derive(Debug, Clone, Default)]
pub struct Pruner {
    mode: PruneMode,
    bounds: FxHashMap<Variable, Interval>,
    /// Previous interval of every tightened variable, for undo
    trail: Vec<(Variable, Option<Interval>)>,
    /// Committed required constraints over two or more variables
    linear: Vec<Constraint>,
}

impl Pruner {
    pub fn new(mode: PruneMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> PruneMode {
        self.mode
    }

    /// Change the mode; committed bounds are tracked regardless of mode.
    pub fn set_mode(&mut self, mode: PruneMode) {
        self.mode = mode;
    }

    /// Current committed interval of a variable.
    pub fn bounds(&self, var: Variable) -> Interval {
        self.bounds.get(&var).copied().unwrap_or(Interval::UNBOUNDED)
    }

    /// Record constraints the solver has accepted.
    pub fn commit(&mut self, constraints: &[Constraint]) {
        for constraint in constraints {
            if let Some((var, interval)) = unit_bound(constraint) {
                let old = self.bounds.get(&var).copied();
                let next = old.unwrap_or(Interval::UNBOUNDED).intersect(&interval);
                if old != Some(next) {
                    self.trail.push((var, old));
                    self.bounds.insert(var, next);
                }
            } else if is_linear(constraint) {
                self.linear.push(constraint.clone());
            }
        }
    }

    pub fn mark(&self) -> PruneMark {
        PruneMark {
            trail: self.trail.len(),
            linear: self.linear.len(),
        }
    }

    /// Forget everything committed since `mark`.
    pub fn undo(&mut self, mark: PruneMark) {
        while self.trail.len() > mark.trail {
            let Some((var, old)) = self.trail.pop() else {
                break;
            };
            match old {
                Some(interval) => self.bounds.insert(var, interval),
                None => self.bounds.remove(&var),
            };
        }
        self.linear.truncate(mark.linear);
    }

    /// Reject the candidate if it provably contradicts committed constraints.
    pub fn check(&self, candidate: &[Constraint]) -> Result<(), PruneConflict> {
        if self.mode == PruneMode::Off {
            return Ok(());
        }

        let mut scratch = Scratch::new(&self.bounds);
        for (var, interval) in candidate.iter().filter_map(unit_bound) {
            scratch.tighten(var, interval)?;
        }

        if self.mode == PruneMode::Propagate {
            let linear: Vec<&Constraint> = self
                .linear
                .iter()
                .chain(candidate.iter().filter(|c| is_linear(c)))
                .collect();
            for _ in 0..PROPAGATION_ROUNDS {
                let mut changed = false;
                for constraint in &linear {
                    for (target, coeff) in constraint.expression.terms() {
                        let derived = derive(&scratch, constraint, target, coeff);
                        changed |= scratch.tighten(target, derived)?;
                    }
                }
                if !changed {
                    break;
                }
            }
        }

        Ok(())
    }
}
