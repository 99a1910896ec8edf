//! Result reporting: solutions on success, rejection traces on failure.

use std::fmt;

use indexmap::IndexMap;

use crate::disjunction::DisjunctionId;

/// Counters collected during one `solve()` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchStats {
    /// Alternatives considered, pruned or not.
    pub attempts: u64,
    /// Alternatives rejected by the pre-check.
    pub pruned: u64,
    /// Alternatives rejected by the arithmetic solver.
    pub solver_rejections: u64,
    /// Committed alternatives undone because nothing below them worked.
    pub backtracks: u64,
    /// Deepest number of simultaneously committed alternatives.
    pub max_depth: usize,
}

/// Why an alternative was not kept.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectReason {
    /// The pre-check emptied the admissible interval of `variable`.
    Pruned { variable: String, lower: f64, upper: f64 },
    /// The solver refused the constraint at this index within the alternative.
    Infeasible { constraint: usize },
    /// The alternative was consistent, but no choice for the later disjunctions was.
    NoCompletion,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Pruned {
                variable,
                lower,
                upper,
            } => write!(f, "pruned: {} needs {} <= {} <= {}", variable, lower, variable, upper),
            RejectReason::Infeasible { constraint } => {
                write!(f, "infeasible at constraint {}", constraint)
            }
            RejectReason::NoCompletion => write!(f, "no completion for later disjunctions"),
        }
    }
}

/// First reason an alternative was rejected, and how often it was rejected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rejection {
    pub reason: RejectReason,
    pub count: u64,
}

/// Rejected alternatives of one disjunction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisjunctionTrace {
    pub disjunction: DisjunctionId,
    pub label: Option<String>,
    /// Keyed by alternative index, in first-rejection order.
    pub rejected: IndexMap<usize, Rejection>,
}

impl DisjunctionTrace {
    pub(crate) fn new(disjunction: DisjunctionId, label: Option<String>) -> Self {
        Self {
            disjunction,
            label,
            rejected: IndexMap::new(),
        }
    }

    pub(crate) fn reject(&mut self, alternative: usize, reason: RejectReason) {
        self.rejected
            .entry(alternative)
            .and_modify(|r| r.count += 1)
            .or_insert(Rejection { reason, count: 1 });
    }
}

/// Diagnostic for an unsatisfiable system. Not guaranteed to be minimal.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conflict {
    /// One trace per disjunction the search reached, in decision order.
    pub traces: Vec<DisjunctionTrace>,
    pub stats: SearchStats,
}

impl Conflict {
    pub fn trace(&self, disjunction: DisjunctionId) -> Option<&DisjunctionTrace> {
        self.traces.iter().find(|t| t.disjunction == disjunction)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "no combination of alternatives is consistent")?;
        for trace in &self.traces {
            match &trace.label {
                Some(label) => writeln!(f, "  disjunction {} ({}):", trace.disjunction, label)?,
                None => writeln!(f, "  disjunction {}:", trace.disjunction)?,
            }
            for (alternative, rejection) in &trace.rejected {
                write!(f, "    alternative {}: {}", alternative, rejection.reason)?;
                if rejection.count > 1 {
                    write!(f, " (x{})", rejection.count)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Values and choices of a satisfying combination.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Every registered variable, in registration order.
    pub values: IndexMap<String, f64>,
    /// Chosen alternative index, indexed by disjunction registration order.
    pub choices: Vec<usize>,
    pub stats: SearchStats,
}

impl Solution {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// The alternative committed for a disjunction.
    pub fn chosen(&self, disjunction: DisjunctionId) -> Option<usize> {
        self.choices.get(disjunction.0).copied()
    }
}

/// Outcome of `solve()`. Global unsatisfiability is a normal result, not an error.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveResult {
    Satisfied(Solution),
    Unsatisfied(Conflict),
}

impl SolveResult {
    pub fn satisfiable(&self) -> bool {
        matches!(self, SolveResult::Satisfied(_))
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveResult::Satisfied(solution) => Some(solution),
            SolveResult::Unsatisfied(_) => None,
        }
    }

    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            SolveResult::Satisfied(_) => None,
            SolveResult::Unsatisfied(conflict) => Some(conflict),
        }
    }

    pub fn stats(&self) -> &SearchStats {
        match self {
            SolveResult::Satisfied(solution) => &solution.stats,
            SolveResult::Unsatisfied(conflict) => &conflict.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_counts_keep_first_reason() {
        let mut trace = DisjunctionTrace::new(DisjunctionId(0), None);
        trace.reject(1, RejectReason::NoCompletion);
        trace.reject(0, RejectReason::Infeasible { constraint: 2 });
        trace.reject(1, RejectReason::Infeasible { constraint: 0 });

        let keys: Vec<usize> = trace.rejected.keys().copied().collect();
        assert_eq!(keys, [1, 0]);
        assert_eq!(trace.rejected[&1].reason, RejectReason::NoCompletion);
        assert_eq!(trace.rejected[&1].count, 2);
    }

    #[test]
    fn test_conflict_display() {
        let mut first = DisjunctionTrace::new(DisjunctionId(0), Some("order".into()));
        first.reject(
            0,
            RejectReason::Pruned {
                variable: "x".into(),
                lower: 30.0,
                upper: 20.0,
            },
        );
        first.reject(1, RejectReason::NoCompletion);
        first.reject(1, RejectReason::NoCompletion);
        let mut second = DisjunctionTrace::new(DisjunctionId(1), None);
        second.reject(0, RejectReason::Infeasible { constraint: 1 });

        let conflict = Conflict {
            traces: vec![first, second],
            stats: SearchStats::default(),
        };
        insta::assert_snapshot!(conflict.to_string(), @r"
        no combination of alternatives is consistent
          disjunction #0 (order):
            alternative 0: pruned: x needs 30 <= x <= 20
            alternative 1: no completion for later disjunctions (x2)
          disjunction #1:
            alternative 0: infeasible at constraint 1
        ");
    }
}
