//! Search configuration.
//!
//! [`SearchConfig`] holds the knobs that control how `solve()` explores
//! alternative combinations. None of them change whether a system is
//! satisfiable; they only change how much work the search does and which
//! feasible combination it reports first.

/// How aggressively alternatives are rejected before the arithmetic solver sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PruneMode {
    /// Every alternative goes straight to the solver.
    Off,
    /// Check single-variable constraints against constant bounds implied by
    /// committed required constraints.
    #[default]
    Bounds,
    /// [`PruneMode::Bounds`] plus interval propagation through committed
    /// multi-variable required constraints.
    Propagate,
}

/// Order in which disjunctions are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionOrder {
    /// Registration order.
    #[default]
    Registration,
    /// Disjunctions with fewer alternatives first; ties keep registration order.
    FewestAlternatives,
}

/// Configuration for the disjunction search.
///
/// # Defaults
///
/// ```
/// use disjoin::{DecisionOrder, PruneMode, SearchConfig};
///
/// let config = SearchConfig::default();
/// assert_eq!(config.prune, PruneMode::Bounds);
/// assert_eq!(config.order, DecisionOrder::Registration);
/// assert_eq!(config.step_limit, None);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use disjoin::{PruneMode, SearchConfig};
///
/// let config = SearchConfig::default()
///     .with_prune(PruneMode::Propagate)
///     .with_step_limit(10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    /// Pre-check applied to each candidate alternative.
    pub prune: PruneMode,

    /// Decision order over registered disjunctions.
    pub order: DecisionOrder,

    /// Maximum number of alternative attempts per `solve()` call.
    ///
    /// When exceeded, every speculative constraint is retracted and the call
    /// fails with `DisjoinError::StepLimitExceeded`. `None` searches exhaustively.
    pub step_limit: Option<u64>,
}

impl SearchConfig {
    /// Sets the pruning mode.
    pub fn with_prune(mut self, prune: PruneMode) -> Self {
        self.prune = prune;
        self
    }

    /// Sets the decision order.
    pub fn with_order(mut self, order: DecisionOrder) -> Self {
        self.order = order;
        self
    }

    /// Sets the step limit.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }
}
