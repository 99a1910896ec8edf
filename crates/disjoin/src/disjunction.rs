//! Disjunction registry.

use std::fmt;

use disjoin_core::{Constraint, DisjoinError};

use crate::config::DecisionOrder;

/// One branch of a disjunction: constraints that must hold together.
pub type Alternative = Vec<Constraint>;

/// Index of a disjunction in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisjunctionId(pub usize);

impl fmt::Display for DisjunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A group of alternatives, at least one of which must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Disjunction {
    label: Option<String>,
    alternatives: Vec<Alternative>,
}

impl Disjunction {
    /// Create a disjunction. Fails with [`DisjoinError::EmptyDisjunction`]
    /// when given zero alternatives; an alternative itself may be empty.
    pub fn new(alternatives: Vec<Alternative>) -> Result<Self, DisjoinError> {
        if alternatives.is_empty() {
            return Err(DisjoinError::EmptyDisjunction);
        }
        Ok(Self {
            label: None,
            alternatives,
        })
    }

    /// Attach a label shown in conflict reports.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    pub fn alternative(&self, index: usize) -> Option<&[Constraint]> {
        self.alternatives.get(index).map(Vec::as_slice)
    }

    /// Number of alternatives (always at least one).
    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// All constraints across every alternative.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.alternatives.iter().flatten()
    }
}

/// Ordered list of registered disjunctions.
#[derive(Debug, Clone, Default)]
pub struct DisjunctionRegistry {
    disjunctions: Vec<Disjunction>,
}

impl DisjunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a disjunction, returning its position in registration order.
    pub fn add(&mut self, disjunction: Disjunction) -> DisjunctionId {
        let id = DisjunctionId(self.disjunctions.len());
        self.disjunctions.push(disjunction);
        id
    }

    pub fn get(&self, id: DisjunctionId) -> Option<&Disjunction> {
        self.disjunctions.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DisjunctionId, &Disjunction)> {
        self.disjunctions
            .iter()
            .enumerate()
            .map(|(index, d)| (DisjunctionId(index), d))
    }

    pub fn len(&self) -> usize {
        self.disjunctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disjunctions.is_empty()
    }

    /// The sequence in which the search decides disjunctions.
    pub fn decision_order(&self, order: DecisionOrder) -> Vec<DisjunctionId> {
        let mut ids: Vec<DisjunctionId> = (0..self.disjunctions.len()).map(DisjunctionId).collect();
        if order == DecisionOrder::FewestAlternatives {
            // Stable sort keeps registration order among ties
            ids.sort_by_key(|id| self.disjunctions[id.0].len());
        }
        ids
    }
}
