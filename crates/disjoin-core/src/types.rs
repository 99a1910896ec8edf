//! Linear constraint types shared by the solver and the disjunction search.

use std::fmt;

use indexmap::IndexMap;

/// Tolerance for floating-point comparisons.
pub const EPSILON: f64 = 1e-8;

/// Near-zero check for floating point values.
pub fn near_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

/// Opaque handle to a variable owned by an arithmetic solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable(pub usize);

impl Variable {
    /// Create a variable handle with the given ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// The raw ID of this handle.
    pub fn id(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Handle returned by a solver for a constraint it accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintId(pub usize);

/// A linear expression in the form: constant + Σ(coefficient * variable)
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Expression {
    pub constant: f64,
    terms: IndexMap<Variable, f64>,
}

impl Expression {
    /// Create a constant expression.
    pub fn from_constant(value: f64) -> Self {
        Self {
            constant: value,
            terms: IndexMap::new(),
        }
    }

    /// Create an expression from a single variable.
    pub fn from_variable(var: Variable) -> Self {
        Self::from_term(var, 1.0)
    }

    /// Create an expression `coefficient * var`.
    pub fn from_term(var: Variable, coefficient: f64) -> Self {
        let mut expr = Self::default();
        expr.add_term(var, coefficient);
        expr
    }

    /// Build a sum of weighted variables.
    pub fn sum<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let mut expr = Self::default();
        for (var, coefficient) in terms {
            expr.add_term(var, coefficient);
        }
        expr
    }

    /// Add a term to the expression. Coefficients that cancel out are dropped.
    pub fn add_term(&mut self, var: Variable, coefficient: f64) {
        if near_zero(coefficient) {
            return;
        }
        let entry = self.terms.entry(var).or_insert(0.0);
        *entry += coefficient;
        if near_zero(*entry) {
            self.terms.shift_remove(&var);
        }
    }

    /// Builder form of [`Expression::add_term`].
    pub fn plus(mut self, var: Variable, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    /// Builder form adding to the constant.
    pub fn offset(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    /// Multiply the expression by a scalar.
    pub fn multiply(&mut self, scalar: f64) {
        self.constant *= scalar;
        for coeff in self.terms.values_mut() {
            *coeff *= scalar;
        }
    }

    /// Add another expression to this one.
    pub fn add_expression(&mut self, other: &Expression, multiplier: f64) {
        self.constant += other.constant * multiplier;
        for (&var, &coeff) in &other.terms {
            self.add_term(var, coeff * multiplier);
        }
    }

    /// Get the coefficient for a variable.
    pub fn coefficient(&self, var: Variable) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    /// Check if this expression contains the given variable.
    pub fn contains(&self, var: Variable) -> bool {
        self.terms.contains_key(&var)
    }

    /// Get an iterator over the terms, in insertion order.
    pub fn terms(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.terms.iter().map(|(&var, &coeff)| (var, coeff))
    }

    /// Number of variables with a non-zero coefficient.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when the expression is a bare constant.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression under an assignment.
    pub fn evaluate<F>(&self, value: F) -> f64
    where
        F: Fn(Variable) -> f64,
    {
        self.terms
            .iter()
            .fold(self.constant, |acc, (&var, &coeff)| acc + coeff * value(var))
    }
}

impl From<Variable> for Expression {
    fn from(var: Variable) -> Self {
        Self::from_variable(var)
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Self::from_constant(value)
    }
}

impl Expression {
    /// Render the expression, naming variables through `name`.
    pub fn render<F>(&self, name: F) -> String
    where
        F: Fn(Variable) -> String,
    {
        let mut out = String::new();
        for (var, coeff) in self.terms() {
            if out.is_empty() {
                if coeff < 0.0 {
                    out.push('-');
                }
            } else {
                out.push_str(if coeff < 0.0 { " - " } else { " + " });
            }
            if (coeff.abs() - 1.0).abs() >= EPSILON {
                out.push_str(&format!("{}*", coeff.abs()));
            }
            out.push_str(&name(var));
        }
        if out.is_empty() {
            out = self.constant.to_string();
        } else if !near_zero(self.constant) {
            let sign = if self.constant < 0.0 { "-" } else { "+" };
            out.push_str(&format!(" {} {}", sign, self.constant.abs()));
        }
        out
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(|var| var.to_string()))
    }
}

/// Constraint strength levels.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Strength(pub f64);

impl Strength {
    pub const REQUIRED: Strength = Strength(1_001_001_000.0);
    pub const STRONG: Strength = Strength(1_000_000.0);
    pub const MEDIUM: Strength = Strength(1_000.0);
    pub const WEAK: Strength = Strength(1.0);

    /// Create a custom strength, clipped to the valid range.
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, Self::REQUIRED.0))
    }

    /// Check if this is a required constraint.
    pub fn is_required(&self) -> bool {
        self.0 >= Self::REQUIRED.0
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self::REQUIRED
    }
}

/// The relation of a constraint (equality or inequality).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Relation {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::LessOrEqual => "<=",
            Relation::Equal => "==",
            Relation::GreaterOrEqual => ">=",
        })
    }
}

/// A linear constraint `expression <relation> 0`.
///
/// The right-hand-side constant of the user-facing form `lhs <relation> rhs`
/// is folded into the expression's constant, so a constraint is immutable
/// once built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    pub expression: Expression,
    pub relation: Relation,
    pub strength: Strength,
}

impl Constraint {
    /// Create a new constraint from a normalised expression.
    pub fn new(expression: Expression, relation: Relation, strength: Strength) -> Self {
        Self {
            expression,
            relation,
            strength,
        }
    }

    /// Required constraint `lhs <relation> rhs`.
    pub fn relate(lhs: impl Into<Expression>, relation: Relation, rhs: f64) -> Self {
        let mut expression = lhs.into();
        expression.constant -= rhs;
        Self::new(expression, relation, Strength::REQUIRED)
    }

    /// Required constraint `lhs == rhs`.
    pub fn equal(lhs: impl Into<Expression>, rhs: f64) -> Self {
        Self::relate(lhs, Relation::Equal, rhs)
    }

    /// Required constraint `lhs <= rhs`.
    pub fn less_or_equal(lhs: impl Into<Expression>, rhs: f64) -> Self {
        Self::relate(lhs, Relation::LessOrEqual, rhs)
    }

    /// Required constraint `lhs >= rhs`.
    pub fn greater_or_equal(lhs: impl Into<Expression>, rhs: f64) -> Self {
        Self::relate(lhs, Relation::GreaterOrEqual, rhs)
    }

    /// Replace the strength of this constraint.
    pub fn with_strength(mut self, strength: Strength) -> Self {
        self.strength = strength;
        self
    }

    /// The right-hand-side constant of the `terms <relation> rhs` form.
    pub fn rhs(&self) -> f64 {
        0.0 - self.expression.constant
    }

    /// Variables referenced by this constraint.
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.expression.terms().map(|(var, _)| var)
    }

    /// Check the constraint by substitution.
    pub fn holds<F>(&self, value: F, tolerance: f64) -> bool
    where
        F: Fn(Variable) -> f64,
    {
        let residual = self.expression.evaluate(value);
        match self.relation {
            Relation::Equal => residual.abs() <= tolerance,
            Relation::LessOrEqual => residual <= tolerance,
            Relation::GreaterOrEqual => residual >= -tolerance,
        }
    }
}

impl Constraint {
    /// Render as `terms <relation> rhs`, naming variables through `name`.
    pub fn render<F>(&self, name: F) -> String
    where
        F: Fn(Variable) -> String,
    {
        let mut lhs = self.expression.clone();
        lhs.constant = 0.0;
        let mut out = format!("{} {} {}", lhs.render(name), self.relation, self.rhs());
        if !self.strength.is_required() {
            out.push_str(&format!(" @{}", self.strength.0));
        }
        out
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(|var| var.to_string()))
    }
}
