//! Variable registry: external names to solver variable handles.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use disjoin_core::{Constraint, DisjoinError, Variable};

/// Maps external names to solver variable handles.
///
/// Entries are never removed; iteration follows registration order.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    by_name: IndexMap<String, Variable>,
    names: FxHashMap<Variable, String>,
    /// Values from the last successful solve
    solved: FxHashMap<Variable, f64>,
}

impl VariableRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under a unique name.
    pub fn register(&mut self, name: impl Into<String>, handle: Variable) -> Result<(), DisjoinError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(DisjoinError::DuplicateVariable { name });
        }
        // An aliased handle keeps its first name for diagnostics.
        self.names.entry(handle).or_insert_with(|| name.clone());
        self.by_name.insert(name, handle);
        Ok(())
    }

    /// The handle registered under a name.
    pub fn handle(&self, name: &str) -> Option<Variable> {
        self.by_name.get(name).copied()
    }

    /// The name a handle was registered under.
    pub fn name_of(&self, handle: Variable) -> Option<&str> {
        self.names.get(&handle).map(String::as_str)
    }

    /// Check whether a handle is registered.
    pub fn contains_handle(&self, handle: Variable) -> bool {
        self.names.contains_key(&handle)
    }

    /// Fail with [`DisjoinError::UnregisteredHandle`] if the constraint uses an unknown handle.
    pub fn check(&self, constraint: &Constraint) -> Result<(), DisjoinError> {
        match constraint.variables().find(|v| !self.contains_handle(*v)) {
            Some(variable) => Err(DisjoinError::UnregisteredHandle { variable }),
            None => Ok(()),
        }
    }

    /// Last solved value of a variable.
    pub fn value(&self, name: &str) -> Result<f64, DisjoinError> {
        self.handle(name)
            .and_then(|handle| self.solved.get(&handle).copied())
            .ok_or_else(|| DisjoinError::UnknownVariable {
                name: name.to_string(),
            })
    }

    /// Iterate over `(name, handle)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Variable)> {
        self.by_name.iter().map(|(name, &handle)| (name.as_str(), handle))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Render a constraint using registered names instead of raw handles.
    pub fn describe(&self, constraint: &Constraint) -> String {
        constraint.render(|var| self.display_name(var))
    }

    /// Registered name of a handle, or its raw form when unregistered.
    pub fn display_name(&self, handle: Variable) -> String {
        self.name_of(handle)
            .map_or_else(|| handle.to_string(), str::to_string)
    }

    pub(crate) fn record_values(&mut self, values: impl IntoIterator<Item = (Variable, f64)>) {
        self.solved.clear();
        self.solved.extend(values);
    }

    pub(crate) fn clear_values(&mut self) {
        self.solved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = VariableRegistry::new();
        registry.register("x", Variable(0)).unwrap();
        registry.register("y", Variable(1)).unwrap();

        assert_eq!(registry.handle("x"), Some(Variable(0)));
        assert_eq!(registry.name_of(Variable(1)), Some("y"));
        assert_eq!(registry.len(), 2);
        let names: Vec<&str> = registry.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn test_duplicate_name() {
        let mut registry = VariableRegistry::new();
        registry.register("x", Variable(0)).unwrap();
        let err = registry.register("x", Variable(1)).unwrap_err();
        assert!(matches!(err, DisjoinError::DuplicateVariable { name } if name == "x"));
        assert_eq!(registry.handle("x"), Some(Variable(0)));
    }

    #[test]
    fn test_value_requires_solve() {
        let mut registry = VariableRegistry::new();
        registry.register("x", Variable(0)).unwrap();

        assert!(matches!(
            registry.value("x"),
            Err(DisjoinError::UnknownVariable { .. })
        ));
        assert!(matches!(
            registry.value("nope"),
            Err(DisjoinError::UnknownVariable { .. })
        ));

        registry.record_values([(Variable(0), 4.5)]);
        assert_eq!(registry.value("x").unwrap(), 4.5);

        registry.clear_values();
        assert!(registry.value("x").is_err());
    }

    #[test]
    fn test_check_unregistered_handle() {
        let mut registry = VariableRegistry::new();
        registry.register("x", Variable(0)).unwrap();

        assert!(registry.check(&Constraint::equal(Variable(0), 1.0)).is_ok());
        assert!(matches!(
            registry.check(&Constraint::equal(Variable(7), 1.0)),
            Err(DisjoinError::UnregisteredHandle { variable }) if variable == Variable(7)
        ));
    }

    #[test]
    fn test_describe_uses_names() {
        let mut registry = VariableRegistry::new();
        for id in 0..13 {
            registry.register(format!("n{}", id), Variable(id)).unwrap();
        }
        registry.register("left", Variable(1)).ok();

        let c = Constraint::greater_or_equal(
            disjoin_core::Expression::from(Variable(12)).plus(Variable(1), -1.0),
            10.0,
        );
        assert_eq!(registry.describe(&c), "n12 - n1 >= 10");
    }
}
