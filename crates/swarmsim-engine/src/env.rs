//! Per-node execution environment and its bootstrap rules.

use std::collections::HashMap;

use swarmsim_types::Value;
use tracing::warn;

/// Variable bindings for one node's program, threaded through every round.
///
/// The environment is handed to [`StepEngine::step`](crate::StepEngine::step)
/// and replaced by the environment the engine returns, so later rounds see
/// earlier rounds' updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    bindings: HashMap<String, Value>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an environment from toggle names and `(key, value)` pairs.
    ///
    /// Each toggle name becomes a binding to `true`. Each pair must be a
    /// two-element [`Value::List`] whose first element is a string key; a
    /// value that is itself a flat list is converted to an ordered tuple
    /// before insertion. Malformed pairs (wrong shape, wrong arity, or a
    /// non-string key) are skipped with a warning and do not abort
    /// processing of subsequent pairs.
    pub fn bootstrap<'a, T>(toggles: T, pairs: &[Value]) -> Self
    where
        T: IntoIterator<Item = &'a str>,
    {
        let mut env = Self::new();

        for toggle in toggles {
            env.insert(toggle, Value::Bool(true));
        }

        for pair in pairs {
            let Value::List(items) = pair else {
                warn!(pair = ?pair, "skipping malformed environment pair: not a list");
                continue;
            };
            if items.len() != 2 {
                warn!(
                    arity = items.len(),
                    pair = ?pair,
                    "skipping malformed environment pair: wrong arity"
                );
                continue;
            }
            let Value::Str(key) = &items[0] else {
                warn!(pair = ?pair, "skipping malformed environment pair: non-string key");
                continue;
            };

            let value = match &items[1] {
                Value::List(elements) => Value::Tuple(elements.clone()),
                other => other.clone(),
            };
            env.insert(key.clone(), value);
        }

        env
    }

    /// Inserts a binding, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.bindings.insert(key.into(), value);
    }

    /// Returns the binding for a key, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.bindings.get(key)
    }

    /// Returns true if a binding exists for the key.
    pub fn contains(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over all bindings in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_toggles_become_true_bindings() {
        let env = Environment::bootstrap(["debug", "trace"], &[]);

        assert_eq!(env.len(), 2);
        assert_eq!(env.get("debug"), Some(&Value::Bool(true)));
        assert_eq!(env.get("trace"), Some(&Value::Bool(true)));
    }

    #[test]
    fn bootstrap_converts_list_values_to_tuples() {
        let pair = Value::list(vec![
            Value::str("x"),
            Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        ]);
        let env = Environment::bootstrap([], &[pair]);

        assert_eq!(
            env.get("x"),
            Some(&Value::tuple(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3)
            ]))
        );
    }

    #[test]
    fn bootstrap_scalar_values_inserted_as_is() {
        let pair = Value::list(vec![Value::str("count"), Value::Int(9)]);
        let env = Environment::bootstrap([], &[pair]);

        assert_eq!(env.get("count"), Some(&Value::Int(9)));
    }

    #[test]
    fn bootstrap_skips_wrong_arity_without_aborting() {
        let bad = Value::list(vec![Value::str("bad")]);
        let good = Value::list(vec![Value::str("good"), Value::Int(1)]);
        let env = Environment::bootstrap([], &[bad, good]);

        assert_eq!(env.len(), 1);
        assert!(!env.contains("bad"));
        assert_eq!(env.get("good"), Some(&Value::Int(1)));
    }

    #[test]
    fn bootstrap_skips_non_string_key() {
        let bad = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let env = Environment::bootstrap([], &[bad]);

        assert!(env.is_empty());
    }

    #[test]
    fn bootstrap_skips_non_list_pair() {
        let env = Environment::bootstrap([], &[Value::Int(42)]);
        assert!(env.is_empty());
    }

    #[test]
    fn later_pair_overrides_earlier_binding() {
        let first = Value::list(vec![Value::str("k"), Value::Int(1)]);
        let second = Value::list(vec![Value::str("k"), Value::Int(2)]);
        let env = Environment::bootstrap([], &[first, second]);

        assert_eq!(env.get("k"), Some(&Value::Int(2)));
    }
}
