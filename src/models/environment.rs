use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::new_id;

fn enabled_by_default() -> bool {
    true
}

/// A single environment variable
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Display hint for masking the value; not a security boundary
    #[serde(default)]
    pub secret: bool,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Variable {
            key: key.into(),
            value: value.into(),
            enabled: true,
            secret: false,
        }
    }

    pub fn secret(key: impl Into<String>, value: impl Into<String>) -> Self {
        Variable {
            secret: true,
            ..Variable::new(key, value)
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Environment variables
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Environment {
            id: new_id(),
            name: name.into(),
            variables: Vec::new(),
        }
    }

    /// Append a variable, keeping declaration order
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.push(Variable::new(key, value));
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Value `key` resolves to, honoring the same rules as [`Environment::variable_map`]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables
            .iter()
            .rev()
            .find(|v| v.enabled && v.key == key)
            .map(|v| v.value.as_str())
    }

    /// Collapse enabled variables into a flat map; on duplicate keys the
    /// last enabled one in declaration order wins
    pub fn variable_map(&self) -> VariableMap {
        self.variables
            .iter()
            .filter(|v| v.enabled)
            .map(|v| (v.key.clone(), v.value.clone()))
            .collect()
    }
}

/// Flat key -> value mapping used for interpolation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableMap(HashMap<String, String>);

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = VariableMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for VariableMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_variables_are_excluded() {
        let env = Environment::new("dev")
            .with_variable(Variable::new("host", "localhost"))
            .with_variable(Variable::new("token", "abc").disabled());
        let map = env.variable_map();
        assert_eq!(map.get("host"), Some("localhost"));
        assert!(!map.contains_key("token"));
        assert_eq!(env.get("token"), None);
    }

    #[test]
    fn test_last_enabled_duplicate_wins() {
        let env = Environment::new("dev")
            .with_variable(Variable::new("host", "first"))
            .with_variable(Variable::new("host", "second"))
            .with_variable(Variable::new("host", "third").disabled());
        assert_eq!(env.variable_map().get("host"), Some("second"));
        assert_eq!(env.get("host"), Some("second"));
    }

    #[test]
    fn test_secret_flag_does_not_hide_value() {
        let env = Environment::new("prod").with_variable(Variable::secret("key", "s3cr3t"));
        assert_eq!(env.variable_map().get("key"), Some("s3cr3t"));
    }

    #[test]
    fn test_environment_without_id_gets_one() {
        let env: Environment = serde_yaml::from_str("name: staging\n").unwrap();
        assert!(!env.id.is_empty());
        assert!(env.variables.is_empty());
    }
}
