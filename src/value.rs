use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Listed before `Number` so whole JSON numbers stay integers.
    Int(i64),
    Number(f64),
    Str(String),
}

impl Value {
    /// Name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Nil => write!(f, "nil"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

/// Key-value store shared by every step of a rule sequence.
///
/// Entries double as variable bindings when a step's condition is evaluated,
/// so only boolean entries may be named in conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Context
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Context {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for Context
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.values.extend(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_values_map_onto_variants() {
        let context: Context =
            serde_json::from_str(r#"{"a": true, "b": 1, "c": "x", "d": null, "e": 1.5}"#).unwrap();
        assert_eq!(context.get("a"), Some(&Value::Bool(true)));
        assert_eq!(context.get("b"), Some(&Value::Int(1)));
        assert_eq!(context.get("c"), Some(&Value::Str("x".into())));
        assert_eq!(context.get("d"), Some(&Value::Nil));
        assert_eq!(context.get("e"), Some(&Value::Number(1.5)));
    }

    #[test]
    fn numbers_keep_their_json_form() {
        let input = r#"{"a":-3,"b":1,"c":2.0,"d":0.25}"#;
        let context: Context = serde_json::from_str(input).unwrap();
        assert_eq!(context.get("a"), Some(&Value::Int(-3)));
        assert_eq!(context.get("c"), Some(&Value::Number(2.0)));
        assert_eq!(serde_json::to_string(&context).unwrap(), input);
    }

    #[test]
    fn serializes_in_key_order() {
        let context: Context = [("b", Value::from(2)), ("a", Value::from(false))]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_string(&context).unwrap(),
            r#"{"a":false,"b":2}"#
        );
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::Nil.kind(), "nil");
        assert_eq!(Value::from(1.5).kind(), "number");
        assert_eq!(Value::from(1).kind(), "integer");
        assert_eq!(Value::from("s").kind(), "string");
    }

    #[test]
    fn insert_replaces() {
        let mut context = Context::new();
        assert_eq!(context.insert("result", 1), None);
        assert_eq!(context.insert("result", 0), Some(Value::Int(1)));
        assert_eq!(context.len(), 1);
    }
}
