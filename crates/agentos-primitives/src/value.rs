// value.rs — Dynamic attribute-path lookup over request/context data.
//
// Conditions evaluate dotted attribute paths like `args.amount` or
// `context.user_verified` against request data. Rather than reflecting
// over host-language objects, we model every value as this sum type and
// resolve paths by iterative map/list indexing (spec §9: "Dynamic
// attribute-path lookup over nested dictionaries").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A dynamically-typed value used throughout ABAC condition evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Resolve a dot-notation path (e.g. `"args.amount"`) against this value,
    /// treating `self` as the root of the path.
    ///
    /// Each segment indexes a `Map` by key, or a `List` by a numeric
    /// segment. Any missing key, out-of-range index, or attempt to index a
    /// scalar returns `None` rather than erroring — callers treat an
    /// unresolved path as "attribute absent", not an evaluation failure.
    pub fn resolve_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Value::Map(map) => map.get(segment)?,
                Value::List(list) => {
                    let idx: usize = segment.parse().ok()?;
                    list.get(idx)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Build a rooted `Value::Map` from three sub-trees, matching the
    /// `{args.*, context.*, agent.*}` attribute namespaces in spec §3.
    pub fn rooted(args: Value, context: Value, agent: Value) -> Value {
        let mut root = BTreeMap::new();
        root.insert("args".to_string(), args);
        root.insert("context".to_string(), context);
        root.insert("agent".to_string(), agent);
        Value::Map(root)
    }

    /// Convert from `serde_json::Value`, used when loading free-form
    /// `arguments`/`context` maps off the wire.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut args = BTreeMap::new();
        args.insert("amount".to_string(), Value::Int(600));
        args.insert("path".to_string(), Value::String("fs://workspace/a".to_string()));

        let mut context = BTreeMap::new();
        context.insert("user_verified".to_string(), Value::Bool(true));

        let mut agent = BTreeMap::new();
        agent.insert("role".to_string(), Value::String("support".to_string()));

        Value::rooted(Value::Map(args), Value::Map(context), Value::Map(agent))
    }

    #[test]
    fn resolves_nested_path() {
        let root = sample();
        assert_eq!(root.resolve_path("args.amount"), Some(&Value::Int(600)));
        assert_eq!(
            root.resolve_path("context.user_verified"),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            root.resolve_path("agent.role"),
            Some(&Value::String("support".to_string()))
        );
    }

    #[test]
    fn missing_segment_resolves_to_none() {
        let root = sample();
        assert_eq!(root.resolve_path("args.nonexistent"), None);
        assert_eq!(root.resolve_path("missing.path"), None);
    }

    #[test]
    fn indexing_a_scalar_resolves_to_none() {
        let root = sample();
        assert_eq!(root.resolve_path("args.amount.nested"), None);
    }

    #[test]
    fn list_index_resolution() {
        let root = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(root.resolve_path("1"), Some(&Value::Int(2)));
        assert_eq!(root.resolve_path("9"), None);
        assert_eq!(root.resolve_path("not-a-number"), None);
    }

    #[test]
    fn from_json_round_trip_shapes() {
        let json = serde_json::json!({
            "amount": 100,
            "nested": {"a": [1, 2, "three"]},
            "flag": true,
            "ratio": 1.5,
            "missing": null,
        });
        let value = Value::from_json(&json);
        assert_eq!(value.resolve_path("amount"), Some(&Value::Int(100)));
        assert_eq!(value.resolve_path("nested.a.2"), Some(&Value::String("three".to_string())));
        assert_eq!(value.resolve_path("flag"), Some(&Value::Bool(true)));
        assert_eq!(value.resolve_path("ratio"), Some(&Value::Float(1.5)));
        assert_eq!(value.resolve_path("missing"), Some(&Value::Null));
    }

    #[test]
    fn as_helpers() {
        assert_eq!(Value::String("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Int(5).as_f64(), Some(5.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert!(Value::Int(1).as_bool().is_none());
    }
}
