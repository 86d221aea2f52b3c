// condition.rs — ABAC condition tree over `agentos_primitives::Value`.
//
// `attribute_path` is dot-notation over `{args.*, context.*, agent.*}`,
// resolved with `Value::resolve_path` (no reflection, per spec §9). Regex
// operators are capped at a fixed evaluation budget; on timeout the
// condition is treated as NOT MATCHED and the caller emits a
// `regex_timeout` audit note (spec §4.1's tie-break/timeout rule).

use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};

use agentos_primitives::Value;

/// The comparison operators a `Condition` leaf may use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    NotIn,
    Contains,
    StartsWith,
    NotStartsWith,
    NotContains,
    Matches,
}

/// A single `{attribute_path, operator, value}` leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub attribute_path: String,
    pub operator: Operator,
    pub value: serde_json::Value,
}

/// Per-pattern regex evaluation cap (spec §4.1: "capped at 5 ms").
const REGEX_TIMEOUT: Duration = Duration::from_millis(5);

/// Outcome of evaluating one condition, distinguishing a genuine mismatch
/// from a regex timeout so callers can emit the right audit note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    Matched,
    NotMatched,
    RegexTimeout,
}

impl Condition {
    pub fn evaluate(&self, root: &Value) -> ConditionOutcome {
        let Some(actual) = root.resolve_path(&self.attribute_path) else {
            return ConditionOutcome::NotMatched;
        };
        match self.operator {
            Operator::Eq => bool_outcome(values_equal(actual, &self.value)),
            Operator::Ne => bool_outcome(!values_equal(actual, &self.value)),
            Operator::Gt => bool_outcome(numeric_cmp(actual, &self.value, |a, b| a > b)),
            Operator::Lt => bool_outcome(numeric_cmp(actual, &self.value, |a, b| a < b)),
            Operator::Gte => bool_outcome(numeric_cmp(actual, &self.value, |a, b| a >= b)),
            Operator::Lte => bool_outcome(numeric_cmp(actual, &self.value, |a, b| a <= b)),
            Operator::In => bool_outcome(membership(actual, &self.value)),
            Operator::NotIn => bool_outcome(!membership(actual, &self.value)),
            Operator::Contains => bool_outcome(string_contains(actual, &self.value)),
            Operator::NotContains => bool_outcome(!string_contains(actual, &self.value)),
            Operator::StartsWith => bool_outcome(string_starts_with(actual, &self.value)),
            Operator::NotStartsWith => bool_outcome(!string_starts_with(actual, &self.value)),
            Operator::Matches => regex_matches(actual, &self.value),
        }
    }
}

fn bool_outcome(matched: bool) -> ConditionOutcome {
    if matched {
        ConditionOutcome::Matched
    } else {
        ConditionOutcome::NotMatched
    }
}

fn values_equal(actual: &Value, expected: &serde_json::Value) -> bool {
    Value::from_json(expected) == *actual
}

fn numeric_cmp(actual: &Value, expected: &serde_json::Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn membership(actual: &Value, expected: &serde_json::Value) -> bool {
    let Some(items) = expected.as_array() else {
        return false;
    };
    items.iter().any(|item| values_equal(actual, item))
}

fn string_contains(actual: &Value, expected: &serde_json::Value) -> bool {
    match (actual.as_str(), expected.as_str()) {
        (Some(a), Some(b)) => a.contains(b),
        _ => false,
    }
}

fn string_starts_with(actual: &Value, expected: &serde_json::Value) -> bool {
    match (actual.as_str(), expected.as_str()) {
        (Some(a), Some(b)) => a.starts_with(b),
        _ => false,
    }
}

fn regex_matches(actual: &Value, expected: &serde_json::Value) -> ConditionOutcome {
    let (Some(text), Some(pattern)) = (actual.as_str(), expected.as_str()) else {
        return ConditionOutcome::NotMatched;
    };
    let Ok(re) = Regex::new(pattern) else {
        return ConditionOutcome::NotMatched;
    };
    let start = Instant::now();
    let result = re.is_match(text);
    if start.elapsed() > REGEX_TIMEOUT {
        return ConditionOutcome::RegexTimeout;
    }
    bool_outcome(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn root() -> Value {
        let mut args = BTreeMap::new();
        args.insert("amount".to_string(), Value::Int(600));
        args.insert("region".to_string(), Value::String("us-east".to_string()));
        let mut context = BTreeMap::new();
        context.insert("user_verified".to_string(), Value::Bool(true));
        Value::rooted(Value::Map(args), Value::Map(context), Value::Map(BTreeMap::new()))
    }

    fn cond(path: &str, op: Operator, value: serde_json::Value) -> Condition {
        Condition {
            attribute_path: path.to_string(),
            operator: op,
            value,
        }
    }

    #[test]
    fn eq_matches_equal_value() {
        let c = cond("args.region", Operator::Eq, serde_json::json!("us-east"));
        assert_eq!(c.evaluate(&root()), ConditionOutcome::Matched);
    }

    #[test]
    fn gt_on_numeric_attribute() {
        let c = cond("args.amount", Operator::Gt, serde_json::json!(500));
        assert_eq!(c.evaluate(&root()), ConditionOutcome::Matched);
        let c2 = cond("args.amount", Operator::Gt, serde_json::json!(700));
        assert_eq!(c2.evaluate(&root()), ConditionOutcome::NotMatched);
    }

    #[test]
    fn in_checks_membership() {
        let c = cond(
            "args.region",
            Operator::In,
            serde_json::json!(["us-east", "us-west"]),
        );
        assert_eq!(c.evaluate(&root()), ConditionOutcome::Matched);
    }

    #[test]
    fn missing_attribute_path_is_not_matched() {
        let c = cond("args.missing", Operator::Eq, serde_json::json!(1));
        assert_eq!(c.evaluate(&root()), ConditionOutcome::NotMatched);
    }

    #[test]
    fn matches_operator_uses_regex() {
        let c = cond("args.region", Operator::Matches, serde_json::json!("^us-"));
        assert_eq!(c.evaluate(&root()), ConditionOutcome::Matched);
    }

    #[test]
    fn bool_equality_on_context() {
        let c = cond(
            "context.user_verified",
            Operator::Eq,
            serde_json::json!(true),
        );
        assert_eq!(c.evaluate(&root()), ConditionOutcome::Matched);
    }

    #[test]
    fn invalid_regex_pattern_does_not_match() {
        let c = cond("args.region", Operator::Matches, serde_json::json!("("));
        assert_eq!(c.evaluate(&root()), ConditionOutcome::NotMatched);
    }
}
