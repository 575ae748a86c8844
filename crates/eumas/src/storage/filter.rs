//! Where-filter trees for Weaviate queries
//!
//! A filter is either a single condition on a property path or a conjunction
//! of filters. Trees render to the GraphQL `where:` argument and to the JSON
//! shape used by the REST API, and can be evaluated against a local object.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::error::{EumasError, Result};

/// Comparison operators supported by the filter tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    ContainsAny,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "Equal",
            Operator::GreaterThan => "GreaterThan",
            Operator::GreaterThanEqual => "GreaterThanEqual",
            Operator::LessThan => "LessThan",
            Operator::LessThanEqual => "LessThanEqual",
            Operator::ContainsAny => "ContainsAny",
        }
    }
}

/// Typed operand of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    TextArray(Vec<String>),
}

impl FilterValue {
    /// Numeric operand. NaN and infinities have no GraphQL literal and are
    /// rejected.
    pub fn number(value: f64) -> Result<Self> {
        if value.is_finite() {
            Ok(FilterValue::Number(value))
        } else {
            Err(EumasError::validation(format!(
                "Filter value must be a finite number, got {value}"
            )))
        }
    }

    /// Weaviate key carrying this operand (`valueText`, `valueNumber`, ...)
    pub fn key(&self) -> &'static str {
        match self {
            FilterValue::Text(_) => "valueText",
            FilterValue::Number(_) => "valueNumber",
            FilterValue::Date(_) => "valueDate",
            FilterValue::TextArray(_) => "valueTextArray",
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FilterValue::Text(s) => json!(s),
            FilterValue::Number(n) => json!(n),
            FilterValue::Date(d) => json!(d.to_rfc3339()),
            FilterValue::TextArray(values) => json!(values),
        }
    }

    fn to_graphql(&self) -> String {
        match self {
            FilterValue::Number(n) => format!("{n:?}"),
            other => other.to_json().to_string(),
        }
    }
}

/// A filter tree over object properties
#[derive(Debug, Clone, PartialEq)]
pub enum WhereFilter {
    Condition {
        path: Vec<String>,
        operator: Operator,
        value: FilterValue,
    },
    And(Vec<WhereFilter>),
}

impl WhereFilter {
    pub fn condition(path: &[&str], operator: Operator, value: FilterValue) -> Self {
        WhereFilter::Condition {
            path: path.iter().map(|p| p.to_string()).collect(),
            operator,
            value,
        }
    }

    pub fn equal_text(path: &[&str], value: impl Into<String>) -> Self {
        Self::condition(path, Operator::Equal, FilterValue::Text(value.into()))
    }

    pub fn greater_than(path: &[&str], value: f64) -> Result<Self> {
        Ok(Self::condition(path, Operator::GreaterThan, FilterValue::number(value)?))
    }

    pub fn greater_than_equal(path: &[&str], value: f64) -> Result<Self> {
        Ok(Self::condition(
            path,
            Operator::GreaterThanEqual,
            FilterValue::number(value)?,
        ))
    }

    pub fn date_on_or_after(path: &[&str], value: DateTime<Utc>) -> Self {
        Self::condition(path, Operator::GreaterThanEqual, FilterValue::Date(value))
    }

    pub fn date_on_or_before(path: &[&str], value: DateTime<Utc>) -> Self {
        Self::condition(path, Operator::LessThanEqual, FilterValue::Date(value))
    }

    pub fn contains_any(path: &[&str], values: Vec<String>) -> Self {
        Self::condition(path, Operator::ContainsAny, FilterValue::TextArray(values))
    }

    /// Conjoin two filters. Nested conjunctions are flattened.
    pub fn and(self, other: WhereFilter) -> Self {
        let mut operands = match self {
            WhereFilter::And(operands) => operands,
            condition => vec![condition],
        };
        match other {
            WhereFilter::And(more) => operands.extend(more),
            condition => operands.push(condition),
        }
        WhereFilter::And(operands)
    }

    /// JSON shape accepted by the REST API
    pub fn to_json(&self) -> Value {
        match self {
            WhereFilter::Condition {
                path,
                operator,
                value,
            } => {
                let mut map = Map::new();
                map.insert("path".to_string(), json!(path));
                map.insert("operator".to_string(), json!(operator.as_str()));
                map.insert(value.key().to_string(), value.to_json());
                Value::Object(map)
            }
            WhereFilter::And(operands) => json!({
                "operator": "And",
                "operands": operands.iter().map(WhereFilter::to_json).collect::<Vec<_>>(),
            }),
        }
    }

    /// GraphQL input-object literal for the `where:` argument
    pub fn to_graphql(&self) -> String {
        match self {
            WhereFilter::Condition {
                path,
                operator,
                value,
            } => format!(
                "{{path: {}, operator: {}, {}: {}}}",
                json!(path),
                operator.as_str(),
                value.key(),
                value.to_graphql()
            ),
            WhereFilter::And(operands) => {
                let rendered = operands
                    .iter()
                    .map(WhereFilter::to_graphql)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{operator: And, operands: [{rendered}]}}")
            }
        }
    }

    /// Evaluate the filter against a flat property map.
    ///
    /// Only single-segment paths can be resolved locally; conditions that
    /// cross a reference never match.
    pub fn matches(&self, properties: &Map<String, Value>) -> bool {
        match self {
            WhereFilter::And(operands) => operands.iter().all(|f| f.matches(properties)),
            WhereFilter::Condition {
                path,
                operator,
                value,
            } => {
                let [name] = path.as_slice() else {
                    return false;
                };
                match properties.get(name) {
                    Some(actual) => condition_holds(actual, *operator, value),
                    None => false,
                }
            }
        }
    }
}

fn condition_holds(actual: &Value, operator: Operator, expected: &FilterValue) -> bool {
    use std::cmp::Ordering;

    let ordering = match (expected, actual) {
        (FilterValue::Number(n), Value::Number(a)) => {
            a.as_f64().and_then(|a| a.partial_cmp(n))
        }
        (FilterValue::Text(s), Value::String(a)) => Some(a.as_str().cmp(s.as_str())),
        (FilterValue::Date(d), Value::String(a)) => DateTime::parse_from_rfc3339(a)
            .ok()
            .map(|a| a.with_timezone(&Utc).cmp(d)),
        (FilterValue::TextArray(values), _) => {
            return operator == Operator::ContainsAny && contains_any(actual, values);
        }
        _ => None,
    };

    let Some(ordering) = ordering else {
        return false;
    };

    match operator {
        Operator::Equal => ordering == Ordering::Equal,
        Operator::GreaterThan => ordering == Ordering::Greater,
        Operator::GreaterThanEqual => ordering != Ordering::Less,
        Operator::LessThan => ordering == Ordering::Less,
        Operator::LessThanEqual => ordering != Ordering::Greater,
        Operator::ContainsAny => false,
    }
}

fn contains_any(actual: &Value, wanted: &[String]) -> bool {
    match actual {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|item| wanted.iter().any(|w| w == item)),
        Value::String(item) => wanted.iter().any(|w| w == item),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_condition_graphql() {
        let filter = WhereFilter::greater_than(&["relationshipStrength"], 0.5).unwrap();
        assert_eq!(
            filter.to_graphql(),
            r#"{path: ["relationshipStrength"], operator: GreaterThan, valueNumber: 0.5}"#
        );
    }

    #[test]
    fn test_text_value_is_escaped() {
        let filter = WhereFilter::equal_text(&["archetype"], "Ella-\"M\"");
        assert_eq!(
            filter.to_graphql(),
            r#"{path: ["archetype"], operator: Equal, valueText: "Ella-\"M\""}"#
        );
    }

    #[test]
    fn test_and_graphql() {
        let filter = WhereFilter::greater_than(&["relationshipStrength"], 0.0)
            .unwrap()
            .and(WhereFilter::equal_text(&["archetype"], "Ella-M"));
        assert_eq!(
            filter.to_graphql(),
            concat!(
                r#"{operator: And, operands: ["#,
                r#"{path: ["relationshipStrength"], operator: GreaterThan, valueNumber: 0.0}, "#,
                r#"{path: ["archetype"], operator: Equal, valueText: "Ella-M"}]}"#
            )
        );
    }

    #[test]
    fn test_and_flattens() {
        let filter = WhereFilter::equal_text(&["a"], "1")
            .and(WhereFilter::equal_text(&["b"], "2"))
            .and(WhereFilter::equal_text(&["c"], "3"));
        match filter {
            WhereFilter::And(operands) => assert_eq!(operands.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_json_shape() {
        let filter = WhereFilter::contains_any(&["contextTags"], vec!["urgent".to_string()])
            .and(WhereFilter::greater_than_equal(&["memoryPriority"], 0.5).unwrap());
        let json = filter.to_json();

        assert_eq!(json["operator"], "And");
        assert_eq!(json["operands"][0]["path"][0], "contextTags");
        assert_eq!(json["operands"][0]["operator"], "ContainsAny");
        assert_eq!(json["operands"][0]["valueTextArray"][0], "urgent");
        assert_eq!(json["operands"][1]["valueNumber"], 0.5);
    }

    #[test]
    fn test_date_rendering() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let filter = WhereFilter::date_on_or_after(&["timestamp"], start);
        assert!(filter
            .to_graphql()
            .contains(r#"valueDate: "2024-01-01T00:00:00+00:00""#));
    }

    #[test]
    fn test_matches_contains_any_and_priority() {
        let memory = props(json!({
            "contextTags": ["work", "urgent"],
            "memoryPriority": 0.8
        }));

        let lenient = WhereFilter::contains_any(&["contextTags"], vec!["urgent".to_string()])
            .and(WhereFilter::greater_than_equal(&["memoryPriority"], 0.5).unwrap());
        let strict = WhereFilter::contains_any(&["contextTags"], vec!["urgent".to_string()])
            .and(WhereFilter::greater_than_equal(&["memoryPriority"], 0.9).unwrap());

        assert!(lenient.matches(&memory));
        assert!(!strict.matches(&memory));
    }

    #[test]
    fn test_matches_greater_than_is_strict() {
        let relation = props(json!({"relationshipStrength": 0.5}));
        let at = WhereFilter::greater_than(&["relationshipStrength"], 0.5).unwrap();
        let below = WhereFilter::greater_than(&["relationshipStrength"], 0.4).unwrap();
        assert!(!at.matches(&relation));
        assert!(below.matches(&relation));
    }

    #[test]
    fn test_matches_inclusive_date_range() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let range = WhereFilter::date_on_or_after(&["timestamp"], start)
            .and(WhereFilter::date_on_or_before(&["timestamp"], end));

        let on_start = props(json!({"timestamp": start.to_rfc3339()}));
        let on_end = props(json!({"timestamp": end.to_rfc3339()}));
        let after = props(json!({"timestamp": "2024-02-01T00:00:00Z"}));

        assert!(range.matches(&on_start));
        assert!(range.matches(&on_end));
        assert!(!range.matches(&after));
    }

    #[test]
    fn test_matches_missing_property_or_reference_path() {
        let memory = props(json!({"userPrompt": "hi"}));
        assert!(!WhereFilter::equal_text(&["archetype"], "Ella-M").matches(&memory));
        assert!(
            !WhereFilter::contains_any(&["evaluatedMemory", "Memory", "contextTags"], vec![])
                .matches(&memory)
        );
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = WhereFilter::greater_than(&["relationshipStrength"], value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert!(WhereFilter::greater_than_equal(&["memoryPriority"], value).is_err());
        }
        assert!(FilterValue::number(f64::MAX).is_ok());
    }
}
