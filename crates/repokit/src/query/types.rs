//! Query Types - Operators, conditions and value comparison
//!
//! Conditions are evaluated against entity-shaped JSON records, so a column
//! may be a dotted path through fetched navigations (`customer.name`).

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Query operator types
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
            QueryOperator::Like => write!(f, "LIKE"),
            QueryOperator::NotLike => write!(f, "NOT LIKE"),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::NotIn => write!(f, "NOT IN"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
            QueryOperator::IsNotNull => write!(f, "IS NOT NULL"),
            QueryOperator::Between => write!(f, "BETWEEN"),
        }
    }
}

/// Field condition
#[derive(Debug, Clone, PartialEq)]
pub struct WhereCondition {
    pub column: String,
    pub operator: QueryOperator,
    pub value: Option<Value>,
    pub values: Vec<Value>, // For IN, NOT IN, BETWEEN
}

impl WhereCondition {
    fn single(column: &str, operator: QueryOperator, value: Value) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: Some(value),
            values: Vec::new(),
        }
    }

    pub fn eq<T: Into<Value>>(column: &str, value: T) -> Self {
        Self::single(column, QueryOperator::Equal, value.into())
    }

    pub fn ne<T: Into<Value>>(column: &str, value: T) -> Self {
        Self::single(column, QueryOperator::NotEqual, value.into())
    }

    pub fn gt<T: Into<Value>>(column: &str, value: T) -> Self {
        Self::single(column, QueryOperator::GreaterThan, value.into())
    }

    pub fn gte<T: Into<Value>>(column: &str, value: T) -> Self {
        Self::single(column, QueryOperator::GreaterThanOrEqual, value.into())
    }

    pub fn lt<T: Into<Value>>(column: &str, value: T) -> Self {
        Self::single(column, QueryOperator::LessThan, value.into())
    }

    pub fn lte<T: Into<Value>>(column: &str, value: T) -> Self {
        Self::single(column, QueryOperator::LessThanOrEqual, value.into())
    }

    /// SQL-style pattern: `%` matches any run, `_` one character
    pub fn like(column: &str, pattern: &str) -> Self {
        Self::single(column, QueryOperator::Like, Value::String(pattern.to_string()))
    }

    pub fn not_like(column: &str, pattern: &str) -> Self {
        Self::single(column, QueryOperator::NotLike, Value::String(pattern.to_string()))
    }

    pub fn is_in<T: Into<Value>>(column: &str, values: Vec<T>) -> Self {
        Self {
            column: column.to_string(),
            operator: QueryOperator::In,
            value: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<T: Into<Value>>(column: &str, values: Vec<T>) -> Self {
        Self {
            operator: QueryOperator::NotIn,
            ..Self::is_in(column, values)
        }
    }

    pub fn null(column: &str) -> Self {
        Self {
            column: column.to_string(),
            operator: QueryOperator::IsNull,
            value: None,
            values: Vec::new(),
        }
    }

    pub fn not_null(column: &str) -> Self {
        Self {
            operator: QueryOperator::IsNotNull,
            ..Self::null(column)
        }
    }

    pub fn between<T: Into<Value>>(column: &str, start: T, end: T) -> Self {
        Self {
            column: column.to_string(),
            operator: QueryOperator::Between,
            value: None,
            values: vec![start.into(), end.into()],
        }
    }

    /// Root member the column path starts from
    pub fn root(&self) -> &str {
        self.column.split('.').next().unwrap_or(&self.column)
    }

    pub fn matches(&self, record: &Value) -> bool {
        let actual = lookup_path(record, &self.column).unwrap_or(&Value::Null);
        let expected = self.value.as_ref().unwrap_or(&Value::Null);

        match self.operator {
            QueryOperator::Equal => values_equal(actual, expected),
            QueryOperator::NotEqual => !values_equal(actual, expected),
            QueryOperator::GreaterThan => ordered(actual, expected) == Some(Ordering::Greater),
            QueryOperator::GreaterThanOrEqual => matches!(
                ordered(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            QueryOperator::LessThan => ordered(actual, expected) == Some(Ordering::Less),
            QueryOperator::LessThanOrEqual => matches!(
                ordered(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            QueryOperator::Like => like(actual, expected),
            QueryOperator::NotLike => actual.is_string() && !like(actual, expected),
            QueryOperator::In => self.values.iter().any(|v| values_equal(actual, v)),
            QueryOperator::NotIn => !self.values.iter().any(|v| values_equal(actual, v)),
            QueryOperator::IsNull => actual.is_null(),
            QueryOperator::IsNotNull => !actual.is_null(),
            QueryOperator::Between => match self.values.as_slice() {
                [low, high] => {
                    matches!(ordered(actual, low), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(ordered(actual, high), Some(Ordering::Less | Ordering::Equal))
                }
                _ => false,
            },
        }
    }
}

impl fmt::Display for WhereCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.values.is_empty()) {
            (Some(value), _) => write!(f, "{} {} {}", self.column, self.operator, value),
            (None, false) => write!(
                f,
                "{} {} {}",
                self.column,
                self.operator,
                Value::Array(self.values.clone())
            ),
            (None, true) => write!(f, "{} {}", self.column, self.operator),
        }
    }
}

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Follow a dotted path through nested objects
pub fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |current, segment| current.get(segment))
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Ordering {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
    }
}

/// Total order used for sorting: null < bool < number < string < array < object
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        _ if rank(a) == rank(b) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Comparison for range operators; values of different kinds do not compare
fn ordered(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(_), Value::Bool(_))
        | (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_)) => Some(compare_values(a, b)),
        _ => None,
    }
}

/// Equality with numeric normalization, so `1` equals `1.0`
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Ordering::Equal,
        _ => a == b,
    }
}

static LIKE_PATTERNS: Lazy<DashMap<String, Option<Regex>>> = Lazy::new(DashMap::new);

fn like(actual: &Value, pattern: &Value) -> bool {
    let (Value::String(text), Value::String(pattern)) = (actual, pattern) else {
        return false;
    };

    let compiled = LIKE_PATTERNS
        .entry(pattern.clone())
        .or_insert_with(|| Regex::new(&like_to_regex(pattern)).ok())
        .clone();

    compiled.map(|re| re.is_match(text)).unwrap_or(false)
}

/// Translate a LIKE pattern into an anchored, case-insensitive regex
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::from("(?is)^");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                regex.push_str(if c == '%' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    regex.push_str(&regex::escape(&literal));
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "id": 4,
            "name": "Grace Hopper",
            "score": 9.5,
            "active": true,
            "manager": null,
            "customer": {"city": "Arlington"}
        })
    }

    #[test]
    fn test_equality_and_paths() {
        let r = record();
        assert!(WhereCondition::eq("id", 4).matches(&r));
        assert!(WhereCondition::eq("id", 4.0).matches(&r));
        assert!(WhereCondition::ne("name", "Ada").matches(&r));
        assert!(WhereCondition::eq("customer.city", "Arlington").matches(&r));
        assert!(WhereCondition::null("customer.zip").matches(&r));
        assert!(WhereCondition::null("manager").matches(&r));
        assert!(WhereCondition::not_null("customer").matches(&r));
    }

    #[test]
    fn test_ranges() {
        let r = record();
        assert!(WhereCondition::gt("score", 9).matches(&r));
        assert!(WhereCondition::lte("id", 4).matches(&r));
        assert!(!WhereCondition::lt("id", 4).matches(&r));
        assert!(WhereCondition::between("id", 1, 4).matches(&r));
        assert!(!WhereCondition::between("id", 5, 9).matches(&r));
        // strings never compare with numbers
        assert!(!WhereCondition::gt("name", 1).matches(&r));
    }

    #[test]
    fn test_like_and_membership() {
        let r = record();
        assert!(WhereCondition::like("name", "grace%").matches(&r));
        assert!(WhereCondition::like("name", "%H_pper").matches(&r));
        assert!(!WhereCondition::like("name", "Ada%").matches(&r));
        assert!(WhereCondition::not_like("name", "Ada%").matches(&r));
        assert!(!WhereCondition::like("name", "Grace.Hopper").matches(&r));
        assert!(WhereCondition::is_in("id", vec![1, 4]).matches(&r));
        assert!(WhereCondition::not_in("id", vec![1, 2]).matches(&r));
    }

    #[test]
    fn test_compare_values_total_order() {
        let mut values = vec![json!("b"), json!(2), json!(null), json!(true), json!(1.5), json!("a")];
        values.sort_by(compare_values);
        assert_eq!(
            values,
            vec![json!(null), json!(true), json!(1.5), json!(2), json!("a"), json!("b")]
        );
    }

    #[test]
    fn test_condition_display() {
        assert_eq!(WhereCondition::eq("name", "Ada").to_string(), "name = \"Ada\"");
        assert_eq!(WhereCondition::is_in("id", vec![1, 2]).to_string(), "id IN [1,2]");
        assert_eq!(WhereCondition::null("manager").to_string(), "manager IS NULL");
        assert_eq!(WhereCondition::eq("customer.city", "X").root(), "customer");
    }
}
