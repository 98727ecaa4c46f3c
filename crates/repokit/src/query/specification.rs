//! Specifications - composable filters over entities
//!
//! Field conditions are evaluated against the entity-shaped record so they can
//! reach into fetched navigations; closures see the deserialized entity.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::types::WhereCondition;

type PredicateFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

pub enum Specification<T> {
    Condition(WhereCondition),
    Predicate {
        label: Option<String>,
        test: PredicateFn<T>,
    },
    And(Box<Specification<T>>, Box<Specification<T>>),
    Or(Box<Specification<T>>, Box<Specification<T>>),
    Not(Box<Specification<T>>),
}

impl<T> Specification<T> {
    pub fn condition(condition: WhereCondition) -> Self {
        Specification::Condition(condition)
    }

    /// Closure filter. Queries using it bypass the result cache.
    pub fn predicate<F>(test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Specification::Predicate {
            label: None,
            test: Arc::new(test),
        }
    }

    /// Closure filter with a stable label; the label stands in for the
    /// closure in cache keys, so equal labels must mean equal filters.
    pub fn labelled<F>(label: &str, test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Specification::Predicate {
            label: Some(label.to_string()),
            test: Arc::new(test),
        }
    }

    pub fn and(self, other: Specification<T>) -> Self {
        Specification::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Specification<T>) -> Self {
        Specification::Or(Box::new(self), Box::new(other))
    }

    pub fn is_satisfied_by(&self, entity: &T, record: &Value) -> bool {
        match self {
            Specification::Condition(condition) => condition.matches(record),
            Specification::Predicate { test, .. } => test(entity),
            Specification::And(left, right) => {
                left.is_satisfied_by(entity, record) && right.is_satisfied_by(entity, record)
            }
            Specification::Or(left, right) => {
                left.is_satisfied_by(entity, record) || right.is_satisfied_by(entity, record)
            }
            Specification::Not(inner) => !inner.is_satisfied_by(entity, record),
        }
    }

    /// Every field condition in the tree
    pub fn conditions(&self) -> Vec<&WhereCondition> {
        let mut found = Vec::new();
        self.collect_conditions(&mut found);
        found
    }

    fn collect_conditions<'a>(&'a self, found: &mut Vec<&'a WhereCondition>) {
        match self {
            Specification::Condition(condition) => found.push(condition),
            Specification::Predicate { .. } => {}
            Specification::And(left, right) | Specification::Or(left, right) => {
                left.collect_conditions(found);
                right.collect_conditions(found);
            }
            Specification::Not(inner) => inner.collect_conditions(found),
        }
    }

    /// Stable text form, `None` when an unlabelled closure is involved
    pub fn fingerprint(&self) -> Option<String> {
        match self {
            Specification::Condition(condition) => Some(condition.to_string()),
            Specification::Predicate { label, .. } => label.as_ref().map(|l| format!("fn:{}", l)),
            Specification::And(left, right) => {
                Some(format!("({} AND {})", left.fingerprint()?, right.fingerprint()?))
            }
            Specification::Or(left, right) => {
                Some(format!("({} OR {})", left.fingerprint()?, right.fingerprint()?))
            }
            Specification::Not(inner) => Some(format!("NOT {}", inner.fingerprint()?)),
        }
    }
}

impl<T> std::ops::Not for Specification<T> {
    type Output = Specification<T>;

    fn not(self) -> Self::Output {
        Specification::Not(Box::new(self))
    }
}

impl<T> From<WhereCondition> for Specification<T> {
    fn from(condition: WhereCondition) -> Self {
        Specification::Condition(condition)
    }
}

impl<T> Clone for Specification<T> {
    fn clone(&self) -> Self {
        match self {
            Specification::Condition(condition) => Specification::Condition(condition.clone()),
            Specification::Predicate { label, test } => Specification::Predicate {
                label: label.clone(),
                test: Arc::clone(test),
            },
            Specification::And(left, right) => Specification::And(left.clone(), right.clone()),
            Specification::Or(left, right) => Specification::Or(left.clone(), right.clone()),
            Specification::Not(inner) => Specification::Not(inner.clone()),
        }
    }
}

impl<T> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Specification::Condition(condition) => write!(f, "Condition({})", condition),
            Specification::Predicate { label, .. } => match label {
                Some(label) => write!(f, "Predicate({})", label),
                None => write!(f, "Predicate(<closure>)"),
            },
            Specification::And(left, right) => {
                f.debug_tuple("And").field(left).field(right).finish()
            }
            Specification::Or(left, right) => f.debug_tuple("Or").field(left).field(right).finish(),
            Specification::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
        }
    }
}
