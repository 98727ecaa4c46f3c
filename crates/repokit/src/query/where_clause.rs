//! Query options field-condition shortcuts

use serde_json::Value;

use super::options::QueryOptions;
use super::specification::Specification;
use super::types::WhereCondition;

impl<T> QueryOptions<T> {
    fn where_condition(self, condition: WhereCondition) -> Self {
        self.satisfy_by(Specification::Condition(condition))
    }

    /// Add WHERE condition with equality
    pub fn where_eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_condition(WhereCondition::eq(column, value))
    }

    pub fn where_ne<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_condition(WhereCondition::ne(column, value))
    }

    pub fn where_gt<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_condition(WhereCondition::gt(column, value))
    }

    pub fn where_gte<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_condition(WhereCondition::gte(column, value))
    }

    pub fn where_lt<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_condition(WhereCondition::lt(column, value))
    }

    pub fn where_lte<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.where_condition(WhereCondition::lte(column, value))
    }

    /// Case-insensitive pattern match with `%` and `_` wildcards
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.where_condition(WhereCondition::like(column, pattern))
    }

    pub fn where_not_like(self, column: &str, pattern: &str) -> Self {
        self.where_condition(WhereCondition::not_like(column, pattern))
    }

    pub fn where_in<V: Into<Value>>(self, column: &str, values: Vec<V>) -> Self {
        self.where_condition(WhereCondition::is_in(column, values))
    }

    pub fn where_not_in<V: Into<Value>>(self, column: &str, values: Vec<V>) -> Self {
        self.where_condition(WhereCondition::not_in(column, values))
    }

    pub fn where_null(self, column: &str) -> Self {
        self.where_condition(WhereCondition::null(column))
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.where_condition(WhereCondition::not_null(column))
    }

    pub fn where_between<V: Into<Value>>(self, column: &str, start: V, end: V) -> Self {
        self.where_condition(WhereCondition::between(column, start, end))
    }
}
