//! Fluent SELECT builder.
//!
//! The builder accumulates statement fragments across chained calls and
//! renders them once via [`QueryBuilder::build`]. Its central ergonomic
//! contract: every filter method taking an `Option` is a no-op when the
//! value is `None`, so call sites apply every optional search filter
//! unconditionally and only the present ones reach the statement.
//!
//! A builder instance has a single owner; it is not meant to be shared or
//! mutated concurrently.

use std::collections::HashMap;

use crate::error::DbError;
use crate::pool::DbPool;
use crate::results::Row;
use crate::strcase::camel_to_snake;
use crate::types::DbValue;

/// Pattern operators for the `*_where_like` filters. The set is closed, so
/// an invalid operator is unrepresentable rather than a runtime panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    StartsWith,
    EndsWith,
    Contains,
}

impl QueryOperator {
    fn pattern(self, value: &str) -> String {
        match self {
            QueryOperator::StartsWith => format!("{value}%"),
            QueryOperator::EndsWith => format!("%{value}"),
            QueryOperator::Contains => format!("%{value}%"),
        }
    }
}

/// Mutable accumulator of SELECT-clause fragments.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    select_fields: Vec<String>,
    table: String,
    joins: Vec<String>,
    conditions: Vec<String>,
    args: Vec<DbValue>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add projection fields. Without any, the statement selects `*`.
    #[must_use]
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select_fields
            .extend(fields.iter().map(|f| (*f).to_string()));
        self
    }

    #[must_use]
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Add a join clause, e.g. `join("INNER", "profiles p", "u.id = p.user_id")`.
    #[must_use]
    pub fn join(mut self, join_type: &str, table: &str, on_condition: &str) -> Self {
        self.joins
            .push(format!("{join_type} JOIN {table} ON {on_condition}"));
        self
    }

    /// Add a condition when `value` is present; no-op otherwise.
    ///
    /// `condition` supplies its own placeholder, e.g. `"id = ?"`.
    #[must_use]
    pub fn where_(self, condition: &str, value: Option<DbValue>) -> Self {
        self.add_filter(condition, "AND", value)
    }

    /// AND a condition onto the chain; seeds the first condition when none
    /// exists yet, so filter order does not matter.
    #[must_use]
    pub fn and_where(self, condition: &str, value: Option<DbValue>) -> Self {
        self.add_filter(condition, "AND", value)
    }

    /// OR a condition onto the chain; seeds the first condition when none
    /// exists yet.
    #[must_use]
    pub fn or_where(self, condition: &str, value: Option<DbValue>) -> Self {
        self.add_filter(condition, "OR", value)
    }

    /// Add a LIKE condition on `column` when `value` is present.
    #[must_use]
    pub fn where_like(self, column: &str, operator: QueryOperator, value: Option<&str>) -> Self {
        self.add_like_filter(column, "AND", operator, value)
    }

    /// AND a LIKE condition onto the chain.
    #[must_use]
    pub fn and_where_like(
        self,
        column: &str,
        operator: QueryOperator,
        value: Option<&str>,
    ) -> Self {
        self.add_like_filter(column, "AND", operator, value)
    }

    /// OR a LIKE condition onto the chain.
    #[must_use]
    pub fn or_where_like(self, column: &str, operator: QueryOperator, value: Option<&str>) -> Self {
        self.add_like_filter(column, "OR", operator, value)
    }

    #[must_use]
    pub fn group_by(mut self, fields: &[&str]) -> Self {
        self.group_by.extend(fields.iter().map(|f| (*f).to_string()));
        self
    }

    /// Add order-by fields. A leading `-` means descending; names are
    /// normalized from camelCase to the snake_case storage convention.
    #[must_use]
    pub fn order_by(mut self, fields: &[&str]) -> Self {
        for field in fields {
            match field.strip_prefix('-') {
                Some(name) => self
                    .order_by
                    .push(format!("{} DESC", camel_to_snake(name))),
                None => self.order_by.push(format!("{} ASC", camel_to_snake(field))),
            }
        }
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Pagination sugar: 1-based page number and page size.
    #[must_use]
    pub fn page(mut self, page: u64, page_size: u64) -> Self {
        self.offset = Some(page.saturating_sub(1) * page_size);
        self.limit = Some(page_size);
        self
    }

    /// Render the statement and its positional argument list.
    ///
    /// Rendering is idempotent: without intervening mutation, repeated calls
    /// return identical output.
    ///
    /// # Panics
    ///
    /// Panics if no table was set; a query with no target is a caller
    /// programming error.
    #[must_use]
    pub fn build(&self) -> (String, Vec<DbValue>) {
        assert!(!self.table.is_empty(), "query builder: no table specified");

        let mut query = String::from("SELECT ");
        if self.select_fields.is_empty() {
            query.push('*');
        } else {
            query.push_str(&self.select_fields.join(", "));
        }

        query.push_str(" FROM ");
        query.push_str(&self.table);

        if !self.joins.is_empty() {
            query.push(' ');
            query.push_str(&self.joins.join(" "));
        }

        if !self.conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.conditions.join(" "));
        }

        if !self.group_by.is_empty() {
            query.push_str(" GROUP BY ");
            query.push_str(&self.group_by.join(", "));
        }

        if !self.order_by.is_empty() {
            query.push_str(" ORDER BY ");
            query.push_str(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            query.push_str(&format!(" OFFSET {offset}"));
        }

        (query, self.args.clone())
    }

    /// Render and execute against the read pool, invoking `row_fn` once per
    /// row and stopping on its first error.
    ///
    /// Results are whatever `row_fn` accumulates per row; the builder holds
    /// no result set of its own.
    ///
    /// # Errors
    ///
    /// Returns the first error from the statement or from `row_fn`.
    pub async fn execute<T, F>(&self, pool: &DbPool, row_fn: F) -> Result<Vec<T>, DbError>
    where
        F: FnMut(&Row) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let (sql, args) = self.build();
        pool.query(&sql, &args, row_fn).await
    }

    fn add_filter(mut self, condition: &str, conjunction: &str, value: Option<DbValue>) -> Self {
        if let Some(value) = value {
            self.add_condition(condition, conjunction);
            self.args.push(value);
        }
        self
    }

    fn add_like_filter(
        mut self,
        column: &str,
        conjunction: &str,
        operator: QueryOperator,
        value: Option<&str>,
    ) -> Self {
        if let Some(value) = value {
            let pattern = operator.pattern(value);
            self.add_condition(&format!("{column} LIKE ?"), conjunction);
            self.args.push(DbValue::Text(pattern));
        }
        self
    }

    fn add_condition(&mut self, condition: &str, conjunction: &str) {
        if let Some(last) = self.conditions.last_mut() {
            *last = format!("{last} {conjunction} ({condition})");
        } else {
            self.conditions.push(format!("({condition})"));
        }
    }
}

/// Build the projection for a search endpoint: a `count(*) over()` total
/// column followed by each requested field mapped to
/// `table.snake_case_name`, unless a custom mapping overrides it.
#[must_use]
pub fn build_search_select_fields(
    table: &str,
    fields: &[&str],
    custom_mappings: &HashMap<&str, &str>,
) -> Vec<String> {
    let mut db_fields = Vec::with_capacity(fields.len() + 1);
    db_fields.push("count(*) over()".to_string());
    for field in fields {
        match custom_mappings.get(field) {
            Some(mapped) => db_fields.push((*mapped).to_string()),
            None => db_fields.push(format!("{table}.{}", camel_to_snake(field))),
        }
    }
    db_fields
}
