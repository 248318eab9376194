use std::sync::Arc;

use crate::types::DbValue;

/// A single fetched row: shared column names plus owned values.
///
/// Column names are shared across all rows of a result set so wide results
/// do not duplicate the header per row.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<DbValue>,
}

impl Row {
    pub(crate) fn new(columns: Arc<Vec<String>>, values: Vec<DbValue>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get a value by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&DbValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.values.get(index))
    }

    /// Get a value by position.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
