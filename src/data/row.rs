//! Result row.

use std::sync::Arc;

use crate::types::{ColumnValue, Schema};

/// One immutable result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<ColumnValue>,
}

impl Row {
    pub fn new(schema: Arc<Schema>, values: Vec<ColumnValue>) -> Self {
        Self { schema, values }
    }

    /// Value at a 1-based position.
    pub fn get(&self, position: usize) -> Option<&ColumnValue> {
        position
            .checked_sub(1)
            .and_then(|index| self.values.get(index))
    }

    /// Value of the first column named `name`, ignoring case.
    pub fn get_by_name(&self, name: &str) -> Option<&ColumnValue> {
        self.schema
            .position_of(name)
            .and_then(|position| self.get(position))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn values(&self) -> &[ColumnValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<ColumnValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
