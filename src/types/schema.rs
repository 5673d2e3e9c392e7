//! Result set schema: ordered column descriptors.

use crate::transport::messages::{ColumnDesc, TableSchema};
use crate::types::mapping::{ColumnType, HiveType, TypeMapper};
use arrow_schema::{Field, Schema as ArrowSchema};
use std::sync::{Arc, OnceLock};

/// Description of one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name without table prefix
    pub name: String,
    /// Table name, when the server sent `table.column`
    pub table: Option<String>,
    /// Display label, if different from the name
    pub label: Option<String>,
    pub comment: Option<String>,
    pub column_type: ColumnType,
    /// 1-based
    pub position: usize,
}

impl ColumnDescriptor {
    /// Build a descriptor from a raw column name.
    ///
    /// A raw name `t.c` is split at the last dot into table `t` and name `c`.
    pub fn new(raw_name: &str, column_type: ColumnType, position: usize) -> Self {
        let (table, name) = match raw_name.rsplit_once('.') {
            Some((table, name)) => (Some(table.to_string()), name.to_string()),
            None => (None, raw_name.to_string()),
        };
        Self {
            name,
            table,
            label: None,
            comment: None,
            column_type,
            position,
        }
    }

    /// Build a descriptor from its wire form.
    ///
    /// A missing or non-primitive type is treated as STRING.
    pub fn from_desc(desc: &ColumnDesc) -> Self {
        let column_type = desc
            .type_desc
            .primitive()
            .map(ColumnType::from_primitive)
            .unwrap_or_else(|| ColumnType::new(HiveType::String));
        let position = usize::try_from(desc.position).unwrap_or_default();
        let mut descriptor = Self::new(&desc.column_name, column_type, position);
        descriptor.comment = desc.comment.clone();
        descriptor
    }

    pub fn hive_type(&self) -> HiveType {
        self.column_type.hive_type
    }

    /// Label if set, otherwise the name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered columns of a result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    pub fn from_table_schema(schema: &TableSchema) -> Self {
        Self::new(schema.columns.iter().map(ColumnDescriptor::from_desc).collect())
    }

    /// Single STRING column used for server log pages.
    pub fn server_log() -> Arc<Schema> {
        static LOG_SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
        Arc::clone(LOG_SCHEMA.get_or_init(|| {
            Arc::new(Schema::new(vec![ColumnDescriptor::new(
                "log",
                ColumnType::new(HiveType::String),
                1,
            )]))
        }))
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column at a 1-based position.
    pub fn column(&self, position: usize) -> Option<&ColumnDescriptor> {
        position
            .checked_sub(1)
            .and_then(|index| self.columns.get(index))
    }

    /// 1-based position of the first column with `name`, ignoring case.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .map(|index| index + 1)
    }

    /// Arrow schema with every field nullable.
    pub fn to_arrow(&self) -> ArrowSchema {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(&c.name, TypeMapper::hive_to_arrow(&c.column_type), true))
            .collect();
        ArrowSchema::new(fields)
    }
}
