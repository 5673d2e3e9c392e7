//! Column types, schemas and cell values, plus their mapping to Arrow.

mod mapping;
mod schema;
mod value;

pub use mapping::{ColumnType, HiveType, TypeMapper, TypeQualifiers};
pub use schema::{ColumnDescriptor, Schema};
pub use value::{ColumnValue, Decimal, ParseDecimalError};
