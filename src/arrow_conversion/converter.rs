//! Conversion of decoded pages to Arrow record batches.

use crate::data::ColumnBatch;
use crate::error::ConversionError;
use crate::types::Schema;
use arrow_array::{RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType, SchemaRef};
use std::sync::Arc;

use super::builders::build_array;

/// Converter from [`ColumnBatch`] pages of one result set to Arrow.
pub struct ArrowConverter {
    schema: SchemaRef,
    data_types: Vec<DataType>,
}

impl ArrowConverter {
    /// Create a converter for pages of `schema`.
    pub fn new(schema: &Schema) -> Self {
        let schema = Arc::new(schema.to_arrow());
        let data_types = schema
            .fields()
            .iter()
            .map(|field| field.data_type().clone())
            .collect();
        Self { schema, data_types }
    }

    /// Get the Arrow schema for this converter.
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Convert one decoded page.
    ///
    /// # Errors
    /// Returns `ConversionError` if the page does not match the schema or a
    /// value does not fit its Arrow type.
    pub fn convert(&self, batch: &ColumnBatch) -> Result<RecordBatch, ConversionError> {
        if batch.column_count() != self.data_types.len() {
            return Err(ConversionError::ColumnCountMismatch {
                expected: self.data_types.len(),
                actual: batch.column_count(),
            });
        }

        let arrays = self
            .data_types
            .iter()
            .enumerate()
            .map(|(index, data_type)| {
                let position = index + 1;
                let values = batch
                    .column(position)
                    .ok_or(ConversionError::MalformedColumn { column: position })?;
                build_array(data_type, values, position)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let options = RecordBatchOptions::new().with_row_count(Some(batch.row_count()));
        Ok(RecordBatch::try_new_with_options(
            Arc::clone(&self.schema),
            arrays,
            &options,
        )?)
    }
}

impl std::fmt::Debug for ArrowConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrowConverter")
            .field("fields", &self.schema.fields().len())
            .finish()
    }
}
