//! Decoding of columnar wire pages into typed values.

use std::sync::Arc;

use crate::data::bitmap::NullBitmap;
use crate::data::row::Row;
use crate::error::ConversionError;
use crate::transport::messages::{RowSet, TColumn, TypedColumn};
use crate::types::{ColumnDescriptor, ColumnValue, Decimal, HiveType, Schema};

/// One fetched page, decoded column by column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBatch {
    schema: Arc<Schema>,
    columns: Vec<Vec<ColumnValue>>,
    row_count: usize,
}

impl ColumnBatch {
    /// Decode a wire page against the result schema.
    ///
    /// A page without columns is an empty batch. Otherwise the page must
    /// carry one column per schema entry, all of the same length.
    pub fn decode(row_set: RowSet, schema: Arc<Schema>) -> Result<Self, ConversionError> {
        let wire_columns = row_set.columns.unwrap_or_default();
        if wire_columns.is_empty() {
            return Ok(Self::empty(schema));
        }
        if wire_columns.len() != schema.len() {
            return Err(ConversionError::ColumnCountMismatch {
                expected: schema.len(),
                actual: wire_columns.len(),
            });
        }

        let mut columns = Vec::with_capacity(wire_columns.len());
        let mut row_count = None;
        for (descriptor, wire) in schema.columns().iter().zip(wire_columns) {
            let position = columns.len() + 1;
            let wire = wire.ok_or(ConversionError::MalformedColumn { column: position })?;

            let expected = *row_count.get_or_insert(wire.len());
            if wire.len() != expected {
                return Err(ConversionError::RowCountMismatch {
                    column: position,
                    expected,
                    actual: wire.len(),
                });
            }
            columns.push(decode_column(wire, descriptor, position)?);
        }

        Ok(Self {
            schema,
            columns,
            row_count: row_count.unwrap_or(0),
        })
    }

    pub fn empty(schema: Arc<Schema>) -> Self {
        let columns = vec![Vec::new(); schema.len()];
        Self {
            schema,
            columns,
            row_count: 0,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Values of the column at a 1-based position.
    pub fn column(&self, position: usize) -> Option<&[ColumnValue]> {
        position
            .checked_sub(1)
            .and_then(|index| self.columns.get(index))
            .map(Vec::as_slice)
    }

    /// Row-wise view of the page.
    pub fn into_rows(self) -> BatchRows {
        BatchRows {
            schema: self.schema,
            columns: self.columns.into_iter().map(Vec::into_iter).collect(),
            remaining: self.row_count,
        }
    }
}

/// Rows of one [`ColumnBatch`], in page order.
#[derive(Debug)]
pub struct BatchRows {
    schema: Arc<Schema>,
    columns: Vec<std::vec::IntoIter<ColumnValue>>,
    remaining: usize,
}

impl Iterator for BatchRows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let values = self
            .columns
            .iter_mut()
            .map(|column| column.next().unwrap_or(ColumnValue::Null))
            .collect();
        Some(Row::new(Arc::clone(&self.schema), values))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for BatchRows {}

fn decode_column(
    wire: TColumn,
    descriptor: &ColumnDescriptor,
    column: usize,
) -> Result<Vec<ColumnValue>, ConversionError> {
    let hive_type = descriptor.hive_type();
    match wire {
        TColumn::Bool(c) => Ok(map_values(c, ColumnValue::Boolean)),
        TColumn::Byte(c) => Ok(map_values(c, ColumnValue::TinyInt)),
        TColumn::I16(c) => Ok(map_values(c, ColumnValue::SmallInt)),
        TColumn::I32(c) => Ok(map_values(c, ColumnValue::Int)),
        TColumn::I64(c) => match hive_type {
            HiveType::Timestamp => try_map_values(c, |millis, row| {
                ColumnValue::timestamp_from_millis(millis).ok_or(
                    ConversionError::TemporalOutOfRange {
                        millis,
                        row,
                        column,
                    },
                )
            }),
            HiveType::Date => try_map_values(c, |millis, row| {
                ColumnValue::date_from_millis(millis).ok_or(ConversionError::TemporalOutOfRange {
                    millis,
                    row,
                    column,
                })
            }),
            _ => Ok(map_values(c, ColumnValue::BigInt)),
        },
        TColumn::Double(c) => match hive_type {
            HiveType::Float => Ok(map_values(c, |v| ColumnValue::Float(v as f32))),
            _ => Ok(map_values(c, ColumnValue::Double)),
        },
        TColumn::String(c) => match hive_type {
            HiveType::Decimal => try_map_values(c, |text, row| {
                text.parse::<Decimal>()
                    .map(ColumnValue::Decimal)
                    .map_err(|_| ConversionError::InvalidDecimal {
                        value: text,
                        row,
                        column,
                    })
            }),
            HiveType::Char => try_map_values(c, |text, row| {
                text.chars()
                    .next()
                    .map(ColumnValue::Char)
                    .ok_or(ConversionError::InvalidChar { row, column })
            }),
            HiveType::Varchar => Ok(map_values(c, ColumnValue::Varchar)),
            _ => Ok(map_values(c, ColumnValue::String)),
        },
        TColumn::Binary(c) => Ok(map_values(c, ColumnValue::Binary)),
    }
}

fn map_values<T, F>(column: TypedColumn<T>, mut convert: F) -> Vec<ColumnValue>
where
    F: FnMut(T) -> ColumnValue,
{
    let nulls = NullBitmap::from_bytes(&column.nulls);
    column
        .values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            if nulls.is_null(row) {
                ColumnValue::Null
            } else {
                convert(value)
            }
        })
        .collect()
}

/// Like [`map_values`], with `row` as a 0-based index for error reports.
fn try_map_values<T, F>(
    column: TypedColumn<T>,
    mut convert: F,
) -> Result<Vec<ColumnValue>, ConversionError>
where
    F: FnMut(T, usize) -> Result<ColumnValue, ConversionError>,
{
    let nulls = NullBitmap::from_bytes(&column.nulls);
    column
        .values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            if nulls.is_null(row) {
                Ok(ColumnValue::Null)
            } else {
                convert(value, row)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;
    use chrono::NaiveDate;

    fn schema(types: &[(&str, HiveType)]) -> Arc<Schema> {
        Arc::new(Schema::new(
            types
                .iter()
                .enumerate()
                .map(|(i, (name, t))| ColumnDescriptor::new(name, ColumnType::new(*t), i + 1))
                .collect(),
        ))
    }

    fn row_set(columns: Vec<Option<TColumn>>) -> RowSet {
        RowSet {
            columns: Some(columns),
            ..RowSet::default()
        }
    }

    #[test]
    fn test_decode_three_columns() {
        let schema = schema(&[
            ("id", HiveType::Int),
            ("name", HiveType::String),
            ("ts", HiveType::Timestamp),
        ]);
        let page = row_set(vec![
            Some(TColumn::I32(TypedColumn::new(vec![1, 2], vec![]))),
            Some(TColumn::String(TypedColumn::new(
                vec!["a".to_string(), "b".to_string()],
                vec![],
            ))),
            Some(TColumn::I64(TypedColumn::new(vec![0, 1_000], vec![0b01]))),
        ]);

        let batch = ColumnBatch::decode(page, schema).unwrap();
        assert_eq!(batch.row_count(), 2);

        let rows: Vec<Row> = batch.into_rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(1), Some(&ColumnValue::Int(1)));
        assert_eq!(rows[0].get(2), Some(&ColumnValue::String("a".to_string())));
        assert_eq!(rows[0].get(3), Some(&ColumnValue::Null));
        assert_eq!(rows[1].get(1), Some(&ColumnValue::Int(2)));
        assert_eq!(rows[1].get(2), Some(&ColumnValue::String("b".to_string())));
        assert!(matches!(rows[1].get(3), Some(ColumnValue::Timestamp(_))));
        let ts = rows[1].get(3).map(ToString::to_string);
        assert_eq!(ts.as_deref(), Some("1970-01-01 00:00:01.000"));
    }

    #[test]
    fn test_null_bit_overrides_temporal_refinement() {
        let schema = schema(&[("day", HiveType::Date), ("at", HiveType::Timestamp)]);
        // null slots hold values that would not convert
        let page = row_set(vec![
            Some(TColumn::I64(TypedColumn::new(vec![i64::MAX, 0], vec![0b01]))),
            Some(TColumn::I64(TypedColumn::new(vec![0, i64::MAX], vec![0b10]))),
        ]);

        let batch = ColumnBatch::decode(page, schema).unwrap();
        let day = batch.column(1).unwrap();
        assert_eq!(day[0], ColumnValue::Null);
        assert!(matches!(day[1], ColumnValue::Date(_)));
        let at = batch.column(2).unwrap();
        assert!(matches!(at[0], ColumnValue::Timestamp(_)));
        assert_eq!(at[1], ColumnValue::Null);
    }

    #[test]
    fn test_logical_refinement() {
        let schema = schema(&[
            ("f", HiveType::Float),
            ("d", HiveType::Decimal),
            ("c", HiveType::Char),
            ("v", HiveType::Varchar),
            ("day", HiveType::Date),
            ("n", HiveType::BigInt),
        ]);
        let page = row_set(vec![
            Some(TColumn::Double(TypedColumn::new(vec![1.5], vec![]))),
            Some(TColumn::String(TypedColumn::new(vec!["12.50".to_string()], vec![]))),
            Some(TColumn::String(TypedColumn::new(vec!["xyz".to_string()], vec![]))),
            Some(TColumn::String(TypedColumn::new(vec!["abc".to_string()], vec![]))),
            Some(TColumn::I64(TypedColumn::new(vec![86_400_000], vec![]))),
            Some(TColumn::I64(TypedColumn::new(vec![86_400_000], vec![]))),
        ]);

        let rows: Vec<Row> = ColumnBatch::decode(page, schema).unwrap().into_rows().collect();
        let row = &rows[0];
        assert_eq!(row.get(1), Some(&ColumnValue::Float(1.5)));
        assert_eq!(row.get(2), Some(&ColumnValue::Decimal(Decimal::new(1250, 2))));
        assert_eq!(row.get(3), Some(&ColumnValue::Char('x')));
        assert_eq!(row.get(4), Some(&ColumnValue::Varchar("abc".to_string())));
        assert_eq!(
            row.get(5),
            Some(&ColumnValue::Date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()))
        );
        assert_eq!(row.get(6), Some(&ColumnValue::BigInt(86_400_000)));
    }

    #[test]
    fn test_null_slots_skip_refinement() {
        // an invalid decimal under a null flag is never parsed
        let schema = schema(&[("d", HiveType::Decimal), ("c", HiveType::Char)]);
        let page = row_set(vec![
            Some(TColumn::String(TypedColumn::new(vec!["junk".to_string()], vec![0b1]))),
            Some(TColumn::String(TypedColumn::new(vec![String::new()], vec![0b1]))),
        ]);
        let batch = ColumnBatch::decode(page, schema).unwrap();
        assert_eq!(batch.column(1), Some(&[ColumnValue::Null][..]));
        assert_eq!(batch.column(2), Some(&[ColumnValue::Null][..]));
    }

    #[test]
    fn test_malformed_column() {
        let schema = schema(&[("a", HiveType::Int), ("b", HiveType::Int)]);
        let page = row_set(vec![
            Some(TColumn::I32(TypedColumn::new(vec![1], vec![]))),
            None,
        ]);
        let err = ColumnBatch::decode(page, schema).unwrap_err();
        assert!(matches!(err, ConversionError::MalformedColumn { column: 2 }));
    }

    #[test]
    fn test_count_mismatches() {
        let two = schema(&[("a", HiveType::Int), ("b", HiveType::Int)]);
        let page = row_set(vec![Some(TColumn::I32(TypedColumn::new(vec![1], vec![])))]);
        let err = ColumnBatch::decode(page, Arc::clone(&two)).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::ColumnCountMismatch {
                expected: 2,
                actual: 1
            }
        ));

        let page = row_set(vec![
            Some(TColumn::I32(TypedColumn::new(vec![1, 2], vec![]))),
            Some(TColumn::I32(TypedColumn::new(vec![1], vec![]))),
        ]);
        let err = ColumnBatch::decode(page, two).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::RowCountMismatch {
                column: 2,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_invalid_values() {
        let page = row_set(vec![Some(TColumn::String(TypedColumn::new(
            vec!["1".to_string(), "x1".to_string()],
            vec![],
        )))]);
        let err = ColumnBatch::decode(page, schema(&[("d", HiveType::Decimal)])).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::InvalidDecimal { row: 1, column: 1, .. }
        ));

        let page = row_set(vec![Some(TColumn::String(TypedColumn::new(
            vec![String::new()],
            vec![],
        )))]);
        let err = ColumnBatch::decode(page, schema(&[("c", HiveType::Char)])).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidChar { row: 0, column: 1 }));

        let page = row_set(vec![Some(TColumn::I64(TypedColumn::new(vec![i64::MAX], vec![])))]);
        let err = ColumnBatch::decode(page, schema(&[("t", HiveType::Timestamp)])).unwrap_err();
        assert!(matches!(err, ConversionError::TemporalOutOfRange { .. }));
    }

    #[test]
    fn test_empty_page() {
        let batch =
            ColumnBatch::decode(RowSet::default(), schema(&[("a", HiveType::Int)])).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.column_count(), 1);
        assert_eq!(batch.into_rows().count(), 0);
    }
}
