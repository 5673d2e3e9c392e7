//! Array builders for converting decoded column values to Arrow arrays.
//!
//! Each builder walks one column of [`ColumnValue`]s and appends nulls for
//! `ColumnValue::Null`.

use crate::error::ConversionError;
use crate::types::ColumnValue;
use arrow_array::builder::{
    BinaryBuilder, BooleanBuilder, Decimal128Builder, PrimitiveBuilder, StringBuilder,
};
use arrow_array::types::{
    ArrowPrimitiveType, Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, TimestampMicrosecondType,
};
use arrow_array::{ArrayRef, NullArray};
use arrow_schema::{DataType, TimeUnit};
use std::fmt::Write;
use std::sync::Arc;

/// Build an Arrow array of `data_type` from one decoded column.
///
/// `column` is the 1-based position used in error reports.
pub fn build_array(
    data_type: &DataType,
    values: &[ColumnValue],
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    match data_type {
        DataType::Boolean => build_boolean_array(values, column),
        DataType::Int8 => build_primitive_array::<Int8Type, _>(values, column, "TINYINT", |v| {
            match v {
                ColumnValue::TinyInt(n) => Some(*n),
                _ => None,
            }
        }),
        DataType::Int16 => build_primitive_array::<Int16Type, _>(values, column, "SMALLINT", |v| {
            match v {
                ColumnValue::SmallInt(n) => Some(*n),
                _ => None,
            }
        }),
        DataType::Int32 => build_primitive_array::<Int32Type, _>(values, column, "INT", |v| {
            match v {
                ColumnValue::Int(n) => Some(*n),
                _ => None,
            }
        }),
        DataType::Int64 => build_primitive_array::<Int64Type, _>(values, column, "BIGINT", |v| {
            match v {
                ColumnValue::BigInt(n) => Some(*n),
                _ => None,
            }
        }),
        DataType::Float32 => build_primitive_array::<Float32Type, _>(values, column, "FLOAT", |v| {
            match v {
                ColumnValue::Float(n) => Some(*n),
                _ => None,
            }
        }),
        DataType::Float64 => {
            build_primitive_array::<Float64Type, _>(values, column, "DOUBLE", |v| match v {
                ColumnValue::Double(n) => Some(*n),
                _ => None,
            })
        }
        DataType::Decimal128(precision, scale) => {
            build_decimal128_array(values, *precision, *scale, column)
        }
        DataType::Timestamp(TimeUnit::Microsecond, None) => {
            build_primitive_array::<TimestampMicrosecondType, _>(values, column, "TIMESTAMP", |v| {
                match v {
                    ColumnValue::Timestamp(ts) => Some(ts.and_utc().timestamp_micros()),
                    _ => None,
                }
            })
        }
        DataType::Date32 => build_primitive_array::<Date32Type, _>(values, column, "DATE", |v| {
            match v {
                ColumnValue::Date(date) => Some(Date32Type::from_naive_date(*date)),
                _ => None,
            }
        }),
        DataType::Binary => build_binary_array(values, column),
        DataType::Null => Ok(Arc::new(NullArray::new(values.len()))),
        _ => Ok(build_string_array(values)),
    }
}

fn unexpected(expected: &'static str, row: usize, column: usize) -> ConversionError {
    ConversionError::UnexpectedValue {
        expected,
        row,
        column,
    }
}

fn build_primitive_array<T, F>(
    values: &[ColumnValue],
    column: usize,
    expected: &'static str,
    extract: F,
) -> Result<ArrayRef, ConversionError>
where
    T: ArrowPrimitiveType,
    F: Fn(&ColumnValue) -> Option<T::Native>,
{
    let mut builder = PrimitiveBuilder::<T>::with_capacity(values.len());
    for (row, value) in values.iter().enumerate() {
        if value.is_null() {
            builder.append_null();
            continue;
        }
        let native = extract(value).ok_or_else(|| unexpected(expected, row, column))?;
        builder.append_value(native);
    }
    Ok(Arc::new(builder.finish()))
}

fn build_boolean_array(values: &[ColumnValue], column: usize) -> Result<ArrayRef, ConversionError> {
    let mut builder = BooleanBuilder::with_capacity(values.len());
    for (row, value) in values.iter().enumerate() {
        match value {
            ColumnValue::Null => builder.append_null(),
            ColumnValue::Boolean(b) => builder.append_value(*b),
            _ => return Err(unexpected("BOOLEAN", row, column)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

/// Decimals are rescaled to the column scale, rounding half away from zero.
fn build_decimal128_array(
    values: &[ColumnValue],
    precision: u8,
    scale: i8,
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    let mut builder = Decimal128Builder::with_capacity(values.len())
        .with_precision_and_scale(precision, scale)?;
    let target_scale = u32::try_from(scale).unwrap_or(0);

    for (row, value) in values.iter().enumerate() {
        match value {
            ColumnValue::Null => builder.append_null(),
            ColumnValue::Decimal(decimal) => {
                let rescaled =
                    decimal
                        .rescale(target_scale)
                        .ok_or_else(|| ConversionError::InvalidDecimal {
                            value: decimal.to_string(),
                            row,
                            column,
                        })?;
                builder.append_value(rescaled.unscaled());
            }
            _ => return Err(unexpected("DECIMAL", row, column)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn build_binary_array(values: &[ColumnValue], column: usize) -> Result<ArrayRef, ConversionError> {
    let data_len = values
        .iter()
        .map(|v| match v {
            ColumnValue::Binary(bytes) => bytes.len(),
            _ => 0,
        })
        .sum();
    let mut builder = BinaryBuilder::with_capacity(values.len(), data_len);
    for (row, value) in values.iter().enumerate() {
        match value {
            ColumnValue::Null => builder.append_null(),
            ColumnValue::Binary(bytes) => builder.append_value(bytes),
            _ => return Err(unexpected("BINARY", row, column)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

/// Any value kind renders as text; string kinds are copied as is.
fn build_string_array(values: &[ColumnValue]) -> ArrayRef {
    let data_len = values
        .iter()
        .map(|v| v.as_str().map_or(8, str::len))
        .sum();
    let mut builder = StringBuilder::with_capacity(values.len(), data_len);
    let mut scratch = String::new();
    for value in values {
        match value {
            ColumnValue::Null => builder.append_null(),
            ColumnValue::String(s) | ColumnValue::Varchar(s) => builder.append_value(s),
            other => {
                scratch.clear();
                // writing to a String cannot fail
                let _ = write!(scratch, "{}", other);
                builder.append_value(&scratch);
            }
        }
    }
    Arc::new(builder.finish())
}
