//! Type mapping between Hive logical types and Apache Arrow data types.

use crate::transport::messages::{PrimitiveTypeEntry, TypeQualifierValue};
use arrow_schema::{DataType, TimeUnit};
use std::collections::BTreeMap;
use std::fmt;

const DEFAULT_DECIMAL_PRECISION: u8 = 10;
const DEFAULT_DECIMAL_SCALE: i8 = 0;
const MAX_DECIMAL_PRECISION: u8 = 38;

/// Hive logical column type, decoded from the wire type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiveType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    String,
    Timestamp,
    Binary,
    Array,
    Map,
    Struct,
    Union,
    UserDefined,
    Decimal,
    Null,
    Date,
    Varchar,
    Char,
    IntervalYearMonth,
    IntervalDayTime,
    TimestampLocalTz,
    /// A type id this client does not know
    Unknown(i32),
}

impl HiveType {
    pub fn from_type_id(id: i32) -> Self {
        match id {
            0 => HiveType::Boolean,
            1 => HiveType::TinyInt,
            2 => HiveType::SmallInt,
            3 => HiveType::Int,
            4 => HiveType::BigInt,
            5 => HiveType::Float,
            6 => HiveType::Double,
            7 => HiveType::String,
            8 => HiveType::Timestamp,
            9 => HiveType::Binary,
            10 => HiveType::Array,
            11 => HiveType::Map,
            12 => HiveType::Struct,
            13 => HiveType::Union,
            14 => HiveType::UserDefined,
            15 => HiveType::Decimal,
            16 => HiveType::Null,
            17 => HiveType::Date,
            18 => HiveType::Varchar,
            19 => HiveType::Char,
            20 => HiveType::IntervalYearMonth,
            21 => HiveType::IntervalDayTime,
            22 => HiveType::TimestampLocalTz,
            other => HiveType::Unknown(other),
        }
    }

    /// SQL name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            HiveType::Boolean => "BOOLEAN",
            HiveType::TinyInt => "TINYINT",
            HiveType::SmallInt => "SMALLINT",
            HiveType::Int => "INT",
            HiveType::BigInt => "BIGINT",
            HiveType::Float => "FLOAT",
            HiveType::Double => "DOUBLE",
            HiveType::String => "STRING",
            HiveType::Timestamp => "TIMESTAMP",
            HiveType::Binary => "BINARY",
            HiveType::Array => "ARRAY",
            HiveType::Map => "MAP",
            HiveType::Struct => "STRUCT",
            HiveType::Union => "UNIONTYPE",
            HiveType::UserDefined => "USER_DEFINED",
            HiveType::Decimal => "DECIMAL",
            HiveType::Null => "VOID",
            HiveType::Date => "DATE",
            HiveType::Varchar => "VARCHAR",
            HiveType::Char => "CHAR",
            HiveType::IntervalYearMonth => "INTERVAL_YEAR_MONTH",
            HiveType::IntervalDayTime => "INTERVAL_DAY_TIME",
            HiveType::TimestampLocalTz => "TIMESTAMP WITH LOCAL TIME ZONE",
            HiveType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for HiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Precision, scale and length qualifiers of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeQualifiers {
    pub precision: Option<u8>,
    pub scale: Option<i8>,
    pub max_length: Option<u32>,
}

impl TypeQualifiers {
    pub fn from_wire(qualifiers: &BTreeMap<String, TypeQualifierValue>) -> Self {
        let int = |key: &str| match qualifiers.get(key) {
            Some(TypeQualifierValue::I32(value)) => Some(*value),
            Some(TypeQualifierValue::String(value)) => value.parse().ok(),
            None => None,
        };
        Self {
            precision: int("precision").and_then(|v| u8::try_from(v).ok()),
            scale: int("scale").and_then(|v| i8::try_from(v).ok()),
            max_length: int("characterMaximumLength").and_then(|v| u32::try_from(v).ok()),
        }
    }
}

/// Logical type of a column plus its qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    pub hive_type: HiveType,
    pub qualifiers: TypeQualifiers,
}

impl ColumnType {
    pub fn new(hive_type: HiveType) -> Self {
        Self {
            hive_type,
            qualifiers: TypeQualifiers::default(),
        }
    }

    pub fn from_primitive(entry: &PrimitiveTypeEntry) -> Self {
        Self {
            hive_type: HiveType::from_type_id(entry.type_id),
            qualifiers: TypeQualifiers::from_wire(&entry.qualifiers),
        }
    }

    /// Decimal precision and scale, with defaults.
    pub fn decimal_precision_scale(&self) -> (u8, i8) {
        (
            self.qualifiers
                .precision
                .unwrap_or(DEFAULT_DECIMAL_PRECISION)
                .clamp(1, MAX_DECIMAL_PRECISION),
            self.qualifiers.scale.unwrap_or(DEFAULT_DECIMAL_SCALE),
        )
    }
}

/// Type mapper for converting Hive types to Arrow.
pub struct TypeMapper;

impl TypeMapper {
    /// Convert a column type to an Arrow DataType.
    ///
    /// Complex, interval and unknown types are carried as their string form.
    pub fn hive_to_arrow(column_type: &ColumnType) -> DataType {
        match column_type.hive_type {
            HiveType::Boolean => DataType::Boolean,
            HiveType::TinyInt => DataType::Int8,
            HiveType::SmallInt => DataType::Int16,
            HiveType::Int => DataType::Int32,
            HiveType::BigInt => DataType::Int64,
            HiveType::Float => DataType::Float32,
            HiveType::Double => DataType::Float64,
            HiveType::Decimal => {
                let (precision, scale) = column_type.decimal_precision_scale();
                DataType::Decimal128(precision, scale)
            }
            HiveType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            HiveType::Date => DataType::Date32,
            HiveType::Binary => DataType::Binary,
            HiveType::Null => DataType::Null,
            _ => DataType::Utf8,
        }
    }
}
