/// Type mapping between backend field types and client column types
///
/// The backend is schema-optional: a field may carry a declared type, or none
/// at all. Declared types map through a fixed table; undeclared fields are
/// classified from their runtime value. Binary records get special treatment
/// in both paths.
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::decode::{parse_date, parse_timestamp};
use crate::models::Value;

/// Backend field type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Short,
    Boolean,
    Long,
    Double,
    Decimal,
    Date,
    DateTime,
    Byte,
    Binary,
    Embedded,
    EmbeddedList,
    EmbeddedMap,
    EmbeddedSet,
    Link,
    LinkList,
    LinkMap,
    LinkSet,
    Transient,
}

impl FieldType {
    /// Upper-case tag used by the backend's command language and by
    /// `getColumnTypeName`.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::Short => "SHORT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Long => "LONG",
            FieldType::Double => "DOUBLE",
            FieldType::Decimal => "DECIMAL",
            FieldType::Date => "DATE",
            FieldType::DateTime => "DATETIME",
            FieldType::Byte => "BYTE",
            FieldType::Binary => "BINARY",
            FieldType::Embedded => "EMBEDDED",
            FieldType::EmbeddedList => "EMBEDDEDLIST",
            FieldType::EmbeddedMap => "EMBEDDEDMAP",
            FieldType::EmbeddedSet => "EMBEDDEDSET",
            FieldType::Link => "LINK",
            FieldType::LinkList => "LINKLIST",
            FieldType::LinkMap => "LINKMAP",
            FieldType::LinkSet => "LINKSET",
            FieldType::Transient => "TRANSIENT",
        }
    }

    /// Parse a type tag, case-insensitively.
    pub fn from_name(name: &str) -> Option<FieldType> {
        let ty = match name.to_ascii_uppercase().as_str() {
            "STRING" => FieldType::String,
            "INTEGER" => FieldType::Integer,
            "FLOAT" => FieldType::Float,
            "SHORT" => FieldType::Short,
            "BOOLEAN" => FieldType::Boolean,
            "LONG" => FieldType::Long,
            "DOUBLE" => FieldType::Double,
            "DECIMAL" => FieldType::Decimal,
            "DATE" => FieldType::Date,
            "DATETIME" => FieldType::DateTime,
            "BYTE" => FieldType::Byte,
            "BINARY" => FieldType::Binary,
            "EMBEDDED" => FieldType::Embedded,
            "EMBEDDEDLIST" => FieldType::EmbeddedList,
            "EMBEDDEDMAP" => FieldType::EmbeddedMap,
            "EMBEDDEDSET" => FieldType::EmbeddedSet,
            "LINK" => FieldType::Link,
            "LINKLIST" => FieldType::LinkList,
            "LINKMAP" => FieldType::LinkMap,
            "LINKSET" => FieldType::LinkSet,
            "TRANSIENT" => FieldType::Transient,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Byte
                | FieldType::Short
                | FieldType::Integer
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
                | FieldType::Decimal
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Client-exposed column types, carrying their standard integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Varchar,
    Integer,
    Float,
    SmallInt,
    Boolean,
    BigInt,
    Decimal,
    Date,
    Timestamp,
    TinyInt,
    Binary,
    JavaObject,
    Blob,
    Null,
}

impl SqlType {
    pub fn code(self) -> i32 {
        match self {
            SqlType::Varchar => 12,
            SqlType::Integer => 4,
            SqlType::Float => 6,
            SqlType::SmallInt => 5,
            SqlType::Boolean => 16,
            SqlType::BigInt => -5,
            SqlType::Decimal => 3,
            SqlType::Date => 91,
            SqlType::Timestamp => 93,
            SqlType::TinyInt => -6,
            SqlType::Binary => -2,
            SqlType::JavaObject => 2000,
            SqlType::Blob => 2004,
            SqlType::Null => 0,
        }
    }
}

/// Fixed mapping from a declared backend type to a column type.
pub fn sql_type_of(field_type: FieldType) -> SqlType {
    match field_type {
        FieldType::String => SqlType::Varchar,
        FieldType::Integer => SqlType::Integer,
        FieldType::Float => SqlType::Float,
        FieldType::Short => SqlType::SmallInt,
        FieldType::Boolean => SqlType::Boolean,
        FieldType::Long => SqlType::BigInt,
        FieldType::Double | FieldType::Decimal => SqlType::Decimal,
        FieldType::Date => SqlType::Date,
        FieldType::DateTime => SqlType::Timestamp,
        FieldType::Byte => SqlType::TinyInt,
        FieldType::Binary => SqlType::Binary,
        FieldType::Embedded
        | FieldType::EmbeddedList
        | FieldType::EmbeddedMap
        | FieldType::EmbeddedSet
        | FieldType::Link
        | FieldType::LinkList
        | FieldType::LinkMap
        | FieldType::LinkSet => SqlType::JavaObject,
        FieldType::Transient => SqlType::Null,
    }
}

/// Classify an undeclared value by its runtime type.
///
/// Precedence: boolean, byte, date, double, float, integer, long, short,
/// string, then the generic object fallback.
pub fn infer_sql_type(value: &Value) -> SqlType {
    match value {
        Value::Null => SqlType::Null,
        Value::Blob(_) => SqlType::Binary,
        v if v.is_blob_list() => SqlType::Blob,
        Value::Bool(_) => sql_type_of(FieldType::Boolean),
        Value::Byte(_) => sql_type_of(FieldType::Byte),
        Value::Date(_) => sql_type_of(FieldType::Date),
        Value::DateTime(_) => sql_type_of(FieldType::DateTime),
        Value::Double(_) => sql_type_of(FieldType::Double),
        Value::Float(_) => sql_type_of(FieldType::Float),
        Value::Int(_) => sql_type_of(FieldType::Integer),
        Value::Long(_) => sql_type_of(FieldType::Long),
        Value::Short(_) => sql_type_of(FieldType::Short),
        Value::String(_) => sql_type_of(FieldType::String),
        _ => SqlType::JavaObject,
    }
}

/// Column type of a field given its declared type (if any) and its value.
///
/// Embedded and link fields holding a binary record report BINARY; embedded
/// and link lists made only of binary records report BLOB.
pub fn column_sql_type(declared: Option<FieldType>, value: &Value) -> SqlType {
    let Some(field_type) = declared else {
        return infer_sql_type(value);
    };

    match field_type {
        FieldType::Embedded | FieldType::Link => match value {
            Value::Null => SqlType::Null,
            Value::Blob(_) => SqlType::Binary,
            _ => sql_type_of(field_type),
        },
        FieldType::EmbeddedList | FieldType::LinkList => match value {
            Value::Null => SqlType::Null,
            v if v.is_blob_list() => SqlType::Blob,
            Value::List(_) => sql_type_of(field_type),
            _ => SqlType::JavaObject,
        },
        _ => sql_type_of(field_type),
    }
}

/// Coerce a stored value to the given backend type.
///
/// Returns `None` when no conversion exists. Null always coerces to null.
pub fn coerce(value: &Value, target: FieldType) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }

    match target {
        FieldType::String => Some(Value::String(value.to_string())),
        FieldType::Byte => to_i64(value)
            .and_then(|v| i8::try_from(v).ok())
            .map(Value::Byte),
        FieldType::Short => to_i64(value)
            .and_then(|v| i16::try_from(v).ok())
            .map(Value::Short),
        FieldType::Integer => to_i64(value)
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int),
        FieldType::Long => to_i64(value).map(Value::Long),
        FieldType::Float => to_f64(value).map(|v| Value::Float(v as f32)),
        FieldType::Double => to_f64(value).map(Value::Double),
        FieldType::Decimal => to_decimal(value).map(Value::Decimal),
        FieldType::Boolean => to_bool(value).map(Value::Bool),
        FieldType::Date => to_timestamp(value).map(|v| Value::Date(v.date())),
        FieldType::DateTime => to_timestamp(value).map(Value::DateTime),
        FieldType::Binary => match value {
            Value::Binary(bytes) | Value::Blob(bytes) => Some(Value::Binary(bytes.clone())),
            _ => None,
        },
        FieldType::Embedded => match value {
            Value::Embedded(_) => Some(value.clone()),
            _ => None,
        },
        FieldType::Link => match value {
            Value::Link(_) => Some(value.clone()),
            Value::Embedded(record) if record.identity().is_persistent() => {
                Some(Value::Link(record.identity()))
            }
            _ => None,
        },
        FieldType::EmbeddedList | FieldType::LinkList => match value {
            Value::List(items) | Value::Set(items) => Some(Value::List(items.clone())),
            _ => None,
        },
        FieldType::EmbeddedSet | FieldType::LinkSet => match value {
            Value::List(items) | Value::Set(items) => Some(Value::Set(items.clone())),
            _ => None,
        },
        FieldType::EmbeddedMap | FieldType::LinkMap => match value {
            Value::Map(_) => Some(value.clone()),
            _ => None,
        },
        FieldType::Transient => Some(value.clone()),
    }
}

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Byte(v) => Some(i64::from(*v)),
        Value::Short(v) => Some(i64::from(*v)),
        Value::Int(v) => Some(i64::from(*v)),
        Value::Long(v) => Some(*v),
        Value::Float(v) if v.is_finite() => Some(*v as i64),
        Value::Double(v) if v.is_finite() => Some(*v as i64),
        Value::Decimal(v) => v.trunc().to_i64(),
        Value::Bool(v) => Some(i64::from(*v)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Byte(v) => Some(f64::from(*v)),
        Value::Short(v) => Some(f64::from(*v)),
        Value::Int(v) => Some(f64::from(*v)),
        Value::Long(v) => Some(*v as f64),
        Value::Float(v) => Some(f64::from(*v)),
        Value::Double(v) => Some(*v),
        Value::Decimal(v) => v.to_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Byte(v) => Some(Decimal::from(*v)),
        Value::Short(v) => Some(Decimal::from(*v)),
        Value::Int(v) => Some(Decimal::from(*v)),
        Value::Long(v) => Some(Decimal::from(*v)),
        Value::Float(v) => Decimal::try_from(*v).ok(),
        Value::Double(v) => Decimal::try_from(*v).ok(),
        Value::Decimal(v) => Some(*v),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(v) => Some(*v),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) => {
            to_i64(value).map(|v| v != 0)
        }
        _ => None,
    }
}

fn to_timestamp(value: &Value) -> Option<PrimitiveDateTime> {
    match value {
        Value::DateTime(v) => Some(*v),
        Value::Date(v) => Some(v.midnight()),
        Value::Long(millis) => {
            let nanos = i128::from(*millis) * 1_000_000;
            OffsetDateTime::from_unix_timestamp_nanos(nanos)
                .ok()
                .map(|v| PrimitiveDateTime::new(v.date(), v.time()))
        }
        Value::String(s) => {
            parse_timestamp(s.trim()).or_else(|| parse_date(s.trim()).map(Date::midnight))
        }
        _ => None,
    }
}
